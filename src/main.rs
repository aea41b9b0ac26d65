use dotenv::dotenv;
use nura_api::db::{Database, DatabaseConfig};
use nura_api::persistence::{self, schema};
use nura_api::{SharedData, app_env, logging, routes};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenv().ok();

    let otel_exporters = match (
        env::var(app_env::OTEL_SPAN_EXPORT_URL),
        env::var(app_env::OTEL_METRIC_EXPORT_URL),
    ) {
        (Ok(span_url), Ok(metric_url)) => match logging::init_exporters(&span_url, &metric_url) {
            Ok(exporters) => Some(exporters),
            Err(err) => {
                eprintln!("OpenTelemetry export disabled: {err:#}");
                None
            }
        },
        _ => None,
    };
    logging::setup_logging_and_tracing(logging::init_env_filter(), otel_exporters);

    let db_config = DatabaseConfig::from_env();
    let db = match Database::open(&db_config).await {
        Ok(db) => Some(db),
        Err(err) => {
            warn!(
                dialect = db_config.dialect().name(),
                "Could not open the database, running without storage: {err}"
            );
            None
        }
    };

    let mut ext_cxn = match db.clone() {
        Some(db) => persistence::ExternalConnectivity::new(db),
        None => persistence::ExternalConnectivity::without_database(),
    };
    if db.is_some() {
        match schema::initialize(&mut ext_cxn, &schema::SeedAccount::from_env()).await {
            Ok(report) => info!(
                dialect = report.dialect.name(),
                seeded_user_id = report.seeded_user_id,
                "Database initialized"
            ),
            Err(err) => warn!("Database schema initialization failed: {err:#}"),
        }
    }

    let shared_data = Arc::new(SharedData { ext_cxn });
    let static_dir = env::var(app_env::STATIC_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("public"));
    let router = routes::build_router(shared_data, &static_dir);

    let port = env::var(app_env::PORT)
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(3000);
    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Could not listen on port {port}: {err}");
            return;
        }
    };
    info!(port, "Starting server");

    if let Err(err) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {err}");
    }

    if let Some(db) = db {
        db.close().await;
    }
    info!("Server stopped");
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Could not listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
