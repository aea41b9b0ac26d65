#![allow(dead_code)]

use axum::Router;
use axum::body::{self, Body};
use axum::http::{Method, Request, StatusCode, header};
use lazy_static::lazy_static;
use nura_api::db::{Database, DatabaseConfig, SslSetting};
use nura_api::persistence::{self, schema};
use nura_api::routing_utils::USER_ID_HEADER;
use nura_api::{SharedData, app_env, routes};
use rand::{Rng, thread_rng};
use serde_json::Value;
use sqlx::{Connection, PgConnection};
use std::env;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tower::ServiceExt;

lazy_static! {
    static ref TOKIO_RT: Runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Tokio runtime failed to initialize");
}

struct TestDatabase {
    base_url: String,
    db_name: String,
}

impl TestDatabase {
    async fn create(base_url: &str) -> Result<Self, sqlx::Error> {
        let mut rng = thread_rng();
        let db_id: u32 = rng.gen_range(10_000..99_999);
        let db_name = format!("nura_test_db_{}", db_id);
        let mut conn = PgConnection::connect(base_url).await?;

        sqlx::query(format!("CREATE DATABASE {}", db_name).as_str())
            .execute(&mut conn)
            .await?;
        conn.close().await?;

        Ok(Self {
            base_url: String::from(base_url),
            db_name,
        })
    }

    fn url(&self) -> String {
        format!("{}/{}", self.base_url, self.db_name)
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        let db_to_drop = self.db_name.clone();
        let conn_str = self.base_url.clone();

        // Runs on a separate thread because the drop may happen inside the test runtime
        let cleanup = std::thread::spawn(move || {
            TOKIO_RT.block_on(async move {
                let mut conn = match PgConnection::connect(conn_str.as_str()).await {
                    Ok(cxn) => cxn,
                    Err(conn_err) => {
                        println!(
                            "Failed to reconnect to database to drop test database {}, please remove it manually. Error: {}",
                            db_to_drop, conn_err
                        );
                        return;
                    }
                };

                let drop_result = sqlx::query(format!("DROP DATABASE {} WITH (FORCE)", db_to_drop).as_str())
                    .execute(&mut conn)
                    .await;
                if let Err(db_err) = drop_result {
                    println!(
                        "Failed to drop test database {}, please remove it manually. Error: {}",
                        db_to_drop, db_err
                    );
                }
            });
        });
        let _ = cleanup.join();
    }
}

/// Creates a throwaway PostgreSQL database for a test and hands the test an open [Database]
/// pointed at it. The database is dropped afterwards.
///
/// Expects that the TEST_DB_URL environment variable is populated
pub fn prepare_db_and_test<F, R>(test_fn: F)
where
    F: FnOnce(Database) -> R,
    R: Future<Output = ()>,
{
    dotenv::dotenv().ok();
    let pg_connection_base_url = env::var(app_env::test::TEST_DB_URL).expect(
        "You must provide the TEST_DB_URL environment variable as the base postgres connection string",
    );

    let test_db = TOKIO_RT
        .block_on(TestDatabase::create(&pg_connection_base_url))
        .unwrap_or_else(|db_err| panic!("Failed to start test database: {}", db_err));

    TOKIO_RT.block_on(async {
        let config = DatabaseConfig {
            database_url: Some(test_db.url()),
            sqlite_path: PathBuf::new(),
            ssl: SslSetting::Prefer,
            max_connections: 5,
            connect_timeout: Duration::from_secs(5),
        };
        let db = Database::open(&config)
            .await
            .unwrap_or_else(|db_err| panic!("Failed to connect to test database: {}", db_err));

        test_fn(db.clone()).await;
        db.close().await;
    });

    drop(test_db);
}

/// Initializes the schema (seeding the default admin account) and builds the full application
/// router on top of `db`
pub async fn initialized_router(db: Database) -> Router {
    let mut ext_cxn = persistence::ExternalConnectivity::new(db);
    schema::initialize(&mut ext_cxn, &schema::SeedAccount::default())
        .await
        .expect("schema should initialize");

    routes::build_router(Arc::new(SharedData { ext_cxn }), Path::new("public"))
}

/// Sends one request through `router`, returning the status and the decoded JSON body
/// (`Value::Null` for empty bodies)
pub async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    acting_user: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user_id) = acting_user {
        request = request.header(USER_ID_HEADER, user_id.to_string());
    }
    let request = match body {
        Some(json) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("request should build");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should always respond");
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not read data from response body!");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            panic!("Response body wasn't JSON: {err}, received body: {bytes:?}")
        })
    };

    (status, json)
}
