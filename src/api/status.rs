use crate::db::Dialect;
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::Json;
use crate::{AppState, SharedData, persistence};
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::{OpenApi, ToSchema};

#[derive(OpenApi)]
#[openapi(paths(get_status), components(schemas(ServiceStatus)))]
/// Defines the OpenAPI documentation for the health endpoint
pub struct StatusApi;
/// Constant used to group health endpoints in OpenAPI documentation
pub const STATUS_API_GROUP: &str = "Status";

/// Health report for the service and its storage
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(serde::Deserialize, Debug))]
pub struct ServiceStatus {
    pub success: bool,
    #[schema(example = "online")]
    pub status: String,
    /// `sqlite`, `postgres`, or `unavailable` when no database could be opened
    #[schema(example = "sqlite")]
    pub database: String,
    /// Total number of tasks, or null if storage couldn't be reached
    #[schema(example = 42)]
    pub tasks: Option<i64>,
}

pub fn status_routes() -> Router<Arc<SharedData>> {
    Router::new().route(
        "/status",
        get(|State(app_state): AppState| async move {
            let dialect = app_state.ext_cxn.database().map(|db| db.dialect());
            let mut ext_cxn = app_state.ext_cxn.clone();

            get_status(dialect, &mut ext_cxn).await
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/status",
    tag = STATUS_API_GROUP,
    responses(
        (status = 200, description = "The service is up. Storage problems are reported in the body.", body = ServiceStatus),
    ),
)]
#[tracing::instrument(skip_all)]
/// Reports whether the service is running and what it is storing data in. Never fails.
async fn get_status(
    dialect: Option<Dialect>,
    ext_cxn: &mut impl ExternalConnectivity,
) -> Json<ServiceStatus> {
    let tasks = match persistence::count_all_tasks(ext_cxn).await {
        Ok(count) => Some(count),
        Err(err) => {
            warn!("Could not count tasks for the status report: {err:#}");
            None
        }
    };

    Json(ServiceStatus {
        success: true,
        status: "online".to_owned(),
        database: dialect.map_or("unavailable", |dialect| dialect.name()).to_owned(),
        tasks,
    })
}
