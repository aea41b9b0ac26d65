use crate::routing_utils::ApiError;
use crate::{SharedData, api, logging};
use axum::Router;
use axum::response::Redirect;
use axum::routing::{get, get_service};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

/// Friendly paths for the web client's screens, relative to the static directory
const PAGES: &[(&str, &str)] = &[
    ("/login", "html/Tela_Login.html"),
    ("/Tela_Login.html", "html/Tela_Login.html"),
    ("/inicial", "html/Tela_Inicial.html"),
    ("/Tela_Inicial.html", "html/Tela_Inicial.html"),
    ("/gerenciamento", "html/Tela_Gerenciamento.html"),
    ("/Tela_Gerenciamento.html", "html/Tela_Gerenciamento.html"),
    ("/criar-conta", "html/Tela_CriaConta.html"),
    ("/Tela_CriaConta.html", "html/Tela_CriaConta.html"),
];

/// Every JSON endpoint, mounted under "/api" by [build_router]
pub fn api_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .merge(api::auth::auth_routes())
        .merge(api::task::task_routes())
        .merge(api::settings::settings_routes())
        .merge(api::status::status_routes())
        .fallback(|| async { ApiError::NotFound("Endpoint not found.".to_owned()) })
}

/// Assembles the whole application: the API, its documentation, the web client's pages and
/// static files from `static_dir` for everything else.
pub fn build_router(shared_data: Arc<SharedData>, static_dir: &Path) -> Router {
    let mut router = Router::new()
        .nest("/api", api_routes())
        .merge(api::swagger_main::build_documentation())
        .route("/", get(|| async { Redirect::to("/login") }));

    for (route, page) in PAGES {
        router = router.route(route, get_service(ServeFile::new(static_dir.join(page))));
    }

    let router = router.fallback_service(ServeDir::new(static_dir));

    logging::attach_tracing_http(router).with_state(shared_data)
}
