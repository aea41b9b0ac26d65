use crate::domain::settings::driving_ports::{SettingsError, SettingsPort};
use crate::domain::settings::{SettingChange, SettingValue};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{ApiError, BasicErrorResponse, Json, UserIdHeader, parse_user_id};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::response::ErrorResponse;
use axum::routing::{get, put};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(paths(get_settings, save_settings, update_setting))]
/// Defines the OpenAPI documentation for the settings API
pub struct SettingsApi;
/// Constant used to group settings endpoints in OpenAPI documentation
pub const SETTINGS_API_GROUP: &str = "Settings";

impl From<SettingsError> for ApiError {
    fn from(value: SettingsError) -> Self {
        match value {
            SettingsError::UnknownField(_) | SettingsError::InvalidValue(_) => {
                ApiError::InvalidInput(value.to_string())
            }
            SettingsError::UserDoesNotExist => ApiError::NotFound("User not found.".to_owned()),
            SettingsError::PortError(cause) => ApiError::Internal(cause),
        }
    }
}

/// Adds routes under "/settings" to the application router
pub fn settings_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/settings/:user_id",
            get(
                |State(app_state): AppState,
                 header: UserIdHeader,
                 Path(user_id): Path<String>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let settings_service = domain::settings::SettingsService {};

                    get_settings(&user_id, header, &mut ext_cxn, &settings_service).await
                },
            )
            .post(
                |State(app_state): AppState,
                 header: UserIdHeader,
                 Path(user_id): Path<String>,
                 Json(body): Json<dto::settings::SaveSettings>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let settings_service = domain::settings::SettingsService {};

                    save_settings(&user_id, header, body, &mut ext_cxn, &settings_service).await
                },
            ),
        )
        .route(
            "/settings/:user_id/:setting",
            put(
                |State(app_state): AppState,
                 header: UserIdHeader,
                 Path((user_id, setting)): Path<(String, String)>,
                 Json(body): Json<dto::settings::SettingValueBody>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let settings_service = domain::settings::SettingsService {};

                    update_setting(
                        &user_id,
                        &setting,
                        header,
                        body,
                        &mut ext_cxn,
                        &settings_service,
                    )
                    .await
                },
            ),
        )
}

/// Settings may only be read or written by the user they belong to, as named by the
/// `x-user-id` header
fn authorize(path_user_id: &str, header: &UserIdHeader) -> Result<i64, ApiError> {
    let user_id = parse_user_id(path_user_id).ok_or_else(|| {
        ApiError::InvalidInput("The user ID in the path must be a positive integer.".to_owned())
    })?;

    match header.0.as_deref().and_then(parse_user_id) {
        Some(acting_user) if acting_user == user_id => Ok(user_id),
        _ => Err(ApiError::Forbidden),
    }
}

#[utoipa::path(
    get,
    path = "/api/settings/{user_id}",
    tag = SETTINGS_API_GROUP,
    params(
        ("user_id" = i64, Path, description = "The user whose settings should be fetched"),
        ("x-user-id" = i64, Header, description = "Must match the user in the path"),
    ),
    responses(
        (status = 200, description = "The user's settings", body = dto::settings::SettingsResponse),
        (status = 403, description = "The header doesn't match the requested user", body = BasicErrorResponse),
        (status = 404, description = "No settings have been saved yet", body = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Retrieves a user's settings
async fn get_settings(
    user_id: &str,
    header: UserIdHeader,
    ext_cxn: &mut impl ExternalConnectivity,
    settings_service: &impl SettingsPort,
) -> Result<Json<dto::settings::SettingsResponse>, ErrorResponse> {
    let user_id = authorize(user_id, &header)?;
    info!(user_id, "Fetching settings");
    let settings_reader = persistence::db_settings_driven_ports::DbSettingsReader;

    let settings = settings_service
        .settings_for_user(user_id, &mut *ext_cxn, &settings_reader)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound("Settings not found.".to_owned()))?;

    Ok(Json(dto::settings::SettingsResponse {
        success: true,
        settings: settings.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/settings/{user_id}",
    tag = SETTINGS_API_GROUP,
    params(
        ("user_id" = i64, Path, description = "The user whose settings should be saved"),
        ("x-user-id" = i64, Header, description = "Must match the user in the path"),
    ),
    request_body = dto::settings::SaveSettings,
    responses(
        (status = 200, description = "Settings saved. Omitted fields were reset to their defaults.", body = dto::SuccessResponse),
        (status = 400, response = BasicErrorResponse),
        (status = 403, description = "The header doesn't match the requested user", body = BasicErrorResponse),
        (status = 404, description = "The user doesn't exist", body = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Saves every setting at once
async fn save_settings(
    user_id: &str,
    header: UserIdHeader,
    body: dto::settings::SaveSettings,
    ext_cxn: &mut impl ExternalConnectivity,
    settings_service: &impl SettingsPort,
) -> Result<Json<dto::SuccessResponse>, ErrorResponse> {
    let user_id = authorize(user_id, &header)?;
    info!(user_id, "Saving settings");

    let update = domain::settings::SettingsUpdate::try_from(body.settings)
        .map_err(|err| ApiError::InvalidInput(err.to_string()))?;
    let user_detect = persistence::db_user_driven_ports::DbDetectUser;
    let settings_writer = persistence::db_settings_driven_ports::DbSettingsWriter;

    settings_service
        .save_settings(
            user_id,
            update,
            &mut *ext_cxn,
            &user_detect,
            &settings_writer,
        )
        .await
        .map_err(ApiError::from)?;

    Ok(Json(dto::SuccessResponse::ok()))
}

#[utoipa::path(
    put,
    path = "/api/settings/{user_id}/{setting}",
    tag = SETTINGS_API_GROUP,
    params(
        ("user_id" = i64, Path, description = "The user whose setting should change"),
        ("setting" = String, Path, description = "The setting's name, such as darkMode or viewMode"),
        ("x-user-id" = i64, Header, description = "Must match the user in the path"),
    ),
    request_body = dto::settings::SettingValueBody,
    responses(
        (status = 200, description = "Setting changed", body = dto::SuccessResponse),
        (status = 400, response = BasicErrorResponse),
        (status = 403, description = "The header doesn't match the requested user", body = BasicErrorResponse),
        (status = 404, description = "The user doesn't exist", body = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Changes a single setting, creating the user's settings with defaults if needed
async fn update_setting(
    user_id: &str,
    setting: &str,
    header: UserIdHeader,
    body: dto::settings::SettingValueBody,
    ext_cxn: &mut impl ExternalConnectivity,
    settings_service: &impl SettingsPort,
) -> Result<Json<dto::SuccessResponse>, ErrorResponse> {
    let user_id = authorize(user_id, &header)?;
    info!(user_id, setting, "Changing setting");

    let change = SettingChange::parse(setting, SettingValue::from(body)).map_err(ApiError::from)?;
    let user_detect = persistence::db_user_driven_ports::DbDetectUser;
    let settings_writer = persistence::db_settings_driven_ports::DbSettingsWriter;

    settings_service
        .update_setting(
            user_id,
            &change,
            &mut *ext_cxn,
            &user_detect,
            &settings_writer,
        )
        .await
        .map_err(ApiError::from)?;

    Ok(Json(dto::SuccessResponse::ok()))
}
