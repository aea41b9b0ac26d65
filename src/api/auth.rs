use crate::domain::user::driving_ports::{CreateUserError, LoginError, UserPort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{ApiError, BasicErrorResponse, Json, ValidationErrorResponse};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::ErrorResponse;
use axum::routing::post;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(login, create_user))]
/// Defines the OpenAPI documentation for logging in and signing up
pub struct AuthApi;
/// Constant used to group authentication endpoints in OpenAPI documentation
pub const AUTH_API_GROUP: &str = "Authentication";

impl From<LoginError> for ApiError {
    fn from(value: LoginError) -> Self {
        match value {
            LoginError::MissingCredentials => {
                ApiError::InvalidInput("Username and password are required.".to_owned())
            }
            LoginError::InvalidCredentials => ApiError::InvalidCredentials,
            LoginError::PortError(cause) => ApiError::Internal(cause),
        }
    }
}

impl From<CreateUserError> for ApiError {
    fn from(value: CreateUserError) -> Self {
        match value {
            CreateUserError::UserAlreadyExists => ApiError::Conflict(value.to_string()),
            CreateUserError::Invalid(problem) => ApiError::InvalidInput(problem),
            CreateUserError::PortError(cause) => ApiError::Internal(cause),
        }
    }
}

/// Adds the login and signup routes to the application router
pub fn auth_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/login",
            post(
                |State(app_state): AppState,
                 Json(credentials): Json<dto::user::LoginRequest>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let user_service = domain::user::UserService {};

                    login(credentials, &mut ext_cxn, &user_service).await
                },
            ),
        )
        .route(
            "/users",
            post(
                |State(app_state): AppState, Json(new_user): Json<dto::user::NewUser>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let user_service = domain::user::UserService {};

                    create_user(new_user, &mut ext_cxn, &user_service).await
                },
            ),
        )
}

#[utoipa::path(
    post,
    path = "/api/login",
    tag = AUTH_API_GROUP,
    request_body = dto::user::LoginRequest,
    responses(
        (status = 200, description = "The credentials were valid", body = dto::user::LoginResponse),
        (status = 400, description = "Username or password was missing", body = BasicErrorResponse),
        (status = 401, description = "The credentials didn't match any user", body = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip_all)]
/// Checks a username (or email) and password
async fn login(
    credentials: dto::user::LoginRequest,
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl UserPort,
) -> Result<Json<dto::user::LoginResponse>, ErrorResponse> {
    let credential_reader = persistence::db_user_driven_ports::DbCredentialReader;

    let login_result = user_service
        .login(
            &credentials.username,
            &credentials.password,
            &mut *ext_cxn,
            &credential_reader,
        )
        .await;
    if matches!(login_result, Err(LoginError::InvalidCredentials)) {
        warn!("Rejected login attempt");
    }
    let user = login_result.map_err(ApiError::from)?;

    Ok(Json(dto::user::LoginResponse {
        success: true,
        user: user.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = AUTH_API_GROUP,
    request_body = dto::user::NewUser,
    responses(
        (status = 201, description = "User created", body = dto::user::InsertedUser),
        (status = 400, response = BasicErrorResponse),
        (status = 409, description = "The username or email is taken", body = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Creates an account
async fn create_user(
    new_user: dto::user::NewUser,
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl UserPort,
) -> Result<(StatusCode, Json<dto::user::InsertedUser>), ErrorResponse> {
    info!("Attempt to create user: {}", new_user);
    new_user.validate().map_err(ValidationErrorResponse::from)?;

    let user_writer = persistence::db_user_driven_ports::DbUserWriter;
    let user_detect = persistence::db_user_driven_ports::DbDetectUser;

    let user_id = user_service
        .create_user(&new_user.into(), &mut *ext_cxn, &user_writer, &user_detect)
        .await
        .map_err(ApiError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(dto::user::InsertedUser {
            success: true,
            user_id,
        }),
    ))
}
