use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Query};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum_macros::FromRequest;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::error;
use utoipa::openapi::{RefOr, Schema};
use utoipa::{ToResponse, ToSchema, openapi};
use validator::ValidationErrors;

/// Header a client uses to say which user it is acting for
pub const USER_ID_HEADER: &str = "x-user-id";

/// Contains diagnostic information about an API failure
#[derive(Serialize, Debug, ToSchema, ToResponse)]
#[response(examples(
    ("Not Found" = (
        summary = "Entity could not be found (404)",
        value = json!({
            "success": false,
            "error": "The requested entity could not be found.",
            "error_code": "not_found",
            "extra_info": null
        })
    )),

    ("Internal Failure" = (
        summary = "Something unexpected went wrong inside the server (500)",
        value = json!({
            "success": false,
            "error": "Could not access data to complete your request",
            "error_code": "internal_error",
            "extra_info": null
        })
    )),

    ("Invalid Input" = (
        summary = "Invalid request body was passed (400)",
        value = json!({
            "success": false,
            "error": "Submitted data was invalid.",
            "error_code": "invalid_input",
            "extra_info": {
                "password": [
                    {
                        "code": "length",
                        "message": null,
                        "params": {
                            "value": "123",
                            "min": 6
                        }
                    }
                ]
            }
        })
    )),

    ("Malformed JSON" = (
        summary = "Invalid JSON passed to server (400)",
        value = json!({
            "success": false,
            "error": "The passed request body contained malformed or unreadable JSON.",
            "error_code": "invalid_json",
            "extra_info": "Failed to parse the request body as JSON: EOF while parsing an object at line 4 column 0"
        })
    ))
))]
pub struct BasicErrorResponse {
    success: bool,
    error: String,
    error_code: String,
    extra_info: Option<ExtraInfo>,
}

impl BasicErrorResponse {
    fn new(error_code: &str, error: impl Into<String>, extra_info: Option<ExtraInfo>) -> Self {
        BasicErrorResponse {
            success: false,
            error: error.into(),
            error_code: error_code.to_owned(),
            extra_info,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(untagged)]
pub enum ExtraInfo {
    ValidationIssues(ValidationErrorSchema),
    Message(String),
}

/// Stand-in OpenAPI schema for [ValidationErrors] which just provides an empty object
#[derive(Serialize, Debug)]
#[serde(transparent)]
pub struct ValidationErrorSchema(ValidationErrors);

impl<'schem> ToSchema<'schem> for ValidationErrorSchema {
    fn schema() -> (&'schem str, RefOr<Schema>) {
        (
            "ValidationErrorSchema",
            openapi::ObjectBuilder::new().into(),
        )
    }
}

/// Every failure a handler can report, mapped onto a status code and an `error_code`
#[derive(Debug)]
pub enum ApiError {
    InvalidInput(String),
    Unauthorized,
    InvalidCredentials,
    Forbidden,
    NotFound(String),
    Conflict(String),
    /// Storage or other unexpected failures. The cause is logged and never sent to the client.
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::InvalidInput(problem) => (
                StatusCode::BAD_REQUEST,
                BasicErrorResponse::new("invalid_input", problem, None),
            ),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                BasicErrorResponse::new(
                    "unauthorized",
                    "A user ID is required to access this resource.",
                    None,
                ),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                BasicErrorResponse::new("invalid_credentials", "Invalid username or password.", None),
            ),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                BasicErrorResponse::new(
                    "forbidden",
                    "You are not allowed to access another user's data.",
                    None,
                ),
            ),
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                BasicErrorResponse::new("not_found", what, None),
            ),
            Self::Conflict(problem) => (
                StatusCode::CONFLICT,
                BasicErrorResponse::new("conflict", problem, None),
            ),
            Self::Internal(cause) => {
                error!("Request failed: {cause:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    BasicErrorResponse::new(
                        "internal_error",
                        "Could not access data to complete your request",
                        None,
                    ),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

/// Response type that wraps validation errors and turns them into [BasicErrorResponse]s
pub struct ValidationErrorResponse(ValidationErrors);

impl IntoResponse for ValidationErrorResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(BasicErrorResponse::new(
                "invalid_input",
                "Submitted data was invalid.",
                Some(ExtraInfo::ValidationIssues(ValidationErrorSchema(self.0))),
            )),
        )
            .into_response()
    }
}

impl From<ValidationErrors> for ValidationErrorResponse {
    fn from(value: ValidationErrors) -> Self {
        Self(value)
    }
}

/// Wrapper for [axum::Json] which customizes the error response to use our
/// data structure for API errors
#[derive(FromRequest, Debug)]
#[from_request(via(axum::Json), rejection(JsonErrorResponse))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Response type representing JSON parse errors
pub struct JsonErrorResponse {
    parse_problem: String,
}

impl From<JsonRejection> for JsonErrorResponse {
    fn from(value: JsonRejection) -> Self {
        JsonErrorResponse {
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for JsonErrorResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            axum::Json(BasicErrorResponse::new(
                "invalid_json",
                "The passed request body contained malformed or unreadable JSON.",
                Some(ExtraInfo::Message(self.parse_problem)),
            )),
        )
            .into_response()
    }
}

/// Parses a user ID the way clients send it. Anything that isn't a positive integer counts as absent.
pub fn parse_user_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok().filter(|id: &i64| *id > 0)
}

#[derive(Deserialize)]
struct IdentityQuery {
    user_id: Option<String>,
}

/// The user a request claims to act for, read from the `user_id` query parameter or
/// the [USER_ID_HEADER] header (query wins). Handlers that also accept an ID in the body
/// prefer the body's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestingUser(pub Option<i64>);

impl RequestingUser {
    pub fn from_parts(parts: &Parts) -> Self {
        let from_query = Query::<IdentityQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.user_id)
            .and_then(|raw| parse_user_id(&raw));
        let from_header = || {
            parts
                .headers
                .get(USER_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_user_id)
        };

        RequestingUser(from_query.or_else(from_header))
    }

    /// Resolves the acting user, preferring an ID that came with the request body
    pub fn require(self, body_user_id: Option<i64>) -> Result<i64, ApiError> {
        body_user_id.or(self.0).ok_or(ApiError::Unauthorized)
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestingUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestingUser::from_parts(parts))
    }
}

/// The raw value of the [USER_ID_HEADER] header, for routes that compare it against a path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdHeader(pub Option<String>);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UserIdHeader {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_owned());

        Ok(UserIdHeader(header))
    }
}
