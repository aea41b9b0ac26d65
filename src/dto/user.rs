use crate::domain;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Credentials submitted to the login endpoint
#[derive(Deserialize, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct LoginRequest {
    /// Either the username or the email address of the account
    #[serde(default)]
    #[schema(example = "admin")]
    pub username: String,
    #[serde(default)]
    #[schema(example = "admin123")]
    pub password: String,
}

/// DTO for an authenticated user
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct NuraUser {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "admin")]
    pub username: String,
    #[schema(example = "admin@nura.ia")]
    pub email: Option<String>,
}

impl From<domain::user::NuraUser> for NuraUser {
    fn from(value: domain::user::NuraUser) -> Self {
        NuraUser {
            id: value.id,
            username: value.username,
            email: value.email,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct LoginResponse {
    pub success: bool,
    pub user: NuraUser,
}

/// DTO for creating a new user via the API
#[derive(Deserialize, Display, Validate, ToSchema)]
#[display("{username}")]
#[cfg_attr(test, derive(Serialize))]
pub struct NewUser {
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "maria")]
    pub username: String,
    #[validate(email)]
    #[schema(example = "maria@nura.ia")]
    pub email: Option<String>,
    #[validate(length(min = 6))]
    pub password: String,
}

impl From<NewUser> for domain::user::CreateUser {
    fn from(value: NewUser) -> Self {
        domain::user::CreateUser {
            username: value.username,
            email: value.email,
            password: value.password,
        }
    }
}

/// DTO containing the ID of a user that was created via the API.
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct InsertedUser {
    pub success: bool,
    #[serde(rename = "userId")]
    #[schema(example = 10)]
    pub user_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod new_user {
        use super::*;

        #[test]
        fn bad_user_data_gets_rejected() {
            let bad_user = NewUser {
                username: (0..55).map(|_| "A").collect(),
                email: Some("not-an-email".to_owned()),
                password: "123".to_owned(),
            };
            let validation_result = bad_user.validate();
            assert!(validation_result.is_err());
            let validation_errors = validation_result.unwrap_err();
            let field_validations = validation_errors.field_errors();
            assert!(field_validations.contains_key("username"));
            assert!(field_validations.contains_key("email"));
            assert!(field_validations.contains_key("password"));
        }

        #[test]
        fn email_is_optional() {
            let user = NewUser {
                username: "maria".to_owned(),
                email: None,
                password: "hunter22".to_owned(),
            };
            assert!(user.validate().is_ok());
            assert_eq!("maria", user.to_string());
        }
    }
}
