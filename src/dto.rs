use crate::routing_utils::BasicErrorResponse;
use serde::{Deserialize, Deserializer};
use utoipa::OpenApi;

pub mod settings;
pub mod task;
pub mod user;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(
            task::NewTask,
            task::UpdateTask,
            task::Task,
            task::TaskList,
            task::TaskResponse,
            task::InsertedTask,
            task::ChangedTask,
            task::TaskStats,
            task::TaskStatsResponse,
            user::LoginRequest,
            user::NuraUser,
            user::LoginResponse,
            user::NewUser,
            user::InsertedUser,
            settings::Settings,
            settings::SettingsInput,
            settings::SaveSettings,
            settings::SettingsResponse,
            settings::SettingValueBody,
            settings::RawSettingValue,
            SuccessResponse,
            BasicErrorResponse,
        ),
        responses(BasicErrorResponse),
    )
)]
/// Captures OpenAPI schemas and canned responses defined in the DTO module
pub struct OpenApiSchemas;

/// Acknowledgement for operations that return nothing else
#[derive(serde::Serialize, utoipa::ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct SuccessResponse {
    #[schema(example = true)]
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        SuccessResponse { success: true }
    }
}

/// Accepts a user ID sent either as a JSON number or as a numeric string. Values that
/// aren't positive integers are treated as missing.
fn lenient_user_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Number(id)) if id > 0 => Some(id),
        Some(RawId::Text(raw)) => crate::routing_utils::parse_user_id(&raw),
        _ => None,
    })
}

/// Distinguishes a field that was sent as `null` (`Some(None)`) from one that was left out (`None`)
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct WithId {
        #[serde(default, deserialize_with = "lenient_user_id")]
        user_id: Option<i64>,
    }

    #[derive(Deserialize)]
    struct WithNullable {
        #[serde(default, deserialize_with = "explicit_null")]
        note: Option<Option<String>>,
    }

    #[test]
    fn user_ids_can_be_numbers_or_strings() {
        let parse = |value: serde_json::Value| {
            serde_json::from_value::<WithId>(value)
                .expect("user id should always deserialize")
                .user_id
        };

        assert_eq!(Some(3), parse(json!({ "user_id": 3 })));
        assert_eq!(Some(3), parse(json!({ "user_id": "3" })));
        assert_eq!(None, parse(json!({ "user_id": "three" })));
        assert_eq!(None, parse(json!({ "user_id": true })));
        assert_eq!(None, parse(json!({ "user_id": null })));
        assert_eq!(None, parse(json!({})));
    }

    #[test]
    fn null_and_missing_are_different() {
        let missing: WithNullable = serde_json::from_value(json!({})).unwrap();
        let null: WithNullable = serde_json::from_value(json!({ "note": null })).unwrap();
        let set: WithNullable = serde_json::from_value(json!({ "note": "hi" })).unwrap();

        assert_eq!(None, missing.note);
        assert_eq!(Some(None), null.note);
        assert_eq!(Some(Some("hi".to_owned())), set.note);
    }
}
