use crate::domain;
use crate::domain::UnknownVariant;
use crate::domain::settings::SettingValue;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A user's full settings, using the field names the web client expects
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Deserialize, Debug, PartialEq, Eq))]
pub struct Settings {
    pub hide_completed: bool,
    pub highlight_urgent: bool,
    pub auto_suggestions: bool,
    #[schema(example = "Médio")]
    pub detail_level: String,
    pub dark_mode: bool,
    #[schema(example = "#49a09d")]
    pub primary_color: String,
    #[schema(example = "pro")]
    pub current_plan: String,
    #[schema(example = "30 de dezembro de 2025")]
    pub plan_renewal_date: String,
    #[schema(example = "list")]
    pub view_mode: String,
    pub email_notifications: bool,
    pub whatsapp_notifications: bool,
    pub whatsapp_number: Option<String>,
}

impl From<domain::settings::UserSettings> for Settings {
    fn from(value: domain::settings::UserSettings) -> Self {
        Settings {
            hide_completed: value.hide_completed,
            highlight_urgent: value.highlight_urgent,
            auto_suggestions: value.auto_suggestions,
            detail_level: value.detail_level,
            dark_mode: value.dark_mode,
            primary_color: value.primary_color,
            current_plan: value.current_plan.as_str().to_owned(),
            plan_renewal_date: value.plan_renewal_date,
            view_mode: value.view_mode.as_str().to_owned(),
            email_notifications: value.email_notifications,
            whatsapp_notifications: value.whatsapp_notifications,
            whatsapp_number: value.whatsapp_number,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct SettingsResponse {
    pub success: bool,
    pub settings: Settings,
}

/// Settings sent by a client for a whole save. Omitted fields are reset to their defaults.
#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Serialize))]
pub struct SettingsInput {
    pub hide_completed: Option<bool>,
    pub highlight_urgent: Option<bool>,
    pub auto_suggestions: Option<bool>,
    pub detail_level: Option<String>,
    pub dark_mode: Option<bool>,
    pub primary_color: Option<String>,
    pub current_plan: Option<String>,
    pub plan_renewal_date: Option<String>,
    pub view_mode: Option<String>,
    pub email_notifications: Option<bool>,
    pub whatsapp_notifications: Option<bool>,
    pub whatsapp_number: Option<String>,
}

impl TryFrom<SettingsInput> for domain::settings::SettingsUpdate {
    type Error = UnknownVariant;

    fn try_from(value: SettingsInput) -> Result<Self, Self::Error> {
        Ok(domain::settings::SettingsUpdate {
            hide_completed: value.hide_completed,
            highlight_urgent: value.highlight_urgent,
            auto_suggestions: value.auto_suggestions,
            detail_level: value.detail_level,
            dark_mode: value.dark_mode,
            primary_color: value.primary_color,
            current_plan: value.current_plan.as_deref().map(str::parse).transpose()?,
            plan_renewal_date: value.plan_renewal_date,
            view_mode: value.view_mode.as_deref().map(str::parse).transpose()?,
            email_notifications: value.email_notifications,
            whatsapp_notifications: value.whatsapp_notifications,
            whatsapp_number: value.whatsapp_number,
        })
    }
}

/// Request body for saving all settings at once
#[derive(Deserialize, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct SaveSettings {
    pub settings: SettingsInput,
}

/// A single setting's new value. Only booleans, strings and null are meaningful.
#[derive(Deserialize, ToSchema)]
#[serde(untagged)]
#[cfg_attr(test, derive(Serialize))]
pub enum RawSettingValue {
    Flag(bool),
    Text(String),
}

/// Request body for changing one setting
#[derive(Deserialize, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct SettingValueBody {
    pub value: Option<RawSettingValue>,
}

impl From<SettingValueBody> for SettingValue {
    fn from(body: SettingValueBody) -> Self {
        match body.value {
            Some(RawSettingValue::Flag(flag)) => SettingValue::Bool(flag),
            Some(RawSettingValue::Text(text)) => SettingValue::Text(text),
            None => SettingValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_client_field_names() {
        let rendered = serde_json::to_value(Settings::from(
            domain::settings::UserSettings::default(),
        ))
        .expect("settings should serialize");

        assert_eq!(
            json!({
                "hideCompleted": false,
                "highlightUrgent": true,
                "autoSuggestions": true,
                "detailLevel": "Médio",
                "darkMode": false,
                "primaryColor": "#49a09d",
                "currentPlan": "pro",
                "planRenewalDate": "30 de dezembro de 2025",
                "viewMode": "list",
                "emailNotifications": true,
                "whatsappNotifications": false,
                "whatsappNumber": null
            }),
            rendered
        );
    }

    #[test]
    fn input_accepts_legacy_view_mode() {
        let input: SaveSettings = serde_json::from_value(json!({
            "settings": { "viewMode": "lista", "darkMode": true }
        }))
        .expect("body should parse");
        let update = domain::settings::SettingsUpdate::try_from(input.settings)
            .expect("should convert");

        assert_eq!(Some(domain::settings::ViewMode::List), update.view_mode);
        assert_eq!(Some(true), update.dark_mode);
        assert_eq!(None, update.hide_completed);
    }

    #[test]
    fn single_values_map_to_setting_values() {
        let parse = |value: serde_json::Value| {
            SettingValue::from(
                serde_json::from_value::<SettingValueBody>(value).expect("body should parse"),
            )
        };

        assert_eq!(SettingValue::Bool(true), parse(json!({ "value": true })));
        assert_eq!(SettingValue::Text("kanban".into()), parse(json!({ "value": "kanban" })));
        assert_eq!(SettingValue::Null, parse(json!({ "value": null })));
        assert!(serde_json::from_value::<SettingValueBody>(json!({ "value": 12 })).is_err());
    }
}
