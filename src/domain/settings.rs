use crate::domain;
use crate::domain::UnknownVariant;
use crate::domain::settings::driven_ports::{SettingsReader, SettingsWriter};
use crate::domain::settings::driving_ports::SettingsError;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use std::str::FromStr;
use tracing::info;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Plan {
    Free,
    #[default]
    Pro,
    Premium,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Premium => "premium",
        }
    }
}

impl FromStr for Plan {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        domain::parse_with_synonyms(
            "plan",
            raw,
            &[
                ("free", Plan::Free),
                ("pro", Plan::Pro),
                ("premium", Plan::Premium),
            ],
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ViewMode {
    #[default]
    List,
    Kanban,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Kanban => "kanban",
        }
    }
}

impl FromStr for ViewMode {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        domain::parse_with_synonyms(
            "view mode",
            raw,
            &[
                ("list", ViewMode::List),
                ("lista", ViewMode::List),
                ("kanban", ViewMode::Kanban),
            ],
        )
    }
}

/// Display and notification preferences. Every user has at most one of these.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct UserSettings {
    pub hide_completed: bool,
    pub highlight_urgent: bool,
    pub auto_suggestions: bool,
    pub detail_level: String,
    pub dark_mode: bool,
    pub primary_color: String,
    pub current_plan: Plan,
    pub plan_renewal_date: String,
    pub view_mode: ViewMode,
    pub email_notifications: bool,
    pub whatsapp_notifications: bool,
    pub whatsapp_number: Option<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        UserSettings {
            hide_completed: false,
            highlight_urgent: true,
            auto_suggestions: true,
            detail_level: "Médio".to_owned(),
            dark_mode: false,
            primary_color: "#49a09d".to_owned(),
            current_plan: Plan::Pro,
            plan_renewal_date: "30 de dezembro de 2025".to_owned(),
            view_mode: ViewMode::List,
            email_notifications: true,
            whatsapp_notifications: false,
            whatsapp_number: None,
        }
    }
}

/// The settings a client sent for a whole-record save. Anything left as `None` is reset to
/// its default when saved.
#[derive(Default)]
#[cfg_attr(test, derive(Clone, Debug))]
pub struct SettingsUpdate {
    pub hide_completed: Option<bool>,
    pub highlight_urgent: Option<bool>,
    pub auto_suggestions: Option<bool>,
    pub detail_level: Option<String>,
    pub dark_mode: Option<bool>,
    pub primary_color: Option<String>,
    pub current_plan: Option<Plan>,
    pub plan_renewal_date: Option<String>,
    pub view_mode: Option<ViewMode>,
    pub email_notifications: Option<bool>,
    pub whatsapp_notifications: Option<bool>,
    pub whatsapp_number: Option<String>,
}

impl SettingsUpdate {
    pub fn with_defaults(self) -> UserSettings {
        let defaults = UserSettings::default();
        UserSettings {
            hide_completed: self.hide_completed.unwrap_or(defaults.hide_completed),
            highlight_urgent: self.highlight_urgent.unwrap_or(defaults.highlight_urgent),
            auto_suggestions: self.auto_suggestions.unwrap_or(defaults.auto_suggestions),
            detail_level: self.detail_level.unwrap_or(defaults.detail_level),
            dark_mode: self.dark_mode.unwrap_or(defaults.dark_mode),
            primary_color: self.primary_color.unwrap_or(defaults.primary_color),
            current_plan: self.current_plan.unwrap_or(defaults.current_plan),
            plan_renewal_date: self.plan_renewal_date.unwrap_or(defaults.plan_renewal_date),
            view_mode: self.view_mode.unwrap_or(defaults.view_mode),
            email_notifications: self
                .email_notifications
                .unwrap_or(defaults.email_notifications),
            whatsapp_notifications: self
                .whatsapp_notifications
                .unwrap_or(defaults.whatsapp_notifications),
            whatsapp_number: self.whatsapp_number.or(defaults.whatsapp_number),
        }
    }
}

/// The fields a client may change one at a time. Nothing outside this list can be
/// written through a single-field update.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SettingField {
    HideCompleted,
    HighlightUrgent,
    AutoSuggestions,
    DetailLevel,
    DarkMode,
    PrimaryColor,
    CurrentPlan,
    PlanRenewalDate,
    ViewMode,
    EmailNotifications,
    WhatsappNotifications,
    WhatsappNumber,
}

impl SettingField {
    pub const ALL: [SettingField; 12] = [
        SettingField::HideCompleted,
        SettingField::HighlightUrgent,
        SettingField::AutoSuggestions,
        SettingField::DetailLevel,
        SettingField::DarkMode,
        SettingField::PrimaryColor,
        SettingField::CurrentPlan,
        SettingField::PlanRenewalDate,
        SettingField::ViewMode,
        SettingField::EmailNotifications,
        SettingField::WhatsappNotifications,
        SettingField::WhatsappNumber,
    ];

    /// The camelCase name clients use
    pub fn external_name(&self) -> &'static str {
        match self {
            Self::HideCompleted => "hideCompleted",
            Self::HighlightUrgent => "highlightUrgent",
            Self::AutoSuggestions => "autoSuggestions",
            Self::DetailLevel => "detailLevel",
            Self::DarkMode => "darkMode",
            Self::PrimaryColor => "primaryColor",
            Self::CurrentPlan => "currentPlan",
            Self::PlanRenewalDate => "planRenewalDate",
            Self::ViewMode => "viewMode",
            Self::EmailNotifications => "emailNotifications",
            Self::WhatsappNotifications => "whatsappNotifications",
            Self::WhatsappNumber => "whatsappNumber",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::HideCompleted => "hide_completed",
            Self::HighlightUrgent => "highlight_urgent",
            Self::AutoSuggestions => "auto_suggestions",
            Self::DetailLevel => "detail_level",
            Self::DarkMode => "dark_mode",
            Self::PrimaryColor => "primary_color",
            Self::CurrentPlan => "current_plan",
            Self::PlanRenewalDate => "plan_renewal_date",
            Self::ViewMode => "view_mode",
            Self::EmailNotifications => "email_notifications",
            Self::WhatsappNotifications => "whatsapp_notifications",
            Self::WhatsappNumber => "whatsapp_number",
        }
    }

    pub fn from_external_name(name: &str) -> Option<SettingField> {
        Self::ALL
            .into_iter()
            .find(|field| field.external_name() == name)
    }
}

/// An untyped value as it arrived from a client
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SettingValue {
    Bool(bool),
    Text(String),
    Null,
}

impl SettingValue {
    fn describe(&self) -> &'static str {
        match self {
            Self::Bool(_) => "a boolean",
            Self::Text(_) => "a string",
            Self::Null => "null",
        }
    }
}

/// A validated single-field update. Enumerated fields hold their canonical spelling.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SettingChange {
    field: SettingField,
    value: SettingValue,
}

impl SettingChange {
    /// Checks `name` against the allow-list and `value` against the field's type
    pub fn parse(name: &str, value: SettingValue) -> Result<SettingChange, SettingsError> {
        let field = SettingField::from_external_name(name)
            .ok_or_else(|| SettingsError::UnknownField(name.to_owned()))?;
        let received = value.describe();
        let mismatch = |expected: &str| {
            SettingsError::InvalidValue(format!(
                "{} must be {expected}, got {received}",
                field.external_name()
            ))
        };

        let value = match field {
            SettingField::HideCompleted
            | SettingField::HighlightUrgent
            | SettingField::AutoSuggestions
            | SettingField::DarkMode
            | SettingField::EmailNotifications
            | SettingField::WhatsappNotifications => match value {
                SettingValue::Bool(_) => value,
                _ => return Err(mismatch("a boolean")),
            },
            SettingField::DetailLevel | SettingField::PlanRenewalDate => match value {
                SettingValue::Text(_) => value,
                _ => return Err(mismatch("a string")),
            },
            SettingField::PrimaryColor => match value {
                SettingValue::Text(ref color) => {
                    validate_color(color)?;
                    value
                }
                _ => return Err(mismatch("a hex color string")),
            },
            SettingField::CurrentPlan => match value {
                SettingValue::Text(ref plan) => {
                    let plan = Plan::from_str(plan).map_err(invalid_variant)?;
                    SettingValue::Text(plan.as_str().to_owned())
                }
                _ => return Err(mismatch("one of free, pro or premium")),
            },
            SettingField::ViewMode => match value {
                SettingValue::Text(ref mode) => {
                    let mode = ViewMode::from_str(mode).map_err(invalid_variant)?;
                    SettingValue::Text(mode.as_str().to_owned())
                }
                _ => return Err(mismatch("either list or kanban")),
            },
            SettingField::WhatsappNumber => match value {
                SettingValue::Text(_) | SettingValue::Null => value,
                SettingValue::Bool(_) => return Err(mismatch("a string or null")),
            },
        };

        Ok(SettingChange { field, value })
    }

    pub fn field(&self) -> SettingField {
        self.field
    }

    pub fn value(&self) -> &SettingValue {
        &self.value
    }
}

fn invalid_variant(err: UnknownVariant) -> SettingsError {
    SettingsError::InvalidValue(err.to_string())
}

/// Accepts `#rgb` and `#rrggbb`
fn validate_color(color: &str) -> Result<(), SettingsError> {
    let digits = color.strip_prefix('#').unwrap_or_default();
    let valid = matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(SettingsError::InvalidValue(format!(
            "primaryColor must be a hex color like #49a09d, got `{color}`"
        )));
    }

    Ok(())
}

pub mod driven_ports {
    use super::*;

    pub trait SettingsReader: Sync {
        async fn settings_for_user(
            &self,
            user_id: i64,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<UserSettings>, anyhow::Error>;
    }

    pub trait SettingsWriter: Sync {
        /// Creates or fully replaces the user's settings row
        async fn save_settings(
            &self,
            user_id: i64,
            settings: &UserSettings,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;

        /// Writes a single column, creating the row with defaults if the user has none yet
        async fn apply_change(
            &self,
            user_id: i64,
            change: &SettingChange,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum SettingsError {
        #[error("`{0}` is not a setting that can be changed")]
        UnknownField(String),
        #[error("{0}")]
        InvalidValue(String),
        #[error("The specified user did not exist.")]
        UserDoesNotExist,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    impl From<domain::user::UserExistsErr> for SettingsError {
        fn from(value: domain::user::UserExistsErr) -> Self {
            match value {
                domain::user::UserExistsErr::UserDoesNotExist(_) => SettingsError::UserDoesNotExist,
                domain::user::UserExistsErr::PortError(err) => {
                    SettingsError::from(err.context("Verifying the settings owner"))
                }
            }
        }
    }


    pub trait SettingsPort {
        async fn settings_for_user(
            &self,
            user_id: i64,
            ext_cxn: &mut impl ExternalConnectivity,
            settings_read: &impl driven_ports::SettingsReader,
        ) -> Result<Option<UserSettings>, SettingsError>;
        async fn save_settings(
            &self,
            user_id: i64,
            update: SettingsUpdate,
            ext_cxn: &mut impl ExternalConnectivity,
            u_detect: &impl domain::user::driven_ports::DetectUser,
            settings_write: &impl driven_ports::SettingsWriter,
        ) -> Result<UserSettings, SettingsError>;
        async fn update_setting(
            &self,
            user_id: i64,
            change: &SettingChange,
            ext_cxn: &mut impl ExternalConnectivity,
            u_detect: &impl domain::user::driven_ports::DetectUser,
            settings_write: &impl driven_ports::SettingsWriter,
        ) -> Result<(), SettingsError>;
    }
}

pub struct SettingsService {}

impl driving_ports::SettingsPort for SettingsService {
    async fn settings_for_user(
        &self,
        user_id: i64,
        ext_cxn: &mut impl ExternalConnectivity,
        settings_read: &impl SettingsReader,
    ) -> Result<Option<UserSettings>, SettingsError> {
        let settings = settings_read
            .settings_for_user(user_id, &mut *ext_cxn)
            .await
            .context("fetching user settings")?;

        Ok(settings)
    }

    async fn save_settings(
        &self,
        user_id: i64,
        update: SettingsUpdate,
        ext_cxn: &mut impl ExternalConnectivity,
        u_detect: &impl domain::user::driven_ports::DetectUser,
        settings_write: &impl SettingsWriter,
    ) -> Result<UserSettings, SettingsError> {
        if let Some(ref color) = update.primary_color {
            validate_color(color)?;
        }
        domain::user::verify_user_exists(user_id, &mut *ext_cxn, u_detect).await?;

        let settings = update.with_defaults();
        settings_write
            .save_settings(user_id, &settings, &mut *ext_cxn)
            .await
            .context("saving user settings")?;
        info!(user_id, "Saved settings");

        Ok(settings)
    }

    async fn update_setting(
        &self,
        user_id: i64,
        change: &SettingChange,
        ext_cxn: &mut impl ExternalConnectivity,
        u_detect: &impl domain::user::driven_ports::DetectUser,
        settings_write: &impl SettingsWriter,
    ) -> Result<(), SettingsError> {
        domain::user::verify_user_exists(user_id, &mut *ext_cxn, u_detect).await?;

        settings_write
            .apply_change(user_id, change, &mut *ext_cxn)
            .await
            .with_context(|| format!("updating setting {}", change.field().external_name()))?;
        info!(user_id, setting = change.field().external_name(), "Updated setting");

        Ok(())
    }
}
