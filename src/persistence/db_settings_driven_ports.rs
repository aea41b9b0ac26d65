use crate::db::{DbParam, DbRow};
use crate::domain;
use crate::domain::settings::{SettingChange, SettingField, SettingValue, UserSettings};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};

fn settings_from_row(row: &DbRow) -> Result<UserSettings, Error> {
    Ok(UserSettings {
        hide_completed: row.bool("hide_completed")?,
        highlight_urgent: row.bool("highlight_urgent")?,
        auto_suggestions: row.bool("auto_suggestions")?,
        detail_level: row.str("detail_level")?.to_owned(),
        dark_mode: row.bool("dark_mode")?,
        primary_color: row.str("primary_color")?.to_owned(),
        current_plan: row
            .str("current_plan")?
            .parse()
            .context("reading the stored plan")?,
        plan_renewal_date: row.str("plan_renewal_date")?.to_owned(),
        view_mode: row
            .str("view_mode")?
            .parse()
            .context("reading the stored view mode")?,
        email_notifications: row.bool("email_notifications")?,
        whatsapp_notifications: row.bool("whatsapp_notifications")?,
        whatsapp_number: row.opt_str("whatsapp_number")?.map(str::to_owned),
    })
}

fn settings_columns() -> impl Iterator<Item = &'static str> {
    SettingField::ALL.into_iter().map(|field| field.column())
}

fn settings_params(settings: &UserSettings) -> [DbParam; 12] {
    [
        settings.hide_completed.into(),
        settings.highlight_urgent.into(),
        settings.auto_suggestions.into(),
        settings.detail_level.as_str().into(),
        settings.dark_mode.into(),
        settings.primary_color.as_str().into(),
        settings.current_plan.as_str().into(),
        settings.plan_renewal_date.as_str().into(),
        settings.view_mode.as_str().into(),
        settings.email_notifications.into(),
        settings.whatsapp_notifications.into(),
        settings.whatsapp_number.as_deref().into(),
    ]
}

impl From<&SettingValue> for DbParam {
    fn from(value: &SettingValue) -> Self {
        match value {
            SettingValue::Bool(flag) => DbParam::Bool(*flag),
            SettingValue::Text(text) => DbParam::Text(text.clone()),
            SettingValue::Null => DbParam::Null,
        }
    }
}

pub struct DbSettingsReader;

impl domain::settings::driven_ports::SettingsReader for DbSettingsReader {
    async fn settings_for_user(
        &self,
        user_id: i64,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<UserSettings>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;
        let columns = settings_columns().collect::<Vec<_>>().join(", ");

        let row = cxn
            .borrow_connection()
            .get(
                &format!("SELECT {columns} FROM user_settings WHERE user_id = ?"),
                &[user_id.into()],
            )
            .await
            .context("trying to fetch user settings")?;

        row.as_ref().map(settings_from_row).transpose()
    }
}

pub struct DbSettingsWriter;

impl domain::settings::driven_ports::SettingsWriter for DbSettingsWriter {
    async fn save_settings(
        &self,
        user_id: i64,
        settings: &UserSettings,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let columns = settings_columns().collect::<Vec<_>>();
        let placeholders = vec!["?"; columns.len() + 1].join(", ");
        let assignments = columns
            .iter()
            .map(|column| format!("{column} = excluded.{column}"))
            .collect::<Vec<_>>()
            .join(", ");
        let statement = format!(
            "INSERT INTO user_settings (user_id, {}) VALUES ({placeholders}) \
             ON CONFLICT (user_id) DO UPDATE SET {assignments}, updated_at = CURRENT_TIMESTAMP",
            columns.join(", ")
        );

        let mut params = vec![DbParam::from(user_id)];
        params.extend(settings_params(settings));

        let mut cxn = ext_cxn.database_cxn().await?;
        cxn.borrow_connection()
            .run(&statement, &params)
            .await
            .context("trying to upsert user settings")?;

        Ok(())
    }

    async fn apply_change(
        &self,
        user_id: i64,
        change: &SettingChange,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let column = change.field().column();
        let statement = format!(
            "INSERT INTO user_settings (user_id, {column}) VALUES (?, ?) \
             ON CONFLICT (user_id) DO UPDATE SET {column} = excluded.{column}, updated_at = CURRENT_TIMESTAMP"
        );

        let mut cxn = ext_cxn.database_cxn().await?;
        cxn.borrow_connection()
            .run(&statement, &[user_id.into(), change.value().into()])
            .await
            .with_context(|| format!("trying to update the {column} setting"))?;

        Ok(())
    }
}
