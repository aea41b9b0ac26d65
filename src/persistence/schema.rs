//! Creates the tables the service relies on and provisions the seed account. Safe to run on
//! every startup.

use crate::app_env;
use crate::db::{DbConnection, Dialect};
use crate::domain::user::password;
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use tracing::info;

const SQLITE_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT UNIQUE,
        password_hash TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id),
        title TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        priority TEXT NOT NULL DEFAULT 'medium',
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS user_settings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL UNIQUE REFERENCES users (id),
        hide_completed BOOLEAN NOT NULL DEFAULT 0,
        highlight_urgent BOOLEAN NOT NULL DEFAULT 1,
        auto_suggestions BOOLEAN NOT NULL DEFAULT 1,
        detail_level TEXT NOT NULL DEFAULT 'Médio',
        dark_mode BOOLEAN NOT NULL DEFAULT 0,
        primary_color TEXT NOT NULL DEFAULT '#49a09d',
        current_plan TEXT NOT NULL DEFAULT 'pro',
        plan_renewal_date TEXT NOT NULL DEFAULT '30 de dezembro de 2025',
        view_mode TEXT NOT NULL DEFAULT 'list',
        email_notifications BOOLEAN NOT NULL DEFAULT 1,
        whatsapp_notifications BOOLEAN NOT NULL DEFAULT 0,
        whatsapp_number TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks (status)",
];

const POSTGRES_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS tasks (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users (id),
        title TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        priority TEXT NOT NULL DEFAULT 'medium',
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS user_settings (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL UNIQUE REFERENCES users (id),
        hide_completed BOOLEAN NOT NULL DEFAULT FALSE,
        highlight_urgent BOOLEAN NOT NULL DEFAULT TRUE,
        auto_suggestions BOOLEAN NOT NULL DEFAULT TRUE,
        detail_level TEXT NOT NULL DEFAULT 'Médio',
        dark_mode BOOLEAN NOT NULL DEFAULT FALSE,
        primary_color TEXT NOT NULL DEFAULT '#49a09d',
        current_plan TEXT NOT NULL DEFAULT 'pro',
        plan_renewal_date TEXT NOT NULL DEFAULT '30 de dezembro de 2025',
        view_mode TEXT NOT NULL DEFAULT 'list',
        email_notifications BOOLEAN NOT NULL DEFAULT TRUE,
        whatsapp_notifications BOOLEAN NOT NULL DEFAULT FALSE,
        whatsapp_number TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks (status)",
];

/// The account created when the users table is empty
#[derive(Debug, Clone)]
pub struct SeedAccount {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl Default for SeedAccount {
    fn default() -> Self {
        SeedAccount {
            username: "admin".to_owned(),
            password: "admin123".to_owned(),
            email: "admin@nura.ia".to_owned(),
        }
    }
}

impl SeedAccount {
    /// Reads the seed account from [app_env::SEED_USERNAME], [app_env::SEED_PASSWORD] and
    /// [app_env::SEED_EMAIL], keeping the defaults for whatever is unset
    pub fn from_env() -> Self {
        let defaults = SeedAccount::default();
        let read = |name: &str, fallback: String| {
            std::env::var(name)
                .ok()
                .filter(|value| !value.is_empty())
                .unwrap_or(fallback)
        };

        SeedAccount {
            username: read(app_env::SEED_USERNAME, defaults.username),
            password: read(app_env::SEED_PASSWORD, defaults.password),
            email: read(app_env::SEED_EMAIL, defaults.email),
        }
    }
}

/// What [initialize] did
#[derive(Debug, PartialEq, Eq)]
pub struct SchemaReport {
    pub dialect: Dialect,
    pub seeded_user_id: Option<i64>,
}

/// Ensures all tables and indexes exist, then inserts the seed account if there are no users.
pub async fn initialize(
    ext_cxn: &mut impl ExternalConnectivity,
    seed: &SeedAccount,
) -> Result<SchemaReport, anyhow::Error> {
    let mut cxn_handle = ext_cxn.database_cxn().await?;
    let cxn = cxn_handle.borrow_connection();
    let dialect = cxn.dialect();

    let statements = match dialect {
        Dialect::Sqlite => SQLITE_SCHEMA,
        Dialect::Postgres => POSTGRES_SCHEMA,
    };
    for statement in statements {
        cxn.execute_script(statement)
            .await
            .with_context(|| format!("creating {} schema", dialect.name()))?;
    }

    let seeded_user_id = seed_if_empty(cxn, seed).await?;
    info!(dialect = dialect.name(), "Database schema is ready");

    Ok(SchemaReport {
        dialect,
        seeded_user_id,
    })
}

async fn seed_if_empty(
    cxn: &mut DbConnection,
    seed: &SeedAccount,
) -> Result<Option<i64>, anyhow::Error> {
    let user_count = super::count(
        cxn.get("SELECT COUNT(*) AS count FROM users", &[])
            .await
            .context("counting users before seeding")?,
    )?;
    if user_count > 0 {
        return Ok(None);
    }

    let password_hash = password::hash(&seed.password)
        .await
        .context("hashing the seed account password")?;
    let outcome = cxn
        .run(
            "INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?) ON CONFLICT (username) DO NOTHING",
            &[
                seed.username.as_str().into(),
                seed.email.as_str().into(),
                password_hash.into(),
            ],
        )
        .await
        .context("inserting the seed account")?;

    if outcome.changes > 0 {
        info!(username = %seed.username, "Created seed account");
    }

    Ok(outcome.inserted_id.filter(|_| outcome.changes > 0))
}
