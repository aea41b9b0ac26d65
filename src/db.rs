//! Dialect adapter over the two supported storage engines.
//!
//! All SQL in the application is written once with positional `?` placeholders. A [Database]
//! is either an embedded SQLite pool or a networked PostgreSQL pool, chosen once at startup, and
//! the [DbConnection]s it hands out translate placeholders and normalize result rows so callers
//! never see engine-specific types.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgRow, PgSslMode};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, PgPool, Postgres, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use thiserror::Error;
use tracing::{debug, info};

use crate::app_env;

/// Text layout used for timestamps regardless of engine. Matches SQLite's `CURRENT_TIMESTAMP`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Driver(#[from] sqlx::Error),
    #[error("statement expects {placeholders} parameters but {supplied} were supplied")]
    ParameterCount { placeholders: usize, supplied: usize },
    #[error("column `{column}` is missing or is not {expected}")]
    Column {
        column: String,
        expected: &'static str,
    },
    #[error("could not prepare the database location: {0}")]
    Io(#[from] std::io::Error),
}

/// The storage engine backing a [Database]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }
}

/// How the PostgreSQL client should negotiate TLS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslSetting {
    Require,
    Disable,
    Prefer,
}

impl SslSetting {
    /// Interprets the [app_env::DATABASE_SSL] variable. Anything other than a recognizable
    /// true/false leaves the driver's default negotiation in place.
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|raw| raw.trim().to_ascii_lowercase()) {
            Some(flag) if matches!(flag.as_str(), "true" | "1" | "require") => Self::Require,
            Some(flag) if matches!(flag.as_str(), "false" | "0" | "disable") => Self::Disable,
            _ => Self::Prefer,
        }
    }
}

/// Everything needed to open a [Database]. The presence of `database_url` is what selects
/// PostgreSQL over SQLite.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: Option<String>,
    pub sqlite_path: PathBuf,
    pub ssl: SslSetting,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

impl DatabaseConfig {
    /// Reads the database configuration from the process environment, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());

        DatabaseConfig {
            database_url: read(app_env::DB_URL),
            sqlite_path: read(app_env::SQLITE_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./database/nura.db")),
            ssl: SslSetting::from_env_value(read(app_env::DATABASE_SSL).as_deref()),
            max_connections: read(app_env::DB_MAX_CONNECTIONS)
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(10),
            connect_timeout: Duration::from_secs(
                read(app_env::DB_CONNECT_TIMEOUT_SECS)
                    .and_then(|raw| raw.parse().ok())
                    .unwrap_or(5),
            ),
        }
    }

    pub fn dialect(&self) -> Dialect {
        if self.database_url.is_some() {
            Dialect::Postgres
        } else {
            Dialect::Sqlite
        }
    }
}

/// Process-wide connection pool for whichever engine was selected at startup
#[derive(Clone, Debug)]
pub enum Database {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl Database {
    /// Opens the pool described by `config`. For PostgreSQL the first connection is established
    /// eagerly and bounded by the configured connect timeout, so an unreachable server fails
    /// fast instead of hanging startup.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DbError> {
        match config.database_url {
            Some(ref url) => {
                let ssl_mode = match config.ssl {
                    SslSetting::Require => PgSslMode::Require,
                    SslSetting::Disable => PgSslMode::Disable,
                    SslSetting::Prefer => PgSslMode::Prefer,
                };
                let options = PgConnectOptions::from_str(url)?.ssl_mode(ssl_mode);
                let pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(config.connect_timeout)
                    .connect_with(options)
                    .await?;
                info!(
                    max_connections = config.max_connections,
                    "Connected to PostgreSQL"
                );

                Ok(Self::Postgres(pool))
            }
            None => {
                if let Some(parent) = config.sqlite_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                let options = SqliteConnectOptions::new()
                    .filename(&config.sqlite_path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .foreign_keys(true);
                let pool = SqlitePoolOptions::new()
                    .max_connections(5)
                    .acquire_timeout(config.connect_timeout)
                    .connect_with(options)
                    .await?;
                info!(path = %config.sqlite_path.display(), "Opened SQLite database");

                Ok(Self::Sqlite(pool))
            }
        }
    }

    /// Creates a private in-memory SQLite database. The pool pins a single connection for its
    /// whole lifetime because the data disappears once that connection closes.
    pub async fn sqlite_in_memory() -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self::Sqlite(pool))
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Self::Sqlite(_) => Dialect::Sqlite,
            Self::Postgres(_) => Dialect::Postgres,
        }
    }

    /// Checks a connection out of the pool
    pub async fn acquire(&self) -> Result<DbConnection, DbError> {
        Ok(match self {
            Self::Sqlite(pool) => DbConnection::Sqlite(pool.acquire().await?),
            Self::Postgres(pool) => DbConnection::Postgres(pool.acquire().await?),
        })
    }

    /// Closes every pooled connection, waiting for checked-out connections to come back
    pub async fn close(&self) {
        match self {
            Self::Sqlite(pool) => pool.close().await,
            Self::Postgres(pool) => pool.close().await,
        }
    }
}

/// A positional parameter bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum DbParam {
    Integer(i64),
    Real(f64),
    Bool(bool),
    Text(String),
    /// SQL NULL, typed as text on the wire
    Null,
}

impl From<i64> for DbParam {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for DbParam {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for DbParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for DbParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<DbParam>> From<Option<T>> for DbParam {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// A single column value after normalization
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Integer(i64),
    Real(f64),
    Bool(bool),
    Text(String),
}

/// A result row keyed by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbRow {
    columns: BTreeMap<String, DbValue>,
}

impl DbRow {
    pub fn value(&self, column: &str) -> Option<&DbValue> {
        self.columns.get(column)
    }

    pub fn i64(&self, column: &str) -> Result<i64, DbError> {
        match self.value(column) {
            Some(DbValue::Integer(value)) => Ok(*value),
            _ => Err(column_error(column, "an integer")),
        }
    }

    /// Reads a boolean. SQLite stores booleans as 0/1 integers, so integers are accepted too.
    pub fn bool(&self, column: &str) -> Result<bool, DbError> {
        match self.value(column) {
            Some(DbValue::Bool(value)) => Ok(*value),
            Some(DbValue::Integer(value)) => Ok(*value != 0),
            _ => Err(column_error(column, "a boolean")),
        }
    }

    pub fn str(&self, column: &str) -> Result<&str, DbError> {
        match self.value(column) {
            Some(DbValue::Text(value)) => Ok(value.as_str()),
            _ => Err(column_error(column, "text")),
        }
    }

    pub fn opt_str(&self, column: &str) -> Result<Option<&str>, DbError> {
        match self.value(column) {
            Some(DbValue::Text(value)) => Ok(Some(value.as_str())),
            Some(DbValue::Null) => Ok(None),
            _ => Err(column_error(column, "nullable text")),
        }
    }
}

impl FromIterator<(String, DbValue)> for DbRow {
    fn from_iter<I: IntoIterator<Item = (String, DbValue)>>(iter: I) -> Self {
        DbRow {
            columns: iter.into_iter().collect(),
        }
    }
}

fn column_error(column: &str, expected: &'static str) -> DbError {
    DbError::Column {
        column: column.to_owned(),
        expected,
    }
}

/// Outcome of a data-modifying statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    /// Number of rows inserted, updated, or deleted
    pub changes: u64,
    /// Primary key generated by an INSERT, if the statement was one
    pub inserted_id: Option<i64>,
}

/// A connection checked out of a [Database] pool
pub enum DbConnection {
    Sqlite(PoolConnection<Sqlite>),
    Postgres(PoolConnection<Postgres>),
}

impl DbConnection {
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::Sqlite(_) => Dialect::Sqlite,
            Self::Postgres(_) => Dialect::Postgres,
        }
    }

    /// Runs a statement and returns every resulting row
    pub async fn query(&mut self, sql: &str, params: &[DbParam]) -> Result<Vec<DbRow>, DbError> {
        let native_sql = native_statement(self.dialect(), sql, params.len())?;
        debug!(sql = %native_sql, params = params.len(), "query");

        match self {
            Self::Sqlite(conn) => bind_sqlite(sqlx::query(&native_sql), params)
                .fetch_all(&mut **conn)
                .await?
                .iter()
                .map(normalize_sqlite_row)
                .collect(),
            Self::Postgres(conn) => bind_postgres(sqlx::query(&native_sql), params)
                .fetch_all(&mut **conn)
                .await?
                .iter()
                .map(normalize_postgres_row)
                .collect(),
        }
    }

    /// Runs a statement and returns its first row, if any
    pub async fn get(&mut self, sql: &str, params: &[DbParam]) -> Result<Option<DbRow>, DbError> {
        let native_sql = native_statement(self.dialect(), sql, params.len())?;
        debug!(sql = %native_sql, params = params.len(), "get");

        match self {
            Self::Sqlite(conn) => bind_sqlite(sqlx::query(&native_sql), params)
                .fetch_optional(&mut **conn)
                .await?
                .as_ref()
                .map(normalize_sqlite_row)
                .transpose(),
            Self::Postgres(conn) => bind_postgres(sqlx::query(&native_sql), params)
                .fetch_optional(&mut **conn)
                .await?
                .as_ref()
                .map(normalize_postgres_row)
                .transpose(),
        }
    }

    /// Runs a data-modifying statement. INSERTs report the generated `id`: SQLite provides it
    /// natively while PostgreSQL statements get `RETURNING id` appended unless they already
    /// return something.
    pub async fn run(&mut self, sql: &str, params: &[DbParam]) -> Result<RunResult, DbError> {
        let insert = is_insert(sql);
        let native_sql = native_statement(self.dialect(), sql, params.len())?;
        debug!(sql = %native_sql, params = params.len(), "run");

        match self {
            Self::Sqlite(conn) => {
                let outcome = bind_sqlite(sqlx::query(&native_sql), params)
                    .execute(&mut **conn)
                    .await?;

                Ok(RunResult {
                    changes: outcome.rows_affected(),
                    inserted_id: insert.then(|| outcome.last_insert_rowid()),
                })
            }
            Self::Postgres(conn) if insert && !has_returning(sql) => {
                let returning_sql = format!("{} RETURNING id", native_sql.trim_end());
                let rows = bind_postgres(sqlx::query(&returning_sql), params)
                    .fetch_all(&mut **conn)
                    .await?;
                let inserted_id = rows
                    .first()
                    .map(|row| row.try_get::<i64, _>("id"))
                    .transpose()?;

                Ok(RunResult {
                    changes: rows.len() as u64,
                    inserted_id,
                })
            }
            Self::Postgres(conn) => {
                let outcome = bind_postgres(sqlx::query(&native_sql), params)
                    .execute(&mut **conn)
                    .await?;

                Ok(RunResult {
                    changes: outcome.rows_affected(),
                    inserted_id: None,
                })
            }
        }
    }

    /// Runs a parameterless statement such as DDL
    pub async fn execute_script(&mut self, sql: &str) -> Result<(), DbError> {
        match self {
            Self::Sqlite(conn) => {
                sqlx::query(sql).execute(&mut **conn).await?;
            }
            Self::Postgres(conn) => {
                sqlx::query(sql).execute(&mut **conn).await?;
            }
        }

        Ok(())
    }
}

/// A piece of SQL text as seen by the placeholder scanner
enum SqlPiece {
    /// The n-th `?` outside of quotes, counting from 1
    Placeholder(usize),
    Verbatim(char),
}

/// Walks a statement, flagging every `?` that sits outside quoted literals and identifiers
fn scan_placeholders(sql: &str, mut visit: impl FnMut(SqlPiece)) {
    let mut open_quote: Option<char> = None;
    let mut placeholder_count = 0;

    for ch in sql.chars() {
        match open_quote {
            Some(quote) => {
                if ch == quote {
                    open_quote = None;
                }
                visit(SqlPiece::Verbatim(ch));
            }
            None if ch == '\'' || ch == '"' => {
                open_quote = Some(ch);
                visit(SqlPiece::Verbatim(ch));
            }
            None if ch == '?' => {
                placeholder_count += 1;
                visit(SqlPiece::Placeholder(placeholder_count));
            }
            None => visit(SqlPiece::Verbatim(ch)),
        }
    }
}

/// Counts the `?` placeholders in a statement
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    scan_placeholders(sql, |piece| {
        if let SqlPiece::Placeholder(number) = piece {
            count = number;
        }
    });

    count
}

/// Rewrites `?` placeholders into PostgreSQL's `$1, $2, ...` preserving left-to-right order.
/// Question marks inside quotes are left alone.
pub fn translate_placeholders(sql: &str) -> String {
    let mut translated = String::with_capacity(sql.len() + 8);
    scan_placeholders(sql, |piece| match piece {
        SqlPiece::Placeholder(number) => {
            let _ = write!(translated, "${number}");
        }
        SqlPiece::Verbatim(ch) => translated.push(ch),
    });

    translated
}

/// Produces the statement text the engine expects, refusing statements whose placeholder
/// count does not match the supplied parameters
fn native_statement(dialect: Dialect, sql: &str, supplied: usize) -> Result<Cow<'_, str>, DbError> {
    let placeholders = count_placeholders(sql);
    if placeholders != supplied {
        return Err(DbError::ParameterCount {
            placeholders,
            supplied,
        });
    }

    Ok(match dialect {
        Dialect::Sqlite => Cow::Borrowed(sql),
        Dialect::Postgres => Cow::Owned(translate_placeholders(sql)),
    })
}

fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|keyword| keyword.eq_ignore_ascii_case("insert"))
}

fn has_returning(sql: &str) -> bool {
    sql.to_ascii_lowercase().contains("returning")
}

fn bind_sqlite<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[DbParam],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            DbParam::Integer(value) => query.bind(*value),
            DbParam::Real(value) => query.bind(*value),
            DbParam::Bool(value) => query.bind(*value),
            DbParam::Text(value) => query.bind(value.clone()),
            DbParam::Null => query.bind(Option::<String>::None),
        };
    }

    query
}

fn bind_postgres<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[DbParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            DbParam::Integer(value) => query.bind(*value),
            DbParam::Real(value) => query.bind(*value),
            DbParam::Bool(value) => query.bind(*value),
            DbParam::Text(value) => query.bind(value.clone()),
            DbParam::Null => query.bind(Option::<String>::None),
        };
    }

    query
}

fn normalize_sqlite_row(row: &SqliteRow) -> Result<DbRow, DbError> {
    let mut normalized = DbRow::default();

    for (idx, column) in row.columns().iter().enumerate() {
        let (is_null, type_name) = {
            let raw = row.try_get_raw(idx)?;
            (raw.is_null(), raw.type_info().name().to_ascii_uppercase())
        };

        let value = if is_null {
            DbValue::Null
        } else if type_name.contains("INT") || type_name.contains("BOOL") {
            DbValue::Integer(row.try_get_unchecked::<i64, _>(idx)?)
        } else if type_name.contains("REAL") || type_name.contains("FLOA") || type_name.contains("DOUB") {
            DbValue::Real(row.try_get_unchecked::<f64, _>(idx)?)
        } else {
            DbValue::Text(row.try_get_unchecked::<String, _>(idx)?)
        };

        normalized.columns.insert(column.name().to_owned(), value);
    }

    Ok(normalized)
}

fn normalize_postgres_row(row: &PgRow) -> Result<DbRow, DbError> {
    let mut normalized = DbRow::default();

    for (idx, column) in row.columns().iter().enumerate() {
        if row.try_get_raw(idx)?.is_null() {
            normalized.columns.insert(column.name().to_owned(), DbValue::Null);
            continue;
        }

        let value = match column.type_info().name() {
            "INT2" => DbValue::Integer(row.try_get::<i16, _>(idx)?.into()),
            "INT4" => DbValue::Integer(row.try_get::<i32, _>(idx)?.into()),
            "INT8" => DbValue::Integer(row.try_get::<i64, _>(idx)?),
            "FLOAT4" => DbValue::Real(row.try_get::<f32, _>(idx)?.into()),
            "FLOAT8" => DbValue::Real(row.try_get::<f64, _>(idx)?),
            "BOOL" => DbValue::Bool(row.try_get::<bool, _>(idx)?),
            "TIMESTAMP" => DbValue::Text(
                row.try_get::<NaiveDateTime, _>(idx)?
                    .format(TIMESTAMP_FORMAT)
                    .to_string(),
            ),
            "TIMESTAMPTZ" => DbValue::Text(
                row.try_get::<DateTime<Utc>, _>(idx)?
                    .format(TIMESTAMP_FORMAT)
                    .to_string(),
            ),
            "DATE" => DbValue::Text(row.try_get::<NaiveDate, _>(idx)?.to_string()),
            _ => DbValue::Text(row.try_get::<String, _>(idx)?),
        };

        normalized.columns.insert(column.name().to_owned(), value);
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    mod translate_placeholders {
        use super::*;

        #[test]
        fn numbers_placeholders_left_to_right() {
            let translated =
                translate_placeholders("SELECT * FROM tasks WHERE id = ? AND user_id = ? AND status = ?");
            assert_eq!(
                "SELECT * FROM tasks WHERE id = $1 AND user_id = $2 AND status = $3",
                translated
            );
        }

        #[test]
        fn leaves_quoted_question_marks_alone() {
            let translated =
                translate_placeholders("SELECT '?' AS literal, \"odd?col\" FROM t WHERE a = ? AND b = 'it''s?'");
            assert_eq!(
                "SELECT '?' AS literal, \"odd?col\" FROM t WHERE a = $1 AND b = 'it''s?'",
                translated
            );
        }

        #[test]
        fn statement_without_placeholders_is_unchanged() {
            let sql = "SELECT COUNT(*) AS count FROM users";
            assert_eq!(sql, translate_placeholders(sql));
            assert_eq!(0, count_placeholders(sql));
        }
    }

    mod native_statement {
        use super::*;

        #[test]
        fn sqlite_keeps_question_marks() {
            let native = native_statement(Dialect::Sqlite, "DELETE FROM tasks WHERE id = ?", 1);
            assert_that!(native)
                .is_ok()
                .matches(|sql| sql == "DELETE FROM tasks WHERE id = ?");
        }

        #[test]
        fn rejects_mismatched_parameter_count() {
            let native = native_statement(Dialect::Postgres, "SELECT ? + ?", 3);
            let Err(DbError::ParameterCount {
                placeholders: 2,
                supplied: 3,
            }) = native
            else {
                panic!("Expected a parameter count failure, got {native:?}");
            };
        }
    }

    #[test]
    fn ssl_setting_parses_env_flags() {
        assert_eq!(SslSetting::Require, SslSetting::from_env_value(Some("true")));
        assert_eq!(SslSetting::Disable, SslSetting::from_env_value(Some("FALSE")));
        assert_eq!(SslSetting::Prefer, SslSetting::from_env_value(Some("sometimes")));
        assert_eq!(SslSetting::Prefer, SslSetting::from_env_value(None));
    }

    #[test]
    fn detects_inserts() {
        assert!(is_insert("  insert into tasks (title) VALUES (?)"));
        assert!(!is_insert("UPDATE tasks SET title = ?"));
        assert!(!is_insert("ins"));
    }

    mod sqlite_adapter {
        use super::*;

        async fn scratch_connection() -> DbConnection {
            let db = Database::sqlite_in_memory()
                .await
                .expect("in-memory database should open");
            let mut cxn = db.acquire().await.expect("connection should be available");
            cxn.execute_script(
                "CREATE TABLE sample (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT NOT NULL, flag BOOLEAN DEFAULT 0, note TEXT, score REAL)",
            )
            .await
            .expect("table should be created");

            cxn
        }

        #[tokio::test]
        async fn run_reports_inserted_id_and_changes() {
            let mut cxn = scratch_connection().await;

            let first = cxn
                .run("INSERT INTO sample (label) VALUES (?)", &["a".into()])
                .await
                .expect("insert should succeed");
            let second = cxn
                .run("INSERT INTO sample (label) VALUES (?)", &["b".into()])
                .await
                .expect("insert should succeed");
            assert_eq!(Some(1), first.inserted_id);
            assert_eq!(Some(2), second.inserted_id);

            let update = cxn
                .run("UPDATE sample SET label = ?", &["c".into()])
                .await
                .expect("update should succeed");
            assert_eq!(
                RunResult {
                    changes: 2,
                    inserted_id: None
                },
                update
            );
        }

        #[tokio::test]
        async fn binds_parameters_in_placeholder_order() {
            let mut cxn = scratch_connection().await;
            for (label, flag, score) in [("x", true, 1.5), ("y", false, 2.5), ("x", false, 1.5)] {
                cxn.run(
                    "INSERT INTO sample (label, flag, score) VALUES (?, ?, ?)",
                    &[label.into(), flag.into(), DbParam::Real(score)],
                )
                .await
                .expect("insert should succeed");
            }

            let rows = cxn
                .query(
                    "SELECT * FROM sample WHERE label = ? AND flag = ? AND score = ?",
                    &["x".into(), false.into(), DbParam::Real(1.5)],
                )
                .await
                .expect("query should succeed");

            assert_eq!(1, rows.len());
            assert_that!(rows[0].i64("id")).is_ok_containing(3);
        }

        #[tokio::test]
        async fn rows_are_normalized() {
            let mut cxn = scratch_connection().await;
            cxn.run(
                "INSERT INTO sample (label, flag, note) VALUES (?, ?, ?)",
                &["hello".into(), true.into(), DbParam::Null],
            )
            .await
            .expect("insert should succeed");

            let row = cxn
                .get("SELECT id, label, flag, note FROM sample WHERE id = ?", &[DbParam::Integer(1)])
                .await
                .expect("get should succeed")
                .expect("row should exist");

            assert_that!(row.str("label")).is_ok_containing("hello");
            assert_that!(row.bool("flag")).is_ok_containing(true);
            assert_that!(row.opt_str("note")).is_ok_containing(None);
            assert_that!(row.str("missing")).is_err();
        }

        #[tokio::test]
        async fn get_returns_none_without_rows() {
            let mut cxn = scratch_connection().await;

            let row = cxn
                .get("SELECT * FROM sample WHERE id = ?", &[DbParam::Integer(99)])
                .await;
            assert_that!(row).is_ok().is_none();
        }

        #[tokio::test]
        async fn driver_errors_surface_as_db_errors() {
            let mut cxn = scratch_connection().await;

            let outcome = cxn.query("SELECT * FROM not_a_table", &[]).await;
            assert_that!(outcome)
                .is_err()
                .matches(|err| matches!(err, DbError::Driver(_)));
        }
    }
}
