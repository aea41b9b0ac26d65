/// PostgreSQL connection string. When present the server stores data in PostgreSQL, otherwise it
/// falls back to the embedded SQLite database at [SQLITE_PATH]
pub const DB_URL: &str = "DATABASE_URL";
/// Location of the SQLite database file, `./database/nura.db` by default
pub const SQLITE_PATH: &str = "SQLITE_PATH";
/// TLS toggle for PostgreSQL: "true" requires TLS, "false" disables it, unset lets the driver prefer it
pub const DATABASE_SSL: &str = "DATABASE_SSL";
/// Upper bound on pooled PostgreSQL connections (10 by default)
pub const DB_MAX_CONNECTIONS: &str = "DB_MAX_CONNECTIONS";
/// Seconds to wait for a database connection before giving up (5 by default)
pub const DB_CONNECT_TIMEOUT_SECS: &str = "DB_CONNECT_TIMEOUT_SECS";

/// TCP port the HTTP server listens on (3000 by default)
pub const PORT: &str = "PORT";
/// Directory of static frontend assets served for any route outside the API (`public` by default)
pub const STATIC_DIR: &str = "STATIC_DIR";

/// Name of the account created when the users table is empty ("admin" by default)
pub const SEED_USERNAME: &str = "SEED_USERNAME";
/// Password of the seed account ("admin123" by default)
pub const SEED_PASSWORD: &str = "SEED_PASSWORD";
/// Email of the seed account ("admin@nura.ia" by default)
pub const SEED_EMAIL: &str = "SEED_EMAIL";

/// Log level configuration for the application. For formatting info, see [tracing_subscriber's EnvFilter documentation](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
pub const LOG_LEVEL: &str = "LOG_LEVEL";

/// OpenTelemetry span export URL. Spans are only exported when this and [OTEL_METRIC_EXPORT_URL]
/// are both set, typically to a collector sidecar at http://localhost:4317
pub const OTEL_SPAN_EXPORT_URL: &str = "OTEL_SPAN_EXPORT_URL";
/// OpenTelemetry metrics export URL, see [OTEL_SPAN_EXPORT_URL]
pub const OTEL_METRIC_EXPORT_URL: &str = "OTEL_METRIC_EXPORT_URL";

pub mod test {
    /// URL for accessing PostgreSQL during integration tests (should not contain a database name in the path)
    pub const TEST_DB_URL: &str = "TEST_DB_URL";
}
