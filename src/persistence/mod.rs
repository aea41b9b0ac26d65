pub mod db_settings_driven_ports;
pub mod db_task_driven_ports;
pub mod db_user_driven_ports;
pub mod schema;

use crate::db::{Database, DbConnection, DbRow};
use crate::external_connections;
use crate::external_connections::ConnectionHandle;
use anyhow::{Context, anyhow};

/// Data structure which owns clients for connecting to external systems.
/// Allows business logic to be agnostic of the external systems it communicates with
/// so driven adapters can easily be swapped out for other implementations.
///
/// The database is optional: when it could not be opened at startup the service keeps running
/// and every attempt to reach storage fails with an error instead.
#[derive(Clone)]
pub struct ExternalConnectivity {
    db: Option<Database>,
}

impl ExternalConnectivity {
    pub fn new(db: Database) -> Self {
        ExternalConnectivity { db: Some(db) }
    }

    /// Connectivity for a server running in degraded mode with no storage behind it
    pub fn without_database() -> Self {
        ExternalConnectivity { db: None }
    }

    pub fn database(&self) -> Option<&Database> {
        self.db.as_ref()
    }
}

/// A handle from ExternalConnectivity holding a connection checked out of the pool
pub struct PoolConnectionHandle {
    active_connection: DbConnection,
}

impl ConnectionHandle for PoolConnectionHandle {
    fn borrow_connection(&mut self) -> &mut DbConnection {
        &mut self.active_connection
    }
}

impl external_connections::ExternalConnectivity for ExternalConnectivity {
    type DbHandle<'cxn_borrow> = PoolConnectionHandle;

    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error> {
        let db = self
            .db
            .as_ref()
            .ok_or_else(|| anyhow!("no database is configured for this server"))?;
        let active_connection = db
            .acquire()
            .await
            .context("acquiring a pooled database connection")?;

        Ok(PoolConnectionHandle { active_connection })
    }
}

/// Reads the `count` column produced by a `SELECT COUNT(*) AS count` query
fn count(row: Option<DbRow>) -> Result<i64, anyhow::Error> {
    let row = row.ok_or_else(|| anyhow!("COUNT(*) should always produce a row"))?;
    Ok(row.i64("count")?)
}

/// Counts every task in storage, regardless of owner
pub async fn count_all_tasks(
    ext_cxn: &mut impl external_connections::ExternalConnectivity,
) -> Result<i64, anyhow::Error> {
    let mut cxn = ext_cxn.database_cxn().await?;
    let row = cxn
        .borrow_connection()
        .get("SELECT COUNT(*) AS count FROM tasks", &[])
        .await
        .context("counting tasks")?;

    count(row)
}
