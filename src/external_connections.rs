use crate::db::DbConnection;

/// Anything that can lend out a live database connection
pub trait ConnectionHandle {
    fn borrow_connection(&mut self) -> &mut DbConnection;
}

/// Provides access to the systems outside this service. Driven adapters receive one of these
/// instead of reaching for global state, so business logic can be exercised against fakes.
pub trait ExternalConnectivity: Sync {
    type DbHandle<'cxn_borrow>: ConnectionHandle + Send
    where
        Self: 'cxn_borrow;

    /// Acquires a database connection. Fails when no database is configured or the pool
    /// cannot hand out a connection.
    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error>;
}
