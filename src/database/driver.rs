use crate::database::options::ConnectionConfig;
use crate::global::error::DriverError;

/// The database driver the connector delegates to.
///
/// Pooling, server selection and the wire protocol all live behind this trait;
/// the connector only sequences open, probe and release.
#[async_trait::async_trait]
pub trait Driver: Send + Sync + 'static {
    type Client: Clone + Send + Sync + 'static;
    type Database: Catalog;

    /// Build client options from `config` and open a client with them
    async fn open_client(&self, config: &ConnectionConfig) -> Result<Self::Client, DriverError>;

    /// Liveness probe against the primary
    async fn ping(&self, client: &Self::Client) -> Result<(), DriverError>;

    /// Bind a database by name. Pure lookup, no I/O.
    fn database(&self, client: &Self::Client, name: &str) -> Self::Database;

    /// Release a client that will not be handed out
    async fn shutdown(&self, client: Self::Client);
}

/// A database reference that hands out named collections.
pub trait Catalog: Clone + Send + Sync + 'static {
    type Collection<T: Send + Sync>;

    fn name(&self) -> &str;

    /// Pure lookup, no I/O.
    fn collection<T: Send + Sync>(&self, name: &str) -> Self::Collection<T>;
}
