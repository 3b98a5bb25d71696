use std::fmt;
use std::sync::Arc;

use crate::database::driver::{Catalog, Driver};

/// A validated connection bound to one database.
///
/// Clones share the same client; the connector hands the same allocation to
/// every caller of one initialization.
pub struct ConnectionHandle<D: Driver> {
    inner: Arc<HandleInner<D>>,
}

struct HandleInner<D: Driver> {
    client: D::Client,
    database: D::Database,
}

impl<D: Driver> ConnectionHandle<D> {
    pub(crate) fn new(client: D::Client, database: D::Database) -> Self {
        Self {
            inner: Arc::new(HandleInner { client, database }),
        }
    }

    /// Look up a collection of the bound database. No I/O.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> <D::Database as Catalog>::Collection<T> {
        self.inner.database.collection(name)
    }

    pub fn database(&self) -> &D::Database {
        &self.inner.database
    }

    pub fn database_name(&self) -> &str {
        self.inner.database.name()
    }

    /// Raw client access for operations outside the bound database
    pub fn client(&self) -> &D::Client {
        &self.inner.client
    }

    /// Whether both handles come from the same initialization.
    pub fn same_connection(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Take the client back if this is the last clone of the handle.
    pub(crate) fn into_client(self) -> Option<D::Client> {
        Arc::into_inner(self.inner).map(|inner| inner.client)
    }
}

impl<D: Driver> Clone for ConnectionHandle<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Driver> fmt::Debug for ConnectionHandle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("database", &self.database_name())
            .field("shared_by", &Arc::strong_count(&self.inner))
            .finish()
    }
}
