use mongodb::bson::doc;
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, ReadPreference, SelectionCriteria};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use crate::database::driver::{Catalog, Driver};
use crate::database::options::ConnectionConfig;
use crate::global::error::DriverError;

/// [`Driver`] backed by the official `mongodb` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoDriver;

impl MongoDriver {
    /// Parse the URI and apply the configured timeouts and pool bounds on top of it.
    pub async fn client_options(config: &ConnectionConfig) -> Result<ClientOptions, DriverError> {
        let mut options = ClientOptions::parse(config.uri.as_str()).await.map_err(|e| {
            if matches!(*e.kind, ErrorKind::InvalidArgument { .. }) {
                DriverError::InvalidUri(e.to_string())
            } else {
                DriverError::Mongo(e)
            }
        })?;

        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.server_selection_timeout);
        options.min_pool_size = Some(config.min_pool_size);
        options.max_pool_size = Some(config.max_pool_size);

        Ok(options)
    }
}

#[async_trait::async_trait]
impl Driver for MongoDriver {
    type Client = Client;
    type Database = Database;

    async fn open_client(&self, config: &ConnectionConfig) -> Result<Client, DriverError> {
        let options = Self::client_options(config).await?;

        debug!(
            hosts = ?options.hosts,
            min_pool_size = ?options.min_pool_size,
            max_pool_size = ?options.max_pool_size,
            "Opening MongoDB client"
        );

        Ok(Client::with_options(options)?)
    }

    async fn ping(&self, client: &Client) -> Result<(), DriverError> {
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .selection_criteria(SelectionCriteria::ReadPreference(ReadPreference::Primary))
            .await?;

        Ok(())
    }

    fn database(&self, client: &Client, name: &str) -> Database {
        client.database(name)
    }

    async fn shutdown(&self, client: Client) {
        client.shutdown().await;
        info!("MongoDB client shut down");
    }
}

impl Catalog for Database {
    type Collection<T: Send + Sync> = Collection<T>;

    fn name(&self) -> &str {
        Database::name(self)
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        Database::collection(self, name)
    }
}
