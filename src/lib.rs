//! Connect-once access to a MongoDB database.
//!
//! A [`Connector`] opens one client, probes the primary, and hands the
//! resulting [`ConnectionHandle`] to every caller:
//!
//! ```no_run
//! # async fn run() -> Result<(), meerkat::AppError> {
//! use meerkat::{AppConfig, MongoConnector};
//!
//! let config = AppConfig::load()?;
//! let _logging = meerkat::global::logging::init_logging(&config.app)?;
//!
//! let connector = MongoConnector::from_config(&config);
//! let handle = connector.connect().await?;
//! let users = handle.collection::<mongodb::bson::Document>("users");
//! # let _ = users;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod global;

pub use database::connector::{Connector, InitializationState};
pub use database::driver::{Catalog, Driver};
pub use database::handle::ConnectionHandle;
pub use database::mongo::MongoDriver;
pub use database::options::ConnectionConfig;
pub use global::config::AppConfig;
pub use global::error::{AppError, ConfigError, ConnectorError, DriverError};

pub type MongoConnector = Connector<MongoDriver>;
pub type MongoHandle = ConnectionHandle<MongoDriver>;
