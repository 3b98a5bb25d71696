use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("malformed connection uri: {0}")]
    MalformedUri(String),
}

/// Failures reported by the underlying database driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("malformed connection uri: {0}")]
    InvalidUri(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("endpoint unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

/// Outcome errors of [`Connector`](crate::Connector) operations.
///
/// Cloneable so that every caller waiting on the same initialization receives
/// the recorded failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("connection to {uri} failed: {source}")]
    Connect {
        uri: String,
        #[source]
        source: Arc<DriverError>,
    },

    #[error("liveness probe against {uri} failed: {source}")]
    Probe {
        uri: String,
        #[source]
        source: Arc<DriverError>,
    },

    #[error("initialization did not produce a usable connection")]
    Inconsistent,

    #[error("not connected to MongoDB, call Connector::connect first")]
    NotConnected,
}

impl ConnectorError {
    pub(crate) fn connect(uri: &str, source: DriverError) -> Self {
        Self::Connect { uri: uri.to_string(), source: Arc::new(source) }
    }

    pub(crate) fn probe(uri: &str, source: DriverError) -> Self {
        Self::Probe { uri: uri.to_string(), source: Arc::new(source) }
    }

    /// The driver failure behind a connect or probe error, if any.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::Connect { source, .. } | Self::Probe { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.driver_error(), Some(DriverError::Timeout(_)))
    }
}
