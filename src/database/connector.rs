use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::database::driver::Driver;
use crate::database::handle::ConnectionHandle;
use crate::database::mongo::MongoDriver;
use crate::database::options::ConnectionConfig;
use crate::global::config::AppConfig;
use crate::global::error::{ConfigError, ConnectorError, DriverError};

/// Lifecycle of a [`Connector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializationState {
    /// No attempt yet, or reset since the last one
    Uninitialized,

    /// One caller is running the connect sequence; others wait on it
    InProgress,

    /// A validated handle is published
    Ready,

    /// The last attempt failed; the error is returned until a reset
    Failed,
}

impl InitializationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl fmt::Display for InitializationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Phase and outcome of the last initialization, always read and written together.
struct Slot<D: Driver> {
    phase: InitializationState,
    handle: Option<ConnectionHandle<D>>,
    error: Option<ConnectorError>,
}

impl<D: Driver> Slot<D> {
    fn empty() -> Self {
        Self {
            phase: InitializationState::Uninitialized,
            handle: None,
            error: None,
        }
    }

    /// `None` until an initialization has completed.
    fn completed(&self) -> Option<Result<ConnectionHandle<D>, ConnectorError>> {
        if !self.phase.is_terminal() {
            return None;
        }

        Some(match (&self.handle, &self.error) {
            (Some(handle), _) => Ok(handle.clone()),
            (None, Some(err)) => Err(err.clone()),
            (None, None) => {
                error!(state = %self.phase, "Initialization completed without a connection or an error");
                Err(ConnectorError::Inconsistent)
            }
        })
    }
}

/// Establishes one validated connection and shares it with every caller.
///
/// The first `connect` runs open + probe; concurrent callers wait for it and
/// later callers get the recorded outcome. A failure sticks until
/// [`reset`](Self::reset) or [`reconnect`](Self::reconnect) is called.
pub struct Connector<D: Driver> {
    driver: D,
    config: ConnectionConfig,
    /// Held for the whole connect sequence and for resets
    gate: Mutex<()>,
    slot: RwLock<Slot<D>>,
}

impl<D: Driver> Connector<D> {
    pub fn new(driver: D, config: ConnectionConfig) -> Self {
        Self {
            driver,
            config,
            gate: Mutex::new(()),
            slot: RwLock::new(Slot::empty()),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn state(&self) -> InitializationState {
        self.read_slot().phase
    }

    /// Connect once and return the shared handle, or the recorded error.
    ///
    /// Cancel-safe: dropping the initializing caller's future puts the
    /// connector back to `Uninitialized` and the next waiter takes over.
    pub async fn connect(&self) -> Result<ConnectionHandle<D>, ConnectorError> {
        let recorded = self.read_slot().completed();
        if let Some(outcome) = recorded {
            return outcome;
        }

        let _gate = self.gate.lock().await;

        let recorded = self.read_slot().completed();
        if let Some(outcome) = recorded {
            debug!("Initialization finished while waiting");
            return outcome;
        }

        self.initialize().await
    }

    /// The published handle, without waiting.
    pub fn handle(&self) -> Result<ConnectionHandle<D>, ConnectorError> {
        let slot = self.read_slot();
        match slot.phase {
            InitializationState::Ready => slot.completed().unwrap_or(Err(ConnectorError::NotConnected)),
            _ => Err(ConnectorError::NotConnected),
        }
    }

    /// Forget the last outcome so the next `connect` starts over.
    ///
    /// Waits for an initialization in progress to finish first. The client is
    /// shut down here when no caller still holds the handle; otherwise it is
    /// released when the last clone is dropped.
    pub async fn reset(&self) {
        let _gate = self.gate.lock().await;
        self.reset_locked().await;
    }

    /// Reset and connect again without letting another caller in between.
    pub async fn reconnect(&self) -> Result<ConnectionHandle<D>, ConnectorError> {
        let _gate = self.gate.lock().await;
        self.reset_locked().await;
        self.initialize().await
    }

    async fn reset_locked(&self) {
        let (was, previous) = {
            let mut slot = self.write_slot();
            let was = slot.phase;
            let previous = slot.handle.take();
            *slot = Slot::empty();
            (was, previous)
        };

        info!(previous_state = %was, uri = %self.config.redacted_uri(), "Connector reset");

        if let Some(handle) = previous {
            match handle.into_client() {
                Some(client) => self.driver.shutdown(client).await,
                None => debug!("Handle still shared, client released with its last clone"),
            }
        }
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, Slot<D>> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Slot<D>> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs with the gate held.
    async fn initialize(&self) -> Result<ConnectionHandle<D>, ConnectorError> {
        let mut phase = PhaseGuard::enter(&self.slot);

        info!(
            uri = %self.config.redacted_uri(),
            database = %self.config.database,
            "Connecting to MongoDB"
        );

        let result = self.establish().await;
        phase.complete(&result);

        match &result {
            Ok(_) => info!(database = %self.config.database, "Connected to MongoDB"),
            Err(err) => error!(error = %err, "Failed to connect to MongoDB"),
        }

        result
    }

    async fn establish(&self) -> Result<ConnectionHandle<D>, ConnectorError> {
        self.config.validate()?;
        let uri = self.config.redacted_uri();

        let client = match timeout(self.config.connect_timeout, self.driver.open_client(&self.config)).await {
            Ok(Ok(client)) => client,
            Ok(Err(DriverError::InvalidUri(message))) => {
                return Err(ConfigError::MalformedUri(message).into());
            }
            Ok(Err(e)) => return Err(ConnectorError::connect(&uri, e)),
            Err(_) => {
                return Err(ConnectorError::connect(&uri, DriverError::Timeout(self.config.connect_timeout)));
            }
        };

        debug!(uri = %uri, timeout = ?self.config.ping_timeout, "Client opened, probing primary");

        let probe = match timeout(self.config.ping_timeout, self.driver.ping(&client)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(DriverError::Timeout(self.config.ping_timeout)),
        };

        if let Err(e) = probe {
            warn!(uri = %uri, error = %e, "Liveness probe failed, releasing client");
            if timeout(self.config.ping_timeout, self.driver.shutdown(client)).await.is_err() {
                warn!(uri = %uri, "Client shutdown did not finish in time");
            }
            return Err(ConnectorError::probe(&uri, e));
        }

        let database = self.driver.database(&client, &self.config.database);
        Ok(ConnectionHandle::new(client, database))
    }
}

impl Connector<MongoDriver> {
    /// MongoDB-backed connector for the `[database]` section of `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(MongoDriver, config.database.connection_config())
    }
}

impl<D: Driver> fmt::Debug for Connector<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

/// Marks the connector `InProgress` and falls back to `Uninitialized` if the
/// initializing future is dropped before completing.
struct PhaseGuard<'a, D: Driver> {
    slot: &'a RwLock<Slot<D>>,
    completed: bool,
}

impl<'a, D: Driver> PhaseGuard<'a, D> {
    fn enter(slot: &'a RwLock<Slot<D>>) -> Self {
        slot.write().unwrap_or_else(PoisonError::into_inner).phase = InitializationState::InProgress;
        Self { slot, completed: false }
    }

    /// Publish the outcome and its phase in one write.
    fn complete(&mut self, result: &Result<ConnectionHandle<D>, ConnectorError>) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(handle) => {
                slot.phase = InitializationState::Ready;
                slot.handle = Some(handle.clone());
                slot.error = None;
            }
            Err(err) => {
                slot.phase = InitializationState::Failed;
                slot.handle = None;
                slot.error = Some(err.clone());
            }
        }
        self.completed = true;
    }
}

impl<D: Driver> Drop for PhaseGuard<'_, D> {
    fn drop(&mut self) {
        if !self.completed {
            *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Slot::empty();
            warn!("Connect cancelled before completing");
        }
    }
}
