//! In-memory driver for exercising the connector without a server.
//!
//! Endpoints (`host:port` after `mock://`) are reachable by default. An
//! endpoint can be refused (open fails at once) or blackholed (open never
//! completes), and probes can be made to fail or to hang.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::database::driver::{Catalog, Driver};
use crate::database::options::ConnectionConfig;
use crate::global::error::DriverError;

const SCHEME: &str = "mock://";

/// Endpoint that never answers, like a firewalled port.
pub const BLACKHOLE_ENDPOINT: &str = "localhost:1";

#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    refused: Mutex<HashSet<String>>,
    reachable_blackholes: Mutex<HashSet<String>>,
    failing_probe: AtomicBool,
    hanging_probe: AtomicBool,
    open_delay: Mutex<Duration>,
    opens: AtomicUsize,
    pings: AtomicUsize,
    shutdowns: AtomicUsize,
    next_client_id: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct MockClient {
    id: u64,
    endpoint: String,
}

impl MockClient {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug, Clone)]
pub struct MockDatabase {
    name: String,
}

#[derive(Debug)]
pub struct MockCollection<T> {
    name: String,
    database: String,
    _document: PhantomData<fn() -> T>,
}

impl<T> MockCollection<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

/// Placeholder document type for collection lookups.
#[derive(Debug)]
pub struct MockRecord;

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse(&self, endpoint: &str) {
        lock(&self.state.refused).insert(endpoint.to_string());
    }

    /// Make an endpoint answer, including one that was refused or blackholed.
    pub fn accept(&self, endpoint: &str) {
        lock(&self.state.refused).remove(endpoint);
        lock(&self.state.reachable_blackholes).insert(endpoint.to_string());
    }

    pub fn fail_probes(&self, fail: bool) {
        self.state.failing_probe.store(fail, Ordering::SeqCst);
    }

    /// Probes never answer, like a server that accepts but stalls.
    pub fn hang_probes(&self, hang: bool) {
        self.state.hanging_probe.store(hang, Ordering::SeqCst);
    }

    pub fn set_open_delay(&self, delay: Duration) {
        *lock(&self.state.open_delay) = delay;
    }

    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.state.pings.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.state.shutdowns.load(Ordering::SeqCst)
    }

    fn is_blackholed(&self, endpoint: &str) -> bool {
        endpoint == BLACKHOLE_ENDPOINT && !lock(&self.state.reachable_blackholes).contains(endpoint)
    }
}

#[async_trait::async_trait]
impl Driver for MockDriver {
    type Client = MockClient;
    type Database = MockDatabase;

    async fn open_client(&self, config: &ConnectionConfig) -> Result<MockClient, DriverError> {
        let endpoint = config
            .uri
            .strip_prefix(SCHEME)
            .map(|rest| rest.split(['/', '?']).next().unwrap_or_default().to_string())
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| DriverError::InvalidUri(format!("expected {}host:port", SCHEME)))?;

        self.state.opens.fetch_add(1, Ordering::SeqCst);

        let delay = *lock(&self.state.open_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if lock(&self.state.refused).contains(&endpoint) {
            return Err(DriverError::Unavailable(format!("connection refused by {}", endpoint)));
        }
        if self.is_blackholed(&endpoint) {
            std::future::pending::<()>().await;
        }

        Ok(MockClient {
            id: self.state.next_client_id.fetch_add(1, Ordering::SeqCst),
            endpoint,
        })
    }

    async fn ping(&self, client: &MockClient) -> Result<(), DriverError> {
        self.state.pings.fetch_add(1, Ordering::SeqCst);

        if self.state.hanging_probe.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.state.failing_probe.load(Ordering::SeqCst) {
            return Err(DriverError::Unavailable(format!("no primary at {}", client.endpoint)));
        }
        Ok(())
    }

    fn database(&self, _client: &MockClient, name: &str) -> MockDatabase {
        MockDatabase { name: name.to_string() }
    }

    async fn shutdown(&self, _client: MockClient) {
        self.state.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

impl Catalog for MockDatabase {
    type Collection<T: Send + Sync> = MockCollection<T>;

    fn name(&self) -> &str {
        &self.name
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> MockCollection<T> {
        MockCollection {
            name: name.to_string(),
            database: self.name.clone(),
            _document: PhantomData,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
