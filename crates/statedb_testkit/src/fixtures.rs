//! Test fixtures and store helpers.
//!
//! Provides a state store over a private in-memory database, and tracing
//! setup for test binaries.

use std::sync::Arc;

use statedb_core::{StateStore, StoreConfig};
use statedb_driver::{DriverStats, InMemoryDriver, InMemoryServer};
use tracing_subscriber::EnvFilter;

/// A state store over its own in-memory database.
///
/// Keeps the concrete driver next to the store so tests can read the
/// driver's operation counters, the write-count probe.
pub struct TestStore {
    /// The store under test.
    pub store: StateStore,
    driver: Arc<InMemoryDriver>,
    server: InMemoryServer,
}

impl TestStore {
    /// Creates a store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a store with `config`. The connection string must use the
    /// `memory://` scheme.
    pub fn with_config(config: StoreConfig) -> Self {
        let server = InMemoryServer::new();
        let driver = server
            .driver(&config.connection_string, &config.database)
            .expect("Failed to connect to in-memory server");
        let store = StateStore::with_driver(driver.clone(), config);
        Self {
            store,
            driver,
            server,
        }
    }

    /// A second store over the same database, as another process would see it.
    pub fn reopen(&self) -> StateStore {
        let config = self.store.config().clone();
        let driver = self
            .server
            .driver(&config.connection_string, &config.database)
            .expect("Failed to reconnect to in-memory server");
        StateStore::with_driver(driver, config)
    }

    /// Driver operation counters.
    pub fn driver_stats(&self) -> &DriverStats {
        self.driver.stats()
    }

    /// Insert and replace calls the driver has served so far.
    pub fn writes(&self) -> u64 {
        self.driver.stats().writes()
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = StateStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Installs a `tracing` subscriber for tests.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Safe to call
/// from every test; only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use crate::states::RoleState;

    /// A store holding `count` roles with ids `1..=count` and level equal
    /// to their id.
    pub async fn populated_roles(count: i64) -> TestStore {
        let store = TestStore::new();
        let mut roles: Vec<_> = (1..=count)
            .map(|id| RoleState::named(id, &format!("role-{id}")).with_level(id as u32))
            .collect();
        store
            .add_batch(&mut roles)
            .await
            .expect("Failed to populate roles");
        store
    }
}
