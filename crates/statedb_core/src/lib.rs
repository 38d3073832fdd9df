//! # StateDB Core
//!
//! Change-tracked persistence for actor-owned game state.
//!
//! Each entity kind is a Rust type implementing [`CacheState`] and lives in
//! its own document collection. The [`StateStore`] loads states, answers
//! queries and writes them back, and skips the write entirely when a state
//! did not change since it was last loaded or saved.
//!
//! ## Design Principles
//!
//! - **Upsert by id**: add, update and delete are all replace-with-upsert on
//!   the integer `id` field, so repeating a write is harmless
//! - **Soft deletes**: deleted states keep their document with
//!   `is_deleted = true`; default reads never see them
//! - **Fingerprint dirty check**: a 128-bit hash of the canonical document
//!   decides whether an update writes
//! - **Async all the way**: every I/O operation is a future; nothing blocks
//!
//! ## Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use statedb_core::{CacheState, StateMeta, StateStore, StoreConfig, UpdateOutcome};
//! use statedb_driver::InMemoryServer;
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct RoleState {
//!     #[serde(flatten)]
//!     meta: StateMeta,
//!     name: String,
//! }
//!
//! impl CacheState for RoleState {
//!     const COLLECTION: &'static str = "RoleState";
//!     fn meta(&self) -> &StateMeta { &self.meta }
//!     fn meta_mut(&mut self) -> &mut StateMeta { &mut self.meta }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = StateStore::open(&InMemoryServer::new(), StoreConfig::default())
//!     .await
//!     .unwrap();
//!
//! let mut role: RoleState = store.load_state(1).await.unwrap();
//! role.name = "A".into();
//! store.add(&mut role).await.unwrap();
//!
//! // nothing changed, nothing written
//! assert_eq!(store.update(&mut role).await.unwrap(), UpdateOutcome::Unchanged);
//!
//! role.name = "B".into();
//! assert_eq!(store.update(&mut role).await.unwrap(), UpdateOutcome::Saved);
//! assert_eq!(role.meta().update_count(), 1);
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod error;
mod query;
mod state;
mod stats;
mod store;
mod tracker;

pub use collection::CollectionResolver;
pub use config::StoreConfig;
pub use error::{CoreError, CoreResult};
pub use query::{Page, QueryBuilder, DEFAULT_PAGE_SIZE};
pub use state::{
    now_millis, CacheState, StateMeta, CREATE_TIME_FIELD, DELETE_TIME_FIELD, IS_DELETED_FIELD,
    UPDATE_COUNT_FIELD, UPDATE_TIME_FIELD,
};
pub use stats::{StoreStats, StoreStatsSnapshot};
pub use store::{IndexOutcome, StateStore, UpdateOutcome};
pub use tracker::{ChangeSet, ChangeTracker, Fingerprint};

// Query vocabulary callers need alongside the store.
pub use statedb_driver::{
    Filter, IndexInfo, InsertManyOptions, ReplaceOptions, SortDirection, SortSpec,
};
