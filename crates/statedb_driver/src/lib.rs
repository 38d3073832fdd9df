//! # StateDB Driver
//!
//! The document database boundary for StateDB.
//!
//! The state store only needs a handful of primitives from a document
//! database: filtered finds with sort/skip/limit, counts, inserts,
//! replace-with-upsert, physical deletes and index management, all with
//! asynchronous completion. This crate defines those primitives as traits
//! and ships an in-memory implementation.
//!
//! ## Design Principles
//!
//! - Documents are [`Value`](statedb_codec::Value) maps keyed by the integer
//!   field [`ID_FIELD`]
//! - Drivers know nothing about soft deletes, audit fields or change tracking
//! - Handles must be `Send + Sync` so actors on any task can share them
//! - Locks are never held across an `.await`
//!
//! ## Available Drivers
//!
//! - [`InMemoryServer`] / [`InMemoryDriver`] - shared in-process databases
//!   addressed by `memory://` connection strings
//!
//! ## Example
//!
//! ```rust
//! use statedb_codec::Value;
//! use statedb_driver::{DocumentCollection, DocumentDriver, Filter, FindOptions, InMemoryDriver};
//!
//! # tokio_test_block(async {
//! let driver = InMemoryDriver::open("game").unwrap();
//! let roles = driver.collection("roles").await.unwrap();
//! let doc = Value::map(vec![(Value::from("id"), Value::from(1i64))]);
//! roles.insert_one(doc).await.unwrap();
//! let found = roles.find(&Filter::id(1), &FindOptions::new()).await.unwrap();
//! assert_eq!(found.len(), 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod error;
mod filter;
mod index;
mod memory;
mod options;
mod stats;

pub use driver::{Connector, DocumentCollection, DocumentDriver};
pub use error::{DriverError, DriverResult};
pub use filter::{compare_documents, Filter, SortDirection, SortSpec};
pub use index::{IndexInfo, IndexModel};
pub use memory::{InMemoryCollection, InMemoryDriver, InMemoryServer, MEMORY_SCHEME};
pub use options::{
    BulkWriteFailure, FindOptions, InsertManyOptions, InsertManyResult, ReplaceOptions,
    ReplaceResult,
};
pub use stats::DriverStats;

/// Name of the integer id field every document carries.
pub const ID_FIELD: &str = "id";
