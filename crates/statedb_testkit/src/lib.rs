//! # StateDB Testkit
//!
//! Test utilities for StateDB.
//!
//! This crate provides:
//! - Sample game-state types implementing [`CacheState`](statedb_core::CacheState)
//! - [`TestStore`], a state store over a private in-memory database with a
//!   write-count probe
//! - Property-based test generators using proptest
//! - Actor-style stress runs over tokio tasks
//! - [`init_tracing`] for test binaries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use statedb_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn clean_update_writes_nothing() {
//!     let store = TestStore::new();
//!     let mut role = RoleState::named(1, "A");
//!     store.add(&mut role).await.unwrap();
//!     let writes = store.writes();
//!     store.update(&mut role).await.unwrap();
//!     assert_eq!(store.writes(), writes);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod states;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::states::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use states::*;
pub use stress::*;
