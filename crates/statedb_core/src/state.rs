//! The contract every persisted state type implements.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::tracker::{ChangeSet, ChangeTracker};

/// Document field holding the soft-delete flag.
pub const IS_DELETED_FIELD: &str = "is_deleted";
/// Document field holding the creation timestamp.
pub const CREATE_TIME_FIELD: &str = "create_time";
/// Document field holding the last update timestamp.
pub const UPDATE_TIME_FIELD: &str = "update_time";
/// Document field holding the deletion timestamp.
pub const DELETE_TIME_FIELD: &str = "delete_time";
/// Document field holding the update counter.
pub const UPDATE_COUNT_FIELD: &str = "update_count";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Identity and audit fields shared by every state document.
///
/// Embed it with `#[serde(flatten)]` so its fields sit at the top level of
/// the document. Audit fields are only written by the
/// [`StateStore`](crate::StateStore); timestamps are milliseconds since the
/// Unix epoch.
///
/// Equality ignores the attached change tracker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateMeta {
    id: i64,
    #[serde(default)]
    create_time: i64,
    #[serde(default)]
    update_time: i64,
    #[serde(default)]
    delete_time: i64,
    #[serde(default)]
    update_count: u64,
    #[serde(default)]
    is_deleted: bool,
    #[serde(skip)]
    tracker: ChangeTracker,
}

impl StateMeta {
    /// Meta for a state with the given id and no history.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// The state id.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// When the state was first added (ms).
    pub fn create_time(&self) -> i64 {
        self.create_time
    }

    /// When the state was last updated (ms), zero if never.
    pub fn update_time(&self) -> i64 {
        self.update_time
    }

    /// When the state was soft-deleted (ms), zero if never.
    pub fn delete_time(&self) -> i64 {
        self.delete_time
    }

    /// Number of persisted updates.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Whether the state is soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// The attached change tracker.
    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub(crate) fn tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }

    pub(crate) fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    /// Current time, clamped so no audit timestamp ever moves backwards.
    pub(crate) fn next_timestamp(&self) -> i64 {
        now_millis()
            .max(self.create_time)
            .max(self.update_time)
            .max(self.delete_time)
    }

    /// Stamp for the next update: strictly after the previous update and the
    /// creation, even when both land in the same millisecond.
    pub(crate) fn next_update_timestamp(&self) -> i64 {
        let floor = self.create_time.max(self.update_time).saturating_add(1);
        self.next_timestamp().max(floor)
    }

    /// Stamp for the next soft delete, strictly after any earlier one.
    pub(crate) fn next_delete_timestamp(&self) -> i64 {
        self.next_timestamp().max(self.delete_time.saturating_add(1))
    }

    pub(crate) fn mark_created(&mut self, at: i64) {
        self.create_time = at;
    }

    pub(crate) fn mark_updated(&mut self, at: i64) {
        self.update_time = at;
        self.update_count += 1;
    }

    pub(crate) fn mark_deleted(&mut self, at: i64) {
        self.delete_time = at;
        self.is_deleted = true;
    }
}

impl PartialEq for StateMeta {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.create_time == other.create_time
            && self.update_time == other.update_time
            && self.delete_time == other.delete_time
            && self.update_count == other.update_count
            && self.is_deleted == other.is_deleted
    }
}

/// A persisted, change-tracked state type.
///
/// One implementing type is one entity kind, stored in its own collection.
/// The store calls the lifecycle hooks; callers never do.
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use statedb_core::{CacheState, StateMeta};
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct RoleState {
///     #[serde(flatten)]
///     meta: StateMeta,
///     name: String,
///     level: u32,
/// }
///
/// impl CacheState for RoleState {
///     const COLLECTION: &'static str = "RoleState";
///
///     fn meta(&self) -> &StateMeta {
///         &self.meta
///     }
///
///     fn meta_mut(&mut self) -> &mut StateMeta {
///         &mut self.meta
///     }
/// }
/// ```
pub trait CacheState: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Stable collection name for this entity kind, conventionally the type
    /// name. Renaming it orphans existing documents.
    const COLLECTION: &'static str;

    /// Shared identity and audit fields.
    fn meta(&self) -> &StateMeta;

    /// Mutable access to the shared fields.
    fn meta_mut(&mut self) -> &mut StateMeta;

    /// Called once per [`load_state`](crate::StateStore::load_state), after
    /// the document was decoded (`is_new == false`) or a fresh state was
    /// built (`is_new == true`).
    fn after_load(&mut self, _is_new: bool) {}

    /// Called after every acknowledged write of this state.
    fn after_save(&mut self) {}

    /// The state id.
    fn id(&self) -> i64 {
        self.meta().id()
    }

    /// Sets the state id. Ids are immutable once the state is persisted.
    fn set_id(&mut self, id: i64) {
        self.meta_mut().set_id(id);
    }

    /// Whether the state differs from what was last saved or loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    fn check_changes(&self) -> CoreResult<ChangeSet> {
        self.meta().tracker().check(self)
    }
}
