//! The state store façade.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use statedb_codec::{from_value, Value};
use statedb_driver::{
    Connector, DocumentCollection, DocumentDriver, DriverError, Filter, FindOptions, IndexInfo,
    IndexModel, SortDirection,
};
use tracing::{debug, error, info, warn};

use crate::collection::CollectionResolver;
use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::query::{Page, QueryBuilder};
use crate::state::{CacheState, StateMeta, UPDATE_COUNT_FIELD, UPDATE_TIME_FIELD};
use crate::stats::StoreStats;
use crate::tracker::Fingerprint;

/// Result of [`StateStore::create_index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// A new index was created.
    Created(String),
    /// An index whose name starts with the field already existed.
    AlreadyExists(String),
}

impl IndexOutcome {
    /// The index name.
    pub fn name(&self) -> &str {
        match self {
            Self::Created(name) | Self::AlreadyExists(name) => name,
        }
    }
}

/// Result of [`StateStore::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The state matched its baseline; nothing was sent.
    Unchanged,
    /// The state was written and acknowledged.
    Saved,
    /// The state was sent but the server did not acknowledge it. The
    /// baseline is kept, so the next update writes again.
    Unacknowledged,
}

/// Loads, queries and persists [`CacheState`] types over a document driver.
///
/// Every state kind lives in its own collection, resolved through a
/// [`CollectionResolver`] and opened lazily on first use. Default reads
/// exclude soft-deleted documents. Writes are upserts keyed by id.
///
/// The store assumes one owner per state instance: the dirty check and the
/// write that follows it are not atomic against a second writer holding a
/// copy of the same id.
pub struct StateStore {
    driver: Arc<dyn DocumentDriver>,
    config: StoreConfig,
    resolver: CollectionResolver,
    collections: RwLock<HashMap<&'static str, Arc<dyn DocumentCollection>>>,
    stats: StoreStats,
}

/// Decodes a document and attaches its fingerprint as the baseline.
fn hydrate<S: CacheState>(document: &Value) -> CoreResult<S> {
    let fingerprint = Fingerprint::of(document)?;
    let mut state: S = from_value(document)?;
    state.meta_mut().tracker_mut().attach(Some(fingerprint));
    Ok(state)
}

/// Adopts the written fingerprint and runs the save hook.
fn mark_saved<S: CacheState>(state: &mut S, fingerprint: Fingerprint) {
    let id = state.id();
    state
        .meta_mut()
        .tracker_mut()
        .after_save(fingerprint, S::COLLECTION, id);
    state.after_save();
}

/// Puts back the audit fields stamped before a write that then failed, so a
/// retry stamps them once.
fn restore_on_err<S, T, E>(state: &mut S, previous: StateMeta, result: Result<T, E>) -> CoreResult<T>
where
    S: CacheState,
    E: Into<CoreError>,
{
    result.map_err(|err| {
        *state.meta_mut() = previous;
        err.into()
    })
}

impl StateStore {
    /// Connects through `connector` and creates a store.
    ///
    /// # Errors
    ///
    /// Connection failures are logged and returned; there is no retry.
    pub async fn open(connector: &dyn Connector, config: StoreConfig) -> CoreResult<Self> {
        match connector
            .connect(&config.connection_string, &config.database)
            .await
        {
            Ok(driver) => {
                info!(database = %config.database, "state store connected");
                Ok(Self::with_driver(driver, config))
            }
            Err(e) => {
                error!(database = %config.database, error = %e, "state store failed to connect");
                Err(e.into())
            }
        }
    }

    /// Creates a store over an already connected driver.
    pub fn with_driver(driver: Arc<dyn DocumentDriver>, config: StoreConfig) -> Self {
        Self {
            driver,
            config,
            resolver: CollectionResolver::new(),
            collections: RwLock::new(HashMap::new()),
            stats: StoreStats::new(),
        }
    }

    /// The store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Store counters.
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// The underlying driver.
    pub fn driver(&self) -> &Arc<dyn DocumentDriver> {
        &self.driver
    }

    /// The collection registry.
    pub fn resolver(&self) -> &CollectionResolver {
        &self.resolver
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.driver.is_closed()
    }

    async fn collection<S: CacheState>(&self) -> CoreResult<Arc<dyn DocumentCollection>> {
        let name = self.resolver.resolve::<S>()?;
        let cached = self.collections.read().get(name).cloned();
        if let Some(collection) = cached {
            return Ok(collection);
        }

        let handle = self.driver.collection(name).await?;
        Ok(Arc::clone(
            self.collections.write().entry(name).or_insert(handle),
        ))
    }

    async fn find_states<S: CacheState>(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> CoreResult<Vec<S>> {
        let collection = self.collection::<S>().await?;
        let documents = collection.find(filter, options).await?;
        let states = documents
            .iter()
            .map(hydrate::<S>)
            .collect::<CoreResult<Vec<_>>>()?;
        self.stats.record_loads(states.len() as u64);
        Ok(states)
    }

    // === Reads ===

    /// Loads the state with `id`, or builds a new one.
    ///
    /// A missing document yields `S::default()` with `id` set. The lookup is
    /// by id alone, so a soft-deleted document is still loaded.
    /// [`CacheState::after_load`] runs once before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails or the document does not decode.
    pub async fn load_state<S: CacheState>(&self, id: i64) -> CoreResult<S> {
        self.load_state_or_else(id, || None).await
    }

    /// Like [`load_state`](Self::load_state), but a missing document first
    /// asks `default` for the new state. The id is always set to `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails or the document does not decode.
    pub async fn load_state_or_else<S, F>(&self, id: i64, default: F) -> CoreResult<S>
    where
        S: CacheState,
        F: FnOnce() -> Option<S> + Send,
    {
        let collection = self.collection::<S>().await?;
        let found = collection
            .find(&Filter::id(id), &FindOptions::new().limit(1))
            .await?;

        let (mut state, is_new) = match found.first() {
            Some(document) => (hydrate::<S>(document)?, false),
            None => {
                let mut state = default().unwrap_or_default();
                state.set_id(id);
                // a factory may hand back a clone of a loaded state
                state.meta_mut().tracker_mut().attach(None);
                (state, true)
            }
        };

        self.stats.record_loads(1);
        state.after_load(is_new);
        debug!(collection = S::COLLECTION, id, is_new, "loaded state");
        Ok(state)
    }

    /// First non-deleted state matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails or a document does not decode.
    pub async fn find_one<S: CacheState>(&self, filter: Filter) -> CoreResult<Option<S>> {
        let states = self
            .find_states::<S>(&QueryBuilder::active(filter), &FindOptions::new().limit(1))
            .await?;
        Ok(states.into_iter().next())
    }

    /// All non-deleted states matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails or a document does not decode.
    pub async fn find_many<S: CacheState>(&self, filter: Filter) -> CoreResult<Vec<S>> {
        self.find_states(&QueryBuilder::active(filter), &FindOptions::new())
            .await
    }

    /// First non-deleted state matching `filter` in `key` order.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails or a document does not decode.
    pub async fn find_sorted_first<S: CacheState>(
        &self,
        filter: Filter,
        key: &str,
        ascending: bool,
    ) -> CoreResult<Option<S>> {
        let states = self
            .find_states::<S>(
                &QueryBuilder::active(filter),
                &QueryBuilder::sorted_first(key, ascending),
            )
            .await?;
        Ok(states.into_iter().next())
    }

    /// One page of non-deleted states in `key` order.
    ///
    /// A negative `page_index` is treated as 0 and a non-positive
    /// `page_size` as the configured default page size.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails or a document does not decode.
    pub async fn find_sorted_page<S: CacheState>(
        &self,
        filter: Filter,
        key: &str,
        ascending: bool,
        page_index: i64,
        page_size: i64,
    ) -> CoreResult<Vec<S>> {
        let page = Page::clamped_with(page_index, page_size, self.config.default_page_size);
        self.find_states(
            &QueryBuilder::active(filter),
            &QueryBuilder::sorted_page(key, ascending, page),
        )
        .await
    }

    /// Number of non-deleted states matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    pub async fn count<S: CacheState>(&self, filter: Filter) -> CoreResult<u64> {
        let collection = self.collection::<S>().await?;
        Ok(collection.count(&QueryBuilder::active(filter)).await?)
    }

    /// Whether any non-deleted state matches `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    pub async fn exists<S: CacheState>(&self, filter: Filter) -> CoreResult<bool> {
        let collection = self.collection::<S>().await?;
        let found = collection
            .find(&QueryBuilder::active(filter), &FindOptions::new().limit(1))
            .await?;
        Ok(!found.is_empty())
    }

    // === Writes ===

    /// Stamps `create_time` and upserts the state. Always writes.
    ///
    /// Returns the number of documents written: 1 when the document was
    /// inserted or its content changed, 0 when it was replaced by identical
    /// content.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn add<S: CacheState>(&self, state: &mut S) -> CoreResult<u64> {
        let collection = self.collection::<S>().await?;
        let previous = state.meta().clone();
        let now = state.meta().next_timestamp();
        state.meta_mut().mark_created(now);

        let checked = state.check_changes();
        let change = restore_on_err(state, previous.clone(), checked)?;
        let id = state.id();
        let written = collection
            .replace_one(&Filter::id(id), change.document, &self.config.replace_options)
            .await;
        let result = restore_on_err(state, previous, written)?;
        self.stats.record_write();

        if result.acknowledged {
            mark_saved(state, change.fingerprint);
        } else {
            warn!(collection = S::COLLECTION, id, "add was not acknowledged");
        }
        debug!(collection = S::COLLECTION, id, "added state");
        Ok(result.written())
    }

    /// Stamps `create_time` on every state and bulk inserts them.
    ///
    /// With the default unordered options a failing state does not stop the
    /// others. States that were inserted run their save hook even when
    /// others failed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] for an empty batch and
    /// [`CoreError::BatchPartiallyFailed`] when some states were not
    /// inserted.
    pub async fn add_batch<S: CacheState>(&self, states: &mut [S]) -> CoreResult<()> {
        if states.is_empty() {
            return Err(CoreError::invalid_operation(
                "add_batch needs at least one state",
            ));
        }
        let collection = self.collection::<S>().await?;

        let mut fingerprints = Vec::with_capacity(states.len());
        let mut documents = Vec::with_capacity(states.len());
        for state in states.iter_mut() {
            let now = state.meta().next_timestamp();
            state.meta_mut().mark_created(now);
            let change = state.check_changes()?;
            fingerprints.push(change.fingerprint);
            documents.push(change.document);
        }

        let total = states.len();
        let options = self.config.insert_many_options;
        let result = collection.insert_many(documents, &options).await?;
        self.stats.record_write();

        // ordered execution stops at the first failure; later states were never sent
        let attempted = if options.ordered {
            result.failures.first().map_or(total, |f| f.index)
        } else {
            total
        };
        let failed: HashSet<usize> = result.failures.iter().map(|f| f.index).collect();

        for (index, (state, fingerprint)) in states.iter_mut().zip(fingerprints).enumerate() {
            if result.acknowledged && index < attempted && !failed.contains(&index) {
                mark_saved(state, fingerprint);
            }
        }

        for failure in &result.failures {
            warn!(
                collection = S::COLLECTION,
                id = ?states.get(failure.index).map(CacheState::id),
                error = %failure.error,
                "state failed to insert in batch"
            );
        }

        let inserted = result.inserted_ids.len();
        match result.failures.into_iter().next() {
            None => {
                debug!(collection = S::COLLECTION, total, "added batch");
                Ok(())
            }
            Some(first) => {
                let failed = total - inserted;
                self.stats.record_batch_failures(failed as u64);
                Err(CoreError::BatchPartiallyFailed {
                    collection: S::COLLECTION,
                    failed,
                    total,
                    first_error: first.error,
                })
            }
        }
    }

    /// Writes the state if it changed since it was last loaded or saved.
    ///
    /// A clean state costs one serialization and no I/O. A dirty state gets
    /// a new `update_time`, `update_count + 1` and is upserted; the save hook
    /// runs only when the write is acknowledged.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn update<S: CacheState>(&self, state: &mut S) -> CoreResult<UpdateOutcome> {
        let change = state.check_changes()?;
        let id = state.id();
        if !change.changed {
            self.stats.record_skipped_update();
            debug!(collection = S::COLLECTION, id, "state unchanged, skipping update");
            return Ok(UpdateOutcome::Unchanged);
        }

        let collection = self.collection::<S>().await?;
        let previous = state.meta().clone();
        let now = state.meta().next_update_timestamp();
        state.meta_mut().mark_updated(now);

        // the fingerprint excludes these two fields, so the document can be
        // stamped in place instead of serialized again
        let count = i64::try_from(state.meta().update_count()).unwrap_or(i64::MAX);
        let mut document = change.document;
        document.set(UPDATE_TIME_FIELD, now);
        document.set(UPDATE_COUNT_FIELD, count);

        let written = collection
            .replace_one(&Filter::id(id), document, &self.config.replace_options)
            .await;
        let result = restore_on_err(state, previous, written)?;
        self.stats.record_write();

        if result.acknowledged {
            mark_saved(state, change.fingerprint);
            debug!(collection = S::COLLECTION, id, update_count = count, "updated state");
            Ok(UpdateOutcome::Saved)
        } else {
            warn!(collection = S::COLLECTION, id, "update was not acknowledged");
            Ok(UpdateOutcome::Unacknowledged)
        }
    }

    /// Soft-deletes the state: stamps `delete_time`, sets `is_deleted` and
    /// upserts. The document stays in the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn delete<S: CacheState>(&self, state: &mut S) -> CoreResult<u64> {
        let collection = self.collection::<S>().await?;
        let previous = state.meta().clone();
        let now = state.meta().next_delete_timestamp();
        state.meta_mut().mark_deleted(now);

        let checked = state.check_changes();
        let change = restore_on_err(state, previous.clone(), checked)?;
        let id = state.id();
        let written = collection
            .replace_one(&Filter::id(id), change.document, &self.config.replace_options)
            .await;
        let result = restore_on_err(state, previous, written)?;
        self.stats.record_write();
        self.stats.record_soft_delete();

        if result.acknowledged {
            mark_saved(state, change.fingerprint);
        } else {
            warn!(collection = S::COLLECTION, id, "delete was not acknowledged");
        }
        debug!(collection = S::COLLECTION, id, "soft-deleted state");
        Ok(result.written())
    }

    /// Soft-deletes the first non-deleted state matching `filter`.
    ///
    /// Returns 0 when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the write fails.
    pub async fn delete_where<S: CacheState>(&self, filter: Filter) -> CoreResult<u64> {
        match self.find_one::<S>(filter).await? {
            Some(mut state) => self.delete(&mut state).await,
            None => Ok(0),
        }
    }

    // === Indexes ===

    /// Creates an index on `field` unless one whose name starts with `field`
    /// already exists.
    ///
    /// A concurrent creator winning the race is reported as
    /// [`IndexOutcome::AlreadyExists`].
    ///
    /// # Errors
    ///
    /// Returns an error if listing or creating fails.
    pub async fn create_index<S: CacheState>(
        &self,
        field: &str,
        ascending: bool,
    ) -> CoreResult<IndexOutcome> {
        let collection = self.collection::<S>().await?;
        let existing = collection.list_indexes().await?;
        if let Some(index) = existing.iter().find(|i| i.name.starts_with(field)) {
            debug!(collection = S::COLLECTION, index = %index.name, "index already exists");
            return Ok(IndexOutcome::AlreadyExists(index.name.clone()));
        }

        let model = IndexModel::new(field, SortDirection::from_ascending(ascending));
        match collection.create_index(model).await {
            Ok(name) => {
                info!(collection = S::COLLECTION, index = %name, "created index");
                Ok(IndexOutcome::Created(name))
            }
            Err(DriverError::IndexExists { name }) => Ok(IndexOutcome::AlreadyExists(name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Drops an index by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the index does not exist or the driver fails.
    pub async fn drop_index<S: CacheState>(&self, name: &str) -> CoreResult<()> {
        let collection = self.collection::<S>().await?;
        collection.drop_index(name).await?;
        info!(collection = S::COLLECTION, index = name, "dropped index");
        Ok(())
    }

    /// Lists the indexes of `S`'s collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    pub async fn list_indexes<S: CacheState>(&self) -> CoreResult<Vec<IndexInfo>> {
        let collection = self.collection::<S>().await?;
        Ok(collection.list_indexes().await?)
    }

    // === Raw access, bypassing the soft-delete filter ===

    /// States matching `filter`, soft-deleted ones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails or a document does not decode.
    pub async fn find_including_deleted<S: CacheState>(&self, filter: Filter) -> CoreResult<Vec<S>> {
        self.find_states(&filter, &FindOptions::new()).await
    }

    /// Number of documents matching `filter`, soft-deleted ones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    pub async fn count_including_deleted<S: CacheState>(&self, filter: Filter) -> CoreResult<u64> {
        let collection = self.collection::<S>().await?;
        Ok(collection.count(&filter).await?)
    }

    /// Physically removes the first document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    pub async fn hard_delete_one<S: CacheState>(&self, filter: Filter) -> CoreResult<u64> {
        let collection = self.collection::<S>().await?;
        let removed = collection.delete_one(&filter).await?;
        self.stats.record_hard_deletes(removed);
        warn!(collection = S::COLLECTION, removed, "hard-deleted documents");
        Ok(removed)
    }

    /// Physically removes every document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    pub async fn hard_delete_many<S: CacheState>(&self, filter: Filter) -> CoreResult<u64> {
        let collection = self.collection::<S>().await?;
        let removed = collection.delete_many(&filter).await?;
        self.stats.record_hard_deletes(removed);
        warn!(collection = S::COLLECTION, removed, "hard-deleted documents");
        Ok(removed)
    }

    // === Lifecycle ===

    /// Closes the driver. Later operations fail with a closed error.
    /// Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to close.
    pub async fn close(&self) -> CoreResult<()> {
        if self.driver.is_closed() {
            return Ok(());
        }
        self.driver.close().await?;
        self.collections.write().clear();
        info!(database = %self.config.database, "state store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use statedb_driver::{InMemoryDriver, InMemoryServer};

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct RoleState {
        #[serde(flatten)]
        meta: StateMeta,
        name: String,
        level: u32,
        #[serde(skip)]
        loads: u32,
        #[serde(skip)]
        saves: u32,
        #[serde(skip)]
        loaded_new: Option<bool>,
    }

    impl CacheState for RoleState {
        const COLLECTION: &'static str = "RoleState";

        fn meta(&self) -> &StateMeta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut StateMeta {
            &mut self.meta
        }

        fn after_load(&mut self, is_new: bool) {
            self.loads += 1;
            self.loaded_new = Some(is_new);
        }

        fn after_save(&mut self) {
            self.saves += 1;
        }
    }

    fn role(id: i64, name: &str, level: u32) -> RoleState {
        RoleState {
            meta: StateMeta::new(id),
            name: name.to_string(),
            level,
            ..RoleState::default()
        }
    }

    fn store() -> (Arc<InMemoryDriver>, StateStore) {
        let driver = InMemoryDriver::open("game").unwrap();
        let store = StateStore::with_driver(driver.clone(), StoreConfig::default());
        (driver, store)
    }

    #[tokio::test]
    async fn add_then_load_round_trip() {
        let (_, store) = store();
        let mut a = role(1, "A", 3);
        assert_eq!(store.add(&mut a).await.unwrap(), 1);
        assert_eq!(a.saves, 1);
        assert!(a.meta().create_time() > 0);

        let loaded: RoleState = store.load_state(1).await.unwrap();
        assert_eq!(loaded.name, "A");
        assert_eq!(loaded.meta(), a.meta());
        assert_eq!(loaded.loads, 1);
        assert_eq!(loaded.loaded_new, Some(false));
        assert!(!loaded.check_changes().unwrap().changed);
    }

    #[tokio::test]
    async fn load_missing_builds_new_state() {
        let (_, store) = store();
        let fresh: RoleState = store.load_state(42).await.unwrap();
        assert_eq!(fresh.id(), 42);
        assert_eq!(fresh.loaded_new, Some(true));
        assert!(fresh.meta().tracker().baseline().is_none());

        let made: RoleState = store
            .load_state_or_else(7, || Some(role(999, "starter", 1)))
            .await
            .unwrap();
        assert_eq!(made.id(), 7);
        assert_eq!(made.name, "starter");
        assert_eq!(made.loads, 1);
    }

    #[tokio::test]
    async fn clean_update_does_no_io() {
        let (driver, store) = store();
        let mut a = role(1, "A", 1);
        store.add(&mut a).await.unwrap();
        let writes = driver.stats().writes();

        assert_eq!(store.update(&mut a).await.unwrap(), UpdateOutcome::Unchanged);
        assert_eq!(driver.stats().writes(), writes);
        assert_eq!(store.stats().skipped_updates(), 1);
        assert_eq!(a.meta().update_count(), 0);
    }

    #[tokio::test]
    async fn dirty_update_writes_and_counts() {
        let (_, store) = store();
        let mut a = role(1, "A", 1);
        store.add(&mut a).await.unwrap();

        a.name = "B".into();
        assert_eq!(store.update(&mut a).await.unwrap(), UpdateOutcome::Saved);
        assert_eq!(a.meta().update_count(), 1);
        assert!(a.meta().update_time() > a.meta().create_time());

        let loaded: RoleState = store.load_state(1).await.unwrap();
        assert_eq!(loaded.name, "B");
        assert_eq!(loaded.meta().update_count(), 1);
        assert_eq!(loaded.meta().update_time(), a.meta().update_time());

        // the saved state is clean again
        assert_eq!(store.update(&mut a).await.unwrap(), UpdateOutcome::Unchanged);
    }

    #[tokio::test]
    async fn soft_delete_hides_from_reads() {
        let (_, store) = store();
        let mut a = role(1, "A", 1);
        let mut b = role(2, "B", 2);
        store.add(&mut a).await.unwrap();
        store.add(&mut b).await.unwrap();

        assert_eq!(store.delete(&mut a).await.unwrap(), 1);
        assert!(a.meta().is_deleted());

        assert!(store.find_one::<RoleState>(Filter::id(1)).await.unwrap().is_none());
        assert_eq!(store.count::<RoleState>(Filter::All).await.unwrap(), 1);
        assert!(!store.exists::<RoleState>(Filter::eq("name", "A")).await.unwrap());
        assert_eq!(
            store.count_including_deleted::<RoleState>(Filter::All).await.unwrap(),
            2
        );

        // lookup by id ignores the flag
        let raw: RoleState = store.load_state(1).await.unwrap();
        assert!(raw.meta().is_deleted());
    }

    #[tokio::test]
    async fn delete_where_without_match_is_zero() {
        let (_, store) = store();
        let removed = store
            .delete_where::<RoleState>(Filter::eq("name", "nobody"))
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn sorted_queries() {
        let (_, store) = store();
        let mut roles: Vec<_> = (1..=25).map(|i| role(i, "r", i as u32)).collect();
        store.add_batch(&mut roles).await.unwrap();

        let top: RoleState = store
            .find_sorted_first(Filter::All, "level", false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(top.level, 25);

        let page: Vec<RoleState> = store
            .find_sorted_page(Filter::All, "level", true, 2, 10)
            .await
            .unwrap();
        let levels: Vec<u32> = page.iter().map(|r| r.level).collect();
        assert_eq!(levels, (21..=25).collect::<Vec<_>>());

        let clamped: Vec<RoleState> = store
            .find_sorted_page(Filter::All, "level", true, -5, 0)
            .await
            .unwrap();
        assert_eq!(clamped.len(), 10);
        assert_eq!(clamped[0].level, 1);
    }

    #[tokio::test]
    async fn empty_batch_rejected() {
        let (_, store) = store();
        let mut none: Vec<RoleState> = Vec::new();
        assert!(matches!(
            store.add_batch(&mut none).await,
            Err(CoreError::InvalidOperation { .. })
        ));
    }

    #[tokio::test]
    async fn batch_reports_partial_failure() {
        let (_, store) = store();
        let mut existing = role(2, "taken", 1);
        store.add(&mut existing).await.unwrap();

        let mut batch = vec![role(1, "a", 1), role(2, "b", 1), role(3, "c", 1)];
        let err = store.add_batch(&mut batch).await.unwrap_err();
        match err {
            CoreError::BatchPartiallyFailed { failed, total, .. } => {
                assert_eq!(failed, 1);
                assert_eq!(total, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(batch[0].saves, 1);
        assert_eq!(batch[1].saves, 0);
        assert_eq!(batch[2].saves, 1);
        assert_eq!(store.count::<RoleState>(Filter::All).await.unwrap(), 3);
        assert_eq!(store.stats().batch_failures(), 1);
    }

    #[tokio::test]
    async fn create_index_is_idempotent() {
        let (_, store) = store();
        let first = store.create_index::<RoleState>("level", true).await.unwrap();
        assert_eq!(first, IndexOutcome::Created("level_1".into()));

        let second = store.create_index::<RoleState>("level", false).await.unwrap();
        assert_eq!(second, IndexOutcome::AlreadyExists("level_1".into()));
        assert_eq!(second.name(), "level_1");

        store.drop_index::<RoleState>("level_1").await.unwrap();
        assert!(store
            .list_indexes::<RoleState>()
            .await
            .unwrap()
            .iter()
            .all(|i| i.name != "level_1"));
    }

    #[tokio::test]
    async fn hard_delete_removes_documents() {
        let (_, store) = store();
        let mut roles: Vec<_> = (1..=3).map(|i| role(i, "r", 1)).collect();
        store.add_batch(&mut roles).await.unwrap();

        assert_eq!(store.hard_delete_one::<RoleState>(Filter::id(1)).await.unwrap(), 1);
        assert_eq!(store.hard_delete_many::<RoleState>(Filter::All).await.unwrap(), 2);
        assert_eq!(
            store.count_including_deleted::<RoleState>(Filter::All).await.unwrap(),
            0
        );
        assert_eq!(store.stats().hard_deletes(), 3);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_final() {
        let (_, store) = store();
        let mut a = role(1, "A", 1);
        store.add(&mut a).await.unwrap();

        store.close().await.unwrap();
        store.close().await.unwrap();
        assert!(store.is_closed());

        let err = store.load_state::<RoleState>(1).await.unwrap_err();
        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn open_through_connector() {
        let server = InMemoryServer::new();
        let store = StateStore::open(&server, StoreConfig::default()).await.unwrap();
        assert!(!store.is_closed());

        let bad = StateStore::open(&server, StoreConfig::new("mongodb://nope", "game")).await;
        assert!(matches!(bad, Err(CoreError::Driver(DriverError::ConnectionFailed { .. }))));
    }

    #[tokio::test]
    async fn unacknowledged_update_keeps_baseline() {
        let server = InMemoryServer::new();
        let store = StateStore::open(&server, StoreConfig::new("memory://localhost?w=0", "game"))
            .await
            .unwrap();

        let mut a = role(1, "A", 1);
        assert_eq!(store.add(&mut a).await.unwrap(), 0);
        assert_eq!(a.saves, 0);

        a.name = "B".into();
        assert_eq!(store.update(&mut a).await.unwrap(), UpdateOutcome::Unacknowledged);
        assert!(a.check_changes().unwrap().changed);
    }

    #[tokio::test]
    async fn add_twice_without_mutation_still_saves() {
        let (_, store) = store();
        let mut a = role(1, "A", 1);
        store.add(&mut a).await.unwrap();

        // within one millisecond the content is identical: logged, never an error
        assert!(store.add(&mut a).await.unwrap() <= 1);
        assert_eq!(a.saves, 2);
        assert!(!a.check_changes().unwrap().changed);
        assert_eq!(store.count::<RoleState>(Filter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn back_to_back_updates_advance_update_time() {
        let (_, store) = store();
        let mut a = role(1, "A", 1);
        store.add(&mut a).await.unwrap();

        let mut last = a.meta().update_time();
        for level in 2..50 {
            a.level = level;
            assert_eq!(store.update(&mut a).await.unwrap(), UpdateOutcome::Saved);
            assert!(a.meta().update_time() > last);
            last = a.meta().update_time();
        }
    }

    #[tokio::test]
    async fn failed_write_restores_stamps() {
        let (driver, store) = store();
        let mut a = role(1, "A", 1);
        store.add(&mut a).await.unwrap();
        a.name = "B".into();
        store.update(&mut a).await.unwrap();
        let before = a.meta().clone();

        // the store keeps its cached handle, so the failure comes from the write
        driver.close().await.unwrap();
        a.name = "C".into();
        let err = store.update(&mut a).await.unwrap_err();
        assert!(matches!(err, CoreError::Driver(DriverError::Closed)));
        assert_eq!(a.meta(), &before);
        assert_eq!(a.meta().update_count(), 1);
        assert_eq!(a.saves, 2);

        assert!(store.delete(&mut a).await.is_err());
        assert!(!a.meta().is_deleted());
        assert_eq!(a.meta().delete_time(), 0);

        // still dirty, so a retry on a fresh store counts once
        let retry = StateStore::with_driver(
            InMemoryDriver::open("game").unwrap(),
            StoreConfig::default(),
        );
        assert_eq!(retry.update(&mut a).await.unwrap(), UpdateOutcome::Saved);
        assert_eq!(a.meta().update_count(), 2);
    }

    #[tokio::test]
    async fn factory_clone_of_loaded_state_is_new() {
        let (_, store) = store();
        let mut a = role(1, "A", 1);
        store.add(&mut a).await.unwrap();
        let loaded: RoleState = store.load_state(1).await.unwrap();
        assert!(loaded.meta().tracker().baseline().is_some());

        let mut copy: RoleState = store
            .load_state_or_else(2, || Some(loaded.clone()))
            .await
            .unwrap();
        assert_eq!(copy.id(), 2);
        assert_eq!(copy.loaded_new, Some(true));
        assert!(copy.meta().tracker().baseline().is_none());
        assert_eq!(store.update(&mut copy).await.unwrap(), UpdateOutcome::Saved);
        assert!(store.exists::<RoleState>(Filter::id(2)).await.unwrap());
    }
}
