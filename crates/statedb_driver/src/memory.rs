//! In-memory document server for tests and single-process deployments.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use statedb_codec::{to_canonical_cbor, Value};
use tracing::{debug, info};

use crate::driver::{Connector, DocumentCollection, DocumentDriver};
use crate::error::{DriverError, DriverResult};
use crate::filter::{compare_documents, Filter};
use crate::index::{IndexInfo, IndexModel};
use crate::options::{
    BulkWriteFailure, FindOptions, InsertManyOptions, InsertManyResult, ReplaceOptions,
    ReplaceResult,
};
use crate::stats::DriverStats;
use crate::ID_FIELD;

/// Connection string scheme accepted by [`InMemoryServer`].
pub const MEMORY_SCHEME: &str = "memory://";

#[derive(Debug, Default)]
struct CollectionState {
    documents: RwLock<BTreeMap<i64, Value>>,
    indexes: RwLock<Vec<IndexInfo>>,
}

#[derive(Debug, Default)]
struct DatabaseState {
    collections: RwLock<BTreeMap<String, Arc<CollectionState>>>,
}

/// Parsed `memory://host[?w=0|1]` connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConnectionSettings {
    host: String,
    acknowledged: bool,
}

impl ConnectionSettings {
    fn parse(connection_string: &str) -> DriverResult<Self> {
        let rest = connection_string.strip_prefix(MEMORY_SCHEME).ok_or_else(|| {
            DriverError::connection_failed(format!(
                "unsupported connection string {connection_string:?}, expected {MEMORY_SCHEME}<host>"
            ))
        })?;
        let (host, query) = rest.split_once('?').unwrap_or((rest, ""));

        let mut acknowledged = true;
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some(("w", level)) => acknowledged = level != "0",
                _ => {
                    return Err(DriverError::connection_failed(format!(
                        "unknown connection option {pair:?}"
                    )))
                }
            }
        }

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            acknowledged,
        })
    }
}

fn validate_database_name(database: &str) -> DriverResult<()> {
    if database.is_empty() || database.contains(['/', '\\', '.', ' ', '"', '$', '\0']) {
        return Err(DriverError::connection_failed(format!(
            "invalid database name {database:?}"
        )));
    }
    Ok(())
}

/// An in-memory document server.
///
/// Drivers connected to the same server and database share documents, the
/// way separate processes share a real database. Cloning the server clones
/// a handle, not the data.
///
/// # Example
///
/// ```rust
/// use statedb_driver::{DocumentDriver, InMemoryServer};
///
/// let server = InMemoryServer::new();
/// let a = server.driver("memory://local", "game").unwrap();
/// let b = server.driver("memory://local", "game").unwrap();
/// assert_eq!(a.database(), b.database());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryServer {
    databases: Arc<RwLock<HashMap<(String, String), Arc<DatabaseState>>>>,
}

impl InMemoryServer {
    /// Creates an empty server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects synchronously, returning the concrete driver type.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::ConnectionFailed`] for anything other than a
    /// `memory://` connection string or for an invalid database name.
    pub fn driver(
        &self,
        connection_string: &str,
        database: &str,
    ) -> DriverResult<Arc<InMemoryDriver>> {
        let settings = ConnectionSettings::parse(connection_string)?;
        validate_database_name(database)?;

        let state = Arc::clone(
            self.databases
                .write()
                .entry((settings.host.clone(), database.to_string()))
                .or_default(),
        );

        debug!(host = %settings.host, database, "connected to in-memory server");
        Ok(Arc::new(InMemoryDriver {
            database: database.to_string(),
            state,
            closed: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(DriverStats::new()),
            acknowledged: settings.acknowledged,
        }))
    }
}

#[async_trait]
impl Connector for InMemoryServer {
    async fn connect(
        &self,
        connection_string: &str,
        database: &str,
    ) -> DriverResult<Arc<dyn DocumentDriver>> {
        let driver = self.driver(connection_string, database)?;
        Ok(driver)
    }
}

/// A connection to one database on an [`InMemoryServer`].
#[derive(Debug)]
pub struct InMemoryDriver {
    database: String,
    state: Arc<DatabaseState>,
    closed: Arc<AtomicBool>,
    stats: Arc<DriverStats>,
    acknowledged: bool,
}

impl InMemoryDriver {
    /// Creates a standalone driver on a private server.
    ///
    /// # Errors
    ///
    /// Returns an error if the database name is invalid.
    pub fn open(database: &str) -> DriverResult<Arc<Self>> {
        InMemoryServer::new().driver("memory://local", database)
    }

    /// Operation counters for this connection.
    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DriverError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentDriver for InMemoryDriver {
    fn database(&self) -> &str {
        &self.database
    }

    async fn collection(&self, name: &str) -> DriverResult<Arc<dyn DocumentCollection>> {
        tokio::task::yield_now().await;
        self.ensure_open()?;
        if name.is_empty() || name.contains(['$', '\0']) || name.starts_with("system.") {
            return Err(DriverError::InvalidName {
                name: name.to_string(),
            });
        }

        let state = {
            let mut collections = self.state.collections.write();
            if !collections.contains_key(name) {
                debug!(database = %self.database, collection = name, "creating collection");
            }
            Arc::clone(collections.entry(name.to_string()).or_default())
        };

        Ok(Arc::new(InMemoryCollection {
            name: name.to_string(),
            state,
            closed: Arc::clone(&self.closed),
            stats: Arc::clone(&self.stats),
            acknowledged: self.acknowledged,
        }))
    }

    async fn list_collections(&self) -> DriverResult<Vec<String>> {
        tokio::task::yield_now().await;
        self.ensure_open()?;
        Ok(self.state.collections.read().keys().cloned().collect())
    }

    async fn drop_collection(&self, name: &str) -> DriverResult<()> {
        tokio::task::yield_now().await;
        self.ensure_open()?;
        match self.state.collections.write().remove(name) {
            Some(_) => {
                debug!(database = %self.database, collection = name, "dropped collection");
                Ok(())
            }
            None => Err(DriverError::CollectionNotFound {
                name: name.to_string(),
            }),
        }
    }

    async fn close(&self) -> DriverResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(database = %self.database, "closed in-memory driver");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// A collection handle on an [`InMemoryDriver`].
///
/// Documents are kept in id order, so unsorted finds return them by
/// ascending id.
#[derive(Debug)]
pub struct InMemoryCollection {
    name: String,
    state: Arc<CollectionState>,
    closed: Arc<AtomicBool>,
    stats: Arc<DriverStats>,
    acknowledged: bool,
}

impl InMemoryCollection {
    async fn enter(&self) -> DriverResult<()> {
        tokio::task::yield_now().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(DriverError::Closed);
        }
        Ok(())
    }

    /// Checks the document shape and returns its encoded size.
    fn encoded_len(&self, document: &Value) -> DriverResult<u64> {
        if !matches!(document, Value::Map(_)) {
            return Err(DriverError::invalid_document(format!(
                "expected a map in collection {}, got {}",
                self.name,
                document.kind()
            )));
        }
        Ok(to_canonical_cbor(document)?.len() as u64)
    }

    fn id_of(&self, document: &Value) -> DriverResult<i64> {
        document
            .get(ID_FIELD)
            .and_then(Value::as_integer)
            .ok_or_else(|| DriverError::MissingId {
                collection: self.name.clone(),
            })
    }

    fn insert_into(
        &self,
        documents: &mut BTreeMap<i64, Value>,
        document: Value,
    ) -> DriverResult<(i64, u64)> {
        let bytes = self.encoded_len(&document)?;
        let id = self.id_of(&document)?;
        if documents.contains_key(&id) {
            return Err(DriverError::DuplicateKey {
                collection: self.name.clone(),
                id,
            });
        }
        documents.insert(id, document);
        Ok((id, bytes))
    }
}

#[async_trait]
impl DocumentCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> DriverResult<Vec<Value>> {
        self.enter().await?;
        self.stats.record_read();

        let mut matched: Vec<Value> = {
            let documents = self.state.documents.read();
            documents
                .values()
                .filter(|d| filter.matches(d))
                .cloned()
                .collect()
        };

        if !options.sort.is_empty() {
            matched.sort_by(|a, b| compare_documents(&options.sort, a, b));
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        // a limit of zero means no limit
        let limit = options
            .limit
            .filter(|l| *l > 0)
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        Ok(matched.into_iter().skip(skip).take(limit).collect())
    }

    async fn count(&self, filter: &Filter) -> DriverResult<u64> {
        self.enter().await?;
        self.stats.record_read();
        let documents = self.state.documents.read();
        Ok(documents.values().filter(|d| filter.matches(d)).count() as u64)
    }

    async fn insert_one(&self, document: Value) -> DriverResult<i64> {
        self.enter().await?;
        let (id, bytes) = {
            let mut documents = self.state.documents.write();
            self.insert_into(&mut documents, document)?
        };
        self.stats.record_write(bytes);
        Ok(id)
    }

    async fn insert_many(
        &self,
        documents: Vec<Value>,
        options: &InsertManyOptions,
    ) -> DriverResult<InsertManyResult> {
        self.enter().await?;

        let mut result = InsertManyResult {
            acknowledged: self.acknowledged,
            ..InsertManyResult::default()
        };
        let mut total_bytes = 0;
        {
            let mut stored = self.state.documents.write();
            for (index, document) in documents.into_iter().enumerate() {
                match self.insert_into(&mut stored, document) {
                    Ok((id, bytes)) => {
                        result.inserted_ids.push(id);
                        total_bytes += bytes;
                    }
                    Err(error) => {
                        result.failures.push(BulkWriteFailure { index, error });
                        if options.ordered {
                            break;
                        }
                    }
                }
            }
        }
        self.stats.record_write(total_bytes);
        Ok(result)
    }

    async fn replace_one(
        &self,
        filter: &Filter,
        replacement: Value,
        options: &ReplaceOptions,
    ) -> DriverResult<ReplaceResult> {
        self.enter().await?;
        let mut replacement = replacement;
        let bytes = self.encoded_len(&replacement)?;

        let result = {
            let mut documents = self.state.documents.write();
            // documents are keyed by id, so an id filter needs no scan
            let target = match filter.id_hint() {
                Some(id) => documents.get_mut(&id).filter(|d| filter.matches(d)),
                None => documents.values_mut().find(|d| filter.matches(d)),
            };

            match target {
                Some(current) => {
                    let id = self.id_of(current)?;
                    match replacement.get(ID_FIELD) {
                        None => {
                            replacement.set(ID_FIELD, id);
                        }
                        Some(Value::Integer(n)) if *n == id => {}
                        Some(other) => {
                            return Err(DriverError::invalid_document(format!(
                                "replacement would change id {id} to {other:?}"
                            )));
                        }
                    }
                    let modified = *current != replacement;
                    if modified {
                        *current = replacement;
                    }
                    ReplaceResult {
                        acknowledged: true,
                        matched: 1,
                        modified: u64::from(modified),
                        upserted_id: None,
                    }
                }
                None if options.upsert => {
                    if replacement.get(ID_FIELD).is_none() {
                        if let Some(id) = filter.id_hint() {
                            replacement.set(ID_FIELD, id);
                        }
                    }
                    let (id, _) = self.insert_into(&mut documents, replacement)?;
                    ReplaceResult {
                        acknowledged: true,
                        matched: 0,
                        modified: 0,
                        upserted_id: Some(id),
                    }
                }
                None => ReplaceResult {
                    acknowledged: true,
                    ..ReplaceResult::default()
                },
            }
        };

        self.stats.record_write(bytes);
        if self.acknowledged {
            Ok(result)
        } else {
            Ok(ReplaceResult::default())
        }
    }

    async fn delete_one(&self, filter: &Filter) -> DriverResult<u64> {
        self.enter().await?;
        self.stats.record_delete();
        let mut documents = self.state.documents.write();
        let target = documents
            .iter()
            .find(|(_, d)| filter.matches(d))
            .map(|(id, _)| *id);
        Ok(target.and_then(|id| documents.remove(&id)).map_or(0, |_| 1))
    }

    async fn delete_many(&self, filter: &Filter) -> DriverResult<u64> {
        self.enter().await?;
        self.stats.record_delete();
        let mut documents = self.state.documents.write();
        let before = documents.len();
        documents.retain(|_, d| !filter.matches(d));
        Ok((before - documents.len()) as u64)
    }

    async fn list_indexes(&self) -> DriverResult<Vec<IndexInfo>> {
        self.enter().await?;
        self.stats.record_index_operation();
        Ok(self.state.indexes.read().clone())
    }

    async fn create_index(&self, model: IndexModel) -> DriverResult<String> {
        self.enter().await?;
        self.stats.record_index_operation();
        if model.keys.is_empty() {
            return Err(DriverError::invalid_document("index needs at least one key"));
        }

        let info = IndexInfo::from(&model);
        let mut indexes = self.state.indexes.write();
        if indexes.iter().any(|existing| existing.name == info.name) {
            return Err(DriverError::IndexExists { name: info.name });
        }
        debug!(collection = %self.name, index = %info.name, "created index");
        let name = info.name.clone();
        indexes.push(info);
        Ok(name)
    }

    async fn drop_index(&self, name: &str) -> DriverResult<()> {
        self.enter().await?;
        self.stats.record_index_operation();
        let mut indexes = self.state.indexes.write();
        let position = indexes
            .iter()
            .position(|existing| existing.name == name)
            .ok_or_else(|| DriverError::IndexNotFound {
                name: name.to_string(),
            })?;
        indexes.remove(position);
        debug!(collection = %self.name, index = name, "dropped index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{SortDirection, SortSpec};

    fn doc(id: i64, name: &str, level: i64) -> Value {
        Value::map(vec![
            (Value::from("id"), Value::Integer(id)),
            (Value::from("name"), Value::from(name)),
            (Value::from("level"), Value::Integer(level)),
        ])
    }

    async fn roles() -> (Arc<InMemoryDriver>, Arc<dyn DocumentCollection>) {
        let driver = InMemoryDriver::open("game").unwrap();
        let roles = driver.collection("roles").await.unwrap();
        (driver, roles)
    }

    #[test]
    fn connection_string_parsing() {
        let settings = ConnectionSettings::parse("memory://shard-1/?w=0").unwrap();
        assert_eq!(settings.host, "shard-1");
        assert!(!settings.acknowledged);

        assert!(ConnectionSettings::parse("memory://").unwrap().acknowledged);
        assert!(matches!(
            ConnectionSettings::parse("mongodb://localhost:27017"),
            Err(DriverError::ConnectionFailed { .. })
        ));
        assert!(matches!(
            ConnectionSettings::parse("memory://x?retryWrites=true"),
            Err(DriverError::ConnectionFailed { .. })
        ));
    }

    #[test]
    fn invalid_database_name_fails_to_connect() {
        let server = InMemoryServer::new();
        assert!(matches!(
            server.driver("memory://local", "bad.name"),
            Err(DriverError::ConnectionFailed { .. })
        ));
        assert!(server.driver("memory://local", "").is_err());
    }

    #[tokio::test]
    async fn memory_insert_and_find() {
        let (_driver, roles) = roles().await;
        roles.insert_one(doc(2, "B", 5)).await.unwrap();
        roles.insert_one(doc(1, "A", 9)).await.unwrap();

        let all = roles.find(&Filter::All, &FindOptions::new()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|d| d.get("id").cloned()).collect();
        assert_eq!(ids, vec![Some(Value::Integer(1)), Some(Value::Integer(2))]);
        assert_eq!(roles.count(&Filter::gt("level", 6i64)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn memory_insert_duplicate_fails() {
        let (_driver, roles) = roles().await;
        roles.insert_one(doc(1, "A", 1)).await.unwrap();
        let err = roles.insert_one(doc(1, "A2", 1)).await.unwrap_err();
        assert_eq!(
            err,
            DriverError::DuplicateKey {
                collection: "roles".into(),
                id: 1
            }
        );
    }

    #[tokio::test]
    async fn memory_insert_requires_id_and_map() {
        let (_driver, roles) = roles().await;
        let no_id = Value::map(vec![(Value::from("name"), Value::from("x"))]);
        assert!(matches!(
            roles.insert_one(no_id).await,
            Err(DriverError::MissingId { .. })
        ));
        assert!(matches!(
            roles.insert_one(Value::Integer(3)).await,
            Err(DriverError::InvalidDocument { .. })
        ));
    }

    #[tokio::test]
    async fn memory_find_sorted_skip_limit() {
        let (_driver, roles) = roles().await;
        for (id, level) in [(1, 30), (2, 10), (3, 20), (4, 40)] {
            roles.insert_one(doc(id, "x", level)).await.unwrap();
        }
        let options = FindOptions::new()
            .sort(SortSpec::descending("level"))
            .skip(1)
            .limit(2);
        let page = roles.find(&Filter::All, &options).await.unwrap();
        let levels: Vec<_> = page.iter().map(|d| d.get("level").cloned()).collect();
        assert_eq!(
            levels,
            vec![Some(Value::Integer(30)), Some(Value::Integer(20))]
        );
    }

    #[tokio::test]
    async fn memory_replace_reports_modified() {
        let (_driver, roles) = roles().await;
        roles.insert_one(doc(1, "A", 1)).await.unwrap();

        let same = roles
            .replace_one(&Filter::id(1), doc(1, "A", 1), &ReplaceOptions::upsert())
            .await
            .unwrap();
        assert_eq!((same.matched, same.modified), (1, 0));

        let changed = roles
            .replace_one(&Filter::id(1), doc(1, "B", 1), &ReplaceOptions::upsert())
            .await
            .unwrap();
        assert_eq!((changed.matched, changed.modified), (1, 1));
        assert_eq!(changed.written(), 1);
    }

    #[tokio::test]
    async fn memory_replace_upserts_from_filter_id() {
        let (_driver, roles) = roles().await;
        let body = Value::map(vec![(Value::from("name"), Value::from("new"))]);
        let result = roles
            .replace_one(&Filter::id(7), body, &ReplaceOptions::upsert())
            .await
            .unwrap();
        assert_eq!(result.upserted_id, Some(7));
        assert_eq!(result.written(), 1);
        assert_eq!(roles.count(&Filter::id(7)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn memory_replace_by_id_in_large_collection() {
        let (_driver, roles) = roles().await;
        let docs: Vec<_> = (1..=500).map(|id| doc(id, "x", id)).collect();
        roles.insert_many(docs, &InsertManyOptions::default()).await.unwrap();

        let hit = roles
            .replace_one(&Filter::id(250), doc(250, "moved", 1), &ReplaceOptions::upsert())
            .await
            .unwrap();
        assert_eq!((hit.matched, hit.modified), (1, 1));
        let moved = roles.find(&Filter::eq("name", "moved"), &FindOptions::new()).await.unwrap();
        assert_eq!(moved, vec![doc(250, "moved", 1)]);

        // the id is present but the rest of the filter rejects it
        let guarded = Filter::id(300).and(Filter::eq("name", "nobody"));
        let miss = roles
            .replace_one(&guarded, doc(300, "y", 1), &ReplaceOptions::default())
            .await
            .unwrap();
        assert_eq!(miss.matched, 0);
        assert_eq!(roles.count(&Filter::eq("name", "y")).await.unwrap(), 0);

        let upserted = roles
            .replace_one(&Filter::id(501), doc(501, "new", 1), &ReplaceOptions::upsert())
            .await
            .unwrap();
        assert_eq!(upserted.upserted_id, Some(501));
        assert_eq!(roles.count(&Filter::All).await.unwrap(), 501);
    }

    #[tokio::test]
    async fn memory_replace_without_upsert_is_noop() {
        let (_driver, roles) = roles().await;
        let result = roles
            .replace_one(&Filter::id(7), doc(7, "x", 1), &ReplaceOptions::default())
            .await
            .unwrap();
        assert_eq!(result.matched, 0);
        assert_eq!(result.upserted_id, None);
        assert_eq!(roles.count(&Filter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn memory_replace_cannot_change_id() {
        let (_driver, roles) = roles().await;
        roles.insert_one(doc(1, "A", 1)).await.unwrap();
        let result = roles
            .replace_one(&Filter::id(1), doc(2, "A", 1), &ReplaceOptions::upsert())
            .await;
        assert!(matches!(result, Err(DriverError::InvalidDocument { .. })));
    }

    #[tokio::test]
    async fn memory_unacknowledged_writes_still_apply() {
        let server = InMemoryServer::new();
        let driver = server.driver("memory://local?w=0", "game").unwrap();
        let roles = driver.collection("roles").await.unwrap();

        let result = roles
            .replace_one(&Filter::id(1), doc(1, "A", 1), &ReplaceOptions::upsert())
            .await
            .unwrap();
        assert!(!result.acknowledged);
        assert_eq!(roles.count(&Filter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn memory_insert_many_unordered_continues() {
        let (_driver, roles) = roles().await;
        roles.insert_one(doc(2, "taken", 1)).await.unwrap();

        let batch = vec![doc(1, "a", 1), doc(2, "dup", 1), doc(3, "c", 1)];
        let result = roles
            .insert_many(batch, &InsertManyOptions::unordered())
            .await
            .unwrap();
        assert_eq!(result.inserted_ids, vec![1, 3]);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 1);
        assert!(!result.is_complete());
    }

    #[tokio::test]
    async fn memory_insert_many_ordered_stops() {
        let (_driver, roles) = roles().await;
        roles.insert_one(doc(2, "taken", 1)).await.unwrap();

        let batch = vec![doc(1, "a", 1), doc(2, "dup", 1), doc(3, "c", 1)];
        let result = roles
            .insert_many(batch, &InsertManyOptions::default())
            .await
            .unwrap();
        assert_eq!(result.inserted_ids, vec![1]);
        assert_eq!(roles.count(&Filter::All).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn memory_delete_one_and_many() {
        let (_driver, roles) = roles().await;
        for id in 1..=4 {
            roles.insert_one(doc(id, "x", id)).await.unwrap();
        }
        assert_eq!(roles.delete_one(&Filter::gt("level", 1i64)).await.unwrap(), 1);
        assert_eq!(roles.delete_many(&Filter::gt("level", 1i64)).await.unwrap(), 2);
        assert_eq!(roles.delete_one(&Filter::id(99)).await.unwrap(), 0);
        assert_eq!(roles.count(&Filter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn memory_index_lifecycle() {
        let (_driver, roles) = roles().await;
        let name = roles
            .create_index(IndexModel::new("level", SortDirection::Descending))
            .await
            .unwrap();
        assert_eq!(name, "level_-1");

        let again = roles
            .create_index(IndexModel::new("level", SortDirection::Descending))
            .await;
        assert!(matches!(again, Err(DriverError::IndexExists { .. })));

        assert_eq!(roles.list_indexes().await.unwrap().len(), 1);
        roles.drop_index("level_-1").await.unwrap();
        assert!(roles.list_indexes().await.unwrap().is_empty());
        assert!(matches!(
            roles.drop_index("level_-1").await,
            Err(DriverError::IndexNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn memory_drivers_share_server_state() {
        let server = InMemoryServer::new();
        let a = server.connect("memory://local", "game").await.unwrap();
        let b = server.connect("memory://local", "game").await.unwrap();
        let other = server.connect("memory://local", "other").await.unwrap();

        a.collection("roles")
            .await
            .unwrap()
            .insert_one(doc(1, "A", 1))
            .await
            .unwrap();

        let seen = b.collection("roles").await.unwrap();
        assert_eq!(seen.count(&Filter::All).await.unwrap(), 1);
        let isolated = other.collection("roles").await.unwrap();
        assert_eq!(isolated.count(&Filter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn memory_collections_listed_and_dropped() {
        let (driver, _roles) = roles().await;
        driver.collection("pets").await.unwrap();
        assert_eq!(
            driver.list_collections().await.unwrap(),
            vec!["pets".to_string(), "roles".to_string()]
        );
        driver.drop_collection("pets").await.unwrap();
        assert!(matches!(
            driver.drop_collection("pets").await,
            Err(DriverError::CollectionNotFound { .. })
        ));
        assert!(matches!(
            driver.collection("").await,
            Err(DriverError::InvalidName { .. })
        ));
    }

    #[tokio::test]
    async fn memory_close_is_idempotent_and_final() {
        let (driver, roles) = roles().await;
        driver.close().await.unwrap();
        driver.close().await.unwrap();
        assert!(driver.is_closed());

        assert_eq!(
            roles.count(&Filter::All).await.unwrap_err(),
            DriverError::Closed
        );
        assert!(matches!(
            driver.collection("roles").await,
            Err(DriverError::Closed)
        ));
    }

    #[tokio::test]
    async fn memory_stats_count_operations() {
        let (driver, roles) = roles().await;
        roles.insert_one(doc(1, "A", 1)).await.unwrap();
        roles
            .replace_one(&Filter::id(1), doc(1, "B", 1), &ReplaceOptions::upsert())
            .await
            .unwrap();
        roles.find(&Filter::All, &FindOptions::new()).await.unwrap();
        roles.delete_one(&Filter::id(1)).await.unwrap();

        let stats = driver.stats();
        assert_eq!(stats.writes(), 2);
        assert_eq!(stats.reads(), 1);
        assert_eq!(stats.deletes(), 1);
        assert!(stats.bytes_written() > 0);
    }

    #[tokio::test]
    async fn memory_nan_documents_are_rejected() {
        let (_driver, roles) = roles().await;
        let bad = Value::map(vec![
            (Value::from("id"), Value::Integer(1)),
            (Value::from("speed"), Value::Float(f64::NAN)),
        ]);
        assert!(matches!(
            roles.insert_one(bad).await,
            Err(DriverError::Codec(_))
        ));
    }
}
