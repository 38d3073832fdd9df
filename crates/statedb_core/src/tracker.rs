//! Dirty detection by content fingerprint.
//!
//! A [`Fingerprint`] is the XXH3-128 hash of a state's canonical CBOR form.
//! Canonical encoding sorts map keys, so a state holding a `HashMap`
//! fingerprints the same regardless of iteration order.
//!
//! The fingerprint leaves out `update_time` and `update_count`. The update
//! path stamps those two fields itself after deciding to write, so a state
//! that was saved and not touched since stays clean.
//!
//! Collisions are accepted: two different contents hashing to the same value
//! make the tracker report "unchanged" and the write is skipped. At 128 bits
//! this is not expected to happen in practice.

use statedb_codec::{to_canonical_cbor, to_value, Value};
use tracing::error;
use xxhash_rust::xxh3::xxh3_128;

use crate::error::CoreResult;
use crate::state::{CacheState, UPDATE_COUNT_FIELD, UPDATE_TIME_FIELD};

/// 128-bit content hash of a state document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u128);

impl Fingerprint {
    /// Fingerprints a document, ignoring the update stamp fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the document has no canonical encoding (NaN).
    pub fn of(document: &Value) -> CoreResult<Self> {
        let bytes = match document {
            Value::Map(pairs) => {
                let stable = pairs
                    .iter()
                    .filter(|(key, _)| {
                        !matches!(key.as_text(), Some(UPDATE_TIME_FIELD | UPDATE_COUNT_FIELD))
                    })
                    .cloned()
                    .collect();
                to_canonical_cbor(&Value::Map(stable))?
            }
            other => to_canonical_cbor(other)?,
        };
        Ok(Self(xxh3_128(&bytes)))
    }

    /// The raw hash.
    pub fn as_u128(self) -> u128 {
        self.0
    }
}

/// Result of a dirty check.
///
/// Carries the freshly built document and its fingerprint so the write that
/// follows does not serialize the state a second time.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// Whether the state differs from its baseline (always true without one).
    pub changed: bool,
    /// Fingerprint of `document`.
    pub fingerprint: Fingerprint,
    /// The state's current document.
    pub document: Value,
}

/// Remembers the fingerprint of the last saved or loaded content.
///
/// A tracker without a baseline (a new state) reports every check as
/// changed, so the first save always writes.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    baseline: Option<Fingerprint>,
}

impl ChangeTracker {
    /// Sets the baseline: the loaded document's fingerprint, or `None` for a
    /// state that has never been persisted.
    pub fn attach(&mut self, baseline: Option<Fingerprint>) {
        self.baseline = baseline;
    }

    /// The current baseline.
    pub fn baseline(&self) -> Option<Fingerprint> {
        self.baseline
    }

    /// Serializes `state` and compares it against the baseline.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    pub fn check<S: CacheState>(&self, state: &S) -> CoreResult<ChangeSet> {
        let document = to_value(state)?;
        let fingerprint = Fingerprint::of(&document)?;
        let changed = self.baseline != Some(fingerprint);
        Ok(ChangeSet {
            changed,
            fingerprint,
            document,
        })
    }

    /// Adopts `fingerprint` as the new baseline after a persisted write.
    ///
    /// Saving content identical to the baseline means the caller wrote twice
    /// without a mutation in between. That is logged, not rejected.
    pub fn after_save(&mut self, fingerprint: Fingerprint, collection: &str, id: i64) {
        if self.baseline == Some(fingerprint) {
            error!(
                collection,
                id, "state saved with content identical to its last save"
            );
        }
        self.baseline = Some(fingerprint);
    }
}
