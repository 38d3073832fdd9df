//! Entity kind to collection name registry.

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::state::CacheState;

#[derive(Debug, Clone, Copy)]
struct Registration {
    type_id: TypeId,
    type_name: &'static str,
}

/// Maps each [`CacheState`] type to its collection name.
///
/// A type is registered the first time it is resolved. A second type that
/// declares the same [`CacheState::COLLECTION`] is rejected, so two entity
/// kinds can never share (and overwrite) one collection.
#[derive(Debug, Default)]
pub struct CollectionResolver {
    by_name: RwLock<HashMap<&'static str, Registration>>,
}

impl CollectionResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collection name for `S`, registering it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CollectionConflict`] if another type already
    /// uses the name, or [`CoreError::InvalidOperation`] for an empty name.
    pub fn resolve<S: CacheState>(&self) -> CoreResult<&'static str> {
        let name = S::COLLECTION;
        let wanted = TypeId::of::<S>();

        if let Some(existing) = self.by_name.read().get(name).copied() {
            return Self::check(name, existing, wanted, type_name::<S>());
        }

        if name.is_empty() {
            return Err(CoreError::invalid_operation(format!(
                "{} declares an empty collection name",
                type_name::<S>()
            )));
        }

        let mut by_name = self.by_name.write();
        let existing = *by_name.entry(name).or_insert(Registration {
            type_id: wanted,
            type_name: type_name::<S>(),
        });
        Self::check(name, existing, wanted, type_name::<S>())
    }

    fn check(
        name: &'static str,
        existing: Registration,
        wanted: TypeId,
        requested: &'static str,
    ) -> CoreResult<&'static str> {
        if existing.type_id == wanted {
            Ok(name)
        } else {
            Err(CoreError::CollectionConflict {
                collection: name,
                existing: existing.type_name,
                requested,
            })
        }
    }

    /// Registered collection names, sorted.
    pub fn registered(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.by_name.read().keys().copied().collect();
        names.sort_unstable();
        names
    }
}
