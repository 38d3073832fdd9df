//! Sample game-state types.
//!
//! Each type records the lifecycle hooks the store calls on it, so tests can
//! assert when and how often `after_load` and `after_save` ran.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use statedb_core::{CacheState, StateMeta};

/// Hook calls observed on a state instance. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookLog {
    /// Number of `after_load` calls.
    pub loads: u32,
    /// The `is_new` argument of the last `after_load` call.
    pub last_is_new: Option<bool>,
    /// Number of `after_save` calls.
    pub saves: u32,
}

impl HookLog {
    fn loaded(&mut self, is_new: bool) {
        self.loads += 1;
        self.last_is_new = Some(is_new);
    }

    fn saved(&mut self) {
        self.saves += 1;
    }
}

/// A player role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleState {
    /// Identity and audit fields.
    #[serde(flatten)]
    pub meta: StateMeta,
    /// Display name.
    pub name: String,
    /// Character level.
    pub level: u32,
    /// Currency balance.
    pub gold: i64,
    /// Hook calls.
    #[serde(skip)]
    pub hooks: HookLog,
}

impl RoleState {
    /// A level 1 role with the given id and name.
    pub fn named(id: i64, name: &str) -> Self {
        Self {
            meta: StateMeta::new(id),
            name: name.to_string(),
            level: 1,
            ..Self::default()
        }
    }

    /// Sets the level.
    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }
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
        self.hooks.loaded(is_new);
    }

    fn after_save(&mut self) {
        self.hooks.saved();
    }
}

/// A role's item bag, keyed by item id.
///
/// The `HashMap` makes serialization order vary between instances with the
/// same content, which the fingerprint has to see through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BagState {
    /// Identity and audit fields.
    #[serde(flatten)]
    pub meta: StateMeta,
    /// Item id to count.
    pub items: HashMap<i32, u32>,
    /// Hook calls.
    #[serde(skip)]
    pub hooks: HookLog,
}

impl BagState {
    /// An empty bag.
    pub fn empty(id: i64) -> Self {
        Self {
            meta: StateMeta::new(id),
            ..Self::default()
        }
    }

    /// Adds `count` of `item`.
    pub fn put(&mut self, item: i32, count: u32) {
        *self.items.entry(item).or_default() += count;
    }
}

impl CacheState for BagState {
    const COLLECTION: &'static str = "BagState";

    fn meta(&self) -> &StateMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut StateMeta {
        &mut self.meta
    }

    fn after_load(&mut self, is_new: bool) {
        // a fresh bag starts with the welcome gift
        if is_new && self.items.is_empty() {
            self.items.insert(STARTER_ITEM, 1);
        }
        self.hooks.loaded(is_new);
    }

    fn after_save(&mut self) {
        self.hooks.saved();
    }
}

/// Item id given to every new bag on first load.
pub const STARTER_ITEM: i32 = 1001;

/// A pet owned by a role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PetState {
    /// Identity and audit fields.
    #[serde(flatten)]
    pub meta: StateMeta,
    /// Owning role id.
    pub owner_id: i64,
    /// Species tag.
    pub species: String,
    /// Pet level.
    pub level: u32,
    /// Hook calls.
    #[serde(skip)]
    pub hooks: HookLog,
}

impl PetState {
    /// A level 1 pet.
    pub fn new(id: i64, owner_id: i64, species: &str) -> Self {
        Self {
            meta: StateMeta::new(id),
            owner_id,
            species: species.to_string(),
            level: 1,
            ..Self::default()
        }
    }
}

impl CacheState for PetState {
    const COLLECTION: &'static str = "PetState";

    fn meta(&self) -> &StateMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut StateMeta {
        &mut self.meta
    }

    fn after_load(&mut self, is_new: bool) {
        self.hooks.loaded(is_new);
    }

    fn after_save(&mut self) {
        self.hooks.saved();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statedb_codec::to_value;

    #[test]
    fn hooks_are_not_persisted() {
        let mut role = RoleState::named(1, "A");
        role.hooks.saves = 3;
        let doc = to_value(&role).unwrap();
        assert!(doc.get("hooks").is_none());
        assert_eq!(doc.get("name").and_then(|v| v.as_text()), Some("A"));
    }

    #[test]
    fn bag_put_accumulates() {
        let mut bag = BagState::empty(1);
        bag.put(7, 2);
        bag.put(7, 3);
        assert_eq!(bag.items[&7], 5);
    }
}
