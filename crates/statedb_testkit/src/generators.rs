//! Property-based test generators using proptest.
//!
//! Provides strategies for generating game states and mutation sequences.

use proptest::prelude::*;
use statedb_core::StateMeta;

use crate::states::{BagState, RoleState};

/// Strategy for state ids. Positive, as an id generator would hand out.
pub fn state_id_strategy() -> impl Strategy<Value = i64> {
    1i64..1_000_000
}

/// Strategy for role names.
pub fn role_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,15}").expect("Invalid regex")
}

/// Strategy for a role that was never persisted.
pub fn role_strategy() -> impl Strategy<Value = RoleState> {
    (
        state_id_strategy(),
        role_name_strategy(),
        1u32..100,
        any::<i32>(),
    )
        .prop_map(|(id, name, level, gold)| RoleState {
            meta: StateMeta::new(id),
            name,
            level,
            gold: i64::from(gold),
            ..RoleState::default()
        })
}

/// Strategy for bag contents.
pub fn bag_items_strategy() -> impl Strategy<Value = Vec<(i32, u32)>> {
    prop::collection::vec((0i32..10_000, 1u32..1_000), 0..32)
}

/// Strategy for a bag that was never persisted.
pub fn bag_strategy() -> impl Strategy<Value = BagState> {
    (state_id_strategy(), bag_items_strategy()).prop_map(|(id, items)| {
        let mut bag = BagState::empty(id);
        for (item, count) in items {
            bag.put(item, count);
        }
        bag
    })
}

/// One in-memory mutation an actor might apply between updates.
#[derive(Debug, Clone)]
pub enum RoleMutation {
    /// Leaves the state as it is.
    Touch,
    /// Renames the role.
    Rename(String),
    /// Adds to the level.
    LevelUp(u32),
    /// Adds (or subtracts) gold.
    Earn(i32),
}

impl RoleMutation {
    /// Applies the mutation. Returns whether the content changed.
    pub fn apply(&self, role: &mut RoleState) -> bool {
        match self {
            Self::Touch => false,
            Self::Rename(name) => {
                let changed = role.name != *name;
                role.name.clone_from(name);
                changed
            }
            Self::LevelUp(levels) => {
                let before = role.level;
                role.level = role.level.saturating_add(*levels);
                role.level != before
            }
            Self::Earn(amount) => {
                role.gold += i64::from(*amount);
                *amount != 0
            }
        }
    }
}

/// Strategy for a single mutation.
pub fn role_mutation_strategy() -> impl Strategy<Value = RoleMutation> {
    prop_oneof![
        2 => Just(RoleMutation::Touch),
        1 => role_name_strategy().prop_map(RoleMutation::Rename),
        1 => (0u32..5).prop_map(RoleMutation::LevelUp),
        1 => (-100i32..100).prop_map(RoleMutation::Earn),
    ]
}

/// Strategy for a sequence of mutations, one per actor tick.
pub fn role_mutations_strategy(max_len: usize) -> impl Strategy<Value = Vec<RoleMutation>> {
    prop::collection::vec(role_mutation_strategy(), 0..max_len)
}

/// Strategy for raw page requests, including out-of-range values.
pub fn page_request_strategy() -> impl Strategy<Value = (i64, i64)> {
    (-10i64..10, -10i64..30)
}
