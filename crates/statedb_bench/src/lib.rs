//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rand::Rng;
use statedb_testkit::{BagState, RoleState};

/// A bag holding `items` random item stacks.
pub fn random_bag(id: i64, items: usize) -> BagState {
    let mut rng = rand::thread_rng();
    let mut bag = BagState::empty(id);
    for _ in 0..items {
        bag.put(rng.gen_range(0..100_000), rng.gen_range(1..1_000));
    }
    bag
}

/// `count` roles with ids `1..=count` and random levels and gold.
pub fn random_roles(count: usize) -> Vec<RoleState> {
    let mut rng = rand::thread_rng();
    (1..=count as i64)
        .map(|id| {
            let mut role = RoleState::named(id, &format!("role-{id}")).with_level(rng.gen_range(1..100));
            role.gold = rng.gen_range(0..1_000_000);
            role
        })
        .collect()
}
