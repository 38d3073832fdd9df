//! The add, rename, update, delete walkthrough for a single role.

use statedb_core::{Filter, UpdateOutcome};
use statedb_testkit::prelude::*;

#[tokio::test]
async fn role_lifecycle_walkthrough() {
    init_tracing();
    let store = TestStore::new();

    let mut role = RoleState::named(1, "A");
    store.add(&mut role).await.unwrap();
    assert_eq!(store.count::<RoleState>(Filter::All).await.unwrap(), 1);

    role.name = "B".to_string();
    assert_eq!(store.update(&mut role).await.unwrap(), UpdateOutcome::Saved);
    assert_eq!(store.count::<RoleState>(Filter::All).await.unwrap(), 1);

    let found = store
        .find_one::<RoleState>(Filter::id(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.name, "B");
    assert_eq!(found.meta.update_count(), 1);

    let removed = store.delete_where::<RoleState>(Filter::id(1)).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(store.count::<RoleState>(Filter::All).await.unwrap(), 0);
    assert_eq!(
        store
            .count_including_deleted::<RoleState>(Filter::All)
            .await
            .unwrap(),
        1
    );

    let snapshot = store.stats().snapshot();
    assert_eq!(snapshot.soft_deletes, 1);
    assert_eq!(snapshot.skipped_updates, 0);
}

#[tokio::test]
async fn hard_delete_bypasses_soft_delete() {
    let store = scenarios::populated_roles(6).await;

    let mut doomed: RoleState = store.load_state(1).await.unwrap();
    store.delete(&mut doomed).await.unwrap();

    // the raw path sees and removes soft-deleted documents too
    let removed = store
        .hard_delete_many::<RoleState>(Filter::lte("level", 3))
        .await
        .unwrap();
    assert_eq!(removed, 3);
    assert_eq!(store.count::<RoleState>(Filter::All).await.unwrap(), 3);
    assert_eq!(
        store
            .count_including_deleted::<RoleState>(Filter::All)
            .await
            .unwrap(),
        3
    );

    let one = store
        .hard_delete_one::<RoleState>(Filter::All)
        .await
        .unwrap();
    assert_eq!(one, 1);
    assert_eq!(store.stats().hard_deletes(), 4);
}

#[tokio::test]
async fn restart_reads_what_was_saved() {
    let store = TestStore::new();
    let mut bag = BagState::empty(3);
    bag.put(10, 5);
    bag.put(11, 1);
    store.add(&mut bag).await.unwrap();
    bag.put(10, 1);
    store.update(&mut bag).await.unwrap();

    store.close().await.unwrap();

    let restarted = store.reopen();
    let loaded: BagState = restarted.load_state(3).await.unwrap();
    assert_eq!(loaded.items.get(&10), Some(&6));
    assert_eq!(loaded.items.get(&11), Some(&1));
    assert_eq!(loaded.meta.update_count(), 1);
    assert_eq!(loaded.meta.update_time(), bag.meta.update_time());
}
