//! Ordering over the sled-backed record store

use crate::integration::test_utils::{child_of, order, registry};
use orderly::{
    Cascade, Dependent, Lifecycle, OrderingApi, RecordId, RecordStore, ScopeValues, SledRecordStore,
};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn positions_survive_reopening_the_store() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry(Dependent::Destroy);

    let ids: Vec<RecordId> = {
        let store = SledRecordStore::new(temp_dir.path()).unwrap();
        let lifecycle = Lifecycle::new(&registry, &store);
        let ids: Vec<RecordId> = (0..3)
            .map(|_| lifecycle.create("parent", ScopeValues::new()).unwrap().id)
            .collect();
        let mut last = store.get(ids[2]).unwrap().unwrap();
        lifecycle.engine().move_to_top(&mut last).unwrap();
        store.flush().unwrap();
        ids
    };

    let store = SledRecordStore::new(temp_dir.path()).unwrap();
    assert_eq!(
        order(&store, "parent", ScopeValues::new()),
        vec![ids[2], ids[0], ids[1]]
    );
    // Ids keep increasing across reopen
    let next = store.next_id().unwrap();
    assert!(ids.iter().all(|id| *id != next));
}

#[test]
fn cascade_over_sled_store() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry(Dependent::Destroy);
    let store = SledRecordStore::new(temp_dir.path()).unwrap();
    let lifecycle = Lifecycle::new(&registry, &store);

    let parent = lifecycle.create("parent", ScopeValues::new()).unwrap();
    let survivor = lifecycle.create("parent", ScopeValues::new()).unwrap();
    for _ in 0..3 {
        lifecycle.create("child", child_of(parent.id)).unwrap();
    }

    lifecycle.destroy_cascading(&parent, &Cascade::none()).unwrap();
    assert_eq!(store.list_all().unwrap().len(), 1);
    assert_eq!(store.get(survivor.id).unwrap().unwrap().position, Some(0));
}

#[test]
fn api_over_sled_store_stays_dense() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SledRecordStore::new(temp_dir.path()).unwrap());
    let api = OrderingApi::new(store.clone(), Arc::new(registry(Dependent::Nullify)));

    let parents: Vec<RecordId> = (0..2)
        .map(|_| api.create("parent", ScopeValues::new()).unwrap().id)
        .collect();
    let children: Vec<RecordId> = (0..6)
        .map(|i| api.create("child", child_of(parents[i % 2])).unwrap().id)
        .collect();

    api.move_below(children[0], children[4]).unwrap();
    api.update(children[2], child_of(parents[1])).unwrap();
    api.destroy(parents[0]).unwrap();

    assert!(api.verify("parent").unwrap().is_dense());
    assert!(api.verify("child").unwrap().is_dense());
    assert_eq!(order(&*store, "child", child_of(parents[1])).len(), 4);
}
