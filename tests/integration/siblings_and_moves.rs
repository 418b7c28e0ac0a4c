//! Sibling accessors and explicit moves over one global scope group

use crate::integration::test_utils::{order, position, registry, reload, InstrumentedStore};
use orderly::{
    Dependent, InMemoryRecordStore, Lifecycle, OrderingError, RecordId, RecordStore, ScopeRegistry,
    ScopeValues,
};

struct Fixture {
    registry: ScopeRegistry,
    store: InMemoryRecordStore,
}

impl Fixture {
    /// Three parents created in order, at positions 0, 1, 2
    fn new() -> (Self, [RecordId; 3]) {
        let fixture = Fixture {
            registry: registry(Dependent::Destroy),
            store: InMemoryRecordStore::new(),
        };
        let ids = {
            let lifecycle = fixture.lifecycle();
            [0, 1, 2].map(|_| lifecycle.create("parent", ScopeValues::new()).unwrap().id)
        };
        (fixture, ids)
    }

    fn lifecycle(&self) -> Lifecycle<'_> {
        Lifecycle::new(&self.registry, &self.store)
    }

    fn order(&self) -> Vec<RecordId> {
        order(&self.store, "parent", ScopeValues::new())
    }

    fn positions(&self, ids: &[RecordId]) -> Vec<Option<u32>> {
        ids.iter().map(|id| position(&self.store, *id)).collect()
    }
}

fn ids(records: Vec<orderly::OrderedRecord>) -> Vec<RecordId> {
    records.into_iter().map(|r| r.id).collect()
}

#[test]
fn lower_siblings_are_the_records_after() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let lower = lifecycle.engine().lower_siblings(&reload(&f.store, s1)).unwrap();
    assert_eq!(ids(lower.fetch().unwrap()), vec![s2, s3]);
}

#[test]
fn higher_siblings_are_the_records_before() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let higher = lifecycle.engine().higher_siblings(&reload(&f.store, s3)).unwrap();
    assert_eq!(ids(higher.fetch().unwrap()), vec![s1, s2]);
}

#[test]
fn highest_and_lowest_sibling() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let middle = reload(&f.store, s2);
    assert_eq!(lifecycle.engine().highest_sibling(&middle).unwrap().unwrap().id, s1);
    assert_eq!(lifecycle.engine().lowest_sibling(&middle).unwrap().unwrap().id, s3);
}

#[test]
fn top_and_bottom_predicates() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let engine = lifecycle.engine();
    assert!(engine.at_top(&reload(&f.store, s1)).unwrap());
    assert!(!engine.at_top(&reload(&f.store, s2)).unwrap());
    assert!(engine.at_bottom(&reload(&f.store, s3)).unwrap());
    assert!(!engine.at_bottom(&reload(&f.store, s2)).unwrap());
}

#[test]
fn unpositioned_record_has_no_sibling_range() {
    let (f, _) = Fixture::new();
    let lifecycle = f.lifecycle();
    let loose = orderly::OrderedRecord::new(RecordId::new(999), "parent");
    assert!(matches!(
        lifecycle.engine().lower_siblings(&loose),
        Err(OrderingError::Unpositioned(_))
    ));
}

#[test]
fn move_to_top_rearranges_siblings() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let mut record = reload(&f.store, s3);
    assert!(lifecycle.engine().move_to_top(&mut record).unwrap());

    assert_eq!(f.order(), vec![s3, s1, s2]);
    assert_eq!(f.positions(&[s3, s1, s2]), vec![Some(0), Some(1), Some(2)]);
    assert_eq!(record.position, Some(0));
}

#[test]
fn move_to_bottom_rearranges_siblings() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let mut record = reload(&f.store, s1);
    assert!(lifecycle.engine().move_to_bottom(&mut record).unwrap());

    assert_eq!(f.order(), vec![s2, s3, s1]);
    assert_eq!(f.positions(&[s2, s3, s1]), vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn move_up_swaps_with_record_above() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let mut record = reload(&f.store, s3);
    assert!(lifecycle.engine().move_up(&mut record).unwrap());

    assert_eq!(f.order(), vec![s1, s3, s2]);
    assert_eq!(f.positions(&[s1, s3, s2]), vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn move_down_swaps_with_record_below() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let mut record = reload(&f.store, s1);
    assert!(lifecycle.engine().move_down(&mut record).unwrap());

    assert_eq!(f.order(), vec![s2, s1, s3]);
    assert_eq!(f.positions(&[s2, s1, s3]), vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn move_up_then_down_restores_order() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let mut record = reload(&f.store, s2);
    assert!(lifecycle.engine().move_up(&mut record).unwrap());
    assert!(lifecycle.engine().move_down(&mut record).unwrap());
    assert_eq!(f.order(), vec![s1, s2, s3]);
}

#[test]
fn boundary_moves_do_nothing() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let engine = lifecycle.engine();

    assert!(!engine.move_up(&mut reload(&f.store, s1)).unwrap());
    assert!(!engine.move_down(&mut reload(&f.store, s3)).unwrap());
    assert!(engine.move_to_top(&mut reload(&f.store, s1)).unwrap());
    assert!(engine.move_to_bottom(&mut reload(&f.store, s3)).unwrap());
    assert_eq!(f.order(), vec![s1, s2, s3]);
}

#[test]
fn move_above_from_higher_position() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let mut record = reload(&f.store, s1);
    assert!(lifecycle.engine().move_above(&mut record, &reload(&f.store, s3)).unwrap());

    assert_eq!(f.order(), vec![s2, s1, s3]);
    assert_eq!(f.positions(&[s2, s1, s3]), vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn move_above_from_lower_position() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let mut record = reload(&f.store, s3);
    assert!(lifecycle.engine().move_above(&mut record, &reload(&f.store, s2)).unwrap());

    assert_eq!(f.order(), vec![s1, s3, s2]);
    assert_eq!(f.positions(&[s1, s3, s2]), vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn move_above_first_record() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let mut record = reload(&f.store, s3);
    assert!(lifecycle.engine().move_above(&mut record, &reload(&f.store, s1)).unwrap());
    assert_eq!(f.order(), vec![s3, s1, s2]);
}

#[test]
fn move_below_from_higher_position() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let mut record = reload(&f.store, s1);
    assert!(lifecycle.engine().move_below(&mut record, &reload(&f.store, s2)).unwrap());

    assert_eq!(f.order(), vec![s2, s1, s3]);
    assert_eq!(f.positions(&[s2, s1, s3]), vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn move_below_from_lower_position() {
    let (f, [s1, s2, s3]) = Fixture::new();
    let lifecycle = f.lifecycle();
    let mut record = reload(&f.store, s3);
    assert!(lifecycle.engine().move_below(&mut record, &reload(&f.store, s1)).unwrap());

    assert_eq!(f.order(), vec![s1, s3, s2]);
    assert_eq!(f.positions(&[s1, s3, s2]), vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn move_up_touches_only_two_records() {
    let registry = registry(Dependent::Destroy);
    let store = InstrumentedStore::new();
    let lifecycle = Lifecycle::new(&registry, &store);
    let ids: Vec<RecordId> = (0..5)
        .map(|_| lifecycle.create("parent", ScopeValues::new()).unwrap().id)
        .collect();

    store.reset_increments();
    let mut record = reload(&store, ids[4]);
    assert!(lifecycle.engine().move_up(&mut record).unwrap());
    assert_eq!(store.increments(), 2);
}

#[test]
fn failed_save_after_range_move_is_reported() {
    let registry = registry(Dependent::Destroy);
    let store = InstrumentedStore::new();
    let lifecycle = Lifecycle::new(&registry, &store);
    let ids: Vec<RecordId> = (0..3)
        .map(|_| lifecycle.create("parent", ScopeValues::new()).unwrap().id)
        .collect();

    store.fail_put_of(ids[2]);
    let mut record = reload(&store, ids[2]);
    let result = lifecycle.engine().move_above(&mut record, &reload(&store, ids[0]));
    assert!(matches!(result, Err(OrderingError::StorageError(_))));

    // Sibling shifts made before the failing save stay applied
    assert_eq!(position(&store, ids[0]), Some(1));
    assert_eq!(position(&store, ids[1]), Some(2));
    assert_eq!(position(&store, ids[2]), Some(2));
}
