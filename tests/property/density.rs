//! Random operation sequences keep every scope group dense

use orderly::{
    Cascade, ChangeSet, Dependent, InMemoryRecordStore, Lifecycle, OrderingScope, RecordId,
    RecordStore, RelationScope, ScopeKey, ScopeRegistry, ScopeValue, ScopeValues,
};
use orderly::store::RecordQuery;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    CreateParent,
    CreateChild { parent: usize },
    MoveUp { child: usize },
    MoveDown { child: usize },
    MoveTop { child: usize },
    MoveBottom { child: usize },
    MoveAbove { child: usize, other: usize },
    MoveBelow { child: usize, other: usize },
    Reparent { child: usize, parent: Option<usize> },
    DestroyChild { child: usize },
    DestroyParent { parent: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::CreateParent),
        any::<usize>().prop_map(|parent| Op::CreateChild { parent }),
        any::<usize>().prop_map(|child| Op::MoveUp { child }),
        any::<usize>().prop_map(|child| Op::MoveDown { child }),
        any::<usize>().prop_map(|child| Op::MoveTop { child }),
        any::<usize>().prop_map(|child| Op::MoveBottom { child }),
        (any::<usize>(), any::<usize>()).prop_map(|(child, other)| Op::MoveAbove { child, other }),
        (any::<usize>(), any::<usize>()).prop_map(|(child, other)| Op::MoveBelow { child, other }),
        (any::<usize>(), any::<Option<usize>>()).prop_map(|(child, parent)| Op::Reparent { child, parent }),
        any::<usize>().prop_map(|child| Op::DestroyChild { child }),
        any::<usize>().prop_map(|parent| Op::DestroyParent { parent }),
    ]
}

fn registry(dependent: Dependent) -> ScopeRegistry {
    let mut registry = ScopeRegistry::new();
    registry.register(OrderingScope::global("parent").unwrap()).unwrap();
    registry
        .register(
            OrderingScope::new(
                "child",
                vec![ScopeKey::Relation(
                    RelationScope::new("parent", "parent").dependent(dependent),
                )],
            )
            .unwrap(),
        )
        .unwrap();
    registry
}

fn ids_of(store: &InMemoryRecordStore, kind: &str) -> Vec<RecordId> {
    store
        .find(&RecordQuery::new(kind, ScopeValues::new()))
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect()
}

fn pick(ids: &[RecordId], index: usize) -> Option<RecordId> {
    if ids.is_empty() {
        None
    } else {
        Some(ids[index % ids.len()])
    }
}

fn apply(lifecycle: &Lifecycle<'_>, store: &InMemoryRecordStore, op: &Op) {
    let parents = ids_of(store, "parent");
    let children = ids_of(store, "child");
    let engine = lifecycle.engine();
    let load = |id: RecordId| store.get(id).unwrap().unwrap();

    match *op {
        Op::CreateParent => {
            lifecycle.create("parent", ScopeValues::new()).unwrap();
        }
        Op::CreateChild { parent } => {
            let mut values = ScopeValues::new();
            if let Some(parent) = pick(&parents, parent) {
                values.insert("parent_id".to_string(), ScopeValue::Ref(parent));
            }
            lifecycle.create("child", values).unwrap();
        }
        Op::MoveUp { child } => {
            if let Some(id) = pick(&children, child) {
                engine.move_up(&mut load(id)).unwrap();
            }
        }
        Op::MoveDown { child } => {
            if let Some(id) = pick(&children, child) {
                engine.move_down(&mut load(id)).unwrap();
            }
        }
        Op::MoveTop { child } => {
            if let Some(id) = pick(&children, child) {
                engine.move_to_top(&mut load(id)).unwrap();
            }
        }
        Op::MoveBottom { child } => {
            if let Some(id) = pick(&children, child) {
                engine.move_to_bottom(&mut load(id)).unwrap();
            }
        }
        Op::MoveAbove { child, other } => {
            if let (Some(id), Some(other)) = (pick(&children, child), pick(&children, other)) {
                engine.move_above(&mut load(id), &load(other)).unwrap();
            }
        }
        Op::MoveBelow { child, other } => {
            if let (Some(id), Some(other)) = (pick(&children, child), pick(&children, other)) {
                engine.move_below(&mut load(id), &load(other)).unwrap();
            }
        }
        Op::Reparent { child, parent } => {
            if let Some(id) = pick(&children, child) {
                let previous = load(id);
                let target = parent
                    .and_then(|p| pick(&parents, p))
                    .map(ScopeValue::Ref)
                    .unwrap_or(ScopeValue::Null);
                let mut current = previous.clone().with_attribute("parent_id", target);
                let changes = ChangeSet::between(&previous, &current);
                lifecycle.save(&mut current, &changes).unwrap();
            }
        }
        Op::DestroyChild { child } => {
            if let Some(id) = pick(&children, child) {
                lifecycle.destroy(&load(id), &Cascade::none()).unwrap();
            }
        }
        Op::DestroyParent { parent } => {
            if let Some(id) = pick(&parents, parent) {
                lifecycle.destroy_cascading(&load(id), &Cascade::none()).unwrap();
            }
        }
    }
}

fn assert_dense(lifecycle: &Lifecycle<'_>) {
    for kind in ["parent", "child"] {
        let report = lifecycle.engine().verify_density(kind).unwrap();
        assert!(report.is_dense(), "{:?}", report);
    }
}

fn run_sequence(dependent: Dependent, ops: &[Op]) {
    let registry = registry(dependent);
    let store = InMemoryRecordStore::new();
    let lifecycle = Lifecycle::new(&registry, &store);
    for op in ops {
        apply(&lifecycle, &store, op);
        assert_dense(&lifecycle);
    }
}

/// Density holds after every step when children die with their parent
#[test]
fn test_density_with_destroy_cascade() {
    let mut runner = proptest::test_runner::TestRunner::default();
    runner
        .run(&prop::collection::vec(op_strategy(), 1..60), |ops| {
            run_sequence(Dependent::Destroy, &ops);
            Ok(())
        })
        .unwrap();
}

/// Density holds after every step when children are detached from their parent
#[test]
fn test_density_with_nullify_cascade() {
    let mut runner = proptest::test_runner::TestRunner::default();
    runner
        .run(&prop::collection::vec(op_strategy(), 1..60), |ops| {
            run_sequence(Dependent::Nullify, &ops);
            Ok(())
        })
        .unwrap();
}

/// Every move leaves the set of positions in the group unchanged
#[test]
fn test_moves_permute_positions() {
    let mut runner = proptest::test_runner::TestRunner::default();
    runner
        .run(
            &(2usize..12, prop::collection::vec((0usize..4, any::<usize>(), any::<usize>()), 1..30)),
            |(count, moves)| {
                let registry = registry(Dependent::Destroy);
                let store = InMemoryRecordStore::new();
                let lifecycle = Lifecycle::new(&registry, &store);
                for _ in 0..count {
                    lifecycle.create("parent", ScopeValues::new()).unwrap();
                }
                let ids = ids_of(&store, "parent");
                let engine = lifecycle.engine();

                for (kind, a, b) in moves {
                    let id = ids[a % ids.len()];
                    let other = store.get(ids[b % ids.len()]).unwrap().unwrap();
                    let mut record = store.get(id).unwrap().unwrap();
                    match kind {
                        0 => engine.move_above(&mut record, &other).unwrap(),
                        1 => engine.move_below(&mut record, &other).unwrap(),
                        2 => engine.move_to_top(&mut record).unwrap(),
                        _ => engine.move_to_bottom(&mut record).unwrap(),
                    };
                    let mut positions: Vec<_> = ids_of(&store, "parent")
                        .into_iter()
                        .map(|id| store.get(id).unwrap().unwrap().position)
                        .collect();
                    positions.sort();
                    let expected: Vec<_> = (0..count as u32).map(Some).collect();
                    prop_assert_eq!(positions, expected);
                }
                Ok(())
            },
        )
        .unwrap();
}
