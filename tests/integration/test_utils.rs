//! Shared test utilities for integration tests
//!
//! Scope registries mirroring a parent/child setup, a store wrapper that counts
//! and injects failures, and isolation for XDG environment variables.

use orderly::{
    Dependent, InMemoryRecordStore, OrderedRecord, OrderingScope, Position, RecordId, RecordStore,
    RelationScope, ScopeKey, ScopeRegistry, ScopeValue, ScopeValues, StorageError,
};
use orderly::store::RecordQuery;
use parking_lot::Mutex as PlMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

/// `parent` kinds share one global group; `child` kinds are grouped by parent
pub fn registry(dependent: Dependent) -> ScopeRegistry {
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

pub fn child_of(parent: RecordId) -> ScopeValues {
    let mut values = ScopeValues::new();
    values.insert("parent_id".to_string(), ScopeValue::Ref(parent));
    values
}

pub fn reload(store: &dyn RecordStore, id: RecordId) -> OrderedRecord {
    store.get(id).unwrap().unwrap()
}

pub fn position(store: &dyn RecordStore, id: RecordId) -> Option<Position> {
    reload(store, id).position
}

/// Ids of `kind` records in `scope`, in position order
pub fn order(store: &dyn RecordStore, kind: &str, scope: ScopeValues) -> Vec<RecordId> {
    store
        .find(&RecordQuery::new(kind, scope))
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect()
}

/// In-memory store that counts position increments and can fail writes
#[derive(Default)]
pub struct InstrumentedStore {
    inner: InMemoryRecordStore,
    increments: AtomicUsize,
    failing_put: PlMutex<Option<RecordId>>,
}

impl InstrumentedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increments(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }

    pub fn reset_increments(&self) {
        self.increments.store(0, Ordering::SeqCst);
    }

    /// Make every `put` of `id` fail
    pub fn fail_put_of(&self, id: RecordId) {
        *self.failing_put.lock() = Some(id);
    }
}

impl RecordStore for InstrumentedStore {
    fn get(&self, id: RecordId) -> Result<Option<OrderedRecord>, StorageError> {
        self.inner.get(id)
    }

    fn put(&self, record: &OrderedRecord) -> Result<(), StorageError> {
        if *self.failing_put.lock() == Some(record.id) {
            return Err(StorageError::Backend("injected write failure".to_string()));
        }
        self.inner.put(record)
    }

    fn remove(&self, id: RecordId) -> Result<Option<OrderedRecord>, StorageError> {
        self.inner.remove(id)
    }

    fn find(&self, query: &RecordQuery) -> Result<Vec<OrderedRecord>, StorageError> {
        self.inner.find(query)
    }

    fn inc_position(&self, id: RecordId, delta: i32) -> Result<Position, StorageError> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        self.inner.inc_position(id, delta)
    }

    fn next_id(&self) -> Result<RecordId, StorageError> {
        self.inner.next_id()
    }
}

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Environment variable state to restore after test
struct EnvState {
    vars: Vec<(&'static str, Option<String>)>,
}

impl EnvState {
    fn capture(names: &[&'static str]) -> Self {
        Self {
            vars: names.iter().map(|name| (*name, std::env::var(name).ok())).collect(),
        }
    }

    fn restore(self) {
        for (name, value) in self.vars {
            match value {
                Some(orig) => std::env::set_var(name, orig),
                None => std::env::remove_var(name),
            }
        }
    }
}

/// Run `f` with `XDG_CONFIG_HOME` and `HOME` pointing into `test_dir`.
///
/// Also clears `ORDERLY_ENV`; `env` entries are set for the duration of `f`.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, env: &[(&'static str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let mut names = vec!["HOME", "XDG_CONFIG_HOME", "ORDERLY_ENV"];
    names.extend(env.iter().map(|(name, _)| *name));
    let env_state = EnvState::capture(&names);

    let test_config_home = test_dir.path().join("xdg");
    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_config_home).unwrap();
    std::fs::create_dir_all(&test_home).unwrap();

    std::env::set_var("HOME", &test_home);
    std::env::set_var("XDG_CONFIG_HOME", &test_config_home);
    std::env::remove_var("ORDERLY_ENV");
    for (name, value) in env {
        std::env::set_var(name, value);
    }

    let result = f();
    env_state.restore();
    result
}
