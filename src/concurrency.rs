//! Per-scope-group locking for callers sharing one store.

use crate::scope::ScopeGroup;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Lazily created mutex per scope group
#[derive(Debug, Default)]
pub struct ScopeLockManager {
    locks: Mutex<HashMap<ScopeGroup, Arc<Mutex<()>>>>,
}

impl ScopeLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for a scope group
    pub fn get_lock(&self, group: &ScopeGroup) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.entry(group.clone()).or_default().clone()
    }

    /// Run `f` while holding the locks of every group in `groups`.
    ///
    /// Groups are locked in sorted order, so two callers can never hold each
    /// other's next lock. Entries no other caller holds are dropped afterwards.
    pub fn with_groups<T>(&self, groups: &[ScopeGroup], f: impl FnOnce() -> T) -> T {
        let mut ordered: Vec<&ScopeGroup> = groups.iter().collect();
        ordered.sort();
        ordered.dedup();

        let result = {
            let handles: Vec<Arc<Mutex<()>>> = ordered.iter().map(|g| self.get_lock(g)).collect();
            let _guards: Vec<_> = handles.iter().map(|handle| handle.lock()).collect();
            f()
        };
        self.release(&ordered);
        result
    }

    /// Remove the entries of `groups` that only the map still references
    fn release(&self, groups: &[&ScopeGroup]) {
        let mut locks = self.locks.lock();
        for group in groups {
            if locks.get(*group).is_some_and(|handle| Arc::strong_count(handle) == 1) {
                locks.remove(*group);
            }
        }
    }

    /// Drop locks nobody holds or waits on
    pub fn prune(&self) -> usize {
        let mut locks = self.locks.lock();
        let before = locks.len();
        locks.retain(|_, handle| Arc::strong_count(handle) > 1);
        before - locks.len()
    }

    /// Number of groups with a lock entry
    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}
