//! Ordering API
//!
//! Id-based entry points over the lifecycle hooks and the position engine. Every
//! mutating call loads fresh records and holds the locks of all scope groups it
//! touches, so concurrent callers sharing one `OrderingApi` keep groups dense.

use crate::changes::ChangeSet;
use crate::concurrency::ScopeLockManager;
use crate::engine::DensityReport;
use crate::error::{OrderingError, StorageError};
use crate::lifecycle::{settle, DestroySummary, Lifecycle};
use crate::scope::{Cascade, Dependent, ScopeGroup, ScopeRegistry};
use crate::siblings::SiblingsResolver;
use crate::store::{RecordQuery, RecordStore};
use crate::types::{OrderedRecord, RecordId, ScopeValue, ScopeValues};
use std::sync::Arc;
use tracing::debug;

/// Explicit reordering request for `OrderingApi::move_record`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Up,
    Down,
    Top,
    Bottom,
    Above(RecordId),
    Below(RecordId),
}

/// Ordering service shared between callers
pub struct OrderingApi {
    /// Record store holding every ordered record
    store: Arc<dyn RecordStore + Send + Sync>,
    /// Scope declarations per kind
    registry: Arc<ScopeRegistry>,
    /// Scope group locks
    locks: Arc<ScopeLockManager>,
}

impl OrderingApi {
    pub fn new(store: Arc<dyn RecordStore + Send + Sync>, registry: Arc<ScopeRegistry>) -> Self {
        Self::with_lock_manager(store, registry, Arc::new(ScopeLockManager::new()))
    }

    /// Share a lock manager with other services over the same store
    pub fn with_lock_manager(
        store: Arc<dyn RecordStore + Send + Sync>,
        registry: Arc<ScopeRegistry>,
        locks: Arc<ScopeLockManager>,
    ) -> Self {
        Self {
            store,
            registry,
            locks,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore + Send + Sync> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ScopeRegistry> {
        &self.registry
    }

    pub fn lock_manager(&self) -> &Arc<ScopeLockManager> {
        &self.locks
    }

    fn lifecycle(&self) -> Lifecycle<'_> {
        Lifecycle::new(&self.registry, &*self.store)
    }

    /// Create a record at the end of its scope group
    ///
    /// # Arguments
    /// * `kind` - Registered record kind
    /// * `attributes` - Initial attributes, scope attributes included
    pub fn create(&self, kind: &str, attributes: ScopeValues) -> Result<OrderedRecord, OrderingError> {
        let scope = self.registry.get(kind)?;
        let mut probe = OrderedRecord::new(RecordId::new(0), kind);
        probe.attributes = attributes.clone();
        let group = scope.group_of(&probe);

        self.locked(
            |_| Ok(vec![group.clone()]),
            move |lifecycle| lifecycle.create(kind, attributes),
        )
    }

    /// Apply attribute changes and save.
    ///
    /// A changed scope attribute moves the record to the end of its new group
    /// and closes the gap in the old one.
    pub fn update(&self, id: RecordId, attributes: ScopeValues) -> Result<OrderedRecord, OrderingError> {
        let apply = |record: &OrderedRecord| {
            let mut updated = record.clone();
            for (name, value) in &attributes {
                updated.set_attribute(name.clone(), value.clone());
            }
            updated
        };

        self.locked(
            |_| {
                let current = self.get(id)?;
                Ok(vec![self.group_of(&current)?, self.group_of(&apply(&current))?])
            },
            |lifecycle| {
                let previous = self.get(id)?;
                let mut updated = apply(&previous);
                let changes = ChangeSet::between(&previous, &updated);
                lifecycle.save(&mut updated, &changes)?;
                Ok(updated)
            },
        )
    }

    pub fn get(&self, id: RecordId) -> Result<OrderedRecord, OrderingError> {
        Ok(self
            .store
            .get(id)?
            .ok_or(StorageError::RecordNotFound(id))?)
    }

    /// Records of `kind` matching `scope`, ascending by position
    pub fn list(&self, kind: &str, scope: ScopeValues) -> Result<Vec<OrderedRecord>, OrderingError> {
        self.registry.get(kind)?;
        Ok(self.store.find(&RecordQuery::new(kind, scope))?)
    }

    /// The record's whole scope group, itself included
    pub fn siblings_and_self(&self, id: RecordId) -> Result<Vec<OrderedRecord>, OrderingError> {
        let record = self.get(id)?;
        let lifecycle = self.lifecycle();
        let siblings = lifecycle.engine().resolver().siblings_and_self(&record)?;
        Ok(siblings.fetch()?)
    }

    /// Destroy a record and cascade to its dependents
    pub fn destroy(&self, id: RecordId) -> Result<DestroySummary, OrderingError> {
        self.locked(
            |lifecycle| {
                let record = self.get(id)?;
                let mut groups = Vec::new();
                self.cascade_groups(lifecycle, &record, &mut groups)?;
                Ok(groups)
            },
            |lifecycle| {
                let record = self.get(id)?;
                lifecycle.destroy_cascading(&record, &Cascade::none())
            },
        )
    }

    pub fn move_up(&self, id: RecordId) -> Result<bool, OrderingError> {
        self.move_record(id, Move::Up)
    }

    pub fn move_down(&self, id: RecordId) -> Result<bool, OrderingError> {
        self.move_record(id, Move::Down)
    }

    pub fn move_to_top(&self, id: RecordId) -> Result<bool, OrderingError> {
        self.move_record(id, Move::Top)
    }

    pub fn move_to_bottom(&self, id: RecordId) -> Result<bool, OrderingError> {
        self.move_record(id, Move::Bottom)
    }

    pub fn move_above(&self, id: RecordId, other: RecordId) -> Result<bool, OrderingError> {
        self.move_record(id, Move::Above(other))
    }

    pub fn move_below(&self, id: RecordId, other: RecordId) -> Result<bool, OrderingError> {
        self.move_record(id, Move::Below(other))
    }

    /// Run one reordering operation under the record's group lock
    pub fn move_record(&self, id: RecordId, request: Move) -> Result<bool, OrderingError> {
        let other_id = match request {
            Move::Above(other) | Move::Below(other) => Some(other),
            _ => None,
        };

        self.locked(
            |_| {
                let mut groups = vec![self.group_of(&self.get(id)?)?];
                if let Some(other) = other_id {
                    groups.push(self.group_of(&self.get(other)?)?);
                }
                Ok(groups)
            },
            |lifecycle| {
                let engine = lifecycle.engine();
                let mut record = self.get(id)?;
                match request {
                    Move::Up => engine.move_up(&mut record),
                    Move::Down => engine.move_down(&mut record),
                    Move::Top => engine.move_to_top(&mut record),
                    Move::Bottom => engine.move_to_bottom(&mut record),
                    Move::Above(other) => engine.move_above(&mut record, &self.get(other)?),
                    Move::Below(other) => engine.move_below(&mut record, &self.get(other)?),
                }
            },
        )
    }

    /// Density scan of every group of `kind`
    pub fn verify(&self, kind: &str) -> Result<DensityReport, OrderingError> {
        self.lifecycle().engine().verify_density(kind)
    }

    fn group_of(&self, record: &OrderedRecord) -> Result<ScopeGroup, OrderingError> {
        Ok(self.registry.get(&record.kind)?.group_of(record))
    }

    /// Every group a cascading destroy of `record` can touch
    fn cascade_groups(
        &self,
        lifecycle: &Lifecycle<'_>,
        record: &OrderedRecord,
        groups: &mut Vec<ScopeGroup>,
    ) -> Result<(), OrderingError> {
        groups.push(self.group_of(record)?);
        for settlement in settle(&lifecycle.dependents(record)?) {
            let child = &settlement.record;
            match settlement.action {
                Dependent::Destroy => self.cascade_groups(lifecycle, child, groups)?,
                Dependent::Delete => groups.push(self.group_of(child)?),
                Dependent::Nullify => {
                    groups.push(self.group_of(child)?);
                    let mut nullified = child.clone();
                    for key in &settlement.foreign_keys {
                        nullified.set_attribute(key.clone(), ScopeValue::Null);
                    }
                    groups.push(self.group_of(&nullified)?);
                }
                Dependent::Restrict => {}
            }
        }
        Ok(())
    }

    /// Run `op` holding the locks of the groups `plan` returns.
    ///
    /// The plan is recomputed once the locks are held; if another caller moved a
    /// record between groups in the meantime, the locks are released and the
    /// whole sequence starts over.
    fn locked<T>(
        &self,
        plan: impl Fn(&Lifecycle<'_>) -> Result<Vec<ScopeGroup>, OrderingError>,
        op: impl FnOnce(&Lifecycle<'_>) -> Result<T, OrderingError>,
    ) -> Result<T, OrderingError> {
        let lifecycle = self.lifecycle();
        let mut op = Some(op);
        loop {
            let mut groups = plan(&lifecycle)?;
            groups.sort();
            groups.dedup();

            let outcome = self.locks.with_groups(&groups, || -> Result<Option<T>, OrderingError> {
                let mut current = plan(&lifecycle)?;
                current.sort();
                current.dedup();
                if current != groups {
                    return Ok(None);
                }
                match op.take() {
                    Some(op) => op(&lifecycle).map(Some),
                    None => Ok(None),
                }
            })?;

            if let Some(value) = outcome {
                return Ok(value);
            }
            debug!(groups = groups.len(), "scope groups changed while locking, retrying");
        }
    }
}
