//! Lifecycle Hooks
//!
//! Save and destroy entry points that keep scope groups dense: new records are
//! appended, records changing scope leave no gap behind, and destroyed records
//! close their gap unless their whole group is going away with a parent.

use crate::changes::ChangeSet;
use crate::engine::PositionEngine;
use crate::error::{OrderingError, StorageError};
use crate::scope::{Cascade, Dependent, RelationScope, ScopeRegistry, ScopeResolver};
use crate::siblings::{SiblingsResolver, StoreSiblingsResolver};
use crate::store::{RecordQuery, RecordStore};
use crate::types::{OrderedRecord, RecordId, ScopeValue, ScopeValues};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Records of one kind that reference a parent through a scope relation
#[derive(Debug, Clone)]
pub struct Dependents {
    pub kind: String,
    pub relation: RelationScope,
    pub records: Vec<OrderedRecord>,
}

/// How one dependent record is handled when its parent is destroyed
#[derive(Debug, Clone)]
pub struct Settlement {
    pub record: OrderedRecord,
    pub action: Dependent,
    /// Foreign keys cleared when the record is nullified
    pub foreign_keys: Vec<String>,
}

/// Collapse per-relation dependents into one settlement per record.
///
/// A record reached through several relations is settled once: `destroy` wins
/// over `delete`, which wins over `nullify`. Nullified records clear every
/// foreign key that pointed at the parent. `restrict` entries are skipped.
pub fn settle(dependents: &[Dependents]) -> Vec<Settlement> {
    fn rank(action: Dependent) -> u8 {
        match action {
            Dependent::Destroy => 3,
            Dependent::Delete => 2,
            Dependent::Nullify => 1,
            Dependent::Restrict => 0,
        }
    }

    let mut settlements: Vec<Settlement> = Vec::new();
    let mut index: HashMap<RecordId, usize> = HashMap::new();
    for group in dependents {
        let action = group.relation.inverse_dependent;
        if action == Dependent::Restrict {
            continue;
        }
        for record in &group.records {
            let slot = *index.entry(record.id).or_insert_with(|| {
                settlements.push(Settlement {
                    record: record.clone(),
                    action,
                    foreign_keys: Vec::new(),
                });
                settlements.len() - 1
            });
            let settlement = &mut settlements[slot];
            if rank(action) > rank(settlement.action) {
                settlement.action = action;
            }
            if action == Dependent::Nullify {
                settlement.foreign_keys.push(group.relation.foreign_key.clone());
            }
        }
    }
    settlements
}

/// What a cascading destroy did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DestroySummary {
    pub destroyed: Vec<RecordId>,
    pub nullified: Vec<RecordId>,
}

/// Save and destroy hooks on top of a PositionEngine
pub struct Lifecycle<'a, R = StoreSiblingsResolver<'a>> {
    engine: PositionEngine<'a, R>,
}

impl<'a> Lifecycle<'a> {
    pub fn new(registry: &'a ScopeRegistry, store: &'a dyn RecordStore) -> Self {
        Lifecycle {
            engine: PositionEngine::new(registry, store),
        }
    }
}

impl<'a, R: SiblingsResolver> Lifecycle<'a, R> {
    pub fn with_engine(engine: PositionEngine<'a, R>) -> Self {
        Lifecycle { engine }
    }

    pub fn engine(&self) -> &PositionEngine<'a, R> {
        &self.engine
    }

    /// Runs before every save.
    ///
    /// Appends new or scope-changed records to their group, then closes the
    /// gap a scope-changed record leaves in its former group.
    pub fn before_save(&self, record: &mut OrderedRecord, changes: &ChangeSet) -> Result<(), OrderingError> {
        let scope = self.engine.registry().get(&record.kind)?;
        let reposition = !scope.is_global() && !changes.is_new_record() && changes.scope_changed(&scope);

        self.engine.assign_default_position(record, changes)?;

        if reposition {
            let former_scope = changes.former_scope_values(&scope);
            self.reposition_former_siblings(record, &former_scope, changes)?;
        }
        Ok(())
    }

    fn reposition_former_siblings(
        &self,
        record: &OrderedRecord,
        former_scope: &ScopeValues,
        changes: &ChangeSet,
    ) -> Result<usize, OrderingError> {
        let former_position = match changes.former_position() {
            Some(position) => position,
            None => {
                warn!(
                    record = %record.id,
                    kind = %record.kind,
                    "scope changed on a record without a former position, closing gap from 0"
                );
                0
            }
        };

        let shifted = self
            .engine
            .resolver()
            .siblings(record, Some(former_scope))?
            .below(former_position)
            .each_inc(-1)?;
        debug!(record = %record.id, former_position, shifted, "closed gap in former scope group");
        Ok(shifted)
    }

    /// Run the save hooks, validate and write the record
    pub fn save(&self, record: &mut OrderedRecord, changes: &ChangeSet) -> Result<(), OrderingError> {
        self.before_save(record, changes)?;
        self.engine.persist(record)
    }

    /// Allocate an id and save a new record at the end of its group
    pub fn create(&self, kind: &str, attributes: ScopeValues) -> Result<OrderedRecord, OrderingError> {
        self.engine.registry().get(kind)?;
        let id = self.engine.store().next_id()?;
        let mut record = OrderedRecord::new(id, kind);
        record.attributes = attributes;
        self.save(&mut record, &ChangeSet::created())?;
        info!(record = %record.id, kind, position = ?record.position, "record created");
        Ok(record)
    }

    /// Runs after a record was removed.
    ///
    /// Returns how many siblings moved up.
    pub fn after_destroy(&self, record: &OrderedRecord, cascade: &Cascade) -> Result<usize, OrderingError> {
        let scope = self.engine.registry().get(&record.kind)?;
        if scope
            .keys()
            .iter()
            .any(|key| scope.was_destructive_cascade(key, record, cascade))
        {
            debug!(
                record = %record.id,
                kind = %record.kind,
                "parent cascade removes the whole group, skipping gap closing"
            );
            return Ok(0);
        }

        let Some(position) = record.position else {
            warn!(record = %record.id, kind = %record.kind, "destroyed record had no position, nothing to close");
            return Ok(0);
        };
        let shifted = self
            .engine
            .resolver()
            .siblings(record, None)?
            .below(position)
            .each_inc(-1)?;
        debug!(record = %record.id, position, shifted, "closed gap after destroy");
        Ok(shifted)
    }

    /// Remove the record and close its gap
    pub fn destroy(&self, record: &OrderedRecord, cascade: &Cascade) -> Result<OrderedRecord, OrderingError> {
        let removed = self
            .engine
            .store()
            .remove(record.id)?
            .ok_or(StorageError::RecordNotFound(record.id))?;
        self.after_destroy(&removed, cascade)?;
        Ok(removed)
    }

    /// Records of every registered kind whose scope relation targets `parent`
    pub fn dependents(&self, parent: &OrderedRecord) -> Result<Vec<Dependents>, OrderingError> {
        let mut scopes: Vec<_> = self.engine.registry().scopes().collect();
        scopes.sort_by(|a, b| a.kind().cmp(b.kind()));

        let mut found = Vec::new();
        for scope in scopes {
            for relation in scope.relations_to(&parent.kind) {
                let mut values = ScopeValues::new();
                values.insert(relation.foreign_key.clone(), ScopeValue::Ref(parent.id));
                let records = self
                    .engine
                    .store()
                    .find(&RecordQuery::new(scope.kind(), values))?;
                found.push(Dependents {
                    kind: scope.kind().to_string(),
                    relation: relation.clone(),
                    records,
                });
            }
        }
        Ok(found)
    }

    /// Destroy a record along with its dependents.
    ///
    /// `restrict` relations are checked before anything is removed.
    pub fn destroy_cascading(
        &self,
        parent: &OrderedRecord,
        cascade: &Cascade,
    ) -> Result<DestroySummary, OrderingError> {
        let dependents = self.dependents(parent)?;
        if let Some(restricted) = dependents
            .iter()
            .find(|d| d.relation.inverse_dependent == Dependent::Restrict && !d.records.is_empty())
        {
            return Err(OrderingError::DeleteRestricted {
                id: parent.id,
                kind: restricted.kind.clone(),
                count: restricted.records.len(),
            });
        }

        let child_cascade = cascade.clone().with_flagged(parent.id);
        let mut summary = DestroySummary::default();
        for settlement in settle(&dependents) {
            let child = &settlement.record;
            match settlement.action {
                Dependent::Destroy => {
                    let nested = self.destroy_cascading(child, &child_cascade)?;
                    summary.destroyed.extend(nested.destroyed);
                    summary.nullified.extend(nested.nullified);
                }
                Dependent::Delete => {
                    self.engine.store().remove(child.id)?;
                    summary.destroyed.push(child.id);
                }
                Dependent::Nullify => {
                    self.nullify(child, &settlement.foreign_keys)?;
                    summary.nullified.push(child.id);
                }
                Dependent::Restrict => {}
            }
        }

        self.destroy(parent, cascade)?;
        summary.destroyed.push(parent.id);
        info!(
            record = %parent.id,
            kind = %parent.kind,
            destroyed = summary.destroyed.len(),
            nullified = summary.nullified.len(),
            "record destroyed"
        );
        Ok(summary)
    }

    fn nullify(&self, child: &OrderedRecord, foreign_keys: &[String]) -> Result<(), OrderingError> {
        // Earlier nullifications in the same group shift this child's position.
        let previous = self
            .engine
            .store()
            .get(child.id)?
            .ok_or(StorageError::RecordNotFound(child.id))?;
        let mut current = previous.clone();
        for key in foreign_keys {
            current.set_attribute(key.clone(), ScopeValue::Null);
        }
        let changes = ChangeSet::between(&previous, &current);
        self.save(&mut current, &changes)
    }
}
