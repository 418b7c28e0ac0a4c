//! Position Engine
//!
//! Default position assignment and every explicit reordering operation. Each move
//! is expressed as a handful of reads plus per-record increments, so that the
//! positions of a scope group stay a dense `0..n` permutation once it completes.

use crate::changes::ChangeSet;
use crate::error::OrderingError;
use crate::scope::ScopeRegistry;
use crate::siblings::{Siblings, SiblingsResolver, StoreSiblingsResolver};
use crate::store::{RecordQuery, RecordStore};
use crate::types::{OrderedRecord, Position, RecordId, ScopeValues};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Scope group whose positions are not exactly `0..n`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupViolation {
    pub scope: ScopeValues,
    /// Stored positions in id order of the group's records
    pub positions: Vec<(RecordId, Option<Position>)>,
}

/// Outcome of a density scan over one kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DensityReport {
    pub kind: String,
    pub groups: usize,
    pub records: usize,
    pub violations: Vec<GroupViolation>,
}

impl DensityReport {
    pub fn is_dense(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Position arithmetic over a store and a siblings resolver
pub struct PositionEngine<'a, R = StoreSiblingsResolver<'a>> {
    registry: &'a ScopeRegistry,
    store: &'a dyn RecordStore,
    resolver: R,
}

impl<'a> PositionEngine<'a> {
    pub fn new(registry: &'a ScopeRegistry, store: &'a dyn RecordStore) -> Self {
        Self::with_resolver(registry, store, StoreSiblingsResolver::new(registry, store))
    }
}

impl<'a, R: SiblingsResolver> PositionEngine<'a, R> {
    /// Use a custom siblings resolver
    pub fn with_resolver(registry: &'a ScopeRegistry, store: &'a dyn RecordStore, resolver: R) -> Self {
        PositionEngine {
            registry,
            store,
            resolver,
        }
    }

    pub fn registry(&self) -> &'a ScopeRegistry {
        self.registry
    }

    pub fn store(&self) -> &'a dyn RecordStore {
        self.store
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Siblings positioned above the record (`position < p`)
    pub fn higher_siblings(&self, record: &OrderedRecord) -> Result<Siblings<'_>, OrderingError> {
        let p = record.require_position()?;
        Ok(self.resolver.siblings(record, None)?.above(p))
    }

    /// Siblings positioned below the record (`position > p`)
    pub fn lower_siblings(&self, record: &OrderedRecord) -> Result<Siblings<'_>, OrderingError> {
        let p = record.require_position()?;
        Ok(self.resolver.siblings(record, None)?.below(p))
    }

    /// First record of the group, possibly the record itself
    pub fn highest_sibling(&self, record: &OrderedRecord) -> Result<Option<OrderedRecord>, OrderingError> {
        Ok(self.resolver.siblings_and_self(record)?.first()?)
    }

    /// Last record of the group, possibly the record itself
    pub fn lowest_sibling(&self, record: &OrderedRecord) -> Result<Option<OrderedRecord>, OrderingError> {
        Ok(self.resolver.siblings_and_self(record)?.last()?)
    }

    pub fn at_top(&self, record: &OrderedRecord) -> Result<bool, OrderingError> {
        Ok(self.higher_siblings(record)?.is_empty()?)
    }

    pub fn at_bottom(&self, record: &OrderedRecord) -> Result<bool, OrderingError> {
        Ok(self.lower_siblings(record)?.is_empty()?)
    }

    /// Append the record to the end of its (new) scope group.
    ///
    /// Runs when the position is unset, or when a persisted record changed scope.
    pub fn assign_default_position(
        &self,
        record: &mut OrderedRecord,
        changes: &ChangeSet,
    ) -> Result<(), OrderingError> {
        let scope = self.registry.get(&record.kind)?;
        let scope_moved = !changes.is_new_record() && changes.scope_changed(&scope);
        if record.position.is_some() && !scope_moved {
            return Ok(());
        }

        let max = self.resolver.siblings(record, None)?.max_position()?;
        let position = max.map_or(0, |m| m + 1);
        debug!(record = %record.id, kind = %record.kind, position, "assigned default position");
        record.position = Some(position);
        Ok(())
    }

    /// Swap with the sibling directly above. Returns false at the top.
    pub fn move_up(&self, record: &mut OrderedRecord) -> Result<bool, OrderingError> {
        if self.at_top(record)? {
            return Ok(false);
        }
        let p = record.require_position()?;
        let expected = p - 1;
        let neighbor = self
            .resolver
            .siblings(record, None)?
            .at(expected)
            .first()?
            .ok_or(OrderingError::MissingNeighbor {
                id: record.id,
                expected,
            })?;

        self.store.inc_position(neighbor.id, 1)?;
        record.position = Some(self.store.inc_position(record.id, -1)?);
        debug!(record = %record.id, neighbor = %neighbor.id, position = expected, "moved record up");
        Ok(true)
    }

    /// Swap with the sibling directly below. Returns false at the bottom.
    pub fn move_down(&self, record: &mut OrderedRecord) -> Result<bool, OrderingError> {
        if self.at_bottom(record)? {
            return Ok(false);
        }
        let p = record.require_position()?;
        let expected = p + 1;
        let neighbor = self
            .resolver
            .siblings(record, None)?
            .at(expected)
            .first()?
            .ok_or(OrderingError::MissingNeighbor {
                id: record.id,
                expected,
            })?;

        self.store.inc_position(neighbor.id, -1)?;
        record.position = Some(self.store.inc_position(record.id, 1)?);
        debug!(record = %record.id, neighbor = %neighbor.id, position = expected, "moved record down");
        Ok(true)
    }

    /// Place the record directly above `other`.
    ///
    /// Returns `Ok(false)` without touching the store when the two records are
    /// not in the same scope group. A failing final save is returned as an
    /// error; sibling shifts made before it stay committed.
    pub fn move_above(
        &self,
        record: &mut OrderedRecord,
        other: &OrderedRecord,
    ) -> Result<bool, OrderingError> {
        let Some((p, q)) = self.range_move_positions(record, other)? else {
            return Ok(false);
        };
        if record.id == other.id {
            return Ok(true);
        }

        let new_position = if p > q {
            self.resolver
                .siblings(other, None)?
                .below(q)
                .above(p)
                .each_inc(1)?;
            self.store.inc_position(other.id, 1)?;
            q
        } else {
            self.resolver
                .siblings(other, None)?
                .above(q)
                .below(p)
                .each_inc(-1)?;
            q - 1
        };

        record.position = Some(new_position);
        self.persist(record)?;
        debug!(record = %record.id, other = %other.id, from = p, to = new_position, "moved record above sibling");
        Ok(true)
    }

    /// Place the record directly below `other`. Mirror of `move_above`.
    pub fn move_below(
        &self,
        record: &mut OrderedRecord,
        other: &OrderedRecord,
    ) -> Result<bool, OrderingError> {
        let Some((p, q)) = self.range_move_positions(record, other)? else {
            return Ok(false);
        };
        if record.id == other.id {
            return Ok(true);
        }

        let new_position = if p > q {
            self.resolver
                .siblings(other, None)?
                .below(q)
                .above(p)
                .each_inc(1)?;
            q + 1
        } else {
            self.resolver
                .siblings(other, None)?
                .above(q)
                .below(p)
                .each_inc(-1)?;
            self.store.inc_position(other.id, -1)?;
            q
        };

        record.position = Some(new_position);
        self.persist(record)?;
        debug!(record = %record.id, other = %other.id, from = p, to = new_position, "moved record below sibling");
        Ok(true)
    }

    /// Move above every sibling. Returns true when moved or already there.
    pub fn move_to_top(&self, record: &mut OrderedRecord) -> Result<bool, OrderingError> {
        if self.at_top(record)? {
            return Ok(true);
        }
        match self.highest_sibling(record)? {
            Some(highest) => self.move_above(record, &highest),
            None => Ok(true),
        }
    }

    /// Move below every sibling. Returns true when moved or already there.
    pub fn move_to_bottom(&self, record: &mut OrderedRecord) -> Result<bool, OrderingError> {
        if self.at_bottom(record)? {
            return Ok(true);
        }
        match self.lowest_sibling(record)? {
            Some(lowest) => self.move_below(record, &lowest),
            None => Ok(true),
        }
    }

    /// Check that a record can be saved
    pub fn validate(&self, record: &OrderedRecord) -> Result<(), OrderingError> {
        self.registry.get(&record.kind)?;
        if record.position.is_none() {
            return Err(OrderingError::Validation(
                record.id,
                "position is not set".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate and write the whole record
    pub fn persist(&self, record: &OrderedRecord) -> Result<(), OrderingError> {
        self.validate(record)?;
        self.store.put(record)?;
        Ok(())
    }

    /// Scan every scope group of `kind` and report groups that are not dense
    pub fn verify_density(&self, kind: &str) -> Result<DensityReport, OrderingError> {
        let scope = self.registry.get(kind)?;
        let records = self.store.find(&RecordQuery::new(kind, ScopeValues::new()))?;

        let mut groups: BTreeMap<ScopeValues, Vec<(RecordId, Option<Position>)>> = BTreeMap::new();
        for record in &records {
            groups
                .entry(scope.group_values(record))
                .or_default()
                .push((record.id, record.position));
        }

        let group_count = groups.len();
        let violations = groups
            .into_iter()
            .filter_map(|(values, mut positions)| {
                let mut sorted: Vec<Option<Position>> = positions.iter().map(|(_, p)| *p).collect();
                sorted.sort();
                let dense = sorted
                    .iter()
                    .enumerate()
                    .all(|(i, p)| *p == Position::try_from(i).ok());
                if dense {
                    None
                } else {
                    positions.sort_by_key(|(id, _)| *id);
                    Some(GroupViolation {
                        scope: values,
                        positions,
                    })
                }
            })
            .collect();

        Ok(DensityReport {
            kind: kind.to_string(),
            groups: group_count,
            records: records.len(),
            violations,
        })
    }

    /// Both positions for a range move, or `None` on scope mismatch
    fn range_move_positions(
        &self,
        record: &OrderedRecord,
        other: &OrderedRecord,
    ) -> Result<Option<(Position, Position)>, OrderingError> {
        if !self.resolver.sibling_of(record, other)? {
            debug!(record = %record.id, other = %other.id, "range move rejected: not siblings");
            return Ok(None);
        }
        let p = record.require_position()?;
        let q = other.require_position()?;
        if p == q && record.id != other.id {
            return Err(OrderingError::DuplicatePosition {
                id: record.id,
                other: other.id,
                position: p,
            });
        }
        Ok(Some((p, q)))
    }
}
