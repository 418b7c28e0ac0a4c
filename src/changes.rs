//! Change signals passed into the save hooks.
//!
//! The ordering core never tracks dirty state itself; the host describes what
//! changed since the record was loaded.

use crate::scope::OrderingScope;
use crate::types::{OrderedRecord, Position, ScopeValue, ScopeValues};
use std::collections::{BTreeMap, BTreeSet};

/// Old and new value of one attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
    pub old: ScopeValue,
    pub new: ScopeValue,
}

/// What changed on a record since it was last persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    new_record: bool,
    former_position: Option<Position>,
    attributes: BTreeMap<String, AttributeChange>,
}

impl ChangeSet {
    /// The record has never been saved
    pub fn created() -> Self {
        ChangeSet {
            new_record: true,
            ..Self::default()
        }
    }

    /// A persisted record saved without attribute changes
    pub fn unchanged(record: &OrderedRecord) -> Self {
        ChangeSet {
            new_record: false,
            former_position: record.position,
            attributes: BTreeMap::new(),
        }
    }

    /// Diff a persisted record against its modified copy.
    ///
    /// The former position is the one stored on `previous`.
    pub fn between(previous: &OrderedRecord, current: &OrderedRecord) -> Self {
        let names: BTreeSet<&String> = previous
            .attributes
            .keys()
            .chain(current.attributes.keys())
            .collect();
        names.into_iter().fold(Self::unchanged(previous), |changes, name| {
            changes.with_change(name.clone(), previous.attribute(name), current.attribute(name))
        })
    }

    /// Record a change; equal values are ignored.
    pub fn with_change(mut self, attribute: impl Into<String>, old: ScopeValue, new: ScopeValue) -> Self {
        if old != new {
            self.attributes.insert(attribute.into(), AttributeChange { old, new });
        }
        self
    }

    pub fn is_new_record(&self) -> bool {
        self.new_record
    }

    /// Position snapshot taken before the save started
    pub fn former_position(&self) -> Option<Position> {
        self.former_position
    }

    pub fn changed(&self, attribute: &str) -> bool {
        self.attributes.contains_key(attribute)
    }

    pub fn change(&self, attribute: &str) -> Option<&AttributeChange> {
        self.attributes.get(attribute)
    }

    pub fn changed_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Any of the scope's attributes changed
    pub fn scope_changed(&self, scope: &OrderingScope) -> bool {
        scope.attributes().any(|attr| self.changed(attr))
    }

    /// Former values of the scope attributes that changed, keyed by attribute
    pub fn former_scope_values(&self, scope: &OrderingScope) -> ScopeValues {
        scope
            .attributes()
            .filter_map(|attr| {
                self.change(attr)
                    .map(|change| (attr.to_string(), change.old.clone()))
            })
            .collect()
    }
}
