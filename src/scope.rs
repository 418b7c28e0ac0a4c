//! Scope Configuration
//!
//! Declares, per record kind, which fields or relations define the scope group a
//! record is ordered within. Scopes are registered once and never change afterwards.

use crate::config::{KindConfig, OrderlyConfig};
use crate::error::OrderingError;
use crate::types::{OrderedRecord, RecordId, ScopeValue, ScopeValues};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Delete semantics of the parent-side inverse of a scope relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dependent {
    /// Children are destroyed with their hooks
    Destroy,
    /// Children are removed without hooks
    Delete,
    /// Children lose the reference and stay
    #[default]
    Nullify,
    /// Parent cannot be destroyed while children exist
    Restrict,
}

impl Dependent {
    /// Destroying the parent removes the whole child group
    pub fn is_destructive(&self) -> bool {
        matches!(self, Dependent::Destroy | Dependent::Delete)
    }
}

/// A relation used as a scope key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationScope {
    pub name: String,
    pub foreign_key: String,
    pub target_kind: String,
    pub inverse_dependent: Dependent,
}

impl RelationScope {
    /// Relation stored under the conventional `{name}_id` foreign key
    pub fn new(name: impl Into<String>, target_kind: impl Into<String>) -> Self {
        let name = name.into();
        RelationScope {
            foreign_key: format!("{}_id", name),
            name,
            target_kind: target_kind.into(),
            inverse_dependent: Dependent::default(),
        }
    }

    pub fn foreign_key(mut self, key: impl Into<String>) -> Self {
        self.foreign_key = key.into();
        self
    }

    pub fn dependent(mut self, dependent: Dependent) -> Self {
        self.inverse_dependent = dependent;
        self
    }
}

/// One entry of a kind's scope declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKey {
    Field(String),
    Relation(RelationScope),
}

impl ScopeKey {
    pub fn field(name: impl Into<String>) -> Self {
        ScopeKey::Field(name.into())
    }

    /// Declared name of the key
    pub fn name(&self) -> &str {
        match self {
            ScopeKey::Field(name) => name,
            ScopeKey::Relation(rel) => &rel.name,
        }
    }

    /// Record attribute holding the key's value
    pub fn attribute(&self) -> &str {
        match self {
            ScopeKey::Field(name) => name,
            ScopeKey::Relation(rel) => &rel.foreign_key,
        }
    }
}

/// A concrete scope group: kind plus the values of its scope attributes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeGroup {
    pub kind: String,
    pub values: ScopeValues,
}

impl fmt::Display for ScopeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.values.is_empty() {
            let values: Vec<String> = self
                .values
                .iter()
                .map(|(attr, value)| format!("{}={}", attr, value))
                .collect();
            write!(f, "[{}]", values.join(", "))?;
        }
        Ok(())
    }
}

/// Records flagged for destruction by an in-progress cascade
#[derive(Debug, Clone, Default)]
pub struct Cascade {
    flagged: HashSet<RecordId>,
}

impl Cascade {
    /// A plain destroy, not part of any cascade
    pub fn none() -> Self {
        Self::default()
    }

    pub fn flag(&mut self, id: RecordId) {
        self.flagged.insert(id);
    }

    pub fn with_flagged(mut self, id: RecordId) -> Self {
        self.flag(id);
        self
    }

    pub fn is_flagged(&self, id: RecordId) -> bool {
        self.flagged.contains(&id)
    }
}

/// Scope-key introspection used by the lifecycle hooks.
///
/// Implemented by `OrderingScope`, which answers from its declared keys.
pub trait ScopeResolver {
    /// Current value of `key` on `record`
    fn resolve(&self, key: &ScopeKey, record: &OrderedRecord) -> ScopeValue;

    /// True when `record` is being destroyed because the parent behind `key`
    /// is flagged in `cascade` and that relation's inverse is destructive.
    fn was_destructive_cascade(
        &self,
        key: &ScopeKey,
        record: &OrderedRecord,
        cascade: &Cascade,
    ) -> bool;
}

/// Immutable scope declaration of one record kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingScope {
    kind: String,
    keys: Vec<ScopeKey>,
}

impl OrderingScope {
    /// Declare a scope; key names and their attributes must be unique.
    pub fn new(kind: impl Into<String>, keys: Vec<ScopeKey>) -> Result<Self, OrderingError> {
        let kind = kind.into();
        if kind.is_empty() {
            return Err(OrderingError::InvalidScope {
                kind,
                reason: "kind name cannot be empty".to_string(),
            });
        }

        let mut names = HashSet::new();
        let mut attributes = HashSet::new();
        for key in &keys {
            if key.name().is_empty() || key.attribute().is_empty() {
                return Err(OrderingError::InvalidScope {
                    kind,
                    reason: "scope key names cannot be empty".to_string(),
                });
            }
            if !names.insert(key.name().to_string()) {
                return Err(OrderingError::InvalidScope {
                    kind,
                    reason: format!("duplicate scope key '{}'", key.name()),
                });
            }
            if !attributes.insert(key.attribute().to_string()) {
                return Err(OrderingError::InvalidScope {
                    kind,
                    reason: format!("attribute '{}' used by two scope keys", key.attribute()),
                });
            }
        }

        Ok(OrderingScope { kind, keys })
    }

    /// One group containing every record of the kind
    pub fn global(kind: impl Into<String>) -> Result<Self, OrderingError> {
        Self::new(kind, Vec::new())
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn keys(&self) -> &[ScopeKey] {
        &self.keys
    }

    pub fn is_global(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(ScopeKey::attribute)
    }

    /// Relations of this scope pointing at records of `target_kind`
    pub fn relations_to<'a>(&'a self, target_kind: &'a str) -> impl Iterator<Item = &'a RelationScope> {
        self.keys.iter().filter_map(move |key| match key {
            ScopeKey::Relation(rel) if rel.target_kind == target_kind => Some(rel),
            _ => None,
        })
    }

    /// Attribute values identifying `record`'s current scope group
    pub fn group_values(&self, record: &OrderedRecord) -> ScopeValues {
        self.keys
            .iter()
            .map(|key| (key.attribute().to_string(), self.resolve(key, record)))
            .collect()
    }

    pub fn group_of(&self, record: &OrderedRecord) -> ScopeGroup {
        ScopeGroup {
            kind: self.kind.clone(),
            values: self.group_values(record),
        }
    }
}

impl ScopeResolver for OrderingScope {
    fn resolve(&self, key: &ScopeKey, record: &OrderedRecord) -> ScopeValue {
        record.attribute(key.attribute())
    }

    fn was_destructive_cascade(
        &self,
        key: &ScopeKey,
        record: &OrderedRecord,
        cascade: &Cascade,
    ) -> bool {
        let ScopeKey::Relation(rel) = key else {
            return false;
        };
        let Some(parent) = self.resolve(key, record).as_ref_id() else {
            return false;
        };
        cascade.is_flagged(parent) && rel.inverse_dependent.is_destructive()
    }
}

/// Scope declarations looked up by record kind
#[derive(Debug, Default)]
pub struct ScopeRegistry {
    scopes: HashMap<String, Arc<OrderingScope>>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind's scope; a kind can only be registered once.
    pub fn register(&mut self, scope: OrderingScope) -> Result<(), OrderingError> {
        if self.scopes.contains_key(scope.kind()) {
            return Err(OrderingError::ScopeAlreadyRegistered(scope.kind().to_string()));
        }
        self.scopes.insert(scope.kind().to_string(), Arc::new(scope));
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Result<Arc<OrderingScope>, OrderingError> {
        self.scopes
            .get(kind)
            .cloned()
            .ok_or_else(|| OrderingError::UnknownKind(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.scopes.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &Arc<OrderingScope>> {
        self.scopes.values()
    }

    /// Build a registry from the `[kinds]` section of the configuration
    pub fn from_config(config: &OrderlyConfig) -> Result<Self, OrderingError> {
        let mut registry = ScopeRegistry::new();
        let mut kinds: Vec<_> = config.kinds.iter().collect();
        kinds.sort_by(|a, b| a.0.cmp(b.0));
        for (kind, kind_config) in kinds {
            registry.register(scope_from_config(kind, kind_config)?)?;
        }
        Ok(registry)
    }
}

fn scope_from_config(kind: &str, config: &KindConfig) -> Result<OrderingScope, OrderingError> {
    let keys = config
        .scope
        .iter()
        .map(|name| match config.relations.get(name) {
            Some(rel) => {
                let mut relation = RelationScope::new(
                    name.clone(),
                    rel.target.clone().unwrap_or_else(|| name.clone()),
                )
                .dependent(rel.dependent);
                if let Some(ref key) = rel.foreign_key {
                    relation = relation.foreign_key(key.clone());
                }
                ScopeKey::Relation(relation)
            }
            None => ScopeKey::Field(name.clone()),
        })
        .collect();
    OrderingScope::new(kind, keys)
}
