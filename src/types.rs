//! Core record types shared by the store, resolver and position engine.

use crate::error::OrderingError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Zero-based position of a record within its scope group
pub type Position = u32;

/// Scope attribute name -> value, as used for scope groups and overrides
pub type ScopeValues = BTreeMap<String, ScopeValue>;

/// Opaque record identity, stable for the record's lifetime.
///
/// Rendered as 16 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    pub const fn new(raw: u64) -> Self {
        RecordId(raw)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Big-endian key bytes, so store iteration follows id order
    pub fn to_key(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_key()))
    }
}

impl FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| format!("invalid record id '{}': {}", s, e))?;
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| format!("invalid record id '{}': expected 16 hex digits", s))?;
        Ok(RecordId(u64::from_be_bytes(raw)))
    }
}

/// Value of a single scope attribute.
///
/// Relations are stored as `Ref` values holding the related record's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum ScopeValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Ref(RecordId),
}

impl ScopeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScopeValue::Null)
    }

    pub fn as_ref_id(&self) -> Option<RecordId> {
        match self {
            ScopeValue::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Parse the textual form used by the CLI and config files.
    ///
    /// `null`, `true`/`false`, integers and `@<record id>` map to their
    /// variants; anything else is text.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "null" => ScopeValue::Null,
            "true" => ScopeValue::Bool(true),
            "false" => ScopeValue::Bool(false),
            _ => {
                if let Some(id) = raw.strip_prefix('@').and_then(|s| s.parse().ok()) {
                    return ScopeValue::Ref(id);
                }
                raw.parse::<i64>()
                    .map(ScopeValue::Int)
                    .unwrap_or_else(|_| ScopeValue::Text(raw.to_string()))
            }
        }
    }
}

impl fmt::Display for ScopeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeValue::Null => write!(f, "null"),
            ScopeValue::Bool(b) => write!(f, "{}", b),
            ScopeValue::Int(i) => write!(f, "{}", i),
            ScopeValue::Text(s) => write!(f, "{}", s),
            ScopeValue::Ref(id) => write!(f, "@{}", id),
        }
    }
}

impl From<RecordId> for ScopeValue {
    fn from(id: RecordId) -> Self {
        ScopeValue::Ref(id)
    }
}

impl From<i64> for ScopeValue {
    fn from(value: i64) -> Self {
        ScopeValue::Int(value)
    }
}

impl From<&str> for ScopeValue {
    fn from(value: &str) -> Self {
        ScopeValue::Text(value.to_string())
    }
}

impl From<bool> for ScopeValue {
    fn from(value: bool) -> Self {
        ScopeValue::Bool(value)
    }
}

/// A record participating in ordering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedRecord {
    pub id: RecordId,
    pub kind: String,
    pub position: Option<Position>,
    #[serde(default)]
    pub attributes: BTreeMap<String, ScopeValue>,
}

impl OrderedRecord {
    /// Build an unsaved record; the position is assigned on first save.
    pub fn new(id: RecordId, kind: impl Into<String>) -> Self {
        OrderedRecord {
            id,
            kind: kind.into(),
            position: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<ScopeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Current value of an attribute; missing attributes read as `Null`.
    pub fn attribute(&self, name: &str) -> ScopeValue {
        self.attributes.get(name).cloned().unwrap_or_default()
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<ScopeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// The record's position, or `Unpositioned` if it was never assigned.
    pub fn require_position(&self) -> Result<Position, OrderingError> {
        self.position.ok_or(OrderingError::Unpositioned(self.id))
    }
}
