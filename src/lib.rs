//! orderly: dense position ordering for scoped records
//!
//! Records of a kind are partitioned into scope groups by the values of their
//! scope fields and relations. Within each group positions always form the
//! sequence `0..n`; the lifecycle hooks and the position engine keep it that
//! way across creation, reordering, scope changes and destruction.

pub mod api;
pub mod changes;
pub mod cli;
pub mod concurrency;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod scope;
pub mod siblings;
pub mod store;
pub mod types;

pub use api::{Move, OrderingApi};
pub use changes::ChangeSet;
pub use engine::{DensityReport, PositionEngine};
pub use error::{OrderingError, StorageError};
pub use lifecycle::Lifecycle;
pub use scope::{Cascade, Dependent, OrderingScope, RelationScope, ScopeKey, ScopeRegistry};
pub use siblings::{Siblings, SiblingsResolver, StoreSiblingsResolver};
pub use store::{InMemoryRecordStore, RecordStore, SledRecordStore};
pub use types::{OrderedRecord, Position, RecordId, ScopeValue, ScopeValues};
