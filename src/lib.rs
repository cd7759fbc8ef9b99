// ============================================================================
// RustMemORM Library
// ============================================================================
//
// Embedded object store: entities are declared as data, records are staged
// in a session and committed atomically to a single local file, and
// structured queries filter, join, order and page them.
//
// ============================================================================

pub mod config;
pub mod core;
pub mod evaluator;
pub mod executor;
pub mod facade;
pub mod query;
pub mod result;
pub mod storage;
pub mod transaction;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use core::{
    DataType, DbError, EntityDef, Field, Record, RecordState, RelationshipKind, Result, Value,
};
pub use facade::{Engine, Session};
pub use query::{and_, col, or_, select, select_pair, select_tuple, ColumnRef, Predicate, Select};
pub use result::Results;
pub use storage::DurabilityMode;
