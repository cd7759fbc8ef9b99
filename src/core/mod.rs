pub mod error;
pub mod record;
pub mod types;
pub mod value;

pub use error::{DbError, Result};
pub use record::{Record, RecordState};
pub use types::{CompareOp, DataType, EntityDef, Field, ForeignKey, Relationship, RelationshipKind, Row};
pub use value::Value;
