pub mod expr;
pub mod select;

pub use expr::{ColumnRef, Operand, Predicate, and_, col, or_};
pub use select::{Join, JoinKind, OrderBy, Select, select, select_pair, select_tuple};
