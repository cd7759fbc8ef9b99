pub mod context;
pub mod plan;
pub mod query;
pub mod sort;

pub use context::ExecutionContext;
pub use plan::{Binding, IndexProbe, QueryPlan};
pub use query::QueryExecutor;
