use std::collections::BTreeSet;
use crate::core::{CompareOp, EntityDef, Result, Row, Value};

/// Outcome of a `put`: the stored row (with its key filled in) and the row
/// it replaced, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored {
    pub key: i64,
    pub row: Row,
    pub previous: Option<Row>,
}

/// Storage engine trait - the seam between sessions / query execution and
/// the table store.
pub trait StorageEngine: Send + Sync {
    /// Create the backing table for `def` unless one exists. Returns whether
    /// a table was created.
    fn create_table(&mut self, def: &EntityDef) -> Result<bool>;

    fn table_exists(&self, entity: &str) -> bool;

    /// Insert (null key) or upsert (explicit key) a row.
    fn put(&mut self, entity: &str, row: Row) -> Result<Stored>;

    fn get(&self, entity: &str, key: i64) -> Result<Option<&Row>>;

    /// Remove a row; absent keys are a no-op and return `None`.
    fn delete(&mut self, entity: &str, key: i64) -> Result<Option<Row>>;

    /// Fresh traversal of all rows of `entity` in primary-key order.
    fn scan<'a>(&'a self, entity: &str) -> Result<Box<dyn Iterator<Item = (i64, &'a Row)> + 'a>>;

    /// Index-assisted key lookup; `Ok(None)` when `field` is not indexed.
    fn lookup(&self, entity: &str, field: &str, op: CompareOp, value: &Value) -> Result<Option<BTreeSet<i64>>>;

    /// Undo support: put a row back to `previous` without touching the key
    /// counter.
    fn restore(&mut self, entity: &str, key: i64, previous: Option<Row>) -> Result<()>;

    /// Make the current state durable.
    fn flush(&mut self) -> Result<()>;

    fn row_count(&self, entity: &str) -> Result<usize>;
}
