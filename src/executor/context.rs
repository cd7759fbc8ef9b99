use crate::storage::{Catalog, StorageEngine};

/// What a query reads from: the committed tables and their definitions.
pub struct ExecutionContext<'a> {
    pub storage: &'a dyn StorageEngine,
    pub catalog: &'a Catalog,
    /// Log every executed query at INFO under `rustmemorm::echo`.
    pub echo: bool,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(storage: &'a dyn StorageEngine, catalog: &'a Catalog) -> Self {
        Self {
            storage,
            catalog,
            echo: false,
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}
