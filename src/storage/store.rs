use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};
use crate::core::{CompareOp, DbError, EntityDef, Result, Row, Value};
use super::engine::{StorageEngine, Stored};
use super::persistence::SnapshotFile;
use super::table::Table;

/// Tables held in memory and mirrored to a single snapshot file.
pub struct Storage {
    tables: BTreeMap<String, Table>,
    file: SnapshotFile,
    echo: bool,
}

impl Storage {
    /// Open storage over `file`, loading whatever it already holds.
    pub fn open(file: SnapshotFile, echo: bool) -> Result<Self> {
        let tables = file.load()?.unwrap_or_default();
        if !tables.is_empty() {
            info!(path = %file.path().display(), tables = tables.len(), "opened existing database");
        }
        Ok(Self { tables, file, echo })
    }

    /// Definition the table was created with, which may predate the catalog.
    pub fn table_def(&self, entity: &str) -> Option<&EntityDef> {
        self.tables.get(entity).map(Table::def)
    }

    fn table(&self, entity: &str) -> Result<&Table> {
        self.tables
            .get(entity)
            .ok_or_else(|| DbError::UnknownEntity(entity.to_string()))
    }

    fn table_mut(&mut self, entity: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(entity)
            .ok_or_else(|| DbError::UnknownEntity(entity.to_string()))
    }

    fn trace(&self, op: &str, entity: &str, key: i64) {
        if self.echo {
            info!(target: "rustmemorm::echo", op, entity, key, "storage");
        } else {
            debug!(op, entity, key, "storage");
        }
    }
}

impl StorageEngine for Storage {
    fn create_table(&mut self, def: &EntityDef) -> Result<bool> {
        if self.tables.contains_key(def.name()) {
            return Ok(false);
        }
        self.tables.insert(def.name().to_string(), Table::new(def.clone()));
        info!(entity = def.name(), fields = def.fields().len(), indexes = ?def.indexes(), "created table");
        Ok(true)
    }

    fn table_exists(&self, entity: &str) -> bool {
        self.tables.contains_key(entity)
    }

    fn put(&mut self, entity: &str, row: Row) -> Result<Stored> {
        let table = self.table_mut(entity)?;
        let (key, previous) = table.put(row)?;
        let row = table.get(key).cloned().unwrap_or_default();
        self.trace(if previous.is_some() { "update" } else { "insert" }, entity, key);
        Ok(Stored { key, row, previous })
    }

    fn get(&self, entity: &str, key: i64) -> Result<Option<&Row>> {
        Ok(self.table(entity)?.get(key))
    }

    fn delete(&mut self, entity: &str, key: i64) -> Result<Option<Row>> {
        let removed = self.table_mut(entity)?.delete(key);
        if removed.is_some() {
            self.trace("delete", entity, key);
        }
        Ok(removed)
    }

    fn scan<'a>(&'a self, entity: &str) -> Result<Box<dyn Iterator<Item = (i64, &'a Row)> + 'a>> {
        Ok(Box::new(self.table(entity)?.scan()))
    }

    fn lookup(&self, entity: &str, field: &str, op: CompareOp, value: &Value) -> Result<Option<BTreeSet<i64>>> {
        Ok(self.table(entity)?.lookup(field, op, value))
    }

    fn restore(&mut self, entity: &str, key: i64, previous: Option<Row>) -> Result<()> {
        self.table_mut(entity)?.restore(key, previous);
        self.trace("restore", entity, key);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.save(&self.tables)
    }

    fn row_count(&self, entity: &str) -> Result<usize> {
        Ok(self.table(entity)?.row_count())
    }
}
