// ============================================================================
// src/facade/session.rs - Unit of Work
// ============================================================================
//
// A session stages record changes and applies them on `commit` as one
// batch:
//
//   1. staged operations run in staging order against storage, every
//      mutation recorded in an undo log;
//   2. foreign keys are checked against the post-batch state;
//   3. the snapshot file is rewritten;
//   4. only then are keys and states written back to the records.
//
// A failure at any step replays the undo log backwards, so storage, the
// file and the records are left as they were before the commit.
//
// ============================================================================

use std::collections::BTreeSet;
use tracing::{debug, error, info};
use crate::core::{
    CompareOp, DbError, EntityDef, Record, RecordState, RelationshipKind, Result, Row, Value,
};
use crate::executor::{ExecutionContext, QueryExecutor};
use crate::query::Select;
use crate::result::{FromRow, Results};
use crate::storage::{Catalog, Storage, StorageEngine};
use crate::transaction::{Change, UndoLog};
use super::database::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Save,
    Delete,
}

struct Staged {
    operation: Operation,
    record: Record,
    /// State to restore when the change is discarded.
    prior: RecordState,
}

/// Rows written by the commit in progress, keyed by record instance.
#[derive(Default)]
struct Batch {
    saved: Vec<(Record, i64, Row)>,
    deleted: Vec<(Record, i64)>,
}

impl Batch {
    fn key_of(&self, record: &Record) -> Option<i64> {
        self.saved
            .iter()
            .find(|(saved, _, _)| saved.same_instance(record))
            .map(|(_, key, _)| *key)
    }

    fn remember(&mut self, record: &Record, key: i64, row: Row) {
        self.saved.retain(|(saved, _, _)| !saved.same_instance(record));
        self.saved.push((record.clone(), key, row));
    }
}

pub struct Session<'e> {
    engine: &'e mut Engine,
    staged: Vec<Staged>,
}

impl<'e> Session<'e> {
    pub(crate) fn new(engine: &'e mut Engine) -> Self {
        debug!("session opened");
        Self {
            engine,
            staged: Vec::new(),
        }
    }

    /// Stage an insert (record without a key) or an update.
    pub fn add(&mut self, record: &Record) -> Result<()> {
        let def = self.engine.catalog.describe(&record.entity())?;
        record.to_row(def)?;
        if let Some(key) = record.id()
            && let Some(value) = record.get(def.primary_key_field())
            && value != Value::Integer(key)
        {
            return Err(DbError::ConstraintViolation(format!(
                "Primary key of {} cannot change from {} to {}",
                def.name(),
                key,
                value
            )));
        }
        self.stage(Operation::Save, record);
        Ok(())
    }

    /// Stage removal of a persistent record.
    pub fn delete(&mut self, record: &Record) -> Result<()> {
        self.engine.catalog.describe(&record.entity())?;
        if record.id().is_none() {
            return Err(DbError::DetachedRecord(format!(
                "{} has no persistent identity and cannot be deleted",
                record
            )));
        }
        self.stage(Operation::Delete, record);
        Ok(())
    }

    /// Each instance is staged at most once; the latest operation wins.
    fn stage(&mut self, operation: Operation, record: &Record) {
        let mut prior = record.state();
        if let Some(pos) = self.staged.iter().position(|s| s.record.same_instance(record)) {
            if self.staged[pos].operation == operation {
                debug!(entity = %record.entity(), ?operation, "already staged");
                return;
            }
            prior = self.staged.remove(pos).prior;
        }
        debug!(entity = %record.entity(), key = ?record.id(), ?operation, "staged");
        record.set_state(RecordState::Pending);
        self.staged.push(Staged {
            operation,
            record: record.clone(),
            prior,
        });
    }

    pub fn pending_count(&self) -> usize {
        self.staged.len()
    }

    /// Apply every staged change atomically.
    pub fn commit(&mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        if staged.is_empty() {
            return Ok(());
        }
        let Engine { catalog, storage, .. } = &mut *self.engine;

        let mut log = UndoLog::new();
        let mut batch = Batch::default();
        let outcome = Self::apply(catalog, storage, &staged, &mut log, &mut batch)
            .and_then(|()| Self::check_foreign_keys(catalog, storage, &log))
            .and_then(|()| storage.flush());

        if let Err(err) = outcome {
            let changes = log.len();
            if let Err(rollback_err) = log.rollback(storage) {
                error!(error = %rollback_err, "rollback failed");
            }
            for s in &staged {
                s.record.set_state(s.prior);
            }
            info!(error = %err, changes, "commit rolled back");
            return Err(err);
        }

        for (record, key, row) in &batch.saved {
            let def = catalog.describe(&record.entity())?;
            record.overwrite(def, *key, row);
            record.clear_links();
        }
        for (record, _) in &batch.deleted {
            if batch.key_of(record).is_none() {
                record.set_state(RecordState::Deleted);
            }
        }
        info!(
            changes = log.len(),
            saved = batch.saved.len(),
            deleted = batch.deleted.len(),
            "commit"
        );
        Ok(())
    }

    fn apply(
        catalog: &Catalog,
        storage: &mut Storage,
        staged: &[Staged],
        log: &mut UndoLog,
        batch: &mut Batch,
    ) -> Result<()> {
        for s in staged {
            match s.operation {
                Operation::Save => {
                    let mut visiting = Vec::new();
                    Self::save(catalog, storage, &s.record, log, batch, &mut visiting)?;
                }
                Operation::Delete => {
                    let entity = s.record.entity();
                    let key = batch
                        .key_of(&s.record)
                        .or_else(|| s.record.id())
                        .ok_or_else(|| DbError::DetachedRecord(s.record.to_string()))?;
                    match storage.delete(&entity, key)? {
                        Some(previous) => log.record(Change::Delete { entity, key, previous }),
                        None => debug!(entity = %entity, key, "row already gone"),
                    }
                    batch.saved.retain(|(saved, _, _)| !saved.same_instance(&s.record));
                    batch.deleted.push((s.record.clone(), key));
                }
            }
        }
        Ok(())
    }

    /// Write one record, inserting unsaved `belongs_to` targets first.
    fn save(
        catalog: &Catalog,
        storage: &mut Storage,
        record: &Record,
        log: &mut UndoLog,
        batch: &mut Batch,
        visiting: &mut Vec<Record>,
    ) -> Result<i64> {
        if visiting.iter().any(|v| v.same_instance(record)) {
            return Err(DbError::ConstraintViolation(format!(
                "Cyclic relationship links through {}",
                record
            )));
        }
        let def = catalog.describe(&record.entity())?.clone();
        let mut row = record.to_row(&def)?;

        visiting.push(record.clone());
        for (name, target) in record.links() {
            let relationship = catalog.relationship(def.name(), &name)?;
            if relationship.kind != RelationshipKind::BelongsTo {
                return Err(DbError::ConstraintViolation(format!(
                    "Only belongs_to relationships can be linked, '{}.{}' is has_many",
                    def.name(),
                    name
                )));
            }
            if target.entity() != relationship.target {
                return Err(DbError::TypeMismatch(format!(
                    "'{}.{}' expects a {} record, got {}",
                    def.name(),
                    name,
                    relationship.target,
                    target.entity()
                )));
            }
            let target_key = match batch.key_of(&target).or_else(|| target.id()) {
                Some(key) => key,
                None => {
                    debug!(entity = %target.entity(), "cascading insert of linked record");
                    Self::save(catalog, storage, &target, log, batch, visiting)?
                }
            };
            let fk = def.require_field(&relationship.foreign_key)?;
            row[fk] = Value::Integer(target_key);
        }
        visiting.pop();

        let pk = def.primary_key_index();
        match batch.key_of(record).or_else(|| record.id()) {
            Some(key) => {
                if storage.get(def.name(), key)?.is_none() && record.id().is_some() {
                    return Err(DbError::DetachedRecord(format!(
                        "{} no longer exists in storage",
                        record
                    )));
                }
                row[pk] = Value::Integer(key);
            }
            None => {
                if let Value::Integer(key) = row[pk]
                    && storage.get(def.name(), key)?.is_some()
                {
                    return Err(DbError::Integrity(format!(
                        "UNIQUE constraint failed: {}.{} = {}",
                        def.name(),
                        def.primary_key_field(),
                        key
                    )));
                }
            }
        }

        let stored = storage.put(def.name(), row)?;
        log.record(Change::Put {
            entity: def.name().to_string(),
            key: stored.key,
            previous: stored.previous,
        });
        batch.remember(record, stored.key, stored.row);
        Ok(stored.key)
    }

    /// Every foreign key touched by the batch must resolve after it.
    fn check_foreign_keys(catalog: &Catalog, storage: &Storage, log: &UndoLog) -> Result<()> {
        for change in log.changes() {
            let entity = change.entity();
            let key = change.key();
            match storage.get(entity, key)? {
                Some(row) => {
                    let def = catalog.describe(entity)?;
                    for fk in def.foreign_keys() {
                        let idx = def.require_field(&fk.field)?;
                        if let Value::Integer(target) = row[idx]
                            && storage.get(&fk.references, target)?.is_none()
                        {
                            return Err(DbError::Integrity(format!(
                                "FOREIGN KEY constraint failed: {}.{} = {} has no matching {}",
                                entity, fk.field, target, fk.references
                            )));
                        }
                    }
                }
                None => {
                    for (child, fk) in catalog.referencing(entity) {
                        if let Some(child_key) = Self::first_referencing(storage, child, &fk.field, key)? {
                            return Err(DbError::Integrity(format!(
                                "FOREIGN KEY constraint failed: {} {} still references deleted {} {}",
                                child.name(),
                                child_key,
                                entity,
                                key
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn first_referencing(storage: &Storage, child: &EntityDef, field: &str, key: i64) -> Result<Option<i64>> {
        Ok(Self::children(storage, child, field, key)?.into_iter().next())
    }

    /// Keys of `child` rows whose `field` equals `key`, index assisted when
    /// possible.
    fn children(storage: &Storage, child: &EntityDef, field: &str, key: i64) -> Result<BTreeSet<i64>> {
        let value = Value::Integer(key);
        if let Some(keys) = storage.lookup(child.name(), field, CompareOp::Eq, &value)? {
            return Ok(keys);
        }
        let idx = child.require_field(field)?;
        Ok(storage
            .scan(child.name())?
            .filter(|(_, row)| row[idx] == value)
            .map(|(k, _)| k)
            .collect())
    }

    /// Re-read the record's committed state into it, dropping uncommitted
    /// field changes and links.
    pub fn refresh(&self, record: &Record) -> Result<()> {
        let def = self.engine.catalog.describe(&record.entity())?;
        let key = record.id().ok_or_else(|| {
            DbError::DetachedRecord(format!("{} has no persistent identity", record))
        })?;
        let row = self.engine.storage.get(def.name(), key)?.ok_or_else(|| {
            DbError::DetachedRecord(format!("{} {} no longer exists", def.name(), key))
        })?;
        record.overwrite(def, key, row);
        record.clear_links();
        debug!(entity = def.name(), key, "refreshed");
        Ok(())
    }

    /// Run a query over the committed state.
    pub fn exec<'s, T: FromRow + 's>(&'s self, select: &Select<T>) -> Result<Results<'s, T>> {
        let ctx = ExecutionContext::new(&self.engine.storage, &self.engine.catalog)
            .with_echo(self.engine.config().echo);
        QueryExecutor::execute(&ctx, select)
    }

    /// Point lookup by primary key.
    pub fn get(&self, entity: &str, key: i64) -> Result<Option<Record>> {
        let def = self.engine.catalog.describe(entity)?;
        Ok(self
            .engine
            .storage
            .get(entity, key)?
            .map(|row| Record::from_row(def, key, row)))
    }

    /// Records on the many side of a `has_many` relationship.
    pub fn related_many(&self, record: &Record, relationship: &str) -> Result<Vec<Record>> {
        let catalog = &self.engine.catalog;
        let rel = catalog.relationship(&record.entity(), relationship)?;
        if rel.kind != RelationshipKind::HasMany {
            return Err(DbError::ExecutionError(format!(
                "'{}.{}' is not a has_many relationship",
                record.entity(),
                relationship
            )));
        }
        let Some(key) = record.id() else {
            return Ok(Vec::new());
        };
        let child = catalog.describe(&rel.target)?;
        let keys = Self::children(&self.engine.storage, child, &rel.foreign_key, key)?;
        let mut related = Vec::with_capacity(keys.len());
        for child_key in keys {
            if let Some(row) = self.engine.storage.get(child.name(), child_key)? {
                related.push(Record::from_row(child, child_key, row));
            }
        }
        Ok(related)
    }

    /// The parent of a `belongs_to` relationship, or the record it is
    /// linked to if the link is not committed yet.
    pub fn related_one(&self, record: &Record, relationship: &str) -> Result<Option<Record>> {
        let rel = self.engine.catalog.relationship(&record.entity(), relationship)?;
        if rel.kind != RelationshipKind::BelongsTo {
            return Err(DbError::ExecutionError(format!(
                "'{}.{}' is not a belongs_to relationship",
                record.entity(),
                relationship
            )));
        }
        if let Some((_, target)) = record.links().into_iter().find(|(name, _)| name == relationship) {
            return Ok(Some(target));
        }
        match record.get(&rel.foreign_key) {
            Some(Value::Integer(parent)) => self.get(&rel.target, parent),
            _ => Ok(None),
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.staged.is_empty() {
            return;
        }
        debug!(discarded = self.staged.len(), "session closed, staged changes discarded");
        for s in self.staged.drain(..) {
            s.record.set_state(s.prior);
        }
    }
}
