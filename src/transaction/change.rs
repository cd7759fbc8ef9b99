// ============================================================================
// Commit Change Tracking
// ============================================================================
//
// Every storage mutation made by a commit is recorded together with the
// row it replaced, so a failed commit can be reversed change by change.
//
// ============================================================================

use crate::core::{Result, Row};
use crate::storage::StorageEngine;
use tracing::debug;

/// A single applied, reversible storage mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Row written at `key`; `previous` is `None` for an insert.
    Put {
        entity: String,
        key: i64,
        previous: Option<Row>,
    },

    /// Row removed from `key`.
    Delete {
        entity: String,
        key: i64,
        previous: Row,
    },
}

impl Change {
    pub fn entity(&self) -> &str {
        match self {
            Change::Put { entity, .. } | Change::Delete { entity, .. } => entity,
        }
    }

    pub fn key(&self) -> i64 {
        match self {
            Change::Put { key, .. } | Change::Delete { key, .. } => *key,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Change::Delete { .. })
    }
}

/// Ordered record of the changes applied by one commit.
#[derive(Debug, Default)]
pub struct UndoLog {
    changes: Vec<Change>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Reverse every change, newest first.
    pub fn rollback(self, storage: &mut dyn StorageEngine) -> Result<()> {
        debug!(changes = self.changes.len(), "rolling back commit");
        for change in self.changes.into_iter().rev() {
            match change {
                Change::Put { entity, key, previous } => storage.restore(&entity, key, previous)?,
                Change::Delete { entity, key, previous } => storage.restore(&entity, key, Some(previous))?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, EntityDef, Field, Value};
    use crate::storage::{DurabilityMode, SnapshotFile, Storage};

    fn storage() -> Storage {
        let mut storage =
            Storage::open(SnapshotFile::new("unused.db", DurabilityMode::None), false).unwrap();
        storage
            .create_table(
                &EntityDef::new("hero")
                    .field(Field::new("id", DataType::Integer).optional())
                    .field(Field::new("name", DataType::Text)),
            )
            .unwrap();
        storage
    }

    #[test]
    fn test_change_accessors() {
        let change = Change::Delete {
            entity: "hero".to_string(),
            key: 3,
            previous: vec![],
        };
        assert_eq!(change.entity(), "hero");
        assert_eq!(change.key(), 3);
        assert!(change.is_delete());
    }

    #[test]
    fn test_rollback_restores_previous_state() {
        let mut storage = storage();
        let kept = storage.put("hero", vec![Value::Null, "Deadpond".into()]).unwrap();
        let doomed = storage.put("hero", vec![Value::Null, "Dummy".into()]).unwrap();

        let mut log = UndoLog::new();
        let inserted = storage.put("hero", vec![Value::Null, "Spider-Boy".into()]).unwrap();
        log.record(Change::Put { entity: "hero".into(), key: inserted.key, previous: None });
        let updated = storage.put("hero", vec![kept.key.into(), "Deadpool".into()]).unwrap();
        log.record(Change::Put { entity: "hero".into(), key: kept.key, previous: updated.previous });
        let removed = storage.delete("hero", doomed.key).unwrap().unwrap();
        log.record(Change::Delete { entity: "hero".into(), key: doomed.key, previous: removed });
        assert_eq!(log.len(), 3);

        log.rollback(&mut storage).unwrap();

        assert_eq!(storage.get("hero", inserted.key).unwrap(), None);
        assert_eq!(storage.get("hero", kept.key).unwrap(), Some(&kept.row));
        assert_eq!(storage.get("hero", doomed.key).unwrap(), Some(&doomed.row));
    }
}
