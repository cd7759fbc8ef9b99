//! Single-file persistence: every commit rewrites one MessagePack snapshot
//! of all tables.

use crate::core::Result;
use crate::storage::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// Flush and fsync the file before the commit returns.
    Sync,
    /// Flush only; the OS decides when the data reaches the disk.
    #[default]
    Async,
    /// Memory only, nothing is written.
    None,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub version: u32,
    pub tables: BTreeMap<String, Table>,
}

#[derive(Debug, Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    tables: &'a BTreeMap<String, Table>,
}

pub struct SnapshotFile {
    path: PathBuf,
    durability_mode: DurabilityMode,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P, durability_mode: DurabilityMode) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            durability_mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the file: write a temp file next to it, then rename.
    pub fn save(&self, tables: &BTreeMap<String, Table>) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION,
            tables,
        };
        let serialized = rmp_serde::to_vec_named(&snapshot)?;

        let temp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            writer.write_all(&serialized)?;
            writer.flush()?;
        }
        if self.durability_mode == DurabilityMode::Sync {
            temp.as_file().sync_all()?;
        }
        temp.persist(&self.path)?;

        debug!(path = %self.path.display(), bytes = serialized.len(), "snapshot written");
        Ok(())
    }

    pub fn load(&self) -> Result<Option<BTreeMap<String, Table>>> {
        if self.durability_mode == DurabilityMode::None || !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path)?;
        let snapshot: DatabaseSnapshot = rmp_serde::from_slice(&data)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(crate::core::DbError::Serialization(format!(
                "Unsupported snapshot version {} in {}",
                snapshot.version,
                self.path.display()
            )));
        }
        debug!(path = %self.path.display(), tables = snapshot.tables.len(), "snapshot loaded");
        Ok(Some(snapshot.tables))
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn delete(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, EntityDef, Field, Value};
    use tempfile::TempDir;

    fn tables() -> BTreeMap<String, Table> {
        let mut table = Table::new(
            EntityDef::new("team")
                .field(Field::new("id", DataType::Integer).optional())
                .field(Field::new("name", DataType::Text))
                .index("name"),
        );
        table.put(vec![Value::Null, "Preventers".into()]).unwrap();
        table.put(vec![Value::Null, "Z-Force".into()]).unwrap();
        table.delete(2);
        BTreeMap::from([("team".to_string(), table)])
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(temp_dir.path().join("database.db"), DurabilityMode::Sync);
        file.save(&tables()).unwrap();
        assert!(file.exists());

        let loaded = file.load().unwrap().unwrap();
        let team = &loaded["team"];
        assert_eq!(team.row_count(), 1);
        assert_eq!(team.next_key(), Some(3));
        assert_eq!(
            team.lookup("name", crate::core::CompareOp::Eq, &"Preventers".into()).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(temp_dir.path().join("absent.db"), DurabilityMode::Async);
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_memory_mode_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(temp_dir.path().join("database.db"), DurabilityMode::None);
        file.save(&tables()).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(temp_dir.path().join("database.db"), DurabilityMode::Async);
        file.save(&tables()).unwrap();
        file.delete().unwrap();
        assert!(!file.exists());
        file.delete().unwrap();
    }
}
