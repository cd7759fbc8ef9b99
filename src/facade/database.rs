use tracing::info;
use crate::config::EngineConfig;
use crate::core::{DbError, EntityDef, Result};
use crate::storage::{Catalog, Storage, StorageEngine};
use super::session::Session;

/// Schema registry plus storage, opened over one file (or memory).
///
/// Reads and writes go through a [`Session`]; the engine itself only
/// defines entities and creates their tables.
pub struct Engine {
    pub(crate) catalog: Catalog,
    pub(crate) storage: Storage,
    config: EngineConfig,
}

impl Engine {
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let file = config.snapshot_file();
        if config.fresh && file.exists() {
            info!(path = %file.path().display(), "fresh start, removing existing database file");
            file.delete()?;
        }
        let storage = Storage::open(file, config.echo)?;
        info!(url = %config.to_url(), "engine opened");
        Ok(Self {
            catalog: Catalog::new(),
            storage,
            config,
        })
    }

    pub fn memory() -> Result<Self> {
        Self::open(EngineConfig::memory())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Register an entity definition.
    pub fn define(&mut self, def: EntityDef) -> Result<()> {
        self.catalog = self.catalog.clone().define(def)?;
        Ok(())
    }

    /// Create a table for every defined entity that has none yet.
    ///
    /// Tables loaded from the file keep their rows; their stored definition
    /// must match the registered one.
    pub fn create_all(&mut self) -> Result<()> {
        self.catalog.validate()?;

        let mut created = 0;
        for def in self.catalog.entities() {
            if let Some(stored) = self.storage.table_def(def.name()) {
                if stored != def.as_ref() {
                    return Err(DbError::ConstraintViolation(format!(
                        "Stored table '{}' does not match its definition",
                        def.name()
                    )));
                }
                continue;
            }
            if self.storage.create_table(def)? {
                created += 1;
            }
        }
        if created > 0 {
            self.storage.flush()?;
        }
        info!(created, entities = self.catalog.entities().count(), "create_all");
        Ok(())
    }

    /// Open a unit of work. The session holds the engine exclusively until
    /// it is dropped.
    pub fn session(&mut self) -> Session<'_> {
        Session::new(self)
    }
}
