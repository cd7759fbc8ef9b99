use std::path::{Path, PathBuf};
use crate::core::{DbError, Result};
use crate::storage::{DurabilityMode, SnapshotFile};

const URL_SCHEME: &str = "rustmemorm://";
const MEMORY: &str = ":memory:";

/// Engine configuration
///
/// Mirrors a database URL: a backing file (or none, for memory-only
/// engines), how hard each commit pushes to disk, whether to start from an
/// empty file, and whether to echo storage activity.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Backing file; `None` keeps everything in memory
    pub path: Option<PathBuf>,

    pub durability: DurabilityMode,

    /// Remove an existing file on open instead of loading it
    pub fresh: bool,

    /// Log every storage mutation and query at INFO
    pub echo: bool,
}

impl EngineConfig {
    /// File-backed configuration
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            durability: DurabilityMode::default(),
            fresh: false,
            echo: false,
        }
    }

    /// Memory-only configuration, nothing touches the disk
    pub fn memory() -> Self {
        Self {
            path: None,
            durability: DurabilityMode::None,
            fresh: false,
            echo: false,
        }
    }

    pub fn durability(mut self, durability: DurabilityMode) -> Self {
        self.durability = durability;
        self
    }

    pub fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Parse from a database URL
    ///
    /// Formats:
    /// - `rustmemorm:///database.db` relative file
    /// - `rustmemorm:////var/data/database.db` absolute file
    /// - `rustmemorm://:memory:` memory only
    ///
    /// An optional `?durability=sync|async|none` suffix selects the mode.
    ///
    /// ```
    /// use rustmemorm::EngineConfig;
    ///
    /// let config = EngineConfig::from_url("rustmemorm:///database.db").unwrap();
    /// assert_eq!(config.path.as_deref(), Some(std::path::Path::new("database.db")));
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| DbError::Config(format!("URL must start with '{}'", URL_SCHEME)))?;

        let (location, query) = match rest.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (rest, None),
        };

        let mut config = if location == MEMORY || location.is_empty() {
            Self::memory()
        } else {
            let path = location.strip_prefix('/').ok_or_else(|| {
                DbError::Config(format!("Expected '{}/<path>' or '{}{}'", URL_SCHEME, URL_SCHEME, MEMORY))
            })?;
            if path.is_empty() {
                return Err(DbError::Config("Database path cannot be empty".into()));
            }
            Self::new(path)
        };

        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                match pair.split_once('=') {
                    Some(("durability", mode)) => config.durability = parse_durability(mode)?,
                    _ => return Err(DbError::Config(format!("Unknown URL parameter '{}'", pair))),
                }
            }
        }
        Ok(config)
    }

    pub fn to_url(&self) -> String {
        match &self.path {
            Some(path) => format!("{}/{}", URL_SCHEME, path.display()),
            None => format!("{}{}", URL_SCHEME, MEMORY),
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        match &self.path {
            Some(path) => {
                if path.as_os_str().is_empty() {
                    return Err(DbError::Config("Database path cannot be empty".into()));
                }
                if path.is_dir() {
                    return Err(DbError::Config(format!("{} is a directory", path.display())));
                }
                if self.durability == DurabilityMode::None {
                    return Err(DbError::Config(format!(
                        "{} is file-backed but durability is 'none'; use EngineConfig::memory()",
                        path.display()
                    )));
                }
            }
            None => {
                if self.durability != DurabilityMode::None {
                    return Err(DbError::Config("Memory-only engine cannot use a durable mode".into()));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn snapshot_file(&self) -> SnapshotFile {
        match &self.path {
            Some(path) => SnapshotFile::new(path, self.durability),
            None => SnapshotFile::new(MEMORY, DurabilityMode::None),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::memory()
    }
}

fn parse_durability(mode: &str) -> Result<DurabilityMode> {
    match mode.to_ascii_lowercase().as_str() {
        "sync" => Ok(DurabilityMode::Sync),
        "async" => Ok(DurabilityMode::Async),
        "none" => Ok(DurabilityMode::None),
        other => Err(DbError::Config(format!("Unknown durability mode '{}'", other))),
    }
}
