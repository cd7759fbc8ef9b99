pub mod catalog;
pub mod engine;
pub mod persistence;
pub mod store;
pub mod table;

pub use catalog::Catalog;
pub use engine::{StorageEngine, Stored};
pub use persistence::{DurabilityMode, SnapshotFile};
pub use store::Storage;
pub use table::Table;
