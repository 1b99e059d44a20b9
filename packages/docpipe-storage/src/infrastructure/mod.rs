//! Infrastructure layer - RecordStore adapters

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryRecordStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRecordStore;
