//! RecordStore - durable ingestion record persistence
//!
//! Tables and port trait for the repository ingestion pipeline:
//!
//! - `RepositoryRecord`: tracked external content source and its lifecycle
//! - `DocumentRecord`: the generation-unit row owned by one repository
//! - `RecordStore`: persistence port (conditional, single-record mutations)
//!
//! ## Adapters
//!
//! - `MemoryRecordStore`: in-process tables (tests, embedding)
//! - `SqliteRecordStore` (feature `sqlite`, default on): durable SQLite store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docpipe_storage::{RecordStore, RepositoryRecord, SqliteRecordStore};
//!
//! let store = SqliteRecordStore::open("records.db")?;
//! store.insert_repository(&RepositoryRecord::new("id", "https://...", "git")).await?;
//! let unfinished = store.list_unfinished().await?;
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

// Domain re-exports
pub use domain::{
    DocumentRecord, RecordStatus, RecordStore, RepositoryKind, RepositoryRecord,
    ResolvedRepository,
};

// Adapter re-exports
pub use infrastructure::MemoryRecordStore;

#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteRecordStore;
