use docpipe_storage::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Per-record processing errors
///
/// Variants map one-to-one onto the failure taxonomy the pipeline records:
/// configuration (unsupported kind), ingestion, generation, and persistence.
/// All of them are handled once, at the outermost level of per-record
/// processing; nothing is retried within a run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The record's kind is neither `git` nor `file`. The display text is
    /// persisted verbatim into the record's error field.
    #[error("unsupported repository type")]
    UnsupportedKind,

    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Work queue closed")]
    QueueClosed,
}

impl PipelineError {
    pub fn ingestion<E: std::fmt::Display>(e: E) -> Self {
        Self::Ingestion(e.to_string())
    }

    pub fn generation<E: std::fmt::Display>(e: E) -> Self {
        Self::Generation(e.to_string())
    }
}
