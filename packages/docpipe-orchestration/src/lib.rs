/*
 * Docpipe Orchestration - Repository Ingestion Pipeline
 *
 * Drives each tracked repository through a content-generation step exactly
 * once per lifecycle run, surviving process restarts without duplicating or
 * losing work.
 *
 * Architecture:
 * - Record State Machine (Pending/Processing/Completed/Failed)
 * - Work Queue (bounded, single writer, worker-pool readers)
 * - Startup Recovery Scan (Processing-first re-enqueue)
 * - Collaborator Ports (RepositorySource, DocumentGenerator)
 *
 * Correctness guarantees: no duplicate concurrent processing of the same
 * record, deterministic recovery ordering, clean rollback on partial failure.
 */

// Public modules
pub mod config;
pub mod error;
pub mod generator;
pub mod orchestrator;
pub mod queue;
pub mod record;
pub mod source;

mod worker;

// Re-exports
pub use config::{OrchestratorConfig, PARALLEL_COUNT_ENV};
pub use error::{PipelineError, Result};
pub use generator::DocumentGenerator;
pub use orchestrator::Orchestrator;
pub use queue::{work_queue, QueueReader, QueueWriter};
pub use record::{normalize_address, RecordStateMachine};
pub use source::RepositorySource;

// Storage re-exports used at every call site
pub use docpipe_storage::{
    DocumentRecord, RecordStatus, RecordStore, RepositoryKind, RepositoryRecord,
    ResolvedRepository,
};
