//! Record state machine
//!
//! Validates the status transitions the pipeline is allowed to drive:
//!
//! - `Pending | Processing -> Processing` (a worker begins handling)
//! - `Processing -> Completed` (ingestion, generation, and the owned
//!   document record all succeeded)
//! - `Pending | Processing -> Failed` (any unrecovered error, including an
//!   unsupported kind that fails before processing begins)
//!
//! `Cancelled` and `Unauthorized` are administrative states; the pipeline
//! never produces them, and no transition leads out of a terminal state here.
//! Re-queuing a finished record is an external decision.

use docpipe_storage::{RecordStatus, RepositoryRecord};

use crate::error::{PipelineError, Result};

/// State machine wrapper over a dequeued repository record
///
/// A worker drives transitions on its in-memory copy and persists each one
/// through the store; an illegal transition is a bug surfaced as
/// `InvalidStateTransition` rather than silently corrupted state.
pub struct RecordStateMachine {
    record: RepositoryRecord,
}

impl RecordStateMachine {
    pub fn new(record: RepositoryRecord) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &RepositoryRecord {
        &self.record
    }

    fn invalid(&self, to: &str) -> PipelineError {
        PipelineError::InvalidStateTransition {
            from: self.record.status.as_str().to_string(),
            to: to.to_string(),
        }
    }

    /// Transition: `Pending | Processing -> Processing`
    ///
    /// Set before any I/O, so a crash mid-processing leaves the record
    /// visibly `Processing` for the next recovery scan.
    pub fn begin(&mut self) -> Result<()> {
        match self.record.status {
            RecordStatus::Pending | RecordStatus::Processing => {
                self.record.status = RecordStatus::Processing;
                Ok(())
            }
            _ => Err(self.invalid("processing")),
        }
    }

    /// Transition: `Processing -> Completed`, error cleared
    pub fn complete(&mut self) -> Result<()> {
        match self.record.status {
            RecordStatus::Processing => {
                self.record.status = RecordStatus::Completed;
                self.record.error.clear();
                Ok(())
            }
            _ => Err(self.invalid("completed")),
        }
    }

    /// Transition: `Pending | Processing -> Failed`, full error text kept
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        match self.record.status {
            RecordStatus::Pending | RecordStatus::Processing => {
                self.record.status = RecordStatus::Failed;
                self.record.error = error.into();
                Ok(())
            }
            _ => Err(self.invalid("failed")),
        }
    }
}

/// Strip one trailing `.git` suffix from a repository address
///
/// The generator receives the normalized form; everything else keeps the
/// address exactly as registered.
pub fn normalize_address(address: &str) -> &str {
    address.strip_suffix(".git").unwrap_or(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpipe_storage::RepositoryRecord;

    fn record(status: RecordStatus) -> RepositoryRecord {
        RepositoryRecord::new("repo-1", "https://example.com/a.git", "git").with_status(status)
    }

    #[test]
    fn test_begin_from_pending() {
        let mut sm = RecordStateMachine::new(record(RecordStatus::Pending));
        sm.begin().unwrap();
        assert_eq!(sm.record().status, RecordStatus::Processing);
    }

    #[test]
    fn test_begin_from_processing_resumes() {
        // A record interrupted by a crash re-enters processing
        let mut sm = RecordStateMachine::new(record(RecordStatus::Processing));
        sm.begin().unwrap();
        assert_eq!(sm.record().status, RecordStatus::Processing);
    }

    #[test]
    fn test_begin_from_completed_rejected() {
        let mut sm = RecordStateMachine::new(record(RecordStatus::Completed));
        let err = sm.begin().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidStateTransition { .. }
        ));
    }

    #[test]
    fn test_complete_clears_error() {
        let mut record = record(RecordStatus::Processing);
        record.error = "stale error from a previous run".to_string();
        let mut sm = RecordStateMachine::new(record);

        sm.complete().unwrap();

        assert_eq!(sm.record().status, RecordStatus::Completed);
        assert!(sm.record().error.is_empty());
    }

    #[test]
    fn test_complete_requires_processing() {
        let mut sm = RecordStateMachine::new(record(RecordStatus::Pending));
        assert!(sm.complete().is_err());
    }

    #[test]
    fn test_fail_from_pending_keeps_error_text() {
        // Unsupported kinds fail before processing ever begins
        let mut sm = RecordStateMachine::new(record(RecordStatus::Pending));
        sm.fail("unsupported repository type").unwrap();

        assert_eq!(sm.record().status, RecordStatus::Failed);
        assert_eq!(sm.record().error, "unsupported repository type");
    }

    #[test]
    fn test_fail_from_processing() {
        let mut sm = RecordStateMachine::new(record(RecordStatus::Processing));
        sm.fail("Generation failed: model unavailable").unwrap();
        assert_eq!(sm.record().status, RecordStatus::Failed);
    }

    #[test]
    fn test_no_transition_out_of_failed() {
        let mut sm = RecordStateMachine::new(record(RecordStatus::Failed));
        assert!(sm.begin().is_err());
        assert!(sm.complete().is_err());
        assert!(sm.fail("again").is_err());
    }

    #[test]
    fn test_no_transition_out_of_administrative_states() {
        for status in [RecordStatus::Cancelled, RecordStatus::Unauthorized] {
            let mut sm = RecordStateMachine::new(record(status));
            assert!(sm.begin().is_err());
            assert!(sm.fail("boom").is_err());
        }
    }

    #[test]
    fn test_normalize_address_strips_git_suffix() {
        assert_eq!(
            normalize_address("https://example.com/org/repo.git"),
            "https://example.com/org/repo"
        );
        assert_eq!(
            normalize_address("https://example.com/org/repo"),
            "https://example.com/org/repo"
        );
    }

    #[test]
    fn test_normalize_address_only_trailing() {
        // ".git" inside the path is part of the address, not the suffix
        assert_eq!(
            normalize_address("https://example.com/my.github.mirror/repo"),
            "https://example.com/my.github.mirror/repo"
        );
        assert_eq!(normalize_address("/srv/content/local-tree"), "/srv/content/local-tree");
    }
}
