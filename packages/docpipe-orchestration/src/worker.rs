//! Worker loop and per-record processing
//!
//! Each worker owns one record end-to-end: dequeue, ingest, generate,
//! transition state, loop. The cancellation signal is observed only between
//! records; a record already dequeued runs to completion (success or
//! failure) before the worker honors cancellation.
//!
//! Errors from any step are handled once, at the outermost level: the record
//! is marked `Failed` with the full error text and every document row it
//! owns is hard-deleted, so a future retry observes a clean starting state.

use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use docpipe_storage::{
    DocumentRecord, RecordStatus, RecordStore, RepositoryKind, RepositoryRecord,
    ResolvedRepository,
};

use crate::error::{PipelineError, Result};
use crate::generator::DocumentGenerator;
use crate::queue::QueueReader;
use crate::record::{normalize_address, RecordStateMachine};
use crate::source::RepositorySource;

/// Scoped persistence handle for one record's processing
///
/// Acquired when a record is dequeued and dropped on every exit path; the
/// worker holds no store state across records.
pub(crate) struct UnitOfWork {
    store: Arc<dyn RecordStore>,
}

impl UnitOfWork {
    pub(crate) fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn mark_processing(&self, id: &str) -> Result<()> {
        self.store
            .update_status(id, RecordStatus::Processing, "")
            .await?;
        Ok(())
    }

    async fn save_resolved(&self, id: &str, resolved: &ResolvedRepository) -> Result<()> {
        self.store.update_resolved(id, resolved).await?;
        Ok(())
    }

    /// Locate the existing document record or create one
    ///
    /// At most one document row exists per repository; a reused row keeps its
    /// identifier and creation timestamp across runs.
    async fn find_or_create_document(
        &self,
        repository_id: &str,
        local_path: &str,
    ) -> Result<DocumentRecord> {
        if let Some(document) = self.store.find_document(repository_id).await? {
            info!(repository = %repository_id, document = %document.id, "Reusing document record");
            return Ok(document);
        }

        let document =
            DocumentRecord::new(Uuid::new_v4().to_string(), repository_id, local_path);
        self.store.insert_document(&document).await?;
        info!(repository = %repository_id, document = %document.id, "Created document record");
        Ok(document)
    }

    async fn mark_completed(&self, repository_id: &str, document_id: &str) -> Result<()> {
        self.store
            .update_status(repository_id, RecordStatus::Completed, "")
            .await?;
        self.store
            .update_document(document_id, RecordStatus::Completed, Utc::now())
            .await?;
        Ok(())
    }

    /// Failure cleanup: mark the record `Failed`, then purge its documents
    async fn record_failure(&self, repository_id: &str, error: &str) -> Result<()> {
        self.store
            .update_status(repository_id, RecordStatus::Failed, error)
            .await?;
        let deleted = self.store.delete_documents(repository_id).await?;
        if deleted > 0 {
            info!(repository = %repository_id, deleted, "Deleted document rows after failure");
        }
        Ok(())
    }
}

/// One record-processing loop
pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) source: Arc<dyn RepositorySource>,
    pub(crate) generator: Arc<dyn DocumentGenerator>,
}

impl Worker {
    /// Dequeue and process records until cancelled or the queue is drained
    pub(crate) async fn run(self, queue: QueueReader, cancel: CancellationToken) {
        loop {
            // Cancellation is honored between records, never mid-record
            if cancel.is_cancelled() {
                break;
            }

            let record = tokio::select! {
                _ = cancel.cancelled() => break,
                record = queue.read() => match record {
                    Some(record) => record,
                    None => break,
                },
            };

            self.handle(record).await;
        }
        info!(worker = self.id, "Worker stopped");
    }

    /// Process one record, recording any failure centrally
    pub(crate) async fn handle(&self, record: RepositoryRecord) {
        let repository_id = record.id.clone();
        let uow = UnitOfWork::new(Arc::clone(&self.store));
        let mut machine = RecordStateMachine::new(record);

        match self.process(&uow, &mut machine).await {
            Ok(()) => {
                info!(worker = self.id, repository = %repository_id, "Record completed");
            }
            Err(err) => {
                let text = err.to_string();
                error!(worker = self.id, repository = %repository_id, error = %text, "Record failed");

                // The Failed transition goes through the machine like every
                // other one; a record already in a terminal state keeps its
                // stored status
                match machine.fail(text.as_str()) {
                    Ok(()) => {
                        // The worker must keep looping even when the failure
                        // itself cannot be persisted
                        if let Err(persist) = uow.record_failure(&repository_id, &text).await {
                            error!(
                                worker = self.id,
                                repository = %repository_id,
                                error = %persist,
                                "Could not persist failure state"
                            );
                        }
                    }
                    Err(transition) => {
                        error!(
                            worker = self.id,
                            repository = %repository_id,
                            error = %transition,
                            "Skipping failure persistence"
                        );
                    }
                }
            }
        }
    }

    async fn process(&self, uow: &UnitOfWork, machine: &mut RecordStateMachine) -> Result<()> {
        // Unsupported kinds short-circuit to Failed without any ingestion
        let kind =
            RepositoryKind::parse(&machine.record().kind).ok_or(PipelineError::UnsupportedKind)?;

        machine.begin()?;
        let id = machine.record().id.clone();
        // Persisted before any I/O so a crash leaves the record visibly
        // Processing for the next recovery scan
        uow.mark_processing(&id).await?;

        let local_path = match kind {
            RepositoryKind::Git => {
                let record = machine.record();
                info!(repository = %id, address = %record.address, "Cloning repository");
                let resolved = self
                    .source
                    .resolve(
                        &record.address,
                        record.username.as_deref(),
                        record.secret.as_deref(),
                        record.branch.as_deref(),
                    )
                    .await
                    .map_err(PipelineError::ingestion)?;
                info!(
                    repository = %id,
                    name = %resolved.name,
                    branch = %resolved.branch,
                    "Repository resolved"
                );
                uow.save_resolved(&id, &resolved).await?;
                resolved.local_path
            }
            // The address already is a local path
            RepositoryKind::File => machine.record().address.clone(),
        };

        let document = uow.find_or_create_document(&id, &local_path).await?;

        let normalized = normalize_address(&machine.record().address).to_string();
        self.generator
            .generate(&document, machine.record(), &normalized)
            .await
            .map_err(PipelineError::generation)?;

        // Persisted first: with the in-memory record still Processing, a
        // persistence error here can take the Failed transition
        uow.mark_completed(&id, &document.id).await?;
        machine.complete()?;
        Ok(())
    }
}
