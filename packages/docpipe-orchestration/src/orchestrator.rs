//! Orchestrator - startup recovery and worker-pool supervision
//!
//! On start the orchestrator scans the record store for unfinished work,
//! re-enqueues it with `Processing` records strictly before `Pending` ones
//! (work interrupted by a previous crash resumes before new work begins),
//! and supervises a fixed-size pool of workers that drain the queue.
//!
//! The recovery scan is the pipeline's sole source of queue ordering and its
//! sole recovery mechanism. There is no periodic re-scan: a record left
//! `Processing` by a mid-run crash stays that way until the next process
//! restart triggers another scan.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use docpipe_storage::{RecordStatus, RecordStore};

use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::generator::DocumentGenerator;
use crate::queue::{work_queue, QueueWriter};
use crate::source::RepositorySource;
use crate::worker::Worker;

/// Ingestion pipeline supervisor
///
/// All collaborators are passed in at construction; the orchestrator owns no
/// global state.
pub struct Orchestrator {
    store: Arc<dyn RecordStore>,
    source: Arc<dyn RepositorySource>,
    generator: Arc<dyn DocumentGenerator>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        source: Arc<dyn RepositorySource>,
        generator: Arc<dyn DocumentGenerator>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            source,
            generator,
            config,
        }
    }

    /// Run recovery and the worker pool
    ///
    /// Workers are spawned before the scan writes into the queue, so the
    /// bounded queue's backpressure cannot stall recovery. Returns once every
    /// worker has stopped: either the queue drained (the writer is dropped
    /// after the scan; nothing ever writes again) or `cancel` fired and each
    /// worker finished its in-flight record.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let (writer, reader) = work_queue(self.config.queue_capacity);

        let mut handles = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let worker = Worker {
                id,
                store: Arc::clone(&self.store),
                source: Arc::clone(&self.source),
                generator: Arc::clone(&self.generator),
            };
            handles.push(tokio::spawn(worker.run(reader.clone(), cancel.clone())));
        }

        let enqueued = self.recover(&writer, &cancel).await?;
        info!(
            records = enqueued,
            workers = self.config.workers,
            "Recovery scan complete"
        );
        // Sole writer: the queue is populated exactly once per process start
        drop(writer);

        for result in futures::future::join_all(handles).await {
            if let Err(join_err) = result {
                error!(error = %join_err, "Worker task panicked");
            }
        }
        Ok(())
    }

    /// Startup recovery scan
    ///
    /// Each unfinished record is enqueued exactly once, which is what makes
    /// per-record exclusivity structural: no two workers can ever hold the
    /// same identifier.
    async fn recover(&self, queue: &QueueWriter, cancel: &CancellationToken) -> Result<usize> {
        let mut records = self.store.list_unfinished().await?;

        // Stable sort: Processing before Pending, scan order within each
        records.sort_by_key(|record| match record.status {
            RecordStatus::Processing => 0,
            _ => 1,
        });

        let mut enqueued = 0;
        for record in records {
            info!(
                repository = %record.id,
                status = %record.status,
                "Re-enqueueing unfinished record"
            );
            // Cancelled workers stop draining the queue; a full queue must not
            // block the scan past shutdown
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = queue.write(record) => result?,
            }
            enqueued += 1;
        }
        Ok(enqueued)
    }
}
