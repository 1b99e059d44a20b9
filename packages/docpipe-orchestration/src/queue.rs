//! Work queue - bounded hand-off between the recovery scan and the workers
//!
//! FIFO relative to the single writer; `write` suspends when the queue is at
//! capacity (backpressure) and `read` suspends when it is empty. The writer
//! half is not clonable, which makes the single-writer rule structural rather
//! than a convention; the reader half is cheap to clone for the worker pool.

use docpipe_storage::RepositoryRecord;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::error::{PipelineError, Result};

/// Create a bounded work queue
///
/// `capacity` must be at least 1 (tokio channel invariant).
pub fn work_queue(capacity: usize) -> (QueueWriter, QueueReader) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        QueueWriter { tx },
        QueueReader {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Writing half of the work queue (single owner, not `Clone`)
pub struct QueueWriter {
    tx: mpsc::Sender<RepositoryRecord>,
}

impl QueueWriter {
    /// Enqueue one record, suspending while the queue is at capacity
    pub async fn write(&self, record: RepositoryRecord) -> Result<()> {
        self.tx
            .send(record)
            .await
            .map_err(|_| PipelineError::QueueClosed)
    }
}

/// Reading half of the work queue, shared by the worker pool
#[derive(Clone)]
pub struct QueueReader {
    rx: Arc<Mutex<mpsc::Receiver<RepositoryRecord>>>,
}

impl QueueReader {
    /// Dequeue the next record, suspending while the queue is empty
    ///
    /// Returns `None` once the writer has been dropped and the queue is
    /// drained. Only one reader holds the receiver at a time, so a record is
    /// handed to exactly one worker.
    pub async fn read(&self) -> Option<RepositoryRecord> {
        self.rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    fn record(id: &str) -> RepositoryRecord {
        RepositoryRecord::new(id, "https://example.com/a.git", "git")
    }

    #[tokio::test]
    async fn test_fifo_order_single_writer() {
        let (writer, reader) = work_queue(8);

        for id in ["a", "b", "c"] {
            writer.write(record(id)).await.unwrap();
        }

        assert_eq!(reader.read().await.unwrap().id, "a");
        assert_eq!(reader.read().await.unwrap().id, "b");
        assert_eq!(reader.read().await.unwrap().id, "c");
    }

    #[tokio::test]
    async fn test_read_returns_none_after_writer_dropped() {
        let (writer, reader) = work_queue(8);
        writer.write(record("a")).await.unwrap();
        drop(writer);

        assert!(reader.read().await.is_some());
        assert!(reader.read().await.is_none());
    }

    #[tokio::test]
    async fn test_write_blocks_at_capacity() {
        let (writer, reader) = work_queue(1);
        writer.write(record("a")).await.unwrap();

        // Queue full: the second write must suspend until a read frees a slot
        let blocked = tokio::time::timeout(Duration::from_millis(50), writer.write(record("b")));
        assert!(blocked.await.is_err());

        let drain = tokio::spawn({
            let reader = reader.clone();
            async move { reader.read().await }
        });
        writer.write(record("b")).await.unwrap();
        assert_eq!(drain.await.unwrap().unwrap().id, "a");
    }

    #[tokio::test]
    async fn test_read_blocks_when_empty() {
        let (writer, reader) = work_queue(4);

        let blocked = tokio::time::timeout(Duration::from_millis(50), reader.read());
        assert!(blocked.await.is_err());

        writer.write(record("a")).await.unwrap();
        assert_eq!(reader.read().await.unwrap().id, "a");
    }

    #[tokio::test]
    async fn test_write_fails_when_readers_gone() {
        let (writer, reader) = work_queue(4);
        drop(reader);

        let err = writer.write(record("a")).await.unwrap_err();
        assert!(matches!(err, PipelineError::QueueClosed));
    }

    #[tokio::test]
    async fn test_concurrent_readers_no_duplicates() {
        let (writer, reader) = work_queue(64);
        let total = 50;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let reader = reader.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(record) = reader.read().await {
                    seen.push(record.id);
                }
                seen
            }));
        }

        for i in 0..total {
            writer.write(record(&format!("repo-{}", i))).await.unwrap();
        }
        drop(writer);

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }

        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(all.len(), total, "every record dequeued exactly once");
        assert_eq!(unique.len(), total, "no record dequeued twice");
    }
}
