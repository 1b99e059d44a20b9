//! Orchestrator configuration

/// Environment variable controlling the worker-pool size
pub const PARALLEL_COUNT_ENV: &str = "DOCPIPE_PARALLEL_COUNT";

const DEFAULT_WORKERS: usize = 1;
const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Worker-pool and queue sizing
///
/// `workers` is bounded only by what the operator asks for; the core does not
/// validate it against system resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Number of concurrent worker loops
    pub workers: usize,
    /// Work queue capacity (backpressure bound)
    pub queue_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl OrchestratorConfig {
    /// Read the worker count from `DOCPIPE_PARALLEL_COUNT`
    ///
    /// Absent, unparsable, or zero values fall back to 1 worker.
    pub fn from_env() -> Self {
        let raw = std::env::var(PARALLEL_COUNT_ENV).ok();
        Self {
            workers: parse_workers(raw.as_deref()),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

fn parse_workers(raw: Option<&str>) -> usize {
    match raw.and_then(|s| s.trim().parse::<usize>().ok()) {
        Some(n) if n > 0 => n,
        _ => DEFAULT_WORKERS,
    }
}
