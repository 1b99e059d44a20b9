//! Document generator port
//!
//! External collaborator: turns raw repository content into structured
//! documentation. A single opaque, possibly long-running call from the
//! pipeline's point of view; no timeout is imposed here.

use async_trait::async_trait;
use docpipe_storage::{DocumentRecord, RepositoryRecord};

/// Content-generation seam
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// Populate generated content for one document record
    ///
    /// `normalized_address` is the repository address with a trailing `.git`
    /// suffix stripped. Any error fails the owning repository record for
    /// this run and triggers document cleanup.
    async fn generate(
        &self,
        document: &DocumentRecord,
        repository: &RepositoryRecord,
        normalized_address: &str,
    ) -> anyhow::Result<()>;
}
