//! Repository source port
//!
//! External collaborator: materializes repository content locally and returns
//! resolved metadata. The pipeline treats its failures opaquely; whatever
//! text the adapter produces becomes the ingestion error for this run.

use async_trait::async_trait;
use docpipe_storage::ResolvedRepository;

/// Clone/open adapter for `git`-kind repositories
///
/// Implementations live outside this crate (a libgit2 binding, a shell-out,
/// a fixture in tests). Credentials are used for the resolve call only and
/// must never be logged.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Materialize the repository and resolve its metadata
    ///
    /// # Errors
    ///
    /// Fails on network, authentication, or reference-resolution problems.
    /// The error text is persisted verbatim on the failing record.
    async fn resolve(
        &self,
        address: &str,
        username: Option<&str>,
        secret: Option<&str>,
        branch: Option<&str>,
    ) -> anyhow::Result<ResolvedRepository>;
}
