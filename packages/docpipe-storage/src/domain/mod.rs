//! Domain layer for the ingestion record store
//!
//! # Domain Models
//!
//! - `RepositoryRecord`: one row per tracked external content source
//! - `DocumentRecord`: the generation-unit row owned by exactly one repository
//! - `RecordStatus`: lifecycle state machine states
//! - `RepositoryKind`: supported source kinds (`git`, `file`)
//! - `ResolvedRepository`: metadata produced by a successful ingestion
//!
//! # Port Trait
//!
//! - `RecordStore`: primary persistence abstraction
//!
//! # Invariant
//!
//! At most one `DocumentRecord` exists per `RepositoryRecord` at any time. It
//! is created lazily on first processing, reused on later runs, and
//! hard-deleted by the failure-cleanup path so a retry starts clean.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Result;

// ═══════════════════════════════════════════════════════════════════════════
// Status / Kind Enums
// ═══════════════════════════════════════════════════════════════════════════

/// Repository record lifecycle status
///
/// `Cancelled` and `Unauthorized` are reached only through external
/// administrative action; the pipeline itself never produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Newly registered, never processed
    Pending,
    /// A worker is actively handling it (or was, at crash time)
    Processing,
    /// Last run succeeded
    Completed,
    /// Last run raised an unrecovered error
    Failed,
    /// Cancelled by an operator
    Cancelled,
    /// Access revoked by an operator
    Unauthorized,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Processing => "processing",
            RecordStatus::Completed => "completed",
            RecordStatus::Failed => "failed",
            RecordStatus::Cancelled => "cancelled",
            RecordStatus::Unauthorized => "unauthorized",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RecordStatus::Pending),
            "processing" => Some(RecordStatus::Processing),
            "completed" => Some(RecordStatus::Completed),
            "failed" => Some(RecordStatus::Failed),
            "cancelled" => Some(RecordStatus::Cancelled),
            "unauthorized" => Some(RecordStatus::Unauthorized),
            _ => None,
        }
    }

    /// True for states the pipeline never transitions out of
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecordStatus::Completed
                | RecordStatus::Failed
                | RecordStatus::Cancelled
                | RecordStatus::Unauthorized
        )
    }

    /// True for states the startup recovery scan re-enqueues
    pub fn is_unfinished(&self) -> bool {
        matches!(self, RecordStatus::Pending | RecordStatus::Processing)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Supported repository source kinds
///
/// Records carry the kind as free text; parsing happens at processing time so
/// an unsupported kind can be failed explicitly instead of rejected at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryKind {
    /// Remote repository materialized by the source adapter
    Git,
    /// Address is an already-local path
    File,
}

impl RepositoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryKind::Git => "git",
            RepositoryKind::File => "file",
        }
    }

    /// Case-insensitive parse; `None` for unsupported kinds
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("git") {
            Some(RepositoryKind::Git)
        } else if s.eq_ignore_ascii_case("file") {
            Some(RepositoryKind::File)
        } else {
            None
        }
    }
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// Tracked external content source and its lifecycle status
///
/// Resolved metadata (`name`, `organization`, `resolved_branch`, `revision`)
/// is populated only after a successful ingestion.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Opaque, stable identifier
    pub id: String,
    /// Source location (URL for `git`, local path for `file`)
    pub address: String,
    /// Optional ingestion username
    pub username: Option<String>,
    /// Optional ingestion secret (never logged)
    pub secret: Option<String>,
    /// Requested branch
    pub branch: Option<String>,
    /// Raw kind string, parsed at processing time
    pub kind: String,
    /// Lifecycle status
    pub status: RecordStatus,
    /// Full error description; empty unless status is `Failed`
    pub error: String,
    /// Resolved display name
    pub name: Option<String>,
    /// Resolved organization
    pub organization: Option<String>,
    /// Resolved branch
    pub resolved_branch: Option<String>,
    /// Resolved revision
    pub revision: Option<String>,
}

impl RepositoryRecord {
    /// Create a new `Pending` record
    pub fn new(id: impl Into<String>, address: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            username: None,
            secret: None,
            branch: None,
            kind: kind.into(),
            status: RecordStatus::Pending,
            error: String::new(),
            name: None,
            organization: None,
            resolved_branch: None,
            revision: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.secret = Some(secret.into());
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }
}

// Credentials must never leak into logs, so Debug redacts them.
impl fmt::Debug for RepositoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryRecord")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("username", &self.username.as_ref().map(|_| "<redacted>"))
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("branch", &self.branch)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("error", &self.error)
            .field("name", &self.name)
            .field("organization", &self.organization)
            .field("resolved_branch", &self.resolved_branch)
            .field("revision", &self.revision)
            .finish()
    }
}

/// Generation-unit record, owned by exactly one repository record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Document identifier
    pub id: String,
    /// Owning repository identifier (foreign relation, not ownership)
    pub repository_id: String,
    /// Local content path
    pub local_path: String,
    /// Mirrors a subset of the repository state machine
    pub status: RecordStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last-updated timestamp
    pub last_updated: DateTime<Utc>,
}

impl DocumentRecord {
    /// Create a new `Pending` document record
    pub fn new(
        id: impl Into<String>,
        repository_id: impl Into<String>,
        local_path: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            repository_id: repository_id.into(),
            local_path: local_path.into(),
            status: RecordStatus::Pending,
            created_at: now,
            last_updated: now,
        }
    }
}

/// Metadata returned by a successful repository ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRepository {
    /// Display name
    pub name: String,
    /// Branch actually checked out
    pub branch: String,
    /// Resolved revision (commit hash)
    pub revision: String,
    /// Owning organization
    pub organization: String,
    /// Local path the content was materialized at
    pub local_path: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait: RecordStore
// ═══════════════════════════════════════════════════════════════════════════

/// Ingestion record persistence abstraction
///
/// Every mutation is single-record, conditional on the record identifier, and
/// safe to retry. Callers hold no long-lived state over records; a worker
/// acquires one record by dequeuing it, performs bounded work through this
/// trait, and releases everything back to the store before looping.
///
/// # Implementations
///
/// - `MemoryRecordStore`: in-process tables, used by tests and embedding
/// - `SqliteRecordStore` (feature `sqlite`): durable SQLite-backed store
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ═══════════════════════════════════════════════════════════════════════
    // Repository Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Register a new repository record
    async fn insert_repository(&self, record: &RepositoryRecord) -> Result<()>;

    /// Fetch a repository record by identifier
    async fn get_repository(&self, id: &str) -> Result<Option<RepositoryRecord>>;

    /// List every record whose status is `Pending` or `Processing`
    ///
    /// This is the recovery-scan input. No ordering is guaranteed; the
    /// orchestrator establishes priority ordering itself.
    async fn list_unfinished(&self) -> Result<Vec<RepositoryRecord>>;

    /// Conditionally update a record's status and error text
    ///
    /// # Errors
    ///
    /// Returns `StorageError::RepositoryNotFound` if no record has `id`.
    async fn update_status(&self, id: &str, status: RecordStatus, error: &str) -> Result<()>;

    /// Persist resolved ingestion metadata and mark the record `Processing`
    ///
    /// Applied as one conditional update so a crash never leaves metadata
    /// without the matching status.
    async fn update_resolved(&self, id: &str, resolved: &ResolvedRepository) -> Result<()>;

    // ═══════════════════════════════════════════════════════════════════════
    // Document Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Find the document record owned by a repository, if any
    async fn find_document(&self, repository_id: &str) -> Result<Option<DocumentRecord>>;

    /// Insert a new document record
    async fn insert_document(&self, document: &DocumentRecord) -> Result<()>;

    /// Conditionally update a document's status and last-updated timestamp
    ///
    /// # Errors
    ///
    /// Returns `StorageError::DocumentNotFound` if no document has `id`.
    async fn update_document(
        &self,
        id: &str,
        status: RecordStatus,
        last_updated: DateTime<Utc>,
    ) -> Result<()>;

    /// Hard-delete every document row owned by a repository
    ///
    /// Failure-cleanup path: ensures the next run starts from a clean slate
    /// instead of reusing half-populated content. Returns the number of rows
    /// removed; deleting zero rows is not an error.
    async fn delete_documents(&self, repository_id: &str) -> Result<usize>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
