//! SQLite adapter for RecordStore
//!
//! Durable backing for the ingestion pipeline. The schema is created on open;
//! all mutations are single-statement conditional updates scoped by record
//! identifier, matching the contract the orchestrator relies on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::domain::{DocumentRecord, RecordStatus, RecordStore, RepositoryRecord, ResolvedRepository};
use crate::error::{Result, StorageError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS repositories (
    id              TEXT PRIMARY KEY,
    address         TEXT NOT NULL,
    username        TEXT,
    secret          TEXT,
    branch          TEXT,
    kind            TEXT NOT NULL,
    status          TEXT NOT NULL,
    error           TEXT NOT NULL DEFAULT '',
    name            TEXT,
    organization    TEXT,
    resolved_branch TEXT,
    revision        TEXT
);

CREATE TABLE IF NOT EXISTS documents (
    id            TEXT PRIMARY KEY,
    repository_id TEXT NOT NULL,
    local_path    TEXT NOT NULL,
    status        TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    last_updated  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_repository ON documents(repository_id);
CREATE INDEX IF NOT EXISTS idx_repositories_status ON repositories(status);
";

/// SQLite-backed record store
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) a store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn parse_status(idx: usize, raw: &str) -> rusqlite::Result<RecordStatus> {
    RecordStatus::parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid record status: {}", raw).into(),
        )
    })
}

fn row_to_repository(row: &Row<'_>) -> rusqlite::Result<RepositoryRecord> {
    let status: String = row.get(6)?;
    Ok(RepositoryRecord {
        id: row.get(0)?,
        address: row.get(1)?,
        username: row.get(2)?,
        secret: row.get(3)?,
        branch: row.get(4)?,
        kind: row.get(5)?,
        status: parse_status(6, &status)?,
        error: row.get(7)?,
        name: row.get(8)?,
        organization: row.get(9)?,
        resolved_branch: row.get(10)?,
        revision: row.get(11)?,
    })
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let status: String = row.get(3)?;
    Ok(DocumentRecord {
        id: row.get(0)?,
        repository_id: row.get(1)?,
        local_path: row.get(2)?,
        status: parse_status(3, &status)?,
        created_at: row.get(4)?,
        last_updated: row.get(5)?,
    })
}

const REPOSITORY_COLUMNS: &str = "id, address, username, secret, branch, kind, status, error, \
                                  name, organization, resolved_branch, revision";
const DOCUMENT_COLUMNS: &str = "id, repository_id, local_path, status, created_at, last_updated";

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert_repository(&self, record: &RepositoryRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO repositories \
             (id, address, username, secret, branch, kind, status, error, \
              name, organization, resolved_branch, revision) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.id,
                record.address,
                record.username,
                record.secret,
                record.branch,
                record.kind,
                record.status.as_str(),
                record.error,
                record.name,
                record.organization,
                record.resolved_branch,
                record.revision,
            ],
        )?;
        Ok(())
    }

    async fn get_repository(&self, id: &str) -> Result<Option<RepositoryRecord>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                &format!("SELECT {} FROM repositories WHERE id = ?1", REPOSITORY_COLUMNS),
                params![id],
                row_to_repository,
            )
            .optional()?;
        Ok(record)
    }

    async fn list_unfinished(&self) -> Result<Vec<RepositoryRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM repositories WHERE status IN (?1, ?2)",
            REPOSITORY_COLUMNS
        ))?;
        let records = stmt
            .query_map(
                params![
                    RecordStatus::Pending.as_str(),
                    RecordStatus::Processing.as_str()
                ],
                row_to_repository,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    async fn update_status(&self, id: &str, status: RecordStatus, error: &str) -> Result<()> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE repositories SET status = ?2, error = ?3 WHERE id = ?1",
            params![id, status.as_str(), error],
        )?;
        if updated == 0 {
            return Err(StorageError::repository_not_found(id));
        }
        Ok(())
    }

    async fn update_resolved(&self, id: &str, resolved: &ResolvedRepository) -> Result<()> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE repositories SET name = ?2, organization = ?3, resolved_branch = ?4, \
             revision = ?5, status = ?6 WHERE id = ?1",
            params![
                id,
                resolved.name,
                resolved.organization,
                resolved.branch,
                resolved.revision,
                RecordStatus::Processing.as_str(),
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::repository_not_found(id));
        }
        Ok(())
    }

    async fn find_document(&self, repository_id: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.conn.lock();
        let document = conn
            .query_row(
                &format!(
                    "SELECT {} FROM documents WHERE repository_id = ?1",
                    DOCUMENT_COLUMNS
                ),
                params![repository_id],
                row_to_document,
            )
            .optional()?;
        Ok(document)
    }

    async fn insert_document(&self, document: &DocumentRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO documents \
             (id, repository_id, local_path, status, created_at, last_updated) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                document.id,
                document.repository_id,
                document.local_path,
                document.status.as_str(),
                document.created_at,
                document.last_updated,
            ],
        )?;
        Ok(())
    }

    async fn update_document(
        &self,
        id: &str,
        status: RecordStatus,
        last_updated: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE documents SET status = ?2, last_updated = ?3 WHERE id = ?1",
            params![id, status.as_str(), last_updated],
        )?;
        if updated == 0 {
            return Err(StorageError::document_not_found(id));
        }
        Ok(())
    }

    async fn delete_documents(&self, repository_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM documents WHERE repository_id = ?1",
            params![repository_id],
        )?;
        Ok(deleted)
    }
}
