//! In-memory RecordStore adapter
//!
//! Backs the integration tests and embedded use. Same conditional-update
//! semantics as the SQLite adapter: every mutation is scoped by record
//! identifier and missing records surface as not-found errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::domain::{DocumentRecord, RecordStatus, RecordStore, RepositoryRecord, ResolvedRepository};
use crate::error::{Result, StorageError};

#[derive(Default)]
struct Tables {
    repositories: Vec<RepositoryRecord>,
    documents: Vec<DocumentRecord>,
}

/// In-process record store
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: Mutex<Tables>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all repository records (test helper)
    pub fn repositories(&self) -> Vec<RepositoryRecord> {
        self.tables.lock().repositories.clone()
    }

    /// Snapshot of all document records (test helper)
    pub fn documents(&self) -> Vec<DocumentRecord> {
        self.tables.lock().documents.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_repository(&self, record: &RepositoryRecord) -> Result<()> {
        let mut tables = self.tables.lock();
        if tables.repositories.iter().any(|r| r.id == record.id) {
            return Err(StorageError::database(format!(
                "Duplicate repository id: {}",
                record.id
            )));
        }
        tables.repositories.push(record.clone());
        Ok(())
    }

    async fn get_repository(&self, id: &str) -> Result<Option<RepositoryRecord>> {
        let tables = self.tables.lock();
        Ok(tables.repositories.iter().find(|r| r.id == id).cloned())
    }

    async fn list_unfinished(&self) -> Result<Vec<RepositoryRecord>> {
        let tables = self.tables.lock();
        Ok(tables
            .repositories
            .iter()
            .filter(|r| r.status.is_unfinished())
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: &str, status: RecordStatus, error: &str) -> Result<()> {
        let mut tables = self.tables.lock();
        let record = tables
            .repositories
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StorageError::repository_not_found(id))?;
        record.status = status;
        record.error = error.to_string();
        Ok(())
    }

    async fn update_resolved(&self, id: &str, resolved: &ResolvedRepository) -> Result<()> {
        let mut tables = self.tables.lock();
        let record = tables
            .repositories
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StorageError::repository_not_found(id))?;
        record.name = Some(resolved.name.clone());
        record.organization = Some(resolved.organization.clone());
        record.resolved_branch = Some(resolved.branch.clone());
        record.revision = Some(resolved.revision.clone());
        record.status = RecordStatus::Processing;
        Ok(())
    }

    async fn find_document(&self, repository_id: &str) -> Result<Option<DocumentRecord>> {
        let tables = self.tables.lock();
        Ok(tables
            .documents
            .iter()
            .find(|d| d.repository_id == repository_id)
            .cloned())
    }

    async fn insert_document(&self, document: &DocumentRecord) -> Result<()> {
        let mut tables = self.tables.lock();
        if tables.documents.iter().any(|d| d.id == document.id) {
            return Err(StorageError::database(format!(
                "Duplicate document id: {}",
                document.id
            )));
        }
        tables.documents.push(document.clone());
        Ok(())
    }

    async fn update_document(
        &self,
        id: &str,
        status: RecordStatus,
        last_updated: DateTime<Utc>,
    ) -> Result<()> {
        let mut tables = self.tables.lock();
        let document = tables
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StorageError::document_not_found(id))?;
        document.status = status;
        document.last_updated = last_updated;
        Ok(())
    }

    async fn delete_documents(&self, repository_id: &str) -> Result<usize> {
        let mut tables = self.tables.lock();
        let before = tables.documents.len();
        tables.documents.retain(|d| d.repository_id != repository_id);
        Ok(before - tables.documents.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_insert_and_get_repository() {
        let store = MemoryRecordStore::new();
        let record = RepositoryRecord::new("repo-1", "https://example.com/a.git", "git");

        store.insert_repository(&record).await.unwrap();

        let fetched = store.get_repository("repo-1").await.unwrap().unwrap();
        assert_eq!(fetched, record);
        assert!(store.get_repository("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_repository_fails() {
        let store = MemoryRecordStore::new();
        let record = RepositoryRecord::new("repo-1", "https://example.com/a.git", "git");

        store.insert_repository(&record).await.unwrap();
        assert!(store.insert_repository(&record).await.is_err());
    }

    #[tokio::test]
    async fn test_list_unfinished_filters_terminal_states() {
        let store = MemoryRecordStore::new();
        store
            .insert_repository(&RepositoryRecord::new("a", "addr", "git"))
            .await
            .unwrap();
        store
            .insert_repository(
                &RepositoryRecord::new("b", "addr", "git").with_status(RecordStatus::Processing),
            )
            .await
            .unwrap();
        store
            .insert_repository(
                &RepositoryRecord::new("c", "addr", "git").with_status(RecordStatus::Completed),
            )
            .await
            .unwrap();
        store
            .insert_repository(
                &RepositoryRecord::new("d", "addr", "git").with_status(RecordStatus::Failed),
            )
            .await
            .unwrap();

        let unfinished = store.list_unfinished().await.unwrap();
        let ids: Vec<_> = unfinished.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"a"));
        assert!(ids.contains(&"b"));
    }

    #[tokio::test]
    async fn test_update_status() {
        let store = MemoryRecordStore::new();
        store
            .insert_repository(&RepositoryRecord::new("a", "addr", "git"))
            .await
            .unwrap();

        store
            .update_status("a", RecordStatus::Failed, "boom")
            .await
            .unwrap();

        let record = store.get_repository("a").await.unwrap().unwrap();
        assert_eq!(record.status, RecordStatus::Failed);
        assert_eq!(record.error, "boom");
    }

    #[tokio::test]
    async fn test_update_status_missing_record() {
        let store = MemoryRecordStore::new();
        let err = store
            .update_status("missing", RecordStatus::Failed, "boom")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RepositoryNotFound);
    }

    #[tokio::test]
    async fn test_update_resolved_sets_metadata_and_processing() {
        let store = MemoryRecordStore::new();
        store
            .insert_repository(&RepositoryRecord::new("a", "addr", "git"))
            .await
            .unwrap();

        let resolved = ResolvedRepository {
            name: "a".to_string(),
            branch: "main".to_string(),
            revision: "abc123".to_string(),
            organization: "acme".to_string(),
            local_path: "/tmp/repos/a".to_string(),
        };
        store.update_resolved("a", &resolved).await.unwrap();

        let record = store.get_repository("a").await.unwrap().unwrap();
        assert_eq!(record.status, RecordStatus::Processing);
        assert_eq!(record.name.as_deref(), Some("a"));
        assert_eq!(record.resolved_branch.as_deref(), Some("main"));
        assert_eq!(record.revision.as_deref(), Some("abc123"));
        assert_eq!(record.organization.as_deref(), Some("acme"));
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let store = MemoryRecordStore::new();
        let doc = DocumentRecord::new("doc-1", "repo-1", "/tmp/repos/a");

        assert!(store.find_document("repo-1").await.unwrap().is_none());

        store.insert_document(&doc).await.unwrap();
        let found = store.find_document("repo-1").await.unwrap().unwrap();
        assert_eq!(found.id, "doc-1");

        let later = Utc::now();
        store
            .update_document("doc-1", RecordStatus::Completed, later)
            .await
            .unwrap();
        let found = store.find_document("repo-1").await.unwrap().unwrap();
        assert_eq!(found.status, RecordStatus::Completed);
        assert_eq!(found.last_updated, later);
    }

    #[tokio::test]
    async fn test_delete_documents() {
        let store = MemoryRecordStore::new();
        store
            .insert_document(&DocumentRecord::new("doc-1", "repo-1", "/p"))
            .await
            .unwrap();
        store
            .insert_document(&DocumentRecord::new("doc-2", "repo-2", "/q"))
            .await
            .unwrap();

        let deleted = store.delete_documents("repo-1").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.find_document("repo-1").await.unwrap().is_none());
        assert!(store.find_document("repo-2").await.unwrap().is_some());

        // Deleting zero rows is not an error
        assert_eq!(store.delete_documents("repo-1").await.unwrap(), 0);
    }
}
