use async_trait::async_trait;
use chrono::Utc;
use obscura_core::models::{FileStatus, StoredFile};
use obscura_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::repository::{check_transition, FileRepository, StatusUpdate};

/// In-memory record store. Used when no `DATABASE_URL` is configured and in
/// tests; records do not survive a restart.
#[derive(Clone, Default)]
pub struct MemoryFileRepository {
    files: Arc<RwLock<HashMap<Uuid, StoredFile>>>,
}

impl MemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_update(file: &mut StoredFile, update: StatusUpdate) {
    file.status = update.status;
    match update.status {
        FileStatus::Processing => {
            // Marks the processing start; a prior failure's message stays
            // until the next terminal transition overwrites it.
            file.processed_at = Some(Utc::now());
        }
        FileStatus::Completed => {
            file.derived_name = update.derived_name;
            file.derived_size_bytes = update.derived_size_bytes;
            file.processed_at = Some(Utc::now());
            file.error_message = None;
        }
        FileStatus::Failed => {
            file.error_message = update.error_message;
            file.processed_at = Some(Utc::now());
        }
        FileStatus::Uploaded => {}
    }
}

#[async_trait]
impl FileRepository for MemoryFileRepository {
    async fn create(&self, file: &StoredFile) -> Result<(), AppError> {
        self.files.write().await.insert(file.id, file.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<StoredFile>, AppError> {
        Ok(self.files.read().await.get(&id).cloned())
    }

    async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<StoredFile>, AppError> {
        let files = self.files.read().await;
        let mut owned: Vec<StoredFile> = files
            .values()
            .filter(|f| f.owner.user_id() == Some(user_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(owned)
    }

    async fn list_all(&self) -> Result<Vec<StoredFile>, AppError> {
        let files = self.files.read().await;
        let mut all: Vec<StoredFile> = files.values().cloned().collect();
        all.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(all)
    }

    async fn update_status(&self, id: Uuid, update: StatusUpdate) -> Result<StoredFile, AppError> {
        let mut files = self.files.write().await;
        let file = files
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))?;

        check_transition(id, file.status, update.status)?;
        apply_update(file, update);
        Ok(file.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.files
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))
    }

    async fn exists(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.files.read().await.contains_key(&id))
    }
}
