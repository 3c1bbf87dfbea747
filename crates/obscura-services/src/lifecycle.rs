use obscura_core::models::{Owner, ProcessingOptions, StoredFile};
use obscura_core::AppError;
use obscura_db::{FileRepository, StatusUpdate};
use obscura_processing::validator::SNIFF_LEN;
use obscura_processing::{mime_from_extension, FileProcessor, UploadValidator};
use obscura_storage::LocalStorage;
use std::sync::Arc;
use uuid::Uuid;

/// Upload intake and async processing dispatch.
///
/// `submit_upload` does the synchronous part (validate, store, record) and
/// spawns one task per upload to drive the file through the lifecycle. The
/// spawned task exclusively owns the file's status after dispatch; failures
/// inside it are logged and recorded, never surfaced to the uploader.
pub struct FileLifecycleService {
    repository: Arc<dyn FileRepository>,
    storage: Arc<LocalStorage>,
    processor: Arc<dyn FileProcessor>,
    validator: UploadValidator,
}

impl FileLifecycleService {
    pub fn new(
        repository: Arc<dyn FileRepository>,
        storage: Arc<LocalStorage>,
        processor: Arc<dyn FileProcessor>,
        validator: UploadValidator,
    ) -> Self {
        Self {
            repository,
            storage,
            processor,
            validator,
        }
    }

    pub fn storage(&self) -> &Arc<LocalStorage> {
        &self.storage
    }

    /// Validate and accept an upload, returning the `Uploaded` record
    /// immediately. Processing continues in a spawned task. Anonymous uploads
    /// get no durable record; the returned value is their only handle.
    pub async fn submit_upload(
        self: &Arc<Self>,
        owner: Owner,
        original_name: &str,
        declared_mime: Option<String>,
        data: &[u8],
        options: ProcessingOptions,
    ) -> Result<StoredFile, AppError> {
        let head = &data[..data.len().min(SNIFF_LEN)];
        self.validator
            .validate_upload(data.len() as u64, original_name, head)?;

        let option_errors = UploadValidator::validate_options(&options);
        if !option_errors.is_empty() {
            return Err(AppError::Validation(option_errors));
        }

        let stored = self
            .storage
            .store(data, original_name)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let mime_type = declared_mime
            .filter(|m| !m.is_empty() && m != "application/octet-stream")
            .unwrap_or_else(|| mime_from_extension(original_name).to_string());

        let file = StoredFile::new(
            stored.id,
            owner,
            original_name.to_string(),
            stored.stored_name,
            data.len() as i64,
            mime_type,
        );

        if !owner.is_anonymous() {
            if let Err(e) = self.repository.create(&file).await {
                // Record creation failed: remove the stored bytes so no
                // orphan is left behind, then surface the error.
                if let Err(remove_err) = self.storage.remove(&file.stored_name).await {
                    tracing::warn!(
                        stored_name = %file.stored_name,
                        error = %remove_err,
                        "Failed to remove file after record creation failure"
                    );
                }
                return Err(e);
            }
        }

        tracing::info!(
            file_id = %file.id,
            original_name = %file.original_name,
            size_bytes = file.size_bytes,
            anonymous = owner.is_anonymous(),
            "Upload accepted"
        );

        self.dispatch(file.clone(), options);
        Ok(file)
    }

    fn dispatch(self: &Arc<Self>, file: StoredFile, options: ProcessingOptions) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.run_processing(file, options).await;
        });
    }

    async fn run_processing(&self, file: StoredFile, options: ProcessingOptions) {
        let tracked = !file.owner.is_anonymous();

        if tracked {
            if let Err(e) = self
                .repository
                .update_status(file.id, StatusUpdate::processing())
                .await
            {
                tracing::error!(file_id = %file.id, error = %e, "Failed to mark file processing");
                return;
            }
        }

        match self
            .processor
            .process(file.id, &file.stored_name, &options)
            .await
        {
            Ok(artifact) => {
                if tracked {
                    if let Err(e) = self
                        .repository
                        .update_status(
                            file.id,
                            StatusUpdate::completed(artifact.derived_name, artifact.size_bytes),
                        )
                        .await
                    {
                        tracing::error!(file_id = %file.id, error = %e, "Failed to mark file completed");
                    }
                }
            }
            Err(e) => {
                tracing::error!(file_id = %file.id, error = %e, "Processing failed");
                if tracked {
                    if let Err(update_err) = self
                        .repository
                        .update_status(file.id, StatusUpdate::failed(e.to_string()))
                        .await
                    {
                        tracing::error!(
                            file_id = %file.id,
                            error = %update_err,
                            "Failed to mark file failed"
                        );
                    }
                }
            }
        }
    }

    /// Current record for `id`, visible only to its owner.
    pub async fn get_status(&self, requester: Owner, id: Uuid) -> Result<StoredFile, AppError> {
        let file = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))?;

        if file.owner.user_id() != requester.user_id() {
            return Err(AppError::Forbidden("Not the owner of this file".into()));
        }
        Ok(file)
    }

    pub async fn list_for_owner(&self, user_id: Uuid) -> Result<Vec<StoredFile>, AppError> {
        self.repository.list_by_owner(user_id).await
    }

    /// Delete both disk artifacts, then the record. Owner only.
    pub async fn delete_artifact(&self, requester: Owner, id: Uuid) -> Result<(), AppError> {
        let file = self.get_status(requester, id).await?;

        self.storage
            .remove(&file.stored_name)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if let Some(derived_name) = &file.derived_name {
            self.storage
                .remove(derived_name)
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;
        }

        self.repository.delete(id).await?;
        tracing::info!(file_id = %id, "Deleted file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obscura_core::models::FileStatus;
    use obscura_db::MemoryFileRepository;
    use obscura_processing::EmulatedProcessor;
    use std::time::Duration;
    use tempfile::tempdir;

    const JPEG_HEAD: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

    fn jpeg_payload(len: usize) -> Vec<u8> {
        let mut data = JPEG_HEAD.to_vec();
        data.resize(len, 0xAB);
        data
    }

    struct Harness {
        _dir: tempfile::TempDir,
        repository: Arc<MemoryFileRepository>,
        storage: Arc<LocalStorage>,
        service: Arc<FileLifecycleService>,
    }

    async fn harness() -> Harness {
        let dir = tempdir().unwrap();
        let repository = Arc::new(MemoryFileRepository::new());
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let processor = Arc::new(EmulatedProcessor::new(
            storage.clone(),
            Duration::from_millis(0),
            Duration::from_millis(5),
        ));
        let service = Arc::new(FileLifecycleService::new(
            repository.clone(),
            storage.clone(),
            processor,
            UploadValidator::new(1024 * 1024),
        ));
        Harness {
            _dir: dir,
            repository,
            storage,
            service,
        }
    }

    async fn wait_for_status(
        repository: &MemoryFileRepository,
        id: Uuid,
        status: FileStatus,
    ) -> StoredFile {
        for _ in 0..200 {
            if let Some(file) = repository.get_by_id(id).await.unwrap() {
                if file.status == status {
                    return file;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for status {}", status);
    }

    #[tokio::test]
    async fn test_owned_upload_reaches_completed() {
        let h = harness().await;
        let owner = Owner::User(Uuid::new_v4());

        let file = h
            .service
            .submit_upload(
                owner,
                "photo.jpg",
                None,
                &jpeg_payload(10_000),
                ProcessingOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(file.status, FileStatus::Uploaded);
        assert_eq!(file.mime_type, "image/jpeg");

        let completed = wait_for_status(&h.repository, file.id, FileStatus::Completed).await;
        let derived_name = completed.derived_name.unwrap();
        assert_eq!(derived_name, format!("{}_processed.jpg", file.id));
        assert!(completed.derived_size_bytes.unwrap() > 0);
        assert!(completed.error_message.is_none());
        assert!(completed.processed_at.is_some());
        assert!(h.storage.exists(&derived_name).await.unwrap());
    }

    #[tokio::test]
    async fn test_anonymous_upload_has_no_record_but_derived_appears() {
        let h = harness().await;

        let file = h
            .service
            .submit_upload(
                Owner::Anonymous,
                "photo.jpg",
                None,
                &jpeg_payload(10_000),
                ProcessingOptions::default(),
            )
            .await
            .unwrap();

        assert!(!h.repository.exists(file.id).await.unwrap());

        let derived_name = format!("{}_processed.jpg", file.id);
        for _ in 0..200 {
            if h.storage.exists(&derived_name).await.unwrap() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("derived artifact never appeared for anonymous upload");
    }

    #[tokio::test]
    async fn test_invalid_options_rejected_before_storing() {
        let h = harness().await;
        let options = ProcessingOptions {
            intensity: 42,
            objects: vec!["dragon".into()],
            ..Default::default()
        };

        let result = h
            .service
            .submit_upload(
                Owner::Anonymous,
                "photo.jpg",
                None,
                &jpeg_payload(100),
                options,
            )
            .await;

        match result {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {:?}", other.map(|f| f.id)),
        }

        // Nothing reached the upload directory.
        let mut entries = tokio::fs::read_dir(h.storage.base_path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejected_content_never_stored() {
        let h = harness().await;

        let result = h
            .service
            .submit_upload(
                Owner::Anonymous,
                "fake.jpg",
                None,
                b"plain text pretending to be a photo",
                ProcessingOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_status_enforces_ownership() {
        let h = harness().await;
        let owner = Owner::User(Uuid::new_v4());

        let file = h
            .service
            .submit_upload(
                owner,
                "photo.jpg",
                None,
                &jpeg_payload(100),
                ProcessingOptions::default(),
            )
            .await
            .unwrap();

        assert!(h.service.get_status(owner, file.id).await.is_ok());

        let stranger = Owner::User(Uuid::new_v4());
        assert!(matches!(
            h.service.get_status(stranger, file.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            h.service.get_status(owner, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_disk_and_record() {
        let h = harness().await;
        let owner = Owner::User(Uuid::new_v4());

        let file = h
            .service
            .submit_upload(
                owner,
                "photo.jpg",
                None,
                &jpeg_payload(100),
                ProcessingOptions::default(),
            )
            .await
            .unwrap();
        let completed = wait_for_status(&h.repository, file.id, FileStatus::Completed).await;
        let derived_name = completed.derived_name.unwrap();

        h.service.delete_artifact(owner, file.id).await.unwrap();

        assert!(!h.storage.exists(&file.stored_name).await.unwrap());
        assert!(!h.storage.exists(&derived_name).await.unwrap());
        assert!(!h.repository.exists(file.id).await.unwrap());
    }
}
