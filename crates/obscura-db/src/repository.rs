use async_trait::async_trait;
use obscura_core::models::{FileStatus, StoredFile};
use obscura_core::AppError;
use uuid::Uuid;

/// Payload of a lifecycle transition. Only the fields relevant to the target
/// status are set; `completed` and `failed` are the usual entry points.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: FileStatus,
    pub derived_name: Option<String>,
    pub derived_size_bytes: Option<i64>,
    pub error_message: Option<String>,
}

impl StatusUpdate {
    pub fn processing() -> Self {
        Self {
            status: FileStatus::Processing,
            derived_name: None,
            derived_size_bytes: None,
            error_message: None,
        }
    }

    pub fn completed(derived_name: String, derived_size_bytes: i64) -> Self {
        Self {
            status: FileStatus::Completed,
            derived_name: Some(derived_name),
            derived_size_bytes: Some(derived_size_bytes),
            error_message: None,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            status: FileStatus::Failed,
            derived_name: None,
            derived_size_bytes: None,
            error_message: Some(error_message.into()),
        }
    }
}

/// Store of file lifecycle records. Implementations enforce the legal status
/// transitions; an update that would skip a state is rejected.
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn create(&self, file: &StoredFile) -> Result<(), AppError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<StoredFile>, AppError>;

    /// Records owned by `user_id`, newest first.
    async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<StoredFile>, AppError>;

    /// Every record, newest first. Admin statistics only.
    async fn list_all(&self) -> Result<Vec<StoredFile>, AppError>;

    /// Apply a lifecycle transition and return the updated record. Every
    /// transition out of Uploaded stamps `processed_at`; completion clears
    /// any previous error, while a retry's Processing phase keeps it.
    async fn update_status(&self, id: Uuid, update: StatusUpdate) -> Result<StoredFile, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;

    /// Whether a record exists for `id`. The cleaner uses this to tell
    /// tracked files apart from orphaned anonymous ones.
    async fn exists(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Shared transition guard for repository implementations.
pub(crate) fn check_transition(
    id: Uuid,
    current: FileStatus,
    next: FileStatus,
) -> Result<(), AppError> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Illegal status transition for file {}: {} -> {}",
            id, current, next
        )))
    }
}
