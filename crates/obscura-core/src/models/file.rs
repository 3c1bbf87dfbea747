use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Processing status of an uploaded file.
///
/// Transitions: `Uploaded -> Processing -> Completed | Failed`, and
/// `Failed -> Processing` on retry. Only the processing worker writes a
/// dispatched file's status after creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Completed | FileStatus::Failed)
    }

    /// Whether a transition from `self` to `next` is legal.
    pub fn can_transition_to(&self, next: FileStatus) -> bool {
        matches!(
            (self, next),
            (FileStatus::Uploaded, FileStatus::Processing)
                | (FileStatus::Processing, FileStatus::Completed)
                | (FileStatus::Processing, FileStatus::Failed)
                | (FileStatus::Failed, FileStatus::Processing)
        )
    }
}

impl Display for FileStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileStatus::Uploaded => write!(f, "uploaded"),
            FileStatus::Processing => write!(f, "processing"),
            FileStatus::Completed => write!(f, "completed"),
            FileStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for FileStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(FileStatus::Uploaded),
            "processing" => Ok(FileStatus::Processing),
            "completed" => Ok(FileStatus::Completed),
            "failed" => Ok(FileStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid file status: {}", s)),
        }
    }
}

/// Requesting identity: an authenticated account or the anonymous marker.
/// Anonymous uploads never get a durable record; they exist only on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Option<Uuid>", from = "Option<Uuid>")]
pub enum Owner {
    User(Uuid),
    Anonymous,
}

impl Owner {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Owner::Anonymous)
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Owner::User(id) => Some(*id),
            Owner::Anonymous => None,
        }
    }
}

impl From<Owner> for Option<Uuid> {
    fn from(owner: Owner) -> Self {
        owner.user_id()
    }
}

impl From<Option<Uuid>> for Owner {
    fn from(id: Option<Uuid>) -> Self {
        match id {
            Some(id) => Owner::User(id),
            None => Owner::Anonymous,
        }
    }
}

/// One uploaded file and its derived product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: Uuid,
    #[serde(rename = "owner_id")]
    pub owner: Owner,
    pub original_name: String,
    /// On-disk name of the original: `{id}{ext}`.
    pub stored_name: String,
    /// On-disk name of the derived artifact; set only when completed.
    pub derived_name: Option<String>,
    pub size_bytes: i64,
    pub derived_size_bytes: Option<i64>,
    pub mime_type: String,
    pub status: FileStatus,
    /// Last failure reason. Survives a retry's Processing phase; cleared
    /// when processing completes.
    pub error_message: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    /// Stamped when processing starts and again on each terminal transition.
    pub processed_at: Option<DateTime<Utc>>,
}

impl StoredFile {
    pub fn new(
        id: Uuid,
        owner: Owner,
        original_name: String,
        stored_name: String,
        size_bytes: i64,
        mime_type: String,
    ) -> Self {
        Self {
            id,
            owner,
            original_name,
            stored_name,
            derived_name: None,
            size_bytes,
            derived_size_bytes: None,
            mime_type,
            status: FileStatus::Uploaded,
            error_message: None,
            uploaded_at: Utc::now(),
            processed_at: None,
        }
    }

    pub fn is_processed(&self) -> bool {
        self.status == FileStatus::Completed && self.derived_name.is_some()
    }

    /// Coarse type bucket derived from the MIME prefix ("image", "video", ...).
    pub fn type_bucket(&self) -> &str {
        self.mime_type.split('/').next().unwrap_or("other")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            FileStatus::Uploaded,
            FileStatus::Processing,
            FileStatus::Completed,
            FileStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<FileStatus>().unwrap(), status);
        }
        assert!("pending".parse::<FileStatus>().is_err());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(FileStatus::Uploaded.can_transition_to(FileStatus::Processing));
        assert!(FileStatus::Processing.can_transition_to(FileStatus::Completed));
        assert!(FileStatus::Processing.can_transition_to(FileStatus::Failed));
        assert!(FileStatus::Failed.can_transition_to(FileStatus::Processing));

        assert!(!FileStatus::Uploaded.can_transition_to(FileStatus::Completed));
        assert!(!FileStatus::Completed.can_transition_to(FileStatus::Processing));
        assert!(!FileStatus::Uploaded.can_transition_to(FileStatus::Failed));
    }

    #[test]
    fn test_owner_serde_shape() {
        let anon = serde_json::to_value(Owner::Anonymous).unwrap();
        assert!(anon.is_null());

        let id = Uuid::new_v4();
        let user = serde_json::to_value(Owner::User(id)).unwrap();
        assert_eq!(user, serde_json::json!(id.to_string()));

        let back: Owner = serde_json::from_value(serde_json::Value::Null).unwrap();
        assert!(back.is_anonymous());
    }

    #[test]
    fn test_type_bucket() {
        let mut file = StoredFile::new(
            Uuid::new_v4(),
            Owner::Anonymous,
            "photo.jpg".into(),
            "x.jpg".into(),
            10,
            "image/jpeg".into(),
        );
        assert_eq!(file.type_bucket(), "image");
        file.mime_type = "video/mp4".into();
        assert_eq!(file.type_bucket(), "video");
    }
}
