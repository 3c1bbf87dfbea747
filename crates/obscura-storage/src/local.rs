use crate::{StorageError, StorageResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Name suffix of derived artifacts, inserted before the extension:
/// `{id}_processed{ext}`.
pub const DERIVED_SUFFIX: &str = "_processed";

/// Result of storing an upload: the generated id and the on-disk name.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub id: Uuid,
    pub stored_name: String,
}

/// Local filesystem storage rooted at the configured upload directory.
///
/// Names are derived from collision-resistant v4 uuids, so concurrent stores
/// never need filesystem-level uniqueness checks.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create upload directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a stored name to a path, rejecting traversal attempts.
    fn name_to_path(&self, name: &str) -> StorageResult<PathBuf> {
        if name.is_empty()
            || name.contains("..")
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.base_path.join(name))
    }

    /// Lowercased extension of `name` including the dot, or "" when absent.
    fn extension_of(name: &str) -> String {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default()
    }

    /// Persist `data` under a freshly generated id. On a partial write the
    /// incomplete file is removed before the error is surfaced.
    pub async fn store(&self, data: &[u8], original_name: &str) -> StorageResult<StoredObject> {
        let id = Uuid::new_v4();
        let stored_name = format!("{}{}", id, Self::extension_of(original_name));
        let path = self.name_to_path(&stored_name)?;

        if let Err(e) = self.write_all_synced(&path, data).await {
            // No orphaned partial files.
            if let Err(remove_err) = fs::remove_file(&path).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %path.display(),
                        error = %remove_err,
                        "Failed to remove partially written file"
                    );
                }
            }
            return Err(e);
        }

        tracing::info!(
            id = %id,
            stored_name = %stored_name,
            size_bytes = data.len(),
            "Stored upload"
        );

        Ok(StoredObject { id, stored_name })
    }

    async fn write_all_synced(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Produce the derived artifact for `stored_name` by copying it to
    /// `{id}_processed{ext}`. Returns the derived name and its size in bytes.
    pub async fn produce_derived(
        &self,
        id: Uuid,
        stored_name: &str,
    ) -> StorageResult<(String, i64)> {
        let source = self.name_to_path(stored_name)?;
        let derived_name = format!("{}{}{}", id, DERIVED_SUFFIX, Self::extension_of(stored_name));
        let target = self.name_to_path(&derived_name)?;

        if !fs::try_exists(&source).await.unwrap_or(false) {
            return Err(StorageError::NotFound(stored_name.to_string()));
        }

        fs::copy(&source, &target).await.map_err(|e| {
            StorageError::BackendError(format!(
                "Failed to copy {} to {}: {}",
                source.display(),
                target.display(),
                e
            ))
        })?;

        let size = fs::metadata(&target)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .len() as i64;

        Ok((derived_name, size))
    }

    /// Remove a stored file. A missing file is not an error; cleanup paths
    /// call this for names that may already be gone.
    pub async fn remove(&self, name: &str) -> StorageResult<()> {
        let path = self.name_to_path(name)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(name = %name, "Removed stored file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::BackendError(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub async fn exists(&self, name: &str) -> StorageResult<bool> {
        let path = self.name_to_path(name)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    pub async fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.name_to_path(name)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(name.to_string()));
        }
        fs::read(&path)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))
    }

    /// First directory entry whose name starts with `prefix`. Anonymous files
    /// have no durable record, so downloads locate them by id prefix.
    pub async fn find_with_prefix(&self, prefix: &str) -> StorageResult<Option<String>> {
        if prefix.is_empty() || prefix.contains("..") || prefix.contains('/') {
            return Err(StorageError::InvalidName(prefix.to_string()));
        }

        let mut entries = fs::read_dir(&self.base_path)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?
        {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(prefix) {
                    return Ok(Some(name.to_string()));
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_store_and_read() {
        let (_dir, storage) = storage().await;
        let data = b"jpeg bytes".to_vec();

        let stored = storage.store(&data, "photo.JPG").await.unwrap();
        assert_eq!(stored.stored_name, format!("{}.jpg", stored.id));

        let read = storage.read(&stored.stored_name).await.unwrap();
        assert_eq!(read, data);
    }

    #[tokio::test]
    async fn test_unique_ids_for_concurrent_stores() {
        let (_dir, storage) = storage().await;

        let a = storage.store(b"a", "a.png").await.unwrap();
        let b = storage.store(b"b", "b.png").await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.stored_name, b.stored_name);
    }

    #[tokio::test]
    async fn test_produce_derived() {
        let (_dir, storage) = storage().await;
        let stored = storage.store(b"original content", "clip.mp4").await.unwrap();

        let (derived_name, size) = storage
            .produce_derived(stored.id, &stored.stored_name)
            .await
            .unwrap();

        assert_eq!(derived_name, format!("{}_processed.mp4", stored.id));
        assert_eq!(size, 16);
        assert!(storage.exists(&derived_name).await.unwrap());
    }

    #[tokio::test]
    async fn test_produce_derived_missing_source() {
        let (_dir, storage) = storage().await;
        let result = storage
            .produce_derived(Uuid::new_v4(), "missing.jpg")
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let (_dir, storage) = storage().await;
        assert!(storage.remove("nonexistent.jpg").await.is_ok());
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let (_dir, storage) = storage().await;
        assert!(matches!(
            storage.read("../etc/passwd").await,
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            storage.remove("a/b.jpg").await,
            Err(StorageError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn test_find_with_prefix() {
        let (_dir, storage) = storage().await;
        let stored = storage.store(b"x", "p.gif").await.unwrap();

        let found = storage
            .find_with_prefix(&stored.id.to_string())
            .await
            .unwrap();
        assert_eq!(found, Some(stored.stored_name.clone()));

        let missing = storage
            .find_with_prefix(&Uuid::new_v4().to_string())
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
