use obscura_db::FileRepository;
use obscura_storage::DERIVED_SUFFIX;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::time::interval;
use uuid::Uuid;

/// Outcome of one cleanup sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepStats {
    pub removed_originals: usize,
    pub removed_derived: usize,
    pub bytes_reclaimed: u64,
}

impl SweepStats {
    pub fn removed_total(&self) -> usize {
        self.removed_originals + self.removed_derived
    }
}

/// Background reclaimer for anonymous uploads.
///
/// Anonymous files have no durable record, so age and name shape identify
/// them: a regular file older than `max_age` whose stem (minus the derived
/// suffix) parses as a uuid is a candidate. Before deleting, the repository
/// is consulted; ids with a record belong to authenticated owners and are
/// skipped regardless of age.
pub struct FileCleaner {
    upload_dir: PathBuf,
    repository: Arc<dyn FileRepository>,
    max_age: Duration,
    sweep_interval: Duration,
}

impl FileCleaner {
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        repository: Arc<dyn FileRepository>,
        max_age: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            repository,
            max_age,
            sweep_interval,
        }
    }

    /// Artifact id encoded in a stored filename, if the name has the
    /// artifact shape. The derived suffix is stripped before parsing.
    fn artifact_id(name: &str) -> Option<(Uuid, bool)> {
        let stem = Path::new(name).file_stem()?.to_str()?;
        let (stem, derived) = match stem.strip_suffix(DERIVED_SUFFIX) {
            Some(stripped) => (stripped, true),
            None => (stem, false),
        };
        Uuid::parse_str(stem).ok().map(|id| (id, derived))
    }

    /// Walk the upload directory once and delete expired orphans. Per-file
    /// errors are logged and never abort the walk.
    pub async fn sweep_once(&self) -> SweepStats {
        let mut stats = SweepStats::default();

        let mut entries = match fs::read_dir(&self.upload_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(
                    dir = %self.upload_dir.display(),
                    error = %e,
                    "Cleanup sweep could not read upload directory"
                );
                return stats;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read directory entry during sweep");
                    continue;
                }
            };

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };

            let Some((id, derived)) = Self::artifact_id(&name) else {
                continue;
            };

            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "Failed to stat file during sweep");
                    continue;
                }
            };

            let age = metadata
                .modified()
                .ok()
                .and_then(|t| t.elapsed().ok())
                .unwrap_or(Duration::ZERO);
            if age <= self.max_age {
                continue;
            }

            // A durable record means an authenticated owner; never touch it.
            match self.repository.exists(id).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(file_id = %id, error = %e, "Ownership check failed, skipping");
                    continue;
                }
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    stats.bytes_reclaimed += metadata.len();
                    if derived {
                        stats.removed_derived += 1;
                    } else {
                        stats.removed_originals += 1;
                    }
                    tracing::info!(
                        name = %name,
                        age_secs = age.as_secs(),
                        size_bytes = metadata.len(),
                        "Removed expired anonymous file"
                    );
                }
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "Failed to remove expired file");
                }
            }
        }

        if stats.removed_total() > 0 {
            tracing::info!(
                removed_originals = stats.removed_originals,
                removed_derived = stats.removed_derived,
                bytes_reclaimed = stats.bytes_reclaimed,
                "Cleanup sweep finished"
            );
        }

        stats
    }

    /// Start the background cleanup task. The first sweep runs immediately,
    /// subsequent sweeps on the configured interval.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep = interval(self.sweep_interval);
            loop {
                sweep.tick().await;
                self.sweep_once().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obscura_core::models::{Owner, StoredFile};
    use obscura_db::MemoryFileRepository;
    use tempfile::tempdir;

    async fn write_file(dir: &Path, name: &str, data: &[u8]) {
        fs::write(dir.join(name), data).await.unwrap();
    }

    fn cleaner(dir: &Path, repo: Arc<MemoryFileRepository>, max_age: Duration) -> FileCleaner {
        FileCleaner::new(dir, repo, max_age, Duration::from_secs(3600))
    }

    #[test]
    fn test_artifact_id_shapes() {
        let id = Uuid::new_v4();

        let parsed = FileCleaner::artifact_id(&format!("{}.jpg", id));
        assert_eq!(parsed, Some((id, false)));

        let parsed = FileCleaner::artifact_id(&format!("{}_processed.mp4", id));
        assert_eq!(parsed, Some((id, true)));

        assert!(FileCleaner::artifact_id("notes.txt").is_none());
        assert!(FileCleaner::artifact_id("not-a-uuid_processed.jpg").is_none());
    }

    #[tokio::test]
    async fn test_expired_orphans_removed() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(MemoryFileRepository::new());
        let id = Uuid::new_v4();

        write_file(dir.path(), &format!("{}.jpg", id), b"original").await;
        write_file(dir.path(), &format!("{}_processed.jpg", id), b"derived!!").await;

        // max_age zero: everything on disk counts as expired.
        let stats = cleaner(dir.path(), repo, Duration::ZERO).sweep_once().await;

        assert_eq!(stats.removed_originals, 1);
        assert_eq!(stats.removed_derived, 1);
        assert_eq!(stats.bytes_reclaimed, 17);
        assert!(!dir.path().join(format!("{}.jpg", id)).exists());
    }

    #[tokio::test]
    async fn test_odd_entries_do_not_abort_sweep() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(MemoryFileRepository::new());
        let id = Uuid::new_v4();
        let orphan_name = format!("{}.jpg", id);

        // A dangling symlink with the artifact shape is not a regular file;
        // the sweep must skip it and still remove the real orphan.
        let dangling = dir.path().join(format!("{}.jpg", Uuid::new_v4()));
        std::os::unix::fs::symlink(dir.path().join("missing-target"), &dangling).unwrap();
        write_file(dir.path(), &orphan_name, b"orphan").await;

        let stats = cleaner(dir.path(), repo, Duration::ZERO).sweep_once().await;

        assert_eq!(stats.removed_originals, 1);
        assert!(!dir.path().join(&orphan_name).exists());
    }

    #[tokio::test]
    async fn test_non_artifact_names_retained() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(MemoryFileRepository::new());

        write_file(dir.path(), "README.txt", b"keep me").await;
        let stats = cleaner(dir.path(), repo, Duration::ZERO).sweep_once().await;

        assert_eq!(stats.removed_total(), 0);
        assert!(dir.path().join("README.txt").exists());
    }

    #[tokio::test]
    async fn test_young_files_retained() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(MemoryFileRepository::new());
        let id = Uuid::new_v4();

        write_file(dir.path(), &format!("{}.jpg", id), b"fresh").await;
        let stats = cleaner(dir.path(), repo, Duration::from_secs(3600))
            .sweep_once()
            .await;

        assert_eq!(stats.removed_total(), 0);
        assert!(dir.path().join(format!("{}.jpg", id)).exists());
    }

    #[tokio::test]
    async fn test_owned_files_retained_despite_age() {
        let dir = tempdir().unwrap();
        let repo = Arc::new(MemoryFileRepository::new());
        let id = Uuid::new_v4();
        let name = format!("{}.jpg", id);

        let record = StoredFile::new(
            id,
            Owner::User(Uuid::new_v4()),
            "photo.jpg".into(),
            name.clone(),
            5,
            "image/jpeg".into(),
        );
        repo.create(&record).await.unwrap();
        write_file(dir.path(), &name, b"owned").await;

        let stats = cleaner(dir.path(), repo, Duration::ZERO).sweep_once().await;

        assert_eq!(stats.removed_total(), 0);
        assert!(dir.path().join(&name).exists());
    }
}
