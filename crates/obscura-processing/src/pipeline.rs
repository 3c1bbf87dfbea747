use async_trait::async_trait;
use obscura_core::models::ProcessingOptions;
use obscura_storage::{LocalStorage, StorageError};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Source file missing: {0}")]
    SourceMissing(String),

    #[error("Processing failed: {0}")]
    Failed(String),
}

impl From<StorageError> for ProcessingError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(name) => ProcessingError::SourceMissing(name),
            other => ProcessingError::Failed(other.to_string()),
        }
    }
}

/// The derived artifact produced by a processing run.
#[derive(Debug, Clone)]
pub struct DerivedArtifact {
    pub derived_name: String,
    pub size_bytes: i64,
}

/// A processing backend. The lifecycle service drives it through this trait
/// so a real blur pipeline can slot in without touching dispatch or state
/// handling.
#[async_trait]
pub trait FileProcessor: Send + Sync {
    async fn process(
        &self,
        id: Uuid,
        stored_name: &str,
        options: &ProcessingOptions,
    ) -> Result<DerivedArtifact, ProcessingError>;
}

/// Stand-in processor: sleeps for a random interval to emulate pipeline
/// latency, then copies the original to its derived name.
pub struct EmulatedProcessor {
    storage: Arc<LocalStorage>,
    delay_min: Duration,
    delay_max: Duration,
}

impl EmulatedProcessor {
    pub fn new(storage: Arc<LocalStorage>, delay_min: Duration, delay_max: Duration) -> Self {
        Self {
            storage,
            delay_min,
            delay_max,
        }
    }
}

#[async_trait]
impl FileProcessor for EmulatedProcessor {
    async fn process(
        &self,
        id: Uuid,
        stored_name: &str,
        options: &ProcessingOptions,
    ) -> Result<DerivedArtifact, ProcessingError> {
        let delay_ms =
            rand::rng().random_range(self.delay_min.as_millis()..=self.delay_max.as_millis());
        let delay = Duration::from_millis(delay_ms as u64);

        tracing::info!(
            file_id = %id,
            effect = %options.effect,
            intensity = options.intensity,
            objects = ?options.objects,
            delay_ms = delay.as_millis() as u64,
            "Processing file"
        );

        tokio::time::sleep(delay).await;

        let (derived_name, size_bytes) = self.storage.produce_derived(id, stored_name).await?;

        tracing::info!(
            file_id = %id,
            derived_name = %derived_name,
            size_bytes,
            "Processing complete"
        );

        Ok(DerivedArtifact {
            derived_name,
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn processor() -> (tempfile::TempDir, Arc<LocalStorage>, EmulatedProcessor) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let processor = EmulatedProcessor::new(
            storage.clone(),
            Duration::from_millis(0),
            Duration::from_millis(1),
        );
        (dir, storage, processor)
    }

    #[tokio::test]
    async fn test_process_produces_derived_copy() {
        let (_dir, storage, processor) = processor().await;
        let stored = storage.store(b"frame data", "clip.mp4").await.unwrap();

        let artifact = processor
            .process(stored.id, &stored.stored_name, &ProcessingOptions::default())
            .await
            .unwrap();

        assert_eq!(artifact.derived_name, format!("{}_processed.mp4", stored.id));
        assert_eq!(artifact.size_bytes, 10);
        assert_eq!(
            storage.read(&artifact.derived_name).await.unwrap(),
            b"frame data"
        );
    }

    #[tokio::test]
    async fn test_process_missing_source() {
        let (_dir, _storage, processor) = processor().await;

        let result = processor
            .process(Uuid::new_v4(), "gone.jpg", &ProcessingOptions::default())
            .await;

        assert!(matches!(result, Err(ProcessingError::SourceMissing(_))));
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let (_dir, storage, processor) = processor().await;
        let stored = storage.store(b"px", "a.png").await.unwrap();

        let boxed: Arc<dyn FileProcessor> = Arc::new(processor);
        let artifact = boxed
            .process(stored.id, &stored.stored_name, &ProcessingOptions::default())
            .await
            .unwrap();
        assert!(artifact.derived_name.contains("_processed"));
    }
}
