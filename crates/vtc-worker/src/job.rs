//! Per-job pipeline: fetch, fan-out transcode, fan-in, upload.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use vtc_media::{rendition_file_name, TranscodeEngine};
use vtc_models::encoding::OUTPUT_CONTENT_TYPE;
use vtc_models::{RenditionPlan, RenditionSpec, StorageObjectRef};
use vtc_storage::ObjectStore;

use crate::error::{WorkerError, WorkerResult};
use crate::workdir::WorkDir;

/// State owned by exactly one worker invocation.
///
/// Holds the work directory, so dropping the context removes every
/// local file the job produced.
#[derive(Debug)]
pub struct JobContext {
    pub source: StorageObjectRef,
    pub destination_bucket: String,
    work_dir: WorkDir,
}

impl JobContext {
    /// Create the context and its fresh work directory under `root`.
    pub async fn create(
        source: StorageObjectRef,
        destination_bucket: impl Into<String>,
        root: &Path,
    ) -> WorkerResult<Self> {
        Ok(Self {
            source,
            destination_bucket: destination_bucket.into(),
            work_dir: WorkDir::create(root).await?,
        })
    }

    pub fn work_path(&self) -> &Path {
        self.work_dir.path()
    }

    /// Job-unique destination key prefix.
    pub fn job_prefix(&self) -> &str {
        self.work_dir.job_prefix()
    }
}

/// Terminal event of one rendition unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenditionStatus {
    Completed,
    Failed(String),
}

/// Outcome of one rendition unit within a job.
#[derive(Debug, Clone)]
pub struct RenditionOutcome {
    pub spec: RenditionSpec,
    pub path: PathBuf,
    pub status: RenditionStatus,
}

/// Runs one job to a terminal outcome.
pub struct JobRunner {
    store: Arc<dyn ObjectStore>,
    engine: Arc<dyn TranscodeEngine>,
    plan: RenditionPlan,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn TranscodeEngine>,
        plan: RenditionPlan,
    ) -> Self {
        Self { store, engine, plan }
    }

    /// Fetch the source, produce every rendition, upload all outputs.
    ///
    /// Any stage failure fails the whole job; nothing is uploaded
    /// unless every rendition completed. Local cleanup is the
    /// context's concern, not this function's.
    pub async fn run(&self, ctx: &JobContext) -> WorkerResult<Vec<RenditionOutcome>> {
        let source_path = self.fetch(ctx).await?;

        let outcomes = self.transcode_all(ctx, &source_path).await;

        let failed: Vec<String> = outcomes
            .iter()
            .filter(|o| matches!(o.status, RenditionStatus::Failed(_)))
            .map(|o| o.spec.name.clone())
            .collect();
        if !failed.is_empty() {
            warn!(
                "Job for {} failed: {}/{} renditions did not complete",
                ctx.source,
                failed.len(),
                outcomes.len()
            );
            return Err(WorkerError::Transcode { failed });
        }

        self.upload_all(ctx, &outcomes).await?;

        info!(
            "Job for {} completed: {} renditions uploaded under {}/",
            ctx.source,
            outcomes.len(),
            ctx.job_prefix()
        );
        Ok(outcomes)
    }

    /// Download the source object into the work directory.
    async fn fetch(&self, ctx: &JobContext) -> WorkerResult<PathBuf> {
        let extension = Path::new(&ctx.source.key)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let path = ctx.work_path().join(format!("source.{extension}"));

        let bytes = self
            .store
            .download_file(&ctx.source.bucket, &ctx.source.key, &path)
            .await
            .map_err(|e| WorkerError::fetch(e.to_string()))?;

        info!("Fetched {} ({} bytes)", ctx.source, bytes);
        Ok(path)
    }

    /// Fan out one transcode unit per rendition and wait for all of
    /// them (full barrier). Individual failures are captured in the
    /// outcomes, never short-circuited.
    async fn transcode_all(&self, ctx: &JobContext, source: &Path) -> Vec<RenditionOutcome> {
        let units: Vec<(RenditionSpec, PathBuf)> = self
            .plan
            .iter()
            .map(|spec| {
                let output = ctx.work_path().join(rendition_file_name(spec));
                (spec.clone(), output)
            })
            .collect();

        let handles: Vec<_> = units
            .iter()
            .map(|(spec, output)| {
                let engine = Arc::clone(&self.engine);
                let source = source.to_path_buf();
                let spec = spec.clone();
                let output = output.clone();
                tokio::spawn(async move {
                    match engine.transcode(&source, &spec, &output).await {
                        Ok(()) => RenditionStatus::Completed,
                        Err(e) => RenditionStatus::Failed(e.to_string()),
                    }
                })
            })
            .collect();

        let results = join_all(handles).await;

        units
            .into_iter()
            .zip(results)
            .map(|((spec, path), result)| {
                let status = match result {
                    Ok(status) => status,
                    Err(e) => RenditionStatus::Failed(format!("transcode task panicked: {e}")),
                };
                RenditionOutcome { spec, path, status }
            })
            .collect()
    }

    /// Upload every rendition output under the job-unique prefix.
    /// Uploads run concurrently; all must succeed.
    async fn upload_all(&self, ctx: &JobContext, outcomes: &[RenditionOutcome]) -> WorkerResult<()> {
        let uploads = outcomes.iter().map(|outcome| {
            let file_name = outcome
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| outcome.spec.name.clone());
            let key = format!("{}/{}", ctx.job_prefix(), file_name);
            async move {
                self.store
                    .upload_file(&ctx.destination_bucket, &key, &outcome.path, OUTPUT_CONTENT_TYPE)
                    .await
            }
        });

        let results = join_all(uploads).await;
        for result in results {
            result.map_err(|e| WorkerError::upload(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use vtc_media::{MediaError, MediaResult};
    use vtc_models::default_plan;
    use vtc_storage::{StorageError, StorageResult};

    struct FakeStore {
        objects: HashMap<(String, String), Vec<u8>>,
        uploaded: Mutex<Vec<String>>,
        fail_uploads: bool,
    }

    impl FakeStore {
        fn with_source() -> Self {
            let mut objects = HashMap::new();
            objects.insert(
                ("src".to_string(), "video.mp4".to_string()),
                b"raw video bytes".to_vec(),
            );
            Self {
                objects,
                uploaded: Mutex::new(Vec::new()),
                fail_uploads: false,
            }
        }

        fn empty() -> Self {
            Self {
                objects: HashMap::new(),
                uploaded: Mutex::new(Vec::new()),
                fail_uploads: false,
            }
        }

        fn uploaded_keys(&self) -> Vec<String> {
            self.uploaded.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn download_file(
            &self,
            bucket: &str,
            key: &str,
            path: &Path,
        ) -> StorageResult<u64> {
            let data = self
                .objects
                .get(&(bucket.to_string(), key.to_string()))
                .ok_or_else(|| StorageError::not_found(key))?;
            tokio::fs::write(path, data).await?;
            Ok(data.len() as u64)
        }

        async fn upload_file(
            &self,
            _bucket: &str,
            key: &str,
            path: &Path,
            _content_type: &str,
        ) -> StorageResult<()> {
            if self.fail_uploads {
                return Err(StorageError::upload_failed("injected failure"));
            }
            assert!(path.exists(), "upload source must exist");
            self.uploaded.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    struct FakeEngine {
        fail_rendition: Option<String>,
    }

    impl FakeEngine {
        fn ok() -> Self {
            Self { fail_rendition: None }
        }

        fn failing_for(name: &str) -> Self {
            Self {
                fail_rendition: Some(name.to_string()),
            }
        }
    }

    #[async_trait]
    impl TranscodeEngine for FakeEngine {
        async fn transcode(
            &self,
            source: &Path,
            spec: &RenditionSpec,
            output: &Path,
        ) -> MediaResult<()> {
            assert!(source.exists(), "source must be fetched first");
            if self.fail_rendition.as_deref() == Some(spec.name.as_str()) {
                return Err(MediaError::ffmpeg_failed("injected failure", Some(1)));
            }
            tokio::fs::write(output, b"encoded").await?;
            Ok(())
        }
    }

    async fn context(root: &Path) -> JobContext {
        JobContext::create(StorageObjectRef::new("src", "video.mp4"), "dest", root)
            .await
            .unwrap()
    }

    fn runner(store: Arc<FakeStore>, engine: FakeEngine) -> JobRunner {
        JobRunner::new(store, Arc::new(engine), default_plan())
    }

    #[tokio::test]
    async fn test_success_uploads_all_renditions_under_job_prefix() {
        let root = TempDir::new().unwrap();
        let store = Arc::new(FakeStore::with_source());
        let r = runner(Arc::clone(&store), FakeEngine::ok());

        let ctx = context(root.path()).await;
        let prefix = ctx.job_prefix().to_string();

        let outcomes = r.run(&ctx).await.unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes
            .iter()
            .all(|o| o.status == RenditionStatus::Completed));

        let keys = store.uploaded_keys();
        assert_eq!(keys.len(), 3);
        for (key, name) in keys.iter().zip(["360p", "480p", "720p"]) {
            let (key_prefix, file) = key.split_once('/').unwrap();
            assert_eq!(key_prefix, prefix);
            let (numeral, rest) = file.split_once('-').unwrap();
            assert_eq!(numeral.len(), 6);
            assert!(numeral.chars().all(|c| c.is_ascii_digit()));
            assert_eq!(rest, format!("{name}.mp4"));
        }
    }

    #[tokio::test]
    async fn test_one_failed_rendition_fails_job_and_uploads_nothing() {
        let root = TempDir::new().unwrap();
        let store = Arc::new(FakeStore::with_source());
        let r = runner(Arc::clone(&store), FakeEngine::failing_for("480p"));

        let ctx = context(root.path()).await;
        let work_path = ctx.work_path().to_path_buf();

        let result = r.run(&ctx).await;
        assert!(
            matches!(result, Err(WorkerError::Transcode { ref failed }) if failed == &vec!["480p".to_string()])
        );
        assert!(store.uploaded_keys().is_empty());

        drop(ctx);
        assert!(!work_path.exists(), "work directory must be cleaned up");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fatal_and_cleans_up() {
        let root = TempDir::new().unwrap();
        let store = Arc::new(FakeStore::empty());
        let r = runner(Arc::clone(&store), FakeEngine::ok());

        let ctx = context(root.path()).await;
        let work_path = ctx.work_path().to_path_buf();

        let result = r.run(&ctx).await;
        assert!(matches!(result, Err(WorkerError::Fetch(_))));
        assert!(store.uploaded_keys().is_empty());

        drop(ctx);
        assert!(!work_path.exists());
    }

    #[tokio::test]
    async fn test_upload_failure_is_fatal_and_cleans_up() {
        let root = TempDir::new().unwrap();
        let mut store = FakeStore::with_source();
        store.fail_uploads = true;
        let store = Arc::new(store);
        let r = runner(Arc::clone(&store), FakeEngine::ok());

        let ctx = context(root.path()).await;
        let work_path = ctx.work_path().to_path_buf();

        let result = r.run(&ctx).await;
        assert!(matches!(result, Err(WorkerError::Upload(_))));

        drop(ctx);
        assert!(!work_path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_on_success_path() {
        let root = TempDir::new().unwrap();
        let store = Arc::new(FakeStore::with_source());
        let r = runner(Arc::clone(&store), FakeEngine::ok());

        let ctx = context(root.path()).await;
        let work_path = ctx.work_path().to_path_buf();

        r.run(&ctx).await.unwrap();

        drop(ctx);
        assert!(!work_path.exists());
    }

    #[tokio::test]
    async fn test_duplicate_jobs_for_same_source_never_collide() {
        let root = TempDir::new().unwrap();
        let store = Arc::new(FakeStore::with_source());
        let r = runner(Arc::clone(&store), FakeEngine::ok());

        let ctx_a = context(root.path()).await;
        let ctx_b = context(root.path()).await;
        assert_ne!(ctx_a.job_prefix(), ctx_b.job_prefix());

        r.run(&ctx_a).await.unwrap();
        r.run(&ctx_b).await.unwrap();

        let keys = store.uploaded_keys();
        assert_eq!(keys.len(), 6);
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), 6, "destination keys must be disjoint");
    }
}
