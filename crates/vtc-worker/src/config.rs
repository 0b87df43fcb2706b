//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use vtc_models::job::{ENV_DEST_BUCKET, ENV_SOURCE_BUCKET, ENV_SOURCE_KEY};
use vtc_models::StorageObjectRef;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
///
/// The source/destination parameters arrive through the launcher's
/// environment overrides; the rest have local defaults.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Source object this invocation processes
    pub source: StorageObjectRef,
    /// Bucket rendition outputs are persisted to
    pub destination_bucket: String,
    /// Root under which the job's work directory is created
    pub work_dir: PathBuf,
    /// Per-rendition transcode timeout
    pub transcode_timeout: Duration,
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let source_bucket = std::env::var(ENV_SOURCE_BUCKET)
            .map_err(|_| WorkerError::config("SOURCE_BUCKET not set"))?;
        let source_key = std::env::var(ENV_SOURCE_KEY)
            .map_err(|_| WorkerError::config("SOURCE_KEY not set"))?;

        Ok(Self {
            source: StorageObjectRef::new(source_bucket, source_key),
            destination_bucket: std::env::var(ENV_DEST_BUCKET)
                .map_err(|_| WorkerError::config("DEST_BUCKET not set"))?,
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/vtc")),
            transcode_timeout: Duration::from_secs(
                std::env::var("WORKER_TRANSCODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
        })
    }
}
