//! Exclusively owned job work directory.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::WorkerResult;

/// Uniquely named directory owned by exactly one job.
///
/// Removal is tied to `Drop`, so once the directory exists it is
/// cleaned up on every exit path. The directory name doubles as the
/// job-unique destination prefix, which keeps concurrent or duplicate
/// runs for the same source from colliding in the destination
/// namespace.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Create a fresh `job-<uuid>` directory under `root`.
    pub async fn create(root: &Path) -> WorkerResult<Self> {
        let path = root.join(format!("job-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&path).await?;
        debug!("Created work directory {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory name, used as the destination key prefix.
    pub fn job_prefix(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("job")
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove work directory {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let workdir = WorkDir::create(root.path()).await.unwrap();
        let path = workdir.path().to_path_buf();

        tokio::fs::write(path.join("output.mp4"), b"data").await.unwrap();
        assert!(path.exists());

        drop(workdir);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_prefixes_are_unique() {
        let root = TempDir::new().unwrap();
        let a = WorkDir::create(root.path()).await.unwrap();
        let b = WorkDir::create(root.path()).await.unwrap();
        assert_ne!(a.job_prefix(), b.job_prefix());
        assert!(a.job_prefix().starts_with("job-"));
    }
}
