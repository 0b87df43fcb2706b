//! Storage object references.

use serde::{Deserialize, Serialize};

/// A single object within one storage service.
///
/// Immutable once extracted from a notification; cloning is cheap
/// enough for the job fan-out paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageObjectRef {
    /// Bucket the object lives in
    pub bucket: String,
    /// Object key within the bucket
    pub key: String,
}

impl StorageObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for StorageObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}
