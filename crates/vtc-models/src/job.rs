//! Job launch contract between dispatcher and worker.
//!
//! A worker invocation is configured entirely through environment-style
//! key/value parameters; these names are the contract.

use crate::object_ref::StorageObjectRef;

pub const ENV_SOURCE_BUCKET: &str = "SOURCE_BUCKET";
pub const ENV_SOURCE_KEY: &str = "SOURCE_KEY";
pub const ENV_DEST_BUCKET: &str = "DEST_BUCKET";

/// Parameters for one worker invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobParams {
    pub source: StorageObjectRef,
    pub destination_bucket: String,
}

impl JobParams {
    pub fn new(source: StorageObjectRef, destination_bucket: impl Into<String>) -> Self {
        Self {
            source,
            destination_bucket: destination_bucket.into(),
        }
    }

    /// Render as environment pairs for the launcher.
    pub fn to_env(&self) -> Vec<(String, String)> {
        vec![
            (ENV_SOURCE_BUCKET.to_string(), self.source.bucket.clone()),
            (ENV_SOURCE_KEY.to_string(), self.source.key.clone()),
            (ENV_DEST_BUCKET.to_string(), self.destination_bucket.clone()),
        ]
    }
}
