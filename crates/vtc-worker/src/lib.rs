//! Single-job transcode worker.
//!
//! This crate provides:
//! - The per-job pipeline: fetch, fan-out transcode, fan-in, upload
//! - An exclusively owned work directory removed on every exit path
//! - Job outcome surfaced solely through the process exit status

pub mod config;
pub mod error;
pub mod job;
pub mod workdir;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use job::{JobContext, JobRunner, RenditionOutcome, RenditionStatus};
pub use workdir::WorkDir;
