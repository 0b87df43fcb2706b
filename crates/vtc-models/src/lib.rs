//! Shared data models for the transcode pipeline.
//!
//! This crate provides:
//! - Storage object references extracted from upload notifications
//! - Notification envelope parsing (including self-test filtering)
//! - Rendition specs and the deployment rendition plan
//! - The job launch contract between dispatcher and worker
//! - Encoding defaults shared by the FFmpeg wrapper

pub mod encoding;
pub mod job;
pub mod notification;
pub mod object_ref;
pub mod rendition;

// Re-export common types
pub use job::JobParams;
pub use notification::{parse_notification, ParseError, ParseResult, TEST_EVENT_SENTINEL};
pub use object_ref::StorageObjectRef;
pub use rendition::{default_plan, PlanError, RenditionPlan, RenditionSpec};
