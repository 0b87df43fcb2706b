//! Notification dispatcher daemon.
//!
//! This crate provides:
//! - The queue polling loop with explicit cancellation points
//! - Notification parsing and per-object job submission
//! - Message deletion gated on full submission success

pub mod config;
pub mod dispatcher;
pub mod error;

pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use error::{DispatcherError, DispatcherResult};
