//! Notification queue client.
//!
//! This crate provides:
//! - The narrow [`MessageQueue`] capability the dispatcher polls against
//! - An SQS-backed production implementation
//! - Single-use receipt tokens enforced by ownership

pub mod error;
pub mod message;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use message::{QueueMessage, ReceiptToken};
pub use queue::{MessageQueue, SqsConfig, SqsQueue};
