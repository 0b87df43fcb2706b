//! Object storage client.
//!
//! This crate provides:
//! - The narrow [`ObjectStore`] capability the worker fetches and
//!   uploads through
//! - An S3-backed production implementation with download truncation
//!   checks

pub mod client;
pub mod error;

pub use client::{ObjectStore, S3Store};
pub use error::{StorageError, StorageResult};
