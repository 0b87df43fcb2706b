//! Worker job launcher.
//!
//! This crate provides:
//! - The narrow [`JobLauncher`] capability the dispatcher submits
//!   worker invocations through
//! - An ECS-backed production implementation (one Fargate task per job)

pub mod ecs;
pub mod error;

pub use ecs::{EcsConfig, EcsLauncher, JobLauncher, LaunchRequest};
pub use error::{LaunchError, LaunchResult};
