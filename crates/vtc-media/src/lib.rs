//! FFmpeg CLI wrapper for rendition transcoding.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A supervised runner with timeout support
//! - The [`TranscodeEngine`] capability one rendition conversion runs
//!   behind, with an FFmpeg-backed production implementation

pub mod command;
pub mod engine;
pub mod error;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use engine::{rendition_file_name, FfmpegEngine, TranscodeEngine};
pub use error::{MediaError, MediaResult};
