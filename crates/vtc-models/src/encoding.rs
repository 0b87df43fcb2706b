//! Encoding defaults shared by the FFmpeg wrapper.

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Container extension for rendition outputs
pub const OUTPUT_EXTENSION: &str = "mp4";
/// Content type used when persisting rendition outputs
pub const OUTPUT_CONTENT_TYPE: &str = "video/mp4";
