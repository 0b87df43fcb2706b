//! Transcode engine capability and the FFmpeg implementation.

use std::path::Path;

use async_trait::async_trait;
use rand::Rng;
use tracing::{error, info};

use vtc_models::encoding::{
    DEFAULT_AUDIO_CODEC, DEFAULT_PRESET, DEFAULT_VIDEO_CODEC, OUTPUT_EXTENSION,
};
use vtc_models::RenditionSpec;

use crate::command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// One source-to-one-rendition conversion, run as a supervised unit.
///
/// The worker builds one unit per rendition and joins them with a full
/// barrier; tests substitute a fake engine.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Convert `source` into `output` per `spec`. The typed result is
    /// the terminal event of the invocation.
    async fn transcode(
        &self,
        source: &Path,
        spec: &RenditionSpec,
        output: &Path,
    ) -> MediaResult<()>;
}

/// Pick an output file name for one rendition of one job.
///
/// A uniformly drawn 6-digit numeral keeps sibling renditions of the
/// same job apart while staying human-scannable.
pub fn rendition_file_name(spec: &RenditionSpec) -> String {
    let numeral = rand::rng().random_range(100_000..=999_999);
    format!("{}-{}.{}", numeral, spec.name, OUTPUT_EXTENSION)
}

/// FFmpeg-backed transcode engine with fixed H.264/AAC codec selection.
pub struct FfmpegEngine {
    runner: FfmpegRunner,
}

impl FfmpegEngine {
    /// Create an engine whose invocations are killed after `secs`,
    /// verifying the ffmpeg binary is reachable.
    pub fn with_timeout(secs: u64) -> MediaResult<Self> {
        check_ffmpeg()?;
        Ok(Self {
            runner: FfmpegRunner::new().with_timeout(secs),
        })
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn transcode(
        &self,
        source: &Path,
        spec: &RenditionSpec,
        output: &Path,
    ) -> MediaResult<()> {
        info!(
            rendition = %spec.name,
            "Transcode started: {} -> {}",
            source.display(),
            output.display()
        );

        let mut cmd = FfmpegCommand::new(source, output)
            .video_filter(format!("scale={}:{}", spec.width, spec.height))
            .video_codec(DEFAULT_VIDEO_CODEC)
            .audio_codec(DEFAULT_AUDIO_CODEC)
            .preset(DEFAULT_PRESET);

        if let Some(bitrate) = &spec.bitrate {
            cmd = cmd.video_bitrate(bitrate);
        }

        match self.runner.run(&cmd).await {
            Ok(()) => {
                if !output.exists() {
                    let err = MediaError::OutputMissing(output.display().to_string());
                    error!(rendition = %spec.name, "Transcode failed: {}", err);
                    return Err(err);
                }
                info!(rendition = %spec.name, "Transcode completed: {}", output.display());
                Ok(())
            }
            Err(e) => {
                error!(rendition = %spec.name, "Transcode failed: {}", e);
                Err(e)
            }
        }
    }
}
