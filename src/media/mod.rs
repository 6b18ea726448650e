// Media processing over ffmpeg
//
// - Commands: argument helpers and builders for every ffmpeg invocation
// - Processor: runs them, checks inputs first and exit status after

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;
use crate::progress::{ProgressRange, ProgressReporter};

/// Main trait for media processing operations
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Convert an arbitrary media file into the pipeline's mixed WAV input
    async fn ingest_audio(&self, source_path: &Path, wav_path: &Path) -> Result<()>;

    /// Build a video matched to the instrumental track, over a blurred
    /// still when `image_path` exists and a solid color otherwise
    async fn build_background(
        &self,
        instrumental_path: &Path,
        image_path: &Path,
        output_path: &Path,
        reporter: &mut ProgressReporter,
        range: ProgressRange,
    ) -> Result<()>;

    /// Burn a subtitle track onto the background video
    async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
        reporter: &mut ProgressReporter,
        range: ProgressRange,
    ) -> Result<()>;

    /// Check if media processor is available
    async fn check_availability(&self) -> Result<()>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
