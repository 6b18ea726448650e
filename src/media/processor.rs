use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use crate::config::MediaConfig;
use crate::error::{Result, KaraokeError};
use crate::process::ToolCommand;
use crate::progress::{ProgressRange, ProgressReporter};
use super::{MediaProcessorTrait, MediaCommandBuilder};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }

    /// Run `command` over `range`, fail on non-zero exit, then settle at the range end.
    ///
    /// Settling covers a tool that printed too few lines to reach the range
    /// end, so the burn-in phase always closes the stream with a single `100%`.
    async fn run_phase(
        &self,
        command: ToolCommand,
        reporter: &mut ProgressReporter,
        range: ProgressRange,
    ) -> Result<()> {
        let outcome = command.run_with_progress(reporter, range).await?;
        outcome.ensure_success(&command.description)?;
        reporter.set_absolute(range.end);
        Ok(())
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn ingest_audio(&self, source_path: &Path, wav_path: &Path) -> Result<()> {
        KaraokeError::require_file(source_path)?;
        info!("Converting {} to {}", source_path.display(), wav_path.display());

        self.command_builder
            .ingest_audio(source_path, wav_path)
            .execute()
            .await?;

        info!("Audio ingest completed");
        Ok(())
    }

    async fn build_background(
        &self,
        instrumental_path: &Path,
        image_path: &Path,
        output_path: &Path,
        reporter: &mut ProgressReporter,
        range: ProgressRange,
    ) -> Result<()> {
        KaraokeError::require_file(instrumental_path)?;

        let command = if image_path.exists() {
            info!("Building blurred background from {}", image_path.display());
            self.command_builder.blurred_still_background(
                image_path,
                instrumental_path,
                output_path,
                &self.config,
            )
        } else {
            info!(
                "No background still at {}, using {} {} color field",
                image_path.display(),
                self.config.background_size,
                self.config.background_color
            );
            self.command_builder.solid_color_background(
                instrumental_path,
                output_path,
                &self.config,
            )
        };

        self.run_phase(command, reporter, range).await?;

        info!("Background video written to {}", output_path.display());
        Ok(())
    }

    async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
        reporter: &mut ProgressReporter,
        range: ProgressRange,
    ) -> Result<()> {
        KaraokeError::require_file(video_path)?;
        KaraokeError::require_file(subtitle_path)?;
        info!(
            "Burning subtitles from {} into {} -> {}",
            subtitle_path.display(),
            video_path.display(),
            output_path.display()
        );

        let command = self.command_builder.burn_subtitles(
            video_path,
            subtitle_path,
            output_path,
            &self.config,
        );
        self.run_phase(command, reporter, range).await?;

        info!("Subtitle burn-in completed successfully");
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        let output = self.command_builder.version_check().execute().await?;
        let version_info = String::from_utf8_lossy(&output.stdout);
        let first_line = version_info.lines().next().unwrap_or("Unknown version");
        info!("Media processor is available: {}", first_line);
        Ok(())
    }
}
