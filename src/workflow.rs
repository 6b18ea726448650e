use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{KaraokeError, Result};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait};
use crate::paths::WorkingPaths;
use crate::progress::{ProgressRange, ProgressReporter, TRANSCRIBED};
use crate::separate::{SeparatorFactory, StemSeparatorTrait};
use crate::subtitle::{synthesize, write_ass};
use crate::thumbnail::ThumbnailDownloader;
use crate::transcribe::{TranscriberFactory, TranscriberTrait};
use crate::vocals::clean_and_find_lead_in;

pub struct Workflow {
    paths: WorkingPaths,
    separator: Box<dyn StemSeparatorTrait>,
    transcriber: Box<dyn TranscriberTrait>,
    media: Box<dyn MediaProcessorTrait>,
}

impl Workflow {
    /// Build the pipeline over `paths` with the configured external tools
    pub fn new(config: &Config, paths: WorkingPaths) -> Self {
        Self::with_components(
            paths,
            SeparatorFactory::create_default(config.separator.clone()),
            TranscriberFactory::create_default(config.transcriber.clone()),
            MediaProcessorFactory::create_processor(config.media.clone()),
        )
    }

    pub fn with_components(
        paths: WorkingPaths,
        separator: Box<dyn StemSeparatorTrait>,
        transcriber: Box<dyn TranscriberTrait>,
        media: Box<dyn MediaProcessorTrait>,
    ) -> Self {
        Self {
            paths,
            separator,
            transcriber,
            media,
        }
    }

    pub fn paths(&self) -> &WorkingPaths {
        &self.paths
    }

    /// Convert an arbitrary media file into the working mixed track
    pub async fn ingest<P: AsRef<Path>>(&self, input_path: P) -> Result<()> {
        let input_path = input_path.as_ref();
        KaraokeError::require_file(input_path)?;
        fs::create_dir_all(self.paths.root()).await?;

        info!("Ingesting {}", input_path.display());
        self.media.ingest_audio(input_path, &self.paths.mixed_audio()).await
    }

    /// Download the background still; `false` when the server had none
    pub async fn fetch_thumbnail(&self, url: &str) -> Result<bool> {
        fs::create_dir_all(self.paths.root()).await?;
        ThumbnailDownloader::new()?
            .download(url, &self.paths.background_still())
            .await
    }

    /// Run every phase in order and return the final video's path.
    ///
    /// A failed phase aborts the run and leaves its partial files in place.
    pub async fn run(&self, reporter: &mut ProgressReporter) -> Result<PathBuf> {
        info!("Starting karaoke pipeline in {}", self.paths.root().display());

        // Step 1: Split the mixed track into stems
        let stems = self.separator.separate(&self.paths).await?;

        // Step 2: Background video matched to the instrumental
        let background_video = self.paths.background_video();
        self.media
            .build_background(
                &stems.instrumental,
                &self.paths.background_still(),
                &background_video,
                reporter,
                ProgressRange::BACKGROUND,
            )
            .await?;

        // Step 3: Find where singing starts on a cleaned copy of the vocals
        let vocals_path = stems.vocals.clone();
        let cleaned = tokio::task::spawn_blocking(move || clean_and_find_lead_in(vocals_path))
            .await
            .map_err(|e| KaraokeError::Audio(format!("Vocal cleaning task failed: {}", e)))??;

        // Step 4: Transcribe the raw vocals
        let transcript = self.transcriber.transcribe(&stems.vocals).await?;
        reporter.set_absolute(TRANSCRIBED);

        // Step 5: Subtitle timeline
        let cues = synthesize(&transcript.segments, cleaned.lead_in);
        let subtitles = self.paths.subtitles();
        write_ass(&cues, &subtitles).await?;

        // Step 6: Burn the lyrics in
        let final_video = self.paths.final_video();
        self.media
            .burn_subtitles(&background_video, &subtitles, &final_video, reporter, ProgressRange::FINAL)
            .await?;

        info!("Karaoke video written to {}", final_video.display());
        Ok(final_video)
    }

    /// Check every external tool, reporting the first failure
    pub async fn check_tools(&self) -> Result<()> {
        let results = vec![
            ("Stem separator", self.separator.check_availability().await),
            ("Transcriber", self.transcriber.check_availability().await),
            ("Media processor", self.media.check_availability().await),
        ];

        let mut first_error = None;
        for (name, result) in results {
            match result {
                Ok(()) => info!("{} is ready", name),
                Err(e) => {
                    error!("{} is not usable: {}", name, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Delete working artifacts that exist and return how many were removed
    pub async fn clean_working_files(&self, keep_video: bool) -> Result<usize> {
        let mut targets = self.paths.intermediates();
        if !keep_video {
            targets.push(self.paths.final_video());
        }

        let mut removed = 0;
        for path in targets {
            if path.is_file() {
                fs::remove_file(&path).await?;
                info!("Removed {}", path.display());
                removed += 1;
            }
        }

        let scratch = self.paths.separator_scratch();
        if scratch.is_dir() {
            fs::remove_dir_all(&scratch).await?;
            info!("Removed {}", scratch.display());
            removed += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    use crate::config::SeparatorConfig;
    use crate::separate::{MockStemSeparatorTrait, StemPaths};
    use crate::subtitle::parse_ass;
    use crate::transcribe::{MockTranscriberTrait, Transcript, TranscriptSegment};
    use crate::vocals::test_support::silence_then_tone;

    struct FakeSeparator;

    #[async_trait]
    impl StemSeparatorTrait for FakeSeparator {
        async fn separate(&self, paths: &WorkingPaths) -> Result<StemPaths> {
            KaraokeError::require_file(&paths.mixed_audio())?;
            silence_then_tone(16000, 1.0, 2.0, 0.5).write_wav(paths.vocals())?;
            silence_then_tone(16000, 0.0, 3.0, 0.3).write_wav(paths.instrumental())?;
            Ok(StemPaths {
                vocals: paths.vocals(),
                instrumental: paths.instrumental(),
            })
        }

        async fn check_availability(&self) -> Result<()> {
            Ok(())
        }
    }

    struct FakeTranscriber {
        seen: Arc<Mutex<Vec<PathBuf>>>,
    }

    #[async_trait]
    impl TranscriberTrait for FakeTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
            self.seen.lock().unwrap().push(audio_path.to_path_buf());
            Ok(Transcript {
                segments: vec![
                    TranscriptSegment::new(0.2, 1.6, " first"),
                    TranscriptSegment::new(1.5, 2.2, " second"),
                    TranscriptSegment::new(2.4, 3.0, " third"),
                ],
                language: Some("en".to_string()),
            })
        }

        async fn check_availability(&self) -> Result<()> {
            Err(KaraokeError::ToolUnavailable("whisper".to_string()))
        }
    }

    /// Emits ten heartbeats per phase, then snaps to the range end
    struct FakeMedia;

    impl FakeMedia {
        fn heartbeat(reporter: &mut ProgressReporter, range: ProgressRange) {
            for _ in 0..10 {
                reporter.advance(range.step(), range.end);
            }
            reporter.set_absolute(range.end);
        }
    }

    #[async_trait]
    impl MediaProcessorTrait for FakeMedia {
        async fn ingest_audio(&self, source_path: &Path, wav_path: &Path) -> Result<()> {
            std::fs::copy(source_path, wav_path)?;
            Ok(())
        }

        async fn build_background(
            &self,
            instrumental_path: &Path,
            _image_path: &Path,
            output_path: &Path,
            reporter: &mut ProgressReporter,
            range: ProgressRange,
        ) -> Result<()> {
            KaraokeError::require_file(instrumental_path)?;
            std::fs::write(output_path, b"video")?;
            Self::heartbeat(reporter, range);
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
            std::fs::write(output_path, b"video with lyrics")?;
            Self::heartbeat(reporter, range);
            Ok(())
        }

        async fn check_availability(&self) -> Result<()> {
            Ok(())
        }
    }

    fn fake_workflow(root: &Path, seen: Arc<Mutex<Vec<PathBuf>>>) -> Workflow {
        Workflow::with_components(
            WorkingPaths::new(root),
            Box::new(FakeSeparator),
            Box::new(FakeTranscriber { seen }),
            Box::new(FakeMedia),
        )
    }

    #[tokio::test]
    async fn test_full_pipeline_with_fake_tools() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let workflow = fake_workflow(dir.path(), seen.clone());
        std::fs::write(workflow.paths().mixed_audio(), b"mix").unwrap();

        let mut reporter = ProgressReporter::with_sink(Box::new(std::io::sink()));
        let final_video = workflow.run(&mut reporter).await.unwrap();

        assert_eq!(final_video, workflow.paths().final_video());
        assert!(final_video.exists());

        // Printed percentages strictly increase and end with a single 100
        let printed = reporter.reported();
        assert!(printed.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(printed.last(), Some(&100));
        assert_eq!(printed.iter().filter(|&&p| p == 100).count(), 1);
        assert!(printed.contains(&50));
        assert!(printed.contains(&75));

        // The raw stem is what gets transcribed
        assert_eq!(*seen.lock().unwrap(), vec![workflow.paths().vocals()]);

        let ass = std::fs::read_to_string(workflow.paths().subtitles()).unwrap();
        let cues = parse_ass(&ass).unwrap();
        assert_eq!(cues.len(), 3);
        assert!((cues[0].start - 1.0).abs() < 0.06, "lead-in was {}", cues[0].start);
        assert!(cues.windows(2).all(|w| w[0].end <= w[1].start));
    }

    #[tokio::test]
    async fn test_missing_mixed_track_fails_before_any_progress() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SeparatorConfig::default();
        config.binary_path = "karaokify-no-such-separator".to_string();
        let workflow = Workflow::with_components(
            WorkingPaths::new(dir.path()),
            SeparatorFactory::create_default(config),
            Box::new(FakeTranscriber { seen: Arc::default() }),
            Box::new(FakeMedia),
        );

        let mut reporter = ProgressReporter::with_sink(Box::new(std::io::sink()));
        let result = workflow.run(&mut reporter).await;

        assert!(matches!(result, Err(KaraokeError::MissingInput(_))));
        assert!(reporter.reported().is_empty());
        assert!(!workflow.paths().background_video().exists());
    }

    #[tokio::test]
    async fn test_ingest_writes_mixed_track() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("song.mp3");
        std::fs::write(&source, b"encoded").unwrap();
        let workflow = fake_workflow(&dir.path().join("work"), Arc::default());

        workflow.ingest(&source).await.unwrap();
        assert!(workflow.paths().mixed_audio().exists());

        let missing = workflow.ingest(dir.path().join("absent.mp3")).await;
        assert!(matches!(missing, Err(KaraokeError::MissingInput(_))));
    }

    #[tokio::test]
    async fn test_check_tools_reports_unusable_tool() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = fake_workflow(dir.path(), Arc::default());

        let result = workflow.check_tools().await;
        assert!(matches!(result, Err(KaraokeError::ToolUnavailable(name)) if name == "whisper"));
    }

    #[tokio::test]
    async fn test_transcriber_failure_stops_after_background() {
        let dir = tempfile::tempdir().unwrap();
        let mut transcriber = MockTranscriberTrait::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_| Err(KaraokeError::Transcriber("model crashed".to_string())));
        let workflow = Workflow::with_components(
            WorkingPaths::new(dir.path()),
            Box::new(FakeSeparator),
            Box::new(transcriber),
            Box::new(FakeMedia),
        );
        std::fs::write(workflow.paths().mixed_audio(), b"mix").unwrap();

        let mut reporter = ProgressReporter::with_sink(Box::new(std::io::sink()));
        let result = workflow.run(&mut reporter).await;

        assert!(matches!(result, Err(KaraokeError::Transcriber(_))));
        assert_eq!(reporter.reported().last(), Some(&50));
        // Partial files stay behind
        assert!(workflow.paths().background_video().exists());
        assert!(!workflow.paths().subtitles().exists());
    }

    #[tokio::test]
    async fn test_separator_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut separator = MockStemSeparatorTrait::new();
        separator.expect_separate().times(1).returning(|_| {
            Err(KaraokeError::ToolFailed {
                tool: "Stem separation".to_string(),
                code: Some(1),
                stderr: "out of memory".to_string(),
            })
        });
        let mut transcriber = MockTranscriberTrait::new();
        transcriber.expect_transcribe().never();
        let workflow = Workflow::with_components(
            WorkingPaths::new(dir.path()),
            Box::new(separator),
            Box::new(transcriber),
            Box::new(FakeMedia),
        );

        let mut reporter = ProgressReporter::with_sink(Box::new(std::io::sink()));
        let result = workflow.run(&mut reporter).await;

        assert!(matches!(result, Err(KaraokeError::ToolFailed { code: Some(1), .. })));
        assert!(reporter.reported().is_empty());
    }

    #[tokio::test]
    async fn test_clean_keeps_final_video_when_asked() {
        let temp = TempDir::new().unwrap();
        for name in ["vocals.wav", "no_vocals.wav", "lyrics.ass", "output_video_with_lyrics.mp4"] {
            temp.child(name).touch().unwrap();
        }
        temp.child("stems_output/htdemucs").create_dir_all().unwrap();
        let workflow = fake_workflow(temp.path(), Arc::default());

        let removed = workflow.clean_working_files(true).await.unwrap();
        assert_eq!(removed, 4);
        assert!(temp.child("output_video_with_lyrics.mp4").path().exists());
        assert!(!temp.child("vocals.wav").path().exists());
        assert!(!temp.child("stems_output").path().exists());

        assert_eq!(workflow.clean_working_files(false).await.unwrap(), 1);
        assert!(!temp.child("output_video_with_lyrics.mp4").path().exists());
    }
}
