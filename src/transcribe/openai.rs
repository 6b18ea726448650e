// OpenAI Whisper command line implementation

use async_trait::async_trait;
use std::path::Path;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TranscriberConfig;
use crate::error::{Result, KaraokeError};
use crate::process::ToolCommand;
use super::{Transcript, TranscriptSegment, TranscriberTrait, TranscriptionMapper};

/// OpenAI Whisper specific JSON output format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIWhisperOutput {
    pub text: String,
    pub segments: Vec<OpenAIWhisperSegment>,
    pub language: Option<String>,
}

/// OpenAI Whisper specific segment format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIWhisperSegment {
    pub id: u64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub avg_logprob: Option<f64>,
    pub no_speech_prob: Option<f64>,
}

/// Mapper for OpenAI Whisper format
pub struct OpenAIWhisperMapper;

impl TranscriptionMapper<OpenAIWhisperOutput> for OpenAIWhisperMapper {
    fn to_transcript(whisper_output: OpenAIWhisperOutput) -> Result<Transcript> {
        let segments = whisper_output
            .segments
            .into_iter()
            .map(|seg| TranscriptSegment::new(seg.start, seg.end, seg.text))
            .collect();

        Ok(Transcript {
            segments,
            language: whisper_output.language,
        })
    }
}

/// OpenAI Whisper implementation
pub struct OpenAITranscriber {
    config: TranscriberConfig,
}

impl OpenAITranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    fn transcription_command(&self, audio_path: &Path, output_dir: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.config.binary_path, "Transcription")
            .path_arg(audio_path)
            .arg("--model").arg(self.config.model.clone())
            .arg("--output_dir").path_arg(output_dir)
            .arg("--output_format").arg("json")
            .arg("--verbose").arg("False");

        if let Some(lang) = &self.config.language {
            cmd = cmd.arg("--language").arg(lang.clone());
        }
        cmd
    }

    /// Parse the JSON document whisper writes next to its other outputs
    pub fn parse_output(json_content: &str) -> Result<Transcript> {
        let whisper_output: OpenAIWhisperOutput = serde_json::from_str(json_content)
            .map_err(|e| KaraokeError::Transcriber(format!("Failed to parse Whisper JSON: {}", e)))?;
        OpenAIWhisperMapper::to_transcript(whisper_output)
    }
}

#[async_trait]
impl TranscriberTrait for OpenAITranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        KaraokeError::require_file(audio_path)?;
        info!("Transcribing {} with model {}", audio_path.display(), self.config.model);

        // Create temporary output directory for whisper results
        let temp_dir = tempfile::tempdir()
            .map_err(|e| KaraokeError::Transcriber(format!("Failed to create temp directory: {}", e)))?;
        let output_dir = temp_dir.path();

        self.transcription_command(audio_path, output_dir).execute().await?;

        let audio_filename = audio_path
            .file_stem()
            .ok_or_else(|| KaraokeError::Transcriber("Invalid audio filename".to_string()))?;
        let json_file = output_dir.join(format!("{}.json", audio_filename.to_string_lossy()));
        debug!("Reading transcription from {}", json_file.display());

        let json_content = tokio::fs::read_to_string(&json_file)
            .await
            .map_err(|e| KaraokeError::Transcriber(format!("Failed to read output: {}", e)))?;

        let transcript = Self::parse_output(&json_content)?;
        if !transcript.is_ordered() {
            warn!("Transcription segments are not ordered by start time");
        }

        info!(
            "Transcription produced {} segments (language: {})",
            transcript.segments.len(),
            transcript.language.as_deref().unwrap_or("unknown")
        );
        Ok(transcript)
    }

    async fn check_availability(&self) -> Result<()> {
        ToolCommand::new(&self.config.binary_path, "Transcriber check")
            .arg("--help")
            .execute()
            .await?;
        info!("Transcriber is available");
        Ok(())
    }
}
