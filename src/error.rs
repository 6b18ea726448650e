use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KaraokeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WAV codec error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Required input missing: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("External tool not available: {0}")]
    ToolUnavailable(String),

    #[error("{tool} failed with exit code {code:?}: {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Stem separation error: {0}")]
    Separator(String),

    #[error("Transcription error: {0}")]
    Transcriber(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Audio processing error: {0}")]
    Audio(String),

    #[error("Subtitle error: {0}")]
    Subtitle(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, KaraokeError>;

impl KaraokeError {
    /// Fail fast with `MissingInput` unless `path` exists
    pub fn require_file(path: &std::path::Path) -> Result<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(KaraokeError::MissingInput(path.to_path_buf()))
        }
    }
}
