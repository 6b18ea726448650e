use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, KaraokeError};

/// Environment variable naming the pipeline's working directory
pub const WORK_DIR_ENV: &str = "KARAOKIFY_WORK_DIR";

/// Configuration file looked up in the current directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "karaokify.toml";

fn default_blur_sigma() -> f64 {
    20.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub separator: SeparatorConfig,
    #[serde(default)]
    pub transcriber: TranscriberConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Working directory used when the environment variable is not set
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparatorConfig {
    /// Path to the stem separator binary (demucs)
    pub binary_path: String,
    /// Separation model; also the first directory level of the separator output tree
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Path to the openai-whisper command line tool
    pub binary_path: String,
    /// Model size passed to the transcriber
    pub model: String,
    /// Source language hint; detected by the model when unset
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Gaussian blur sigma applied to the background still
    #[serde(default = "default_blur_sigma")]
    pub blur_sigma: f64,
    /// Color of the background when no still image exists
    pub background_color: String,
    /// Resolution of the solid color background
    pub background_size: String,
    /// Encoder used when burning subtitles in
    pub video_codec: String,
    /// Additional encoding options for subtitle burn-in
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    pub subtitle_options: Vec<String>,
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            binary_path: "demucs".to_string(),
            model: "htdemucs".to_string(),
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper".to_string(),
            model: "base".to_string(),
            language: None,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            blur_sigma: default_blur_sigma(),
            background_color: "black".to_string(),
            background_size: "1280x720".to_string(),
            video_codec: "libx264".to_string(),
            subtitle_options: vec![],
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| KaraokeError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| KaraokeError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| KaraokeError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| KaraokeError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Resolve the working directory from the process environment
    pub fn resolve_work_dir(&self) -> Result<PathBuf> {
        self.resolve_work_dir_with(std::env::var(WORK_DIR_ENV).ok())
    }

    /// Resolve the working directory, preferring `env_value` over `workspace.base_dir`
    pub fn resolve_work_dir_with(&self, env_value: Option<String>) -> Result<PathBuf> {
        match env_value.filter(|v| !v.trim().is_empty()) {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => self.workspace.base_dir.clone().ok_or_else(|| {
                KaraokeError::Config(format!(
                    "Working directory not configured: set {} or workspace.base_dir",
                    WORK_DIR_ENV
                ))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("karaokify.toml");
        std::fs::write(
            &path,
            "[media]\nbinary_path = \"/opt/ffmpeg\"\nbackground_color = \"navy\"\n\
             background_size = \"1920x1080\"\nvideo_codec = \"libx265\"\nsubtitle_options = []\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.media.binary_path, "/opt/ffmpeg");
        assert_eq!(config.media.blur_sigma, 20.0);
        assert_eq!(config.transcriber.model, "base");
        assert_eq!(config.separator.model, "htdemucs");
        assert!(config.workspace.base_dir.is_none());
    }

    #[test]
    fn test_partial_section() {
        let config: Config = toml::from_str("[transcriber]\nmodel = \"small\"\n").unwrap();
        assert_eq!(config.transcriber.model, "small");
        assert_eq!(config.transcriber.binary_path, "whisper");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.toml");
        let mut config = Config::default();
        config.transcriber.language = Some("pt".to_string());
        config.save_to_file(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.transcriber.language.as_deref(), Some("pt"));
    }

    #[test]
    fn test_work_dir_resolution_order() {
        let mut config = Config::default();
        assert!(matches!(
            config.resolve_work_dir_with(None),
            Err(KaraokeError::Config(_))
        ));

        config.workspace.base_dir = Some(PathBuf::from("/srv/karaoke"));
        assert_eq!(
            config.resolve_work_dir_with(None).unwrap(),
            PathBuf::from("/srv/karaoke")
        );
        assert_eq!(
            config.resolve_work_dir_with(Some("/tmp/job".to_string())).unwrap(),
            PathBuf::from("/tmp/job")
        );
        assert_eq!(
            config.resolve_work_dir_with(Some("  ".to_string())).unwrap(),
            PathBuf::from("/srv/karaoke")
        );
    }
}
