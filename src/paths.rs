use std::path::{Path, PathBuf};

pub const MIXED_AUDIO_FILE: &str = "track.wav";
pub const BACKGROUND_STILL_FILE: &str = "thumb.png";
pub const VOCALS_FILE: &str = "vocals.wav";
pub const INSTRUMENTAL_FILE: &str = "no_vocals.wav";
pub const BACKGROUND_VIDEO_FILE: &str = "blurred_video.mp4";
pub const SUBTITLE_FILE: &str = "lyrics.ass";
pub const FINAL_VIDEO_FILE: &str = "output_video_with_lyrics.mp4";
pub const SEPARATOR_SCRATCH_DIR: &str = "stems_output";

/// Well-known artifact locations of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingPaths {
    root: PathBuf,
}

impl WorkingPaths {
    /// Bind the artifact names to `root`.
    ///
    /// The directory is not locked. Two pipelines sharing a root overwrite each
    /// other's intermediates, so callers must give every concurrent run its own.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mixed_audio(&self) -> PathBuf {
        self.root.join(MIXED_AUDIO_FILE)
    }

    pub fn background_still(&self) -> PathBuf {
        self.root.join(BACKGROUND_STILL_FILE)
    }

    pub fn vocals(&self) -> PathBuf {
        self.root.join(VOCALS_FILE)
    }

    pub fn instrumental(&self) -> PathBuf {
        self.root.join(INSTRUMENTAL_FILE)
    }

    pub fn background_video(&self) -> PathBuf {
        self.root.join(BACKGROUND_VIDEO_FILE)
    }

    pub fn subtitles(&self) -> PathBuf {
        self.root.join(SUBTITLE_FILE)
    }

    pub fn final_video(&self) -> PathBuf {
        self.root.join(FINAL_VIDEO_FILE)
    }

    pub fn separator_scratch(&self) -> PathBuf {
        self.root.join(SEPARATOR_SCRATCH_DIR)
    }

    /// Every artifact a run leaves behind except the final video
    pub fn intermediates(&self) -> Vec<PathBuf> {
        vec![
            self.mixed_audio(),
            self.instrumental(),
            self.vocals(),
            self.background_still(),
            self.background_video(),
            self.subtitles(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intermediates_exclude_final_video() {
        let paths = WorkingPaths::new("/work");
        let intermediates = paths.intermediates();
        assert_eq!(intermediates.len(), 6);
        assert!(!intermediates.contains(&paths.final_video()));
        assert!(intermediates.contains(&PathBuf::from("/work/lyrics.ass")));
    }
}
