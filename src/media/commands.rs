use std::path::Path;

use crate::config::MediaConfig;
use crate::process::ToolCommand;

/// ffmpeg argument helpers
impl ToolCommand {
    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").path_arg(path)
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.path_arg(path)
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Add a filter graph
    pub fn filter_complex<S: Into<String>>(self, graph: S) -> Self {
        self.arg("-filter_complex").arg(graph)
    }

    /// Select a stream for the output
    pub fn map<S: Into<String>>(self, stream: S) -> Self {
        self.arg("-map").arg(stream)
    }

    /// End output with the shortest input
    pub fn shortest(self) -> Self {
        self.arg("-shortest")
    }
}

/// Builder for the pipeline's ffmpeg invocations
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Convert any media file into the WAV the separator consumes
    pub fn ingest_audio<P: AsRef<Path>>(&self, source_path: P, wav_path: P) -> ToolCommand {
        ToolCommand::new(&self.binary_path, "Audio ingest")
            .overwrite()
            .input(source_path)
            .arg("-vn")
            .arg("-f").arg("wav")
            .output(wav_path)
    }

    /// Loop a blurred still over the instrumental track
    pub fn blurred_still_background<P: AsRef<Path>>(
        &self,
        image_path: P,
        audio_path: P,
        output_path: P,
        config: &MediaConfig,
    ) -> ToolCommand {
        ToolCommand::new(&self.binary_path, "Blurred background")
            .arg("-loop").arg("1")
            .input(image_path)
            .input(audio_path)
            .filter_complex(format!("[0:v]gblur=sigma={}[v]", config.blur_sigma))
            .map("[v]")
            .map("1:a")
            .shortest()
            .overwrite()
            .output(output_path)
    }

    /// Pair a generated solid color track with the instrumental track
    pub fn solid_color_background<P: AsRef<Path>>(
        &self,
        audio_path: P,
        output_path: P,
        config: &MediaConfig,
    ) -> ToolCommand {
        ToolCommand::new(&self.binary_path, "Solid color background")
            .arg("-f").arg("lavfi")
            .arg("-i")
            .arg(format!("color=c={}:s={}", config.background_color, config.background_size))
            .input(audio_path)
            .shortest()
            .overwrite()
            .output(output_path)
    }

    /// Burn subtitles into the video, copying the audio stream
    pub fn burn_subtitles<P: AsRef<Path>>(
        &self,
        video_path: P,
        subtitle_path: P,
        output_path: P,
        config: &MediaConfig,
    ) -> ToolCommand {
        ToolCommand::new(&self.binary_path, "Subtitle burn-in")
            .input(&video_path)
            .video_filter(format!(
                "subtitles={}",
                escape_filter_value(&subtitle_path.as_ref().to_string_lossy())
            ))
            .video_codec(config.video_codec.clone())
            .copy_audio()
            // Add user-specified additional options
            .args(config.subtitle_options.iter().cloned())
            .overwrite()
            .output(output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> ToolCommand {
        ToolCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

/// Escape a filter option value for use inside a `-vf` filtergraph.
///
/// ffmpeg unescapes twice: once when splitting the graph into filters, then
/// again when splitting a filter's options. The value is escaped for the
/// option level first and the result again for the graph level.
pub fn escape_filter_value(value: &str) -> String {
    let option_level = escape_chars(value, &['\\', ':', '\'']);
    escape_chars(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
