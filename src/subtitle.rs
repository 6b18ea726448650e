use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{KaraokeError, Result};
use crate::transcribe::TranscriptSegment;

/// Minimum gap kept between a cue's end and the next cue's start, in seconds
pub const MIN_CUE_GAP: f64 = 0.1;

const SCRIPT_INFO: &str = "[Script Info]\n\
Title: Karaoke Subtitles\n\
Original Script: Subtitle Script\n\
ScriptType: v4.00+\n\
Collisions: Normal\n\n";

const STYLES: &str = "[V4+ Styles]\n\
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
Style: Default,Arial,24,&H00FFFFFF,&H00000000,&H00000000,&H00000000,-1,0,1,1,1,5,10,10,30,1\n\n";

const EVENTS: &str = "[Events]\n\
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n";

const DIALOGUE_PREFIX: &str = "Dialogue: ";

/// One displayed line of lyrics, times in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Derive one cue per segment.
///
/// The first cue starts at `lead_in`. Every cue except the last ends at least
/// `MIN_CUE_GAP` before the next segment starts. Line breaks inside a
/// segment's text are flattened to spaces.
pub fn synthesize(segments: &[TranscriptSegment], lead_in: f64) -> Vec<SubtitleCue> {
    let cues: Vec<SubtitleCue> = segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let start = if i == 0 { lead_in } else { segment.start };
            let end = match segments.get(i + 1) {
                Some(next) => segment.end.min(next.start - MIN_CUE_GAP),
                None => segment.end,
            };
            if end < start {
                warn!("Cue {} ends before it starts ({:.2}s < {:.2}s)", i, end, start);
            }
            SubtitleCue {
                start,
                end,
                text: flatten_text(&segment.text),
            }
        })
        .collect();

    debug!("Synthesized {} cues with lead-in {:.2}s", cues.len(), lead_in);
    cues
}

fn flatten_text(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Format seconds as `H:MM:SS.CC`, truncating to centiseconds
pub fn format_ass_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let centis = ((seconds % 1.0) * 100.0) as u64;
    let whole = seconds as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, centis)
}

/// Parse an `H:MM:SS.CC` timestamp back into seconds
pub fn parse_ass_time(value: &str) -> Result<f64> {
    let invalid = || KaraokeError::Subtitle(format!("Invalid ASS timestamp: {}", value));

    let mut parts = value.trim().splitn(3, ':');
    let (Some(h), Some(m), Some(s)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let hours: u64 = h.parse().map_err(|_| invalid())?;
    let minutes: u64 = m.parse().map_err(|_| invalid())?;
    let secs: f64 = s.parse().map_err(|_| invalid())?;

    Ok((hours * 3600 + minutes * 60) as f64 + secs)
}

/// Serialize cues to an ASS document with a single default style
pub fn to_ass_string(cues: &[SubtitleCue]) -> String {
    let mut content = String::with_capacity(SCRIPT_INFO.len() + STYLES.len() + EVENTS.len() + cues.len() * 64);
    content.push_str(SCRIPT_INFO);
    content.push_str(STYLES);
    content.push_str(EVENTS);

    for cue in cues {
        content.push_str(&format!(
            "{}0,{},{},Default,,0,0,0,,{}\n",
            DIALOGUE_PREFIX,
            format_ass_time(cue.start),
            format_ass_time(cue.end),
            cue.text
        ));
    }
    content
}

/// Read the dialogue lines of an ASS document back into cues
pub fn parse_ass(content: &str) -> Result<Vec<SubtitleCue>> {
    let mut cues = Vec::new();
    for line in content.lines() {
        let Some(fields) = line.strip_prefix(DIALOGUE_PREFIX) else {
            continue;
        };
        let fields: Vec<&str> = fields.splitn(10, ',').collect();
        if fields.len() != 10 {
            return Err(KaraokeError::Subtitle(format!("Malformed dialogue line: {}", line)));
        }
        cues.push(SubtitleCue {
            start: parse_ass_time(fields[1])?,
            end: parse_ass_time(fields[2])?,
            text: fields[9].to_string(),
        });
    }
    Ok(cues)
}

/// Write cues to an ASS subtitle file
pub async fn write_ass<P: AsRef<Path>>(cues: &[SubtitleCue], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating ASS file: {}", output_path.display());

    fs::write(output_path, to_ass_string(cues)).await?;

    info!("ASS file generated with {} cues", cues.len());
    Ok(())
}
