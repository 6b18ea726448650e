use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One recognized utterance, times in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new<S: Into<String>>(start: f64, end: f64, text: S) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Ordered utterances of one audio file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
    pub language: Option<String>,
}

impl Transcript {
    /// True when segment starts never decrease
    pub fn is_ordered(&self) -> bool {
        self.segments.windows(2).all(|w| w[0].start <= w[1].start)
    }
}

/// Trait for converting service-specific transcription formats to `Transcript`
pub trait TranscriptionMapper<T> {
    fn to_transcript(service_result: T) -> Result<Transcript>;
}
