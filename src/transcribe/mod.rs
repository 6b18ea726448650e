// Modular transcription architecture
//
// Transcribers turn an audio file into ordered, timed text segments:
// - OpenAI: the openai-whisper command line tool
//
// To add a new transcription service:
// 1. Create service-specific data structures for parsing its output
// 2. Implement TranscriptionMapper for them
// 3. Add the service to TranscriberImplementation
// 4. Update the factory to create your implementation

pub mod common;
pub mod openai;

use async_trait::async_trait;
use std::path::Path;

pub use common::*;
use crate::config::TranscriberConfig;
use crate::error::Result;

/// Main trait for transcription operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriberTrait: Send + Sync {
    /// Transcribe audio file into ordered segments
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript>;

    /// Check if the transcriber can be launched
    async fn check_availability(&self) -> Result<()>;
}

/// Transcriber implementation type
#[derive(Debug, Clone)]
pub enum TranscriberImplementation {
    OpenAI,
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_transcriber(
        implementation: TranscriberImplementation,
        config: TranscriberConfig,
    ) -> Box<dyn TranscriberTrait> {
        match implementation {
            TranscriberImplementation::OpenAI => Box::new(openai::OpenAITranscriber::new(config)),
        }
    }

    pub fn create_default(config: TranscriberConfig) -> Box<dyn TranscriberTrait> {
        Self::create_transcriber(TranscriberImplementation::OpenAI, config)
    }
}
