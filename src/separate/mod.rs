// Stem separation
//
// A separator splits the mixed track into a vocal stem and an instrumental
// stem. Tools write into their own nested output tree; implementations are
// responsible for leaving both stems flat in the working directory.

pub mod demucs;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::config::SeparatorConfig;
use crate::error::Result;
use crate::paths::WorkingPaths;

/// Stems left in the working directory after separation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemPaths {
    pub vocals: PathBuf,
    pub instrumental: PathBuf,
}

/// Main trait for stem separation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StemSeparatorTrait: Send + Sync {
    /// Separate `paths.mixed_audio()` into `paths.vocals()` and `paths.instrumental()`
    async fn separate(&self, paths: &WorkingPaths) -> Result<StemPaths>;

    /// Check if the separator can be launched
    async fn check_availability(&self) -> Result<()>;
}

/// Factory for creating separator instances
pub struct SeparatorFactory;

impl SeparatorFactory {
    pub fn create_default(config: SeparatorConfig) -> Box<dyn StemSeparatorTrait> {
        Box::new(demucs::DemucsSeparator::new(config))
    }
}
