use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::SeparatorConfig;
use crate::error::{Result, KaraokeError};
use crate::paths::{WorkingPaths, INSTRUMENTAL_FILE, VOCALS_FILE};
use crate::process::ToolCommand;
use super::{StemPaths, StemSeparatorTrait};

/// Stem demucs isolates; the rest of the mix becomes `no_vocals`
const TARGET_STEM: &str = "vocals";

/// Two-stem separation through the demucs command line tool
pub struct DemucsSeparator {
    config: SeparatorConfig,
}

impl DemucsSeparator {
    pub fn new(config: SeparatorConfig) -> Self {
        Self { config }
    }

    fn separation_command(&self, input: &Path, scratch: &Path) -> ToolCommand {
        ToolCommand::new(&self.config.binary_path, "Stem separation")
            .path_arg(input)
            .arg("--two-stems").arg(TARGET_STEM)
            .arg("-n").arg(self.config.model.clone())
            .arg("--out").path_arg(scratch)
    }
}

#[async_trait]
impl StemSeparatorTrait for DemucsSeparator {
    async fn separate(&self, paths: &WorkingPaths) -> Result<StemPaths> {
        let input = paths.mixed_audio();
        KaraokeError::require_file(&input)?;

        let scratch = paths.separator_scratch();
        fs::create_dir_all(&scratch).await?;

        info!("Separating {} into stems", input.display());
        self.separation_command(&input, &scratch).execute().await?;
        info!("Separation finished, stems written under {}", scratch.display());

        let basename = input
            .file_stem()
            .ok_or_else(|| KaraokeError::Separator("Invalid input filename".to_string()))?
            .to_string_lossy()
            .to_string();

        let stems = relocate_stems(
            &scratch,
            &self.config.model,
            &basename,
            paths.root(),
            &[VOCALS_FILE, INSTRUMENTAL_FILE],
        )
        .await?;

        fs::remove_dir_all(&scratch).await?;
        debug!("Removed separator scratch directory {}", scratch.display());

        let result = StemPaths {
            vocals: paths.vocals(),
            instrumental: paths.instrumental(),
        };
        for expected in [&result.vocals, &result.instrumental] {
            if !stems.contains(expected) {
                return Err(KaraokeError::Separator(format!(
                    "Separator did not produce {}",
                    expected.display()
                )));
            }
        }

        Ok(result)
    }

    async fn check_availability(&self) -> Result<()> {
        ToolCommand::new(&self.config.binary_path, "Separator check")
            .arg("--help")
            .execute()
            .await?;
        info!("Stem separator is available");
        Ok(())
    }
}

/// Locate the `{model}/{basename}/` directory under `scratch`.
///
/// Falls back to any directory named `basename` when the model directory
/// differs from the configured name.
pub fn locate_stem_dir(scratch: &Path, model: &str, basename: &str) -> Option<PathBuf> {
    let conventional = scratch.join(model).join(basename);
    if conventional.is_dir() {
        return Some(conventional);
    }

    WalkDir::new(scratch)
        .min_depth(1)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|entry| entry.file_type().is_dir() && entry.file_name() == basename)
        .map(|entry| entry.into_path())
}

/// Move every file of the nested stem directory into `destination`.
///
/// Returns the relocated paths. Fails if the directory cannot be found or a
/// required stem is missing from it.
pub async fn relocate_stems(
    scratch: &Path,
    model: &str,
    basename: &str,
    destination: &Path,
    required: &[&str],
) -> Result<Vec<PathBuf>> {
    let stem_dir = locate_stem_dir(scratch, model, basename).ok_or_else(|| {
        KaraokeError::Separator(format!(
            "Separator output directory {} not found",
            scratch.join(model).join(basename).display()
        ))
    })?;

    for name in required {
        if !stem_dir.join(name).is_file() {
            return Err(KaraokeError::MissingInput(stem_dir.join(name)));
        }
    }

    let shown_dir = pathdiff::diff_paths(&stem_dir, destination).unwrap_or_else(|| stem_dir.clone());
    let mut moved = Vec::new();
    let mut entries = fs::read_dir(&stem_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let target = destination.join(entry.file_name());
        move_file(&entry.path(), &target).await?;

        info!(
            "Moved {} from {} into {}",
            entry.file_name().to_string_lossy(),
            shown_dir.display(),
            destination.display()
        );
        moved.push(target);
    }

    Ok(moved)
}

/// Rename, or copy and delete when crossing filesystems
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }

    warn!("Rename of {} failed, copying instead", from.display());
    fs::copy(from, to).await?;
    fs::remove_file(from).await?;
    Ok(())
}
