/*!
 * On-disk progress checkpoints.
 *
 * A checkpoint lives next to the output as `<output without extension>.progress`
 * and holds the blocks translated so far in the same serialization as the
 * final output. Its presence means a job can be resumed.
 */

use std::path::{Path, PathBuf};

use log::debug;

use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::subtitle_codec::{self, SubtitleBlock};

/// Extension used for checkpoint files
pub const PROGRESS_EXTENSION: &str = "progress";

/// Checkpoint file owned by a single job
#[derive(Debug, Clone)]
pub struct ProgressFile {
    path: PathBuf,
}

impl ProgressFile {
    /// Checkpoint location for `output_path`
    pub fn for_output<P: AsRef<Path>>(output_path: P) -> Self {
        Self {
            path: output_path.as_ref().with_extension(PROGRESS_EXTENSION),
        }
    }

    /// Path of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a checkpoint exists on disk
    pub fn exists(&self) -> bool {
        FileManager::file_exists(&self.path)
    }

    /// Read the checkpoint back; `None` when absent
    pub fn load(&self) -> Result<Option<Vec<SubtitleBlock>>, TranslationError> {
        if !self.exists() {
            return Ok(None);
        }

        let content = FileManager::read_to_string(&self.path)
            .map_err(|e| TranslationError::File(e.to_string()))?;
        let blocks = subtitle_codec::extract_blocks(&content);
        debug!("Read {} block(s) from {}", blocks.len(), self.path.display());
        Ok(Some(blocks))
    }

    /// Replace the checkpoint with `blocks`
    pub fn save(&self, blocks: &[SubtitleBlock]) -> Result<(), TranslationError> {
        FileManager::write_atomic(&self.path, &subtitle_codec::serialize(blocks))
            .map_err(|e| TranslationError::File(e.to_string()))
    }

    /// Delete the checkpoint if present
    pub fn remove(&self) -> Result<(), TranslationError> {
        if self.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
