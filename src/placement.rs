/// Placement of classified files inside the output tree.
///
/// This module maps a [`CardSignature`] to its directory under the output root,
/// creating only the directories along that branch, and moves files into place.
use crate::signature::CardSignature;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directory, relative to the output root, that receives every non-PNG file.
pub const NOT_PNG_DIR: &str = "not_png";

/// A single file that was moved into the output tree.
#[derive(Debug, Clone, Serialize)]
pub struct MoveRecord {
    /// Where the file was found.
    pub original_path: PathBuf,
    /// Where the file ended up.
    pub new_path: PathBuf,
    /// Destination relative to the output root, e.g. `KStudio/no_timeline`.
    pub placement: String,
    /// Whether a file of the same name was already there and got replaced.
    pub replaced: bool,
}

/// Errors that abort a classification run.
#[derive(Debug)]
pub enum ClassifyError {
    /// The input root is missing or is not a directory.
    InvalidInputRoot {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to create a directory in the output tree.
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to move a file into its target directory.
    FileMoveFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: std::io::Error,
    },
    /// The input tree could not be walked.
    TraversalFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInputRoot { path, source } => {
                write!(f, "Invalid input folder {}: {}", path.display(), source)
            }
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::FileMoveFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::TraversalFailed { path, source } => {
                write!(f, "Failed to read folder {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ClassifyError {}

/// Result type for classification operations.
pub type ClassifyResult<T> = Result<T, ClassifyError>;

/// Returns the target directory for `signature` under `output_root`, creating it
/// and any missing parents.
///
/// Only the branch being used is created; calling this again for the same
/// signature returns the same path without error.
pub fn resolve_target_dir(
    signature: &CardSignature,
    output_root: &Path,
) -> ClassifyResult<PathBuf> {
    let target = output_root.join(signature.relative_dir());
    ensure_dir(&target)?;
    Ok(target)
}

/// Creates `dir` and its parents if they do not exist yet.
pub fn ensure_dir(dir: &Path) -> ClassifyResult<()> {
    fs::create_dir_all(dir).map_err(|e| ClassifyError::DirectoryCreationFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Moves `file_path` into `target_dir`, keeping its file name.
///
/// The target directory is created first if it is missing. A file with the
/// same name already in `target_dir` is replaced, which is logged and flagged
/// on the returned record. `output_root` is only used to record the placement
/// label.
pub fn move_into(
    file_path: &Path,
    target_dir: &Path,
    output_root: &Path,
) -> ClassifyResult<MoveRecord> {
    ensure_dir(target_dir)?;

    let file_name = file_path
        .file_name()
        .ok_or_else(|| ClassifyError::FileMoveFailure {
            source: file_path.to_path_buf(),
            destination: target_dir.to_path_buf(),
            source_error: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "file has no name component",
            ),
        })?;

    let destination_path = target_dir.join(file_name);
    let replaced = destination_path.symlink_metadata().is_ok();
    if replaced {
        warn!(
            from = %file_path.display(),
            to = %destination_path.display(),
            "replacing a file with the same name"
        );
    }

    fs::rename(file_path, &destination_path).map_err(|e| ClassifyError::FileMoveFailure {
        source: file_path.to_path_buf(),
        destination: destination_path.clone(),
        source_error: e,
    })?;

    Ok(MoveRecord {
        original_path: file_path.to_path_buf(),
        new_path: destination_path,
        placement: placement_label(target_dir, output_root),
        replaced,
    })
}

/// Renders `target_dir` relative to `output_root` with forward slashes.
fn placement_label(target_dir: &Path, output_root: &Path) -> String {
    let relative = target_dir.strip_prefix(output_root).unwrap_or(target_dir);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
