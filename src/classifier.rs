//! Classification engine.
//!
//! Walks an input folder, detects the signature of every PNG and moves each
//! file into the output tree at `<input>/classified`. Everything already under
//! a `classified` directory is skipped, so a folder can be classified again
//! after new files are dropped into it.
//!
//! The engine is synchronous and runs one file at a time. Callers that need to
//! stay responsive should run it on a worker thread and forward the progress
//! and status callbacks themselves.

use crate::config::{Config, ConfigError, SkipList};
use crate::placement::{
    ClassifyError, ClassifyResult, MoveRecord, NOT_PNG_DIR, ensure_dir, move_into,
    resolve_target_dir,
};
use crate::signature::{CardSignature, SignatureDetector};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Name of the output directory created inside the input folder.
pub const OUTPUT_DIR_NAME: &str = "classified";

/// Status message sent once every file has been handled.
pub const COMPLETE_MESSAGE: &str = "Classification complete!";

/// Outcome of a completed classification run.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifySummary {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    /// Files counted before the run started.
    pub total_files: usize,
    /// Files actually moved.
    pub moved_files: usize,
    /// PNGs that could not be read and were filed as unknown.
    pub unreadable_files: usize,
    /// Moves that replaced an earlier file of the same name in the output tree.
    pub replaced_files: usize,
    /// Number of files moved into each placement, keyed like `KStudio/no_timeline`.
    pub placements: BTreeMap<String, usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ClassifySummary {
    fn record(&mut self, record: &MoveRecord) {
        self.moved_files += 1;
        if record.replaced {
            self.replaced_files += 1;
        }
        *self.placements.entry(record.placement.clone()).or_insert(0) += 1;
    }
}

/// Where a file would go, as reported by [`Classifier::preview`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedMove {
    pub path: PathBuf,
    /// Destination relative to the output root.
    pub placement: String,
}

/// Classifies and relocates card files.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    detector: SignatureDetector,
    skip: SkipList,
}

impl Classifier {
    /// Creates a classifier from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured skip pattern does not compile.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            detector: config.detector(),
            skip: config.skip_list()?,
        })
    }

    /// Returns the output root for `input_root`.
    pub fn output_root(input_root: &Path) -> PathBuf {
        input_root.join(OUTPUT_DIR_NAME)
    }

    /// Reports whether any PNG outside the output tree is waiting to be
    /// classified. Nothing is created or moved.
    pub fn has_eligible_files(&self, input_root: &Path) -> bool {
        self.eligible_files(input_root)
            .filter_map(Result::ok)
            .any(|path| is_png(&path))
    }

    /// Classifies every file under `input_root` and moves it into the output tree.
    ///
    /// After each file `on_progress` receives the percentage of files handled so
    /// far and `on_status` a `Processing: <name>` line. Once the walk is done
    /// `on_status` receives [`COMPLETE_MESSAGE`].
    ///
    /// A PNG that cannot be read is logged and filed under `Unknown_cards`.
    ///
    /// # Errors
    ///
    /// Fails if the input folder cannot be walked, a directory cannot be
    /// created or a file cannot be moved. Files moved before the failure stay
    /// where they were moved to.
    pub fn classify(
        &self,
        input_root: &Path,
        mut on_progress: Option<&mut dyn FnMut(u8)>,
        mut on_status: Option<&mut dyn FnMut(&str)>,
    ) -> ClassifyResult<ClassifySummary> {
        validate_input_root(input_root)?;

        let started_at = Utc::now();
        let output_root = Self::output_root(input_root);
        ensure_dir(&output_root)?;

        let total_files = self
            .eligible_files(input_root)
            .try_fold(0usize, |count, file| file.map(|_| count + 1))?;
        info!(input = %input_root.display(), total_files, "starting classification");

        let mut summary = ClassifySummary {
            input_root: input_root.to_path_buf(),
            output_root: output_root.clone(),
            total_files,
            moved_files: 0,
            unreadable_files: 0,
            replaced_files: 0,
            placements: BTreeMap::new(),
            started_at,
            finished_at: started_at,
        };

        for (index, file) in self.eligible_files(input_root).enumerate() {
            let file = file?;

            let target_dir = if is_png(&file) {
                let (signature, readable) = self.signature_of(&file, fs::read(&file));
                if !readable {
                    summary.unreadable_files += 1;
                }
                resolve_target_dir(&signature, &output_root)?
            } else {
                output_root.join(NOT_PNG_DIR)
            };

            let record = move_into(&file, &target_dir, &output_root)?;
            debug!(
                from = %record.original_path.display(),
                placement = %record.placement,
                "moved file"
            );
            summary.record(&record);

            if let Some(report) = on_progress.as_deref_mut() {
                report(progress_percent(index + 1, total_files));
            }
            if let Some(report) = on_status.as_deref_mut() {
                report(&format!("Processing: {}", display_name(&file)));
            }
        }

        summary.finished_at = Utc::now();
        info!(
            moved = summary.moved_files,
            unreadable = summary.unreadable_files,
            replaced = summary.replaced_files,
            "classification finished"
        );

        if let Some(report) = on_status.as_deref_mut() {
            report(COMPLETE_MESSAGE);
        }

        Ok(summary)
    }

    /// Works out where every eligible file would be placed without touching
    /// the filesystem.
    ///
    /// # Errors
    ///
    /// Fails if the input folder is missing or cannot be walked.
    pub fn preview(&self, input_root: &Path) -> ClassifyResult<Vec<PlannedMove>> {
        validate_input_root(input_root)?;

        self.eligible_files(input_root)
            .map(|file| {
                let path = file?;
                let placement = if is_png(&path) {
                    let (signature, _) = self.signature_of(&path, fs::read(&path));
                    signature.label()
                } else {
                    NOT_PNG_DIR.to_string()
                };
                Ok(PlannedMove { path, placement })
            })
            .collect()
    }

    /// Detects the signature of a PNG from the result of reading it.
    ///
    /// A read failure is logged and yields [`CardSignature::Unknown`]; the
    /// returned flag is `false` in that case.
    fn signature_of(&self, path: &Path, content: io::Result<Vec<u8>>) -> (CardSignature, bool) {
        match content {
            Ok(content) => (self.detector.detect(&content), true),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read file, filing as unknown");
                (CardSignature::Unknown, false)
            }
        }
    }

    /// Walks `input_root` in order, yielding every file outside output
    /// directories that is not on the skip list.
    fn eligible_files<'a>(
        &'a self,
        input_root: &'a Path,
    ) -> impl Iterator<Item = ClassifyResult<PathBuf>> + 'a {
        WalkDir::new(input_root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !is_output_dir(entry))
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    if !is_file_like(&entry) {
                        return None;
                    }
                    let path = entry.into_path();
                    let relative = path.strip_prefix(input_root).unwrap_or(&path);
                    let skipped = self.skip.skips(relative);
                    (!skipped).then_some(Ok(path))
                }
                Err(err) if err.depth() == 0 => {
                    let path = err.path().unwrap_or(input_root).to_path_buf();
                    Some(Err(ClassifyError::TraversalFailed {
                        path,
                        source: err.into(),
                    }))
                }
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry");
                    None
                }
            })
    }
}

/// Reports whether `input_root` holds any PNG waiting to be classified, using
/// the default configuration.
pub fn has_eligible_files(input_root: &Path) -> bool {
    Classifier::default().has_eligible_files(input_root)
}

/// Classifies `input_root` with the default configuration.
///
/// See [`Classifier::classify`].
pub fn classify(
    input_root: &Path,
    on_progress: Option<&mut dyn FnMut(u8)>,
    on_status: Option<&mut dyn FnMut(&str)>,
) -> ClassifyResult<ClassifySummary> {
    Classifier::default().classify(input_root, on_progress, on_status)
}

fn validate_input_root(input_root: &Path) -> ClassifyResult<()> {
    let metadata = fs::metadata(input_root).map_err(|e| ClassifyError::InvalidInputRoot {
        path: input_root.to_path_buf(),
        source: e,
    })?;
    if !metadata.is_dir() {
        return Err(ClassifyError::InvalidInputRoot {
            path: input_root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        });
    }
    Ok(())
}

fn is_output_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_type().is_dir() && entry.file_name() == OUTPUT_DIR_NAME
}

/// Regular files, and symlinks that do not point at a directory. Dangling
/// links count as files and are moved as links.
fn is_file_like(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && !entry.path().is_dir())
}

fn is_png(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().to_ascii_lowercase().ends_with(".png"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (processed * 100 / total).min(100) as u8
}
