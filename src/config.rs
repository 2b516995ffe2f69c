//! Classifier configuration.
//!
//! Everything is optional; with no file every marker-less PNG is unknown and
//! every file in the input folder is sorted. A configuration file looks like:
//!
//! ```toml
//! [cards]
//! # Card families from other games, checked after the built-in ones.
//! extra_markers = ["AIS_Chara", "AIS_Clothes", "EroMakeChara"]
//!
//! [skip]
//! # Left where they are instead of going to not_png.
//! filenames = ["Thumbs.db", "desktop.ini"]
//! patterns = ["**/*.part"]
//! ```
//!
//! `skip.patterns` are globs matched against the path relative to the input
//! folder.

use crate::signature::SignatureDetector;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Problems with a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file is not valid TOML or has fields of the wrong type.
    Parse(String),
    /// A skip pattern is not a valid glob.
    BadPattern { pattern: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "Cannot read {}: {}", path.display(), source)
            }
            Self::Parse(reason) => write!(f, "Malformed configuration: {}", reason),
            Self::BadPattern { pattern, reason } => {
                write!(f, "Bad skip pattern '{}': {}", pattern, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cards: CardRules,
    #[serde(default)]
    pub skip: SkipRules,
}

/// Card detection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardRules {
    /// Markers for additional card families, in priority order.
    #[serde(default)]
    pub extra_markers: Vec<String>,
}

/// Files that are never classified.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkipRules {
    /// Exact file names, such as thumbnail caches the OS drops into folders.
    #[serde(default)]
    pub filenames: Vec<String>,
    /// Globs over the path relative to the input folder.
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Config {
    /// Loads `config_path` if given, else `~/.config/kkcards/config.toml` if it
    /// exists, else the defaults.
    ///
    /// The input folder itself is never searched: a file placed there would
    /// be sorted into `not_png` like any other.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::read(path);
        }

        match user_config_path() {
            Some(path) if path.is_file() => Self::read(&path),
            _ => Ok(Self::default()),
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Builds a detector with the built-in markers followed by `extra_markers`.
    ///
    /// Markers the detector refuses (duplicates, the studio marker, names that
    /// are not valid directory names) are skipped with a warning.
    pub fn detector(&self) -> SignatureDetector {
        let mut detector = SignatureDetector::new();
        for marker in &self.cards.extra_markers {
            if !detector.add_marker(marker) {
                warn!(marker = %marker, "ignoring extra card marker");
            }
        }
        detector
    }

    /// Compiles the skip rules.
    pub fn skip_list(&self) -> Result<SkipList, ConfigError> {
        let patterns = self
            .skip
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| ConfigError::BadPattern {
                    pattern: pattern.clone(),
                    reason: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SkipList {
            filenames: self.skip.filenames.iter().cloned().collect(),
            patterns,
        })
    }
}

fn user_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("kkcards")
            .join("config.toml"),
    )
}

/// Compiled [`SkipRules`].
#[derive(Debug, Clone, Default)]
pub struct SkipList {
    filenames: HashSet<String>,
    patterns: Vec<Pattern>,
}

impl SkipList {
    /// Whether the file at `relative_path` (relative to the input folder) is
    /// left out of classification.
    pub fn skips(&self, relative_path: &Path) -> bool {
        let name_matches = relative_path
            .file_name()
            .is_some_and(|name| self.filenames.contains(name.to_string_lossy().as_ref()));

        name_matches
            || self
                .patterns
                .iter()
                .any(|pattern| pattern.matches_path(relative_path))
    }
}
