//! kkcards - sorts character and studio card files by their embedded signature
//!
//! This library scans card PNGs for the marker strings their game writes into
//! them, works out the card family (and, for studio scenes, the timeline kind
//! and clip length), and moves each file into a matching folder under
//! `<input>/classified`.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod output;
pub mod placement;
pub mod signature;

pub use classifier::{
    COMPLETE_MESSAGE, Classifier, ClassifySummary, OUTPUT_DIR_NAME, PlannedMove, classify,
    has_eligible_files,
};
pub use config::{Config, ConfigError, SkipList};
pub use placement::{ClassifyError, ClassifyResult, MoveRecord, resolve_target_dir};
pub use signature::{CardKind, CardSignature, SignatureDetector, Timeline};

pub use cli::{ClassifyCommand, run_cli};
