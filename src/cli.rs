//! Command-line interface module for kkcards.
//!
//! This module turns parsed arguments into calls on the [`Classifier`]:
//! - Configuration loading
//! - The "nothing to do" check before any folder is created
//! - Classification with a live progress bar
//! - Dry-run previews
//! - Summary output, as a table or JSON

use crate::classifier::{Classifier, ClassifySummary, PlannedMove};
use crate::config::Config;
use crate::output::OutputFormatter;
use clap::Parser;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Sort card PNGs into folders by the signature embedded in them.
#[derive(Debug, Parser)]
#[command(name = "kkcards", version, about)]
pub struct Cli {
    /// Folder containing the cards to sort.
    pub dir: PathBuf,

    /// Show where each file would go without moving anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Path to a TOML configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the result as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Copy)]
pub enum ClassifyCommand {
    /// Classify and move files.
    Classify,
    /// Report planned placements without moving files.
    Preview,
}

impl Cli {
    /// Returns the command selected by the flags.
    pub fn command(&self) -> ClassifyCommand {
        if self.dry_run {
            ClassifyCommand::Preview
        } else {
            ClassifyCommand::Classify
        }
    }
}

/// Runs a command against `dir_path`.
///
/// # Examples
///
/// ```no_run
/// use kkcards::cli::{run_cli, ClassifyCommand};
/// use std::path::Path;
///
/// match run_cli(ClassifyCommand::Classify, Path::new("/path/to/cards"), None, false) {
///     Ok(()) => println!("Done"),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(
    command: ClassifyCommand,
    dir_path: &Path,
    config_path: Option<&Path>,
    json: bool,
) -> Result<(), String> {
    let config =
        Config::load(config_path).map_err(|e| format!("Error loading configuration: {}", e))?;
    let classifier =
        Classifier::new(&config).map_err(|e| format!("Error in configuration: {}", e))?;

    match command {
        ClassifyCommand::Classify => classify_directory(&classifier, dir_path, json),
        ClassifyCommand::Preview => preview_directory(&classifier, dir_path, json),
    }
}

/// Classifies `base_path`, driving a progress bar from the engine callbacks.
///
/// When there is no PNG to sort, nothing is created and the run ends early.
fn classify_directory(classifier: &Classifier, base_path: &Path, json: bool) -> Result<(), String> {
    if !base_path.is_dir() {
        return Err(format!("Not a folder: {}", base_path.display()));
    }
    if !classifier.has_eligible_files(base_path) {
        OutputFormatter::warning("No .png files found in the selected folder!");
        return Ok(());
    }

    if !json {
        OutputFormatter::info(&format!("Classifying cards in: {}", base_path.display()));
    }

    let pb = OutputFormatter::create_percent_bar();
    let mut on_progress = |percent: u8| pb.set_position(u64::from(percent));
    let mut on_status = |message: &str| pb.set_message(message.to_string());

    let result = classifier.classify(base_path, Some(&mut on_progress), Some(&mut on_status));

    match result {
        Ok(summary) => {
            pb.finish_and_clear();
            report_summary(&summary, json)
        }
        Err(e) => {
            pb.abandon();
            Err(format!("Classification failed: {}", e))
        }
    }
}

fn report_summary(summary: &ClassifySummary, json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(summary)
            .map_err(|e| format!("Could not serialize summary: {}", e))?;
        println!("{}", text);
        return Ok(());
    }

    OutputFormatter::success("Classification complete!");
    OutputFormatter::summary_table(&summary.placements, summary.moved_files);
    if summary.unreadable_files > 0 {
        OutputFormatter::warning(&format!(
            "{} unreadable {} filed under Unknown_cards",
            summary.unreadable_files,
            if summary.unreadable_files == 1 { "file was" } else { "files were" }
        ));
    }
    if summary.replaced_files > 0 {
        OutputFormatter::warning(&format!(
            "{} {} replaced an earlier file with the same name",
            summary.replaced_files,
            if summary.replaced_files == 1 { "move" } else { "moves" }
        ));
    }
    println!("Output folder: {}", summary.output_root.display());
    Ok(())
}

/// Prints where each file would go without moving anything.
fn preview_directory(classifier: &Classifier, base_path: &Path, json: bool) -> Result<(), String> {
    let plan = classifier
        .preview(base_path)
        .map_err(|e| format!("Error reading folder: {}", e))?;

    if json {
        let text = serde_json::to_string_pretty(&plan)
            .map_err(|e| format!("Could not serialize plan: {}", e))?;
        println!("{}", text);
        return Ok(());
    }

    OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", base_path.display()));

    if plan.is_empty() {
        OutputFormatter::info("No files found to classify.");
        return Ok(());
    }

    OutputFormatter::header("Files would be classified as follows:");
    for PlannedMove { path, placement } in &plan {
        let shown = path.strip_prefix(base_path).unwrap_or(path);
        println!(" - {}", shown.display());
        println!("   → Would move to {}/", placement);
    }

    OutputFormatter::summary_table(&placement_counts(&plan), plan.len());
    OutputFormatter::dry_run_notice("No files were modified.");
    Ok(())
}

fn placement_counts(plan: &[PlannedMove]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for planned in plan {
        *counts.entry(planned.placement.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_flag_selects_preview() {
        let cli = Cli::parse_from(["kkcards", "cards", "--dry-run"]);
        assert!(matches!(cli.command(), ClassifyCommand::Preview));
        assert_eq!(cli.dir, PathBuf::from("cards"));

        let cli = Cli::parse_from(["kkcards", "cards", "--json", "--config", "k.toml"]);
        assert!(matches!(cli.command(), ClassifyCommand::Classify));
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("k.toml")));
    }

    #[test]
    fn test_placement_counts() {
        let plan = vec![
            PlannedMove {
                path: PathBuf::from("a.png"),
                placement: "Unknown_cards".to_string(),
            },
            PlannedMove {
                path: PathBuf::from("b.png"),
                placement: "Unknown_cards".to_string(),
            },
            PlannedMove {
                path: PathBuf::from("c.txt"),
                placement: "not_png".to_string(),
            },
        ];

        let counts = placement_counts(&plan);
        assert_eq!(counts.get("Unknown_cards"), Some(&2));
        assert_eq!(counts.get("not_png"), Some(&1));
    }
}
