//! Command-line interface for fsorter.
//!
//! This module handles:
//! - Argument parsing
//! - Path expansion and validation
//! - Wiring configuration, rule table, prompt and console output into a run

use crate::config::{CompiledFilters, ConfigError, SortConfig};
use crate::conflict::{ConflictMode, LinePrompt};
use crate::file_organizer::{SortError, SortOptions, SortReport, Sorter};
use crate::output::{self, ConsoleReporter};
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Exit status for a completed run, including runs with per-file failures.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit status when the run could not start.
pub const EXIT_CONFIG: i32 = 1;

/// Sort the files of a directory into per-category subfolders by extension.
///
/// Only the top level of DIRECTORY is scanned. Files whose extension is not
/// known are left alone. Nothing is ever deleted or renamed.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "fsorter")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory to sort
    pub directory: PathBuf,

    /// Directory in which the category folders are created
    ///
    /// Defaults to DIRECTORY itself.
    #[arg(short = 'd', long = "destination", value_name = "PATH")]
    pub destination: Option<PathBuf>,

    /// Only print what would be done
    #[arg(short = 't', long = "test-run", action = ArgAction::SetTrue)]
    pub test_run: bool,

    /// Include files whose name starts with a dot
    #[arg(short = 'a', long = "include-hidden", action = ArgAction::SetTrue)]
    pub include_hidden: bool,

    /// Overwrite files that already exist at the destination
    #[arg(short = 'f', long = "force", action = ArgAction::SetTrue)]
    pub force: bool,

    /// Ask before overwriting each existing file (takes precedence over --force)
    #[arg(short = 'i', long = "interactive", action = ArgAction::SetTrue)]
    pub interactive: bool,

    /// Configuration file with custom rules and exclusions
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Do not print the summary at the end
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    pub quiet: bool,
}

impl Args {
    pub fn conflict_mode(&self) -> ConflictMode {
        ConflictMode::from_flags(self.force, self.interactive)
    }
}

/// Errors that stop a run before any file is processed.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sort(#[from] SortError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        EXIT_CONFIG
    }
}

/// Expands a leading `~` and makes the path absolute.
pub fn expand_path(path: &Path) -> PathBuf {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };

    std::path::absolute(&expanded).unwrap_or(expanded)
}

/// Builds the sorter's options from the arguments and compiled filters.
///
/// # Errors
///
/// Fails if the source or the destination is not an existing directory.
pub fn sort_options(args: &Args, filters: &CompiledFilters) -> Result<SortOptions, CliError> {
    let source = expand_path(&args.directory);
    let destination = args.destination.as_deref().map(expand_path);

    let options = SortOptions::new(&source, destination.as_deref())?
        .dry_run(args.test_run)
        .include_hidden(args.include_hidden || filters.include_hidden())
        .conflict_mode(args.conflict_mode());

    Ok(options)
}

/// Runs fsorter with parsed arguments, printing to the console and asking
/// on stdin when interactive.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use fsorter::cli::{Args, run_cli};
///
/// let args = Args::parse_from(["fsorter", "~/Downloads", "--test-run"]);
/// match run_cli(&args) {
///     Ok(report) => println!("{} files classified", report.classified()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(args: &Args) -> Result<SortReport, CliError> {
    let config = SortConfig::load(args.config.as_deref())?;
    let rules = config.rule_table()?;
    let filters = config.compile_filters()?;
    let options = sort_options(args, &filters)?;

    if options.dry_run {
        output::dry_run_notice(&format!(
            "Showing what would be sorted in {}",
            options.source.display()
        ));
    }

    let sorter = Sorter::new(&rules, &filters, options);
    let mut prompt = LinePrompt::stdio();
    let report = sorter.run(&mut prompt, &mut ConsoleReporter)?;

    if !args.quiet {
        output::summary(&report, sorter.options().dry_run);
    }

    Ok(report)
}
