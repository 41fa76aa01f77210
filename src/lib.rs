//! fsorter - sort the files of a directory into per-category folders
//!
//! This library classifies files by extension against an injectable rule
//! table, formats file sizes for display, resolves destination conflicts
//! (skip, overwrite, or ask) and moves files into their category folders.
//! Rule tables and exclusion filters can be supplied in a TOML file.

pub mod cli;
pub mod config;
pub mod conflict;
pub mod file_category;
pub mod file_organizer;
pub mod logging;
pub mod output;
pub mod size;

pub use config::{CompiledFilters, ConfigError, SortConfig};
pub use conflict::{Confirm, ConflictMode, LinePrompt, MoveDecision};
pub use file_category::{ExtensionRule, RuleError, RuleTable};
pub use file_organizer::{
    Reporter, SortError, SortEvent, SortOptions, SortReport, SortResult, Sorter,
};
pub use size::format_size;

pub use cli::{Args, run_cli};
