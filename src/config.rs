//! Configuration file support.
//!
//! A TOML file can replace the built-in rule table and exclude files from
//! sorting. Every section is optional:
//!
//! ```toml
//! [filters]
//! include_hidden = false
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db"]
//! extensions = ["part", "crdownload"]
//! patterns = ["~$*"]
//! regex = ['^\d+\.tmp$']
//!
//! [[rules]]
//! category = "Pictures"
//! extensions = ["jpg", "png"]
//! ```
//!
//! When any `[[rules]]` are present they replace the built-in table entirely.

use crate::file_category::{ExtensionRule, RuleError, RuleTable};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_NAME: &str = ".fsorter.toml";

/// Errors that can occur while loading or compiling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Invalid TOML syntax or structure.
    #[error("invalid configuration in {}: {reason}", .path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    /// Invalid glob pattern.
    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobPattern { pattern: String, reason: String },

    /// Invalid regex pattern.
    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    /// A custom rule or the rule table as a whole is invalid.
    #[error("invalid rule table: {0}")]
    Rules(#[from] RuleError),

    /// IO error while reading configuration.
    #[error("could not read configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Deserialized configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SortConfig {
    #[serde(default)]
    pub filters: FilterRules,

    /// Custom rules; empty means "use the built-in table".
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// `[filters]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Include dotfiles. Combined with `--include-hidden` by OR.
    #[serde(default)]
    pub include_hidden: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,
}

/// `[filters.exclude]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact file names (case-sensitive).
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Extensions, case-insensitive, without the dot.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Glob patterns matched against the file name.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Regular expressions matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// One `[[rules]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub category: String,
    pub extensions: Vec<String>,
}

impl SortConfig {
    /// Load configuration, falling back to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, if given (must exist)
    /// 2. `.fsorter.toml` in the current directory
    /// 3. `fsorter/config.toml` in the user's config directory
    /// 4. built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a file is found (or explicitly given) but cannot
    /// be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_NAME);
        if local_config.is_file() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("fsorter").join("config.toml");
            if user_config.is_file() {
                return Self::load_from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::ConfigInvalid { reason, .. } => ConfigError::ConfigInvalid {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid {
            path: PathBuf::new(),
            reason: e.to_string(),
        })
    }

    /// Builds the rule table: the custom rules if any, else the built-in one.
    pub fn rule_table(&self) -> Result<RuleTable, ConfigError> {
        if self.rules.is_empty() {
            return Ok(RuleTable::default());
        }

        let rules = self
            .rules
            .iter()
            .map(|rule| ExtensionRule::new(rule.category.clone(), &rule.extensions))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RuleTable::new(rules)?)
    }

    /// Compile the exclusion rules for matching.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex pattern is invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Exclusion rules, pre-compiled for matching.
#[derive(Debug, Default)]
pub struct CompiledFilters {
    include_hidden: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = rules
            .exclude
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlobPattern {
                    pattern: pattern.clone(),
                    reason: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_hidden: rules.include_hidden,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
        })
    }

    /// Whether the configuration asks for dotfiles to be included.
    pub fn include_hidden(&self) -> bool {
        self.include_hidden
    }

    /// Returns the first exclusion rule that matches `file_name`, if any.
    ///
    /// Checks run in order: exact name, extension, glob, regex.
    pub fn exclusion_reason(&self, file_name: &str) -> Option<&'static str> {
        if self.exclude_filenames.contains(file_name) {
            return Some("excluded file name");
        }

        if let Some((_, ext)) = file_name.rsplit_once('.')
            && self.exclude_extensions.contains(&ext.to_lowercase())
        {
            return Some("excluded extension");
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches(file_name))
        {
            return Some("excluded pattern");
        }

        if self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(file_name))
        {
            return Some("excluded regex");
        }

        None
    }
}
