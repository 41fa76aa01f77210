//! Extension-based file classification.
//!
//! A [`RuleTable`] is an ordered list of [`ExtensionRule`]s, each mapping a
//! set of extensions to a category label. The table is built once and passed
//! by reference to whoever needs to classify; there is no global table.
//!
//! # Examples
//!
//! ```
//! use fsorter::file_category::RuleTable;
//!
//! let table = RuleTable::default();
//! assert_eq!(table.classify("Photo.JPG"), Some("Pictures"));
//! assert_eq!(table.classify("notes.md"), Some("Documents"));
//! assert_eq!(table.classify("mystery.xyz"), None);
//! ```
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// The built-in rule table, in lookup order.
const DEFAULT_RULES: &[(&str, &[&str])] = &[
    ("Pictures", &["jpg", "png", "gif", "jpeg"]),
    ("Video", &["mp4", "mkv", "avi", "webm", "flv"]),
    (
        "Documents",
        &["pdf", "doc", "docx", "pptx", "xlst", "odt", "csv", "txt", "md"],
    ),
    ("Archives", &["zip", "tar", "7z", "xz", "gz", "bz", "tgz"]),
    (
        "Music",
        &["mp3", "flac", "ogg", "wav", "m3u8", "pls", "oga", "m4a"],
    ),
    ("Books", &["epub", "fb2", "mobi"]),
    ("Config", &["json", "ini", "conf", "yaml", "toml", "xml"]),
    ("Web", &["html", "htm", "mhtml", "css", "js"]),
    ("Fonts", &["ttf", "otf", "woff2"]),
    ("Scripts", &["sh", "py", "rb", "pl", "php"]),
    ("Packages", &["deb", "rpm", "dmg", "pkg"]),
    ("Backups", &["bak", "bk", "backup"]),
    ("Binaries", &["bin", "exe", "dll", "dat"]),
    ("Images", &["img", "iso"]),
    ("Databases", &["sql", "sqlite"]),
    ("Keys", &["pub", "asc", "gpg"]),
    ("Android", &["apk"]),
    ("Torrent", &["torrent"]),
    ("Logs", &["log"]),
    ("Java", &["jar"]),
];

/// Errors raised while building rules or rule tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// A rule was given no extensions at all.
    #[error("rule for category '{category}' has no extensions")]
    NoExtensions { category: String },

    /// An extension was empty (or only a dot).
    #[error("rule for category '{category}' contains an empty extension")]
    EmptyExtension { category: String },

    /// The category label cannot be used as a folder name.
    #[error("invalid category name '{category}': must be a single, non-empty path component")]
    InvalidCategory { category: String },

    /// Two rules claim the same extension.
    #[error("extension '{extension}' is claimed by both '{first}' and '{second}'")]
    DuplicateExtension {
        extension: String,
        first: String,
        second: String,
    },
}

/// Maps a set of extensions to one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRule {
    extensions: BTreeSet<String>,
    category: String,
}

impl ExtensionRule {
    /// Creates a rule, normalizing every extension to lowercase without a
    /// leading dot.
    ///
    /// # Errors
    ///
    /// Fails if the extension set is empty, if any extension is empty after
    /// normalization, or if the category is not a usable folder name.
    pub fn new<I, S>(category: impl Into<String>, extensions: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let category = category.into();
        validate_category(&category)?;

        let mut normalized = BTreeSet::new();
        for ext in extensions {
            let ext = ext.as_ref().trim();
            let ext = ext.strip_prefix('.').unwrap_or(ext).to_lowercase();
            if ext.is_empty() {
                return Err(RuleError::EmptyExtension { category });
            }
            normalized.insert(ext);
        }

        if normalized.is_empty() {
            return Err(RuleError::NoExtensions { category });
        }

        Ok(Self {
            extensions: normalized,
            category,
        })
    }

    /// The category label, used verbatim as the folder name.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Iterates over the normalized extensions.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

fn validate_category(category: &str) -> Result<(), RuleError> {
    let invalid = category.trim().is_empty()
        || category == "."
        || category == ".."
        || category.contains(['/', '\\']);

    if invalid {
        Err(RuleError::InvalidCategory {
            category: category.to_string(),
        })
    } else {
        Ok(())
    }
}

/// An ordered, immutable set of extension rules.
///
/// No extension may be claimed by more than one rule, so lookup never
/// depends on rule order.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<ExtensionRule>,
    // extension -> index into `rules`
    index: HashMap<String, usize>,
}

impl RuleTable {
    /// Builds a table from rules, rejecting overlapping extension sets.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::DuplicateExtension`] for the first extension
    /// found in two rules.
    pub fn new(rules: Vec<ExtensionRule>) -> Result<Self, RuleError> {
        let mut index: HashMap<String, usize> = HashMap::new();

        for (position, rule) in rules.iter().enumerate() {
            for ext in rule.extensions() {
                if let Some(&owner) = index.get(ext) {
                    return Err(RuleError::DuplicateExtension {
                        extension: ext.to_string(),
                        first: rules[owner].category.clone(),
                        second: rule.category.clone(),
                    });
                }
                index.insert(ext.to_string(), position);
            }
        }

        Ok(Self { rules, index })
    }

    /// Returns the rules in table order.
    pub fn rules(&self) -> &[ExtensionRule] {
        &self.rules
    }

    /// Returns the category for `filename`, or `None` if no rule matches.
    ///
    /// The extension is everything after the last `.` of the lowercased
    /// name. A name without a dot is tested as a whole (`Makefile` is looked
    /// up as `makefile`); a trailing dot yields an empty extension, which
    /// never matches.
    pub fn classify(&self, filename: &str) -> Option<&str> {
        let lowered = filename.to_lowercase();
        let ext = extract_extension(&lowered);
        if ext.is_empty() {
            return None;
        }

        self.index
            .get(ext)
            .map(|&position| self.rules[position].category())
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        // Built-in entries are already normalized and overlap-free (checked in tests).
        let rules: Vec<ExtensionRule> = DEFAULT_RULES
            .iter()
            .map(|(category, extensions)| ExtensionRule {
                extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
                category: category.to_string(),
            })
            .collect();

        let index = rules
            .iter()
            .enumerate()
            .flat_map(|(position, rule)| {
                rule.extensions()
                    .map(move |ext| (ext.to_string(), position))
            })
            .collect();

        Self { rules, index }
    }
}

/// Substring after the last dot, or the whole string if there is none.
fn extract_extension(lowered: &str) -> &str {
    match lowered.rfind('.') {
        Some(pos) => &lowered[pos + 1..],
        None => lowered,
    }
}
