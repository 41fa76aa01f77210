//! Moving files into category folders.
//!
//! [`Sorter`] scans the top level of a source directory, classifies each
//! regular file with a [`RuleTable`], reports the mapping, and moves the file
//! to `destination/category/filename`, applying the conflict policy when
//! something is already there.
//!
//! Per-file problems (a folder that cannot be created, a failed rename) are
//! reported and counted, and the batch carries on. Only setup problems such
//! as a missing source directory are returned as errors.
use crate::config::CompiledFilters;
use crate::conflict::{self, Confirm, ConflictMode, MoveDecision};
use crate::file_category::RuleTable;
use crate::size::format_size;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while sorting.
#[derive(Debug, Error)]
pub enum SortError {
    /// The source directory does not exist.
    #[error("source directory {} does not exist", .0.display())]
    SourceNotFound(PathBuf),

    /// The destination directory does not exist.
    #[error("destination directory {} does not exist", .0.display())]
    DestinationNotFound(PathBuf),

    /// A source or destination path exists but is not a directory.
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// The source directory could not be listed.
    #[error("could not read directory {}: {source}", .path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    /// A category folder could not be created.
    #[error("failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    /// The destination could not be inspected.
    #[error("could not inspect {}: {source}", .path.display())]
    StatFailed { path: PathBuf, source: io::Error },

    /// The rename itself failed.
    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// Result type for sorting operations.
pub type SortResult<T> = Result<T, SortError>;

/// What to sort and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOptions {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub dry_run: bool,
    pub include_hidden: bool,
    pub conflict_mode: ConflictMode,
}

impl SortOptions {
    /// Validates both directories. `destination` defaults to `source`.
    ///
    /// # Errors
    ///
    /// Fails if the source, or an explicitly given destination, is missing
    /// or is not a directory.
    pub fn new(source: &Path, destination: Option<&Path>) -> SortResult<Self> {
        ensure_directory(source, SortError::SourceNotFound)?;
        if let Some(destination) = destination {
            ensure_directory(destination, SortError::DestinationNotFound)?;
        }

        Ok(Self {
            source: source.to_path_buf(),
            destination: destination.unwrap_or(source).to_path_buf(),
            dry_run: false,
            include_hidden: false,
            conflict_mode: ConflictMode::Default,
        })
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn conflict_mode(mut self, mode: ConflictMode) -> Self {
        self.conflict_mode = mode;
        self
    }
}

fn ensure_directory(path: &Path, missing: fn(PathBuf) -> SortError) -> SortResult<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SortError::NotADirectory(path.to_path_buf())),
        Err(_) => Err(missing(path.to_path_buf())),
    }
}

/// A directory entry seen during the scan.
#[derive(Debug, Clone)]
pub struct CandidateEntry {
    /// File name, lossily converted for classification and display.
    pub name: String,
    /// Full path in the source directory.
    pub path: PathBuf,
    /// Regular file (symlinks are followed).
    pub is_file: bool,
    /// Name starts with a dot.
    pub hidden: bool,
    /// Size in bytes, when it could be read.
    pub size: Option<u64>,
}

impl CandidateEntry {
    fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let metadata = fs::metadata(&path).ok();

        Self {
            hidden: name.starts_with('.'),
            is_file: metadata.as_ref().is_some_and(|m| m.is_file()),
            size: metadata.map(|m| m.len()),
            name,
            path,
        }
    }
}

/// Something the sorter tells the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortEvent {
    /// A file was classified: `name (size) -> category`.
    Mapped {
        name: String,
        size: Option<String>,
        category: String,
    },
    /// The destination already existed and the policy decided.
    Conflict {
        /// Destination relative to the destination root.
        existing: String,
        mode: ConflictMode,
        decision: MoveDecision,
    },
    /// The file could not be moved.
    Failed { name: String, error: String },
}

/// Receives [`SortEvent`]s as they happen.
pub trait Reporter {
    fn report(&mut self, event: SortEvent);
}

impl Reporter for Vec<SortEvent> {
    fn report(&mut self, event: SortEvent) {
        self.push(event);
    }
}

/// Why an entry was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    NotAFile,
    Hidden,
    Excluded(&'static str),
    Unclassified,
}

/// Terminal state of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Filtered(FilterReason),
    /// Classified and reported; dry run stops here.
    Reported,
    Moved,
    Skipped,
    Failed,
}

/// Tally of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortReport {
    pub scanned: usize,
    pub filtered: usize,
    /// Files classified and reported, per category.
    pub categories: BTreeMap<String, usize>,
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Category folders this run had to create.
    pub created_folders: Vec<PathBuf>,
}

impl SortReport {
    /// Number of classified files.
    pub fn classified(&self) -> usize {
        self.categories.values().sum()
    }

    fn record(&mut self, outcome: &Outcome) {
        self.scanned += 1;
        match outcome {
            Outcome::Filtered(_) => self.filtered += 1,
            Outcome::Reported => {}
            Outcome::Moved => self.moved += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

/// Sorts one directory according to a rule table.
pub struct Sorter<'a> {
    rules: &'a RuleTable,
    filters: &'a CompiledFilters,
    options: SortOptions,
}

impl<'a> Sorter<'a> {
    pub fn new(rules: &'a RuleTable, filters: &'a CompiledFilters, options: SortOptions) -> Self {
        Self {
            rules,
            filters,
            options,
        }
    }

    pub fn options(&self) -> &SortOptions {
        &self.options
    }

    /// Lists the top level of the source directory, in listing order.
    ///
    /// Entries are collected up front so that folders created during the run
    /// are never picked up.
    pub fn scan(&self) -> SortResult<Vec<CandidateEntry>> {
        let entries = fs::read_dir(&self.options.source).map_err(|source| SortError::ReadDir {
            path: self.options.source.clone(),
            source,
        })?;

        let mut candidates = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => candidates.push(CandidateEntry::from_path(entry.path())),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable directory entry"),
            }
        }
        Ok(candidates)
    }

    /// Runs the whole batch.
    ///
    /// # Errors
    ///
    /// Only fails if the source directory cannot be listed; per-file failures
    /// are reported through `reporter` and counted in the returned report.
    pub fn run(
        &self,
        prompt: &mut dyn Confirm,
        reporter: &mut dyn Reporter,
    ) -> SortResult<SortReport> {
        let candidates = self.scan()?;
        tracing::info!(
            source = %self.options.source.display(),
            destination = %self.options.destination.display(),
            entries = candidates.len(),
            dry_run = self.options.dry_run,
            "sorting directory"
        );

        let mut report = SortReport::default();
        let mut ensured: HashSet<PathBuf> = HashSet::new();

        for candidate in &candidates {
            let outcome = self.process(candidate, prompt, reporter, &mut ensured, &mut report);
            tracing::debug!(file = %candidate.name, ?outcome, "processed");
            report.record(&outcome);
        }

        Ok(report)
    }

    fn process(
        &self,
        candidate: &CandidateEntry,
        prompt: &mut dyn Confirm,
        reporter: &mut dyn Reporter,
        ensured: &mut HashSet<PathBuf>,
        report: &mut SortReport,
    ) -> Outcome {
        if !candidate.is_file {
            return Outcome::Filtered(FilterReason::NotAFile);
        }
        if candidate.hidden && !self.options.include_hidden {
            return Outcome::Filtered(FilterReason::Hidden);
        }
        if let Some(reason) = self.filters.exclusion_reason(&candidate.name) {
            return Outcome::Filtered(FilterReason::Excluded(reason));
        }
        let Some(category) = self.rules.classify(&candidate.name) else {
            return Outcome::Filtered(FilterReason::Unclassified);
        };

        reporter.report(SortEvent::Mapped {
            name: candidate.name.clone(),
            size: candidate.size.map(format_size),
            category: category.to_string(),
        });
        *report.categories.entry(category.to_string()).or_insert(0) += 1;

        if self.options.dry_run {
            return Outcome::Reported;
        }

        match self.move_to_category(candidate, category, prompt, reporter, ensured, report) {
            Ok(MoveDecision::Skip) => Outcome::Skipped,
            Ok(_) => Outcome::Moved,
            Err(e) => {
                tracing::warn!(file = %candidate.name, error = %e, "move failed");
                reporter.report(SortEvent::Failed {
                    name: candidate.name.clone(),
                    error: e.to_string(),
                });
                Outcome::Failed
            }
        }
    }

    fn move_to_category(
        &self,
        candidate: &CandidateEntry,
        category: &str,
        prompt: &mut dyn Confirm,
        reporter: &mut dyn Reporter,
        ensured: &mut HashSet<PathBuf>,
        report: &mut SortReport,
    ) -> SortResult<MoveDecision> {
        let root = &self.options.destination;
        let folder = root.join(category);
        if ensure_folder(&folder, ensured)? {
            report.created_folders.push(folder.clone());
        }

        let file_name = candidate
            .path
            .file_name()
            .ok_or_else(|| SortError::FileMoveFailure {
                from: candidate.path.clone(),
                to: folder.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "file has no name component"),
            })?;
        let destination = folder.join(file_name);

        let existing_size = existing_size(&destination)?;
        let decision = conflict::resolve(
            prompt,
            &destination,
            root,
            candidate.size.unwrap_or(0),
            existing_size,
            self.options.conflict_mode,
        );

        if existing_size.is_some() {
            reporter.report(SortEvent::Conflict {
                existing: conflict::relative_display(&destination, root),
                mode: self.options.conflict_mode,
                decision,
            });
        }

        if decision == MoveDecision::Skip {
            tracing::info!(file = %candidate.name, "kept existing destination");
            return Ok(decision);
        }

        fs::rename(&candidate.path, &destination).map_err(|source| SortError::FileMoveFailure {
            from: candidate.path.clone(),
            to: destination.clone(),
            source,
        })?;
        tracing::info!(
            from = %candidate.path.display(),
            to = %destination.display(),
            ?decision,
            "moved"
        );

        Ok(decision)
    }
}

/// Makes sure `folder` exists. Returns true if this call created it.
fn ensure_folder(folder: &Path, ensured: &mut HashSet<PathBuf>) -> SortResult<bool> {
    if ensured.contains(folder) {
        return Ok(false);
    }

    let created = match fs::create_dir(folder) {
        Ok(()) => {
            tracing::info!(folder = %folder.display(), "created category folder");
            true
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && folder.is_dir() => false,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(SortError::DirectoryCreationFailed {
                path: folder.to_path_buf(),
                source: io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "a file with this name already exists",
                ),
            });
        }
        Err(source) => {
            return Err(SortError::DirectoryCreationFailed {
                path: folder.to_path_buf(),
                source,
            });
        }
    };

    ensured.insert(folder.to_path_buf());
    Ok(created)
}

/// Size of whatever is at `path`, or `None` if nothing is.
fn existing_size(path: &Path) -> SortResult<Option<u64>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SortError::StatFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ConflictQuestion;
    use tempfile::TempDir;

    /// Fails the test if asked anything.
    struct NeverAsk;

    impl Confirm for NeverAsk {
        fn ask(&mut self, question: &ConflictQuestion) -> io::Result<String> {
            panic!("unexpected prompt: {}", question.message());
        }
    }

    fn options(dir: &Path) -> SortOptions {
        SortOptions::new(dir, None).expect("valid directory")
    }

    #[test]
    fn test_options_default_destination_to_source() {
        let temp_dir = TempDir::new().unwrap();
        let opts = options(temp_dir.path());
        assert_eq!(opts.destination, opts.source);
        assert!(!opts.dry_run);
        assert_eq!(opts.conflict_mode, ConflictMode::Default);
    }

    #[test]
    fn test_options_reject_missing_and_non_directories() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        assert!(matches!(
            SortOptions::new(&missing, None),
            Err(SortError::SourceNotFound(_))
        ));
        assert!(matches!(
            SortOptions::new(&file, None),
            Err(SortError::NotADirectory(_))
        ));
        assert!(matches!(
            SortOptions::new(temp_dir.path(), Some(missing.as_path())),
            Err(SortError::DestinationNotFound(_))
        ));
    }

    #[test]
    fn test_candidate_entry_flags() {
        let temp_dir = TempDir::new().unwrap();
        let hidden = temp_dir.path().join(".env");
        fs::write(&hidden, "KEY=1").unwrap();
        let sub = temp_dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        let entry = CandidateEntry::from_path(hidden);
        assert!(entry.is_file);
        assert!(entry.hidden);
        assert_eq!(entry.size, Some(5));
        assert_eq!(entry.name, ".env");

        let entry = CandidateEntry::from_path(sub);
        assert!(!entry.is_file);
        assert!(!entry.hidden);
    }

    #[test]
    fn test_ensure_folder_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("Pictures");
        let mut ensured = HashSet::new();

        assert!(ensure_folder(&folder, &mut ensured).unwrap());
        assert!(!ensure_folder(&folder, &mut ensured).unwrap());

        // Pre-existing folders are fine too.
        let mut fresh = HashSet::new();
        assert!(!ensure_folder(&folder, &mut fresh).unwrap());
    }

    #[test]
    fn test_ensure_folder_blocked_by_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("Pictures");
        fs::write(&blocker, "not a folder").unwrap();

        let result = ensure_folder(&blocker, &mut HashSet::new());
        assert!(matches!(
            result,
            Err(SortError::DirectoryCreationFailed { .. })
        ));
    }

    #[test]
    fn test_ensure_folder_propagates_os_errors() {
        let temp_dir = TempDir::new().unwrap();
        // Longer than any file system allows for one path component.
        let folder = temp_dir.path().join("x".repeat(300));
        let mut ensured = HashSet::new();

        let err = ensure_folder(&folder, &mut ensured).unwrap_err();
        match err {
            SortError::DirectoryCreationFailed { path, source } => {
                assert_eq!(path, folder);
                assert_ne!(source.kind(), io::ErrorKind::AlreadyExists);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(ensured.is_empty());
    }

    #[test]
    fn test_run_moves_and_filters() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("photo.JPG"), "jpg").unwrap();
        fs::write(base.join("notes.txt"), "").unwrap();
        fs::write(base.join("unknown.xyz"), "?").unwrap();
        fs::write(base.join(".hidden.txt"), "h").unwrap();
        fs::create_dir(base.join("folder.zip")).unwrap();

        let rules = RuleTable::default();
        let filters = CompiledFilters::default();
        let sorter = Sorter::new(&rules, &filters, options(base));
        let mut events = Vec::new();

        let report = sorter.run(&mut NeverAsk, &mut events).unwrap();

        assert_eq!(report.scanned, 5);
        assert_eq!(report.moved, 2);
        assert_eq!(report.filtered, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(report.created_folders.len(), 2);
        assert_eq!(report.categories.get("Pictures"), Some(&1));
        assert_eq!(report.categories.get("Documents"), Some(&1));

        assert!(base.join("Pictures").join("photo.JPG").is_file());
        assert!(base.join("Documents").join("notes.txt").is_file());
        assert!(base.join("unknown.xyz").is_file());
        assert!(base.join(".hidden.txt").is_file());
        assert!(base.join("folder.zip").is_dir());

        assert!(events.contains(&SortEvent::Mapped {
            name: "notes.txt".to_string(),
            size: Some("empty".to_string()),
            category: "Documents".to_string(),
        }));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_run_dry_run_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("a.png"), "png").unwrap();

        let rules = RuleTable::default();
        let filters = CompiledFilters::default();
        let sorter = Sorter::new(&rules, &filters, options(base).dry_run(true));
        let mut events = Vec::new();

        let report = sorter.run(&mut NeverAsk, &mut events).unwrap();

        assert_eq!(report.moved, 0);
        assert_eq!(report.classified(), 1);
        assert!(report.created_folders.is_empty());
        assert!(base.join("a.png").is_file());
        assert!(!base.join("Pictures").exists());
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_run_skips_conflict_by_default() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir(base.join("Documents")).unwrap();
        fs::write(base.join("Documents").join("b.txt"), "old").unwrap();
        fs::write(base.join("b.txt"), "new").unwrap();

        let rules = RuleTable::default();
        let filters = CompiledFilters::default();
        let sorter = Sorter::new(&rules, &filters, options(base));
        let mut events = Vec::new();

        let report = sorter.run(&mut NeverAsk, &mut events).unwrap();

        assert_eq!(report.skipped, 1);
        assert!(report.created_folders.is_empty());
        assert_eq!(fs::read_to_string(base.join("b.txt")).unwrap(), "new");
        assert_eq!(
            fs::read_to_string(base.join("Documents").join("b.txt")).unwrap(),
            "old"
        );
        assert!(events.iter().any(|e| matches!(
            e,
            SortEvent::Conflict {
                mode: ConflictMode::Default,
                decision: MoveDecision::Skip,
                ..
            }
        )));
    }

    #[test]
    fn test_run_honours_config_exclusions() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("keep.txt"), "k").unwrap();
        fs::write(base.join("skip.txt"), "s").unwrap();

        let config = crate::config::SortConfig::from_toml(
            "[filters.exclude]\nfilenames = [\"skip.txt\"]",
        )
        .unwrap();
        let filters = config.compile_filters().unwrap();
        let rules = RuleTable::default();
        let sorter = Sorter::new(&rules, &filters, options(base));

        let report = sorter.run(&mut NeverAsk, &mut Vec::<SortEvent>::new()).unwrap();

        assert_eq!(report.moved, 1);
        assert!(base.join("skip.txt").is_file());
        assert!(base.join("Documents").join("keep.txt").is_file());
    }

    #[test]
    fn test_folder_failure_does_not_abort_batch() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        // A plain file where the Pictures folder should go.
        fs::write(base.join("Pictures"), "blocker").unwrap();
        fs::write(base.join("a.jpg"), "jpg").unwrap();
        fs::write(base.join("b.txt"), "txt").unwrap();

        let rules = RuleTable::default();
        let filters = CompiledFilters::default();
        let sorter = Sorter::new(&rules, &filters, options(base));
        let mut events = Vec::new();

        let report = sorter.run(&mut NeverAsk, &mut events).unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.moved, 1);
        assert!(base.join("a.jpg").is_file());
        assert!(base.join("Documents").join("b.txt").is_file());
        assert!(events.iter().any(|e| matches!(
            e,
            SortEvent::Failed { name, .. } if name == "a.jpg"
        )));
    }
}
