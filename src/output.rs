//! Console output.
//!
//! Every line carries a plain-text marker (`Skipped:`, `Error:`, ...) so
//! scripts can grep the output; colors are decoration only and are dropped
//! when `NO_COLOR` is set.

use crate::conflict::{ConflictMode, MoveDecision};
use crate::file_organizer::{Reporter, SortEvent, SortReport};
use colored::*;

/// Renders a classified file as `name (size) -> category`.
pub fn mapping_line(name: &str, size: Option<&str>, category: &str) -> String {
    match size {
        Some(size) => format!("{} ({}) -> {}", name, size, category),
        None => format!("{} -> {}", name, category),
    }
}

/// Renders the outcome of a conflict, or `None` if there is nothing to say.
pub fn conflict_line(existing: &str, mode: ConflictMode, decision: MoveDecision) -> Option<String> {
    match (mode, decision) {
        (ConflictMode::Interactive, MoveDecision::Overwrite) => Some("Done.".to_string()),
        (ConflictMode::Interactive, MoveDecision::Skip) => Some("File skipped.".to_string()),
        (ConflictMode::Force, MoveDecision::Overwrite) => {
            Some(format!("Overwriting: '{}'", existing))
        }
        (ConflictMode::Default, MoveDecision::Skip) => Some(format!(
            "Skipped: '{}' already exists. Use --force to overwrite or --interactive to decide per file.",
            existing
        )),
        _ => None,
    }
}

/// Writes [`SortEvent`]s to the terminal.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&mut self, event: SortEvent) {
        match event {
            SortEvent::Mapped {
                name,
                size,
                category,
            } => {
                println!("{}", mapping_line(&name, size.as_deref(), &category));
            }
            SortEvent::Conflict {
                existing,
                mode,
                decision,
            } => {
                if let Some(line) = conflict_line(&existing, mode, decision) {
                    match decision {
                        MoveDecision::Skip => println!("{}", line.yellow()),
                        _ => println!("{}", line.cyan()),
                    }
                }
            }
            SortEvent::Failed { name, error: reason } => {
                error(&format!("{}: {}", name, reason));
            }
        }
    }
}

/// Prints an error message in red, prefixed with `Error:`.
pub fn error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

/// Prints a dry-run notice.
pub fn dry_run_notice(message: &str) {
    println!("{}", format!("[DRY RUN] {}", message).yellow());
}

/// Prints the end-of-run summary: files per category, then the totals.
pub fn summary(report: &SortReport, dry_run: bool) {
    if report.categories.is_empty() {
        println!("\nNo files to sort.");
        return;
    }

    println!("\n{}", "SUMMARY".bold());

    let width = report
        .categories
        .keys()
        .map(|name| name.len())
        .max()
        .unwrap_or(0)
        .max("Category".len());

    println!(
        "{:<width$} | {}",
        "Category".bold(),
        "Files".bold(),
        width = width
    );
    println!("{}", "-".repeat(width + 10));

    for (category, count) in &report.categories {
        println!(
            "{:<width$} | {} {}",
            category,
            count.to_string().green(),
            plural(*count),
            width = width
        );
    }

    println!("{}", "-".repeat(width + 10));
    let total = report.classified();
    println!(
        "{:<width$} | {} {}",
        "Total".bold(),
        total.to_string().green().bold(),
        plural(total),
        width = width
    );

    if dry_run {
        dry_run_notice("No files were moved.");
    } else {
        println!(
            "Moved: {}  Skipped: {}  Failed: {}",
            report.moved, report.skipped, report.failed
        );
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
