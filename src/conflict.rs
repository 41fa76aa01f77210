//! Conflict handling for moves whose destination already exists.
//!
//! The policy itself ([`decide`]) is a pure function of the conflict mode and
//! the user's answer. Asking the question is delegated to a [`Confirm`]
//! implementation so the policy can be tested without a terminal.

use crate::size::format_size;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// How conflicts are handled, derived from the command-line flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictMode {
    /// Leave the existing file alone and tell the user which flags to use.
    #[default]
    Default,
    /// Always overwrite.
    Force,
    /// Ask once per conflicting file.
    Interactive,
}

impl ConflictMode {
    /// Interactive wins over force when both are requested.
    pub fn from_flags(force: bool, interactive: bool) -> Self {
        if interactive {
            ConflictMode::Interactive
        } else if force {
            ConflictMode::Force
        } else {
            ConflictMode::Default
        }
    }
}

/// Outcome of conflict resolution for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDecision {
    /// Nothing at the destination; move normally.
    Proceed,
    /// Keep both files where they are.
    Skip,
    /// Replace the destination file.
    Overwrite,
}

/// The information shown to the user when asking about a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictQuestion {
    /// Destination relative to the destination root, e.g. `Documents/b.txt`.
    pub existing: String,
    /// Size label of the file already at the destination.
    pub existing_size: String,
    /// Name of the file being moved.
    pub incoming: String,
    /// Size label of the file being moved.
    pub incoming_size: String,
}

impl ConflictQuestion {
    /// The prompt text, ending with `[y/N]: `.
    pub fn message(&self) -> String {
        format!(
            "File '{}' ({}) already exists.\nOverwrite it with '{}' ({})? [y/N]: ",
            self.existing, self.existing_size, self.incoming, self.incoming_size
        )
    }
}

/// Something that can ask the user a yes/no question about a conflict.
pub trait Confirm {
    /// Asks once and returns the raw answer line.
    fn ask(&mut self, question: &ConflictQuestion) -> io::Result<String>;
}

/// Asks on a writer and reads a single line from a reader.
pub struct LinePrompt<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl LinePrompt<io::StdinLock<'static>, io::Stdout> {
    /// Prompts on stdout and reads answers from stdin.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Confirm for LinePrompt<R, W> {
    fn ask(&mut self, question: &ConflictQuestion) -> io::Result<String> {
        self.writer.write_all(question.message().as_bytes())?;
        self.writer.flush()?;

        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Returns true only for a `y` answer, in any case.
pub fn is_affirmative(answer: &str) -> bool {
    answer.to_lowercase() == "y"
}

/// The conflict policy.
///
/// `answer` is only consulted in interactive mode; a missing answer there is
/// a decline.
pub fn decide(destination_exists: bool, mode: ConflictMode, answer: Option<&str>) -> MoveDecision {
    if !destination_exists {
        return MoveDecision::Proceed;
    }

    match mode {
        ConflictMode::Interactive => match answer {
            Some(answer) if is_affirmative(answer) => MoveDecision::Overwrite,
            _ => MoveDecision::Skip,
        },
        ConflictMode::Force => MoveDecision::Overwrite,
        ConflictMode::Default => MoveDecision::Skip,
    }
}

/// Applies the conflict policy, asking through `prompt` when the mode is
/// interactive and the destination exists.
///
/// `existing_size` is `None` when nothing is at the destination. A failed
/// prompt read counts as a decline.
pub fn resolve(
    prompt: &mut dyn Confirm,
    destination: &Path,
    destination_root: &Path,
    incoming_size: u64,
    existing_size: Option<u64>,
    mode: ConflictMode,
) -> MoveDecision {
    let Some(existing_size) = existing_size else {
        return MoveDecision::Proceed;
    };

    let answer = if mode == ConflictMode::Interactive {
        let question = ConflictQuestion {
            existing: relative_display(destination, destination_root),
            existing_size: format_size(existing_size),
            incoming: destination
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            incoming_size: format_size(incoming_size),
        };

        match prompt.ask(&question) {
            Ok(answer) => Some(answer),
            Err(e) => {
                tracing::warn!(error = %e, "could not read answer, skipping");
                None
            }
        }
    } else {
        None
    };

    decide(true, mode, answer.as_deref())
}

/// `path` relative to `root` for display, falling back to the full path.
pub fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    /// Replays canned answers and remembers the questions asked.
    struct Scripted {
        answers: Vec<String>,
        asked: Vec<ConflictQuestion>,
    }

    impl Scripted {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().rev().map(|a| a.to_string()).collect(),
                asked: Vec::new(),
            }
        }
    }

    impl Confirm for Scripted {
        fn ask(&mut self, question: &ConflictQuestion) -> io::Result<String> {
            self.asked.push(question.clone());
            self.answers
                .pop()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more answers"))
        }
    }

    #[test]
    fn test_mode_precedence() {
        assert_eq!(ConflictMode::from_flags(false, false), ConflictMode::Default);
        assert_eq!(ConflictMode::from_flags(true, false), ConflictMode::Force);
        assert_eq!(ConflictMode::from_flags(false, true), ConflictMode::Interactive);
        assert_eq!(ConflictMode::from_flags(true, true), ConflictMode::Interactive);
    }

    #[test]
    fn test_decide_without_conflict_always_proceeds() {
        for mode in [
            ConflictMode::Default,
            ConflictMode::Force,
            ConflictMode::Interactive,
        ] {
            assert_eq!(decide(false, mode, None), MoveDecision::Proceed);
            assert_eq!(decide(false, mode, Some("n")), MoveDecision::Proceed);
        }
    }

    #[test]
    fn test_decide_policy_table() {
        assert_eq!(decide(true, ConflictMode::Default, None), MoveDecision::Skip);
        assert_eq!(decide(true, ConflictMode::Force, None), MoveDecision::Overwrite);
        assert_eq!(
            decide(true, ConflictMode::Interactive, Some("y")),
            MoveDecision::Overwrite
        );
        assert_eq!(
            decide(true, ConflictMode::Interactive, Some("Y")),
            MoveDecision::Overwrite
        );
        for declined in ["n", "", "maybe", "yes", " y"] {
            assert_eq!(
                decide(true, ConflictMode::Interactive, Some(declined)),
                MoveDecision::Skip,
                "answer {:?} should decline",
                declined
            );
        }
        assert_eq!(decide(true, ConflictMode::Interactive, None), MoveDecision::Skip);
    }

    #[test]
    fn test_resolve_asks_once_with_sizes() {
        let root = PathBuf::from("/dest");
        let destination = root.join("Documents").join("b.txt");
        let mut prompt = Scripted::new(&["y"]);

        let decision = resolve(
            &mut prompt,
            &destination,
            &root,
            2048,
            Some(1536),
            ConflictMode::Interactive,
        );

        assert_eq!(decision, MoveDecision::Overwrite);
        assert_eq!(prompt.asked.len(), 1);
        let question = &prompt.asked[0];
        assert_eq!(question.existing_size, "1.5 KB");
        assert_eq!(question.incoming, "b.txt");
        assert_eq!(question.incoming_size, "2.0 KB");
        assert!(question.existing.ends_with("b.txt"));
        assert!(question.existing.starts_with("Documents"));
    }

    #[test]
    fn test_resolve_does_not_ask_outside_interactive_mode() {
        let root = PathBuf::from("/dest");
        let destination = root.join("Pictures").join("a.jpg");
        let mut prompt = Scripted::new(&[]);

        assert_eq!(
            resolve(&mut prompt, &destination, &root, 1, Some(1), ConflictMode::Force),
            MoveDecision::Overwrite
        );
        assert_eq!(
            resolve(&mut prompt, &destination, &root, 1, Some(1), ConflictMode::Default),
            MoveDecision::Skip
        );
        assert_eq!(
            resolve(&mut prompt, &destination, &root, 1, None, ConflictMode::Interactive),
            MoveDecision::Proceed
        );
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn test_resolve_read_failure_declines() {
        let root = PathBuf::from("/dest");
        let destination = root.join("Pictures").join("a.jpg");
        let mut prompt = Scripted::new(&[]);

        let decision = resolve(
            &mut prompt,
            &destination,
            &root,
            10,
            Some(10),
            ConflictMode::Interactive,
        );
        assert_eq!(decision, MoveDecision::Skip);
        assert_eq!(prompt.asked.len(), 1);
    }

    #[test]
    fn test_line_prompt_writes_question_and_reads_line() {
        let mut output = Vec::new();
        let answer = {
            let mut prompt = LinePrompt::new(Cursor::new("y\r\nn\n"), &mut output);
            let question = ConflictQuestion {
                existing: "Documents/b.txt".to_string(),
                existing_size: "1.5 KB".to_string(),
                incoming: "b.txt".to_string(),
                incoming_size: "empty".to_string(),
            };
            prompt.ask(&question).unwrap()
        };

        assert_eq!(answer, "y");
        let shown = String::from_utf8(output).unwrap();
        assert_eq!(
            shown,
            "File 'Documents/b.txt' (1.5 KB) already exists.\nOverwrite it with 'b.txt' (empty)? [y/N]: "
        );
    }

    #[test]
    fn test_line_prompt_eof_is_empty_answer() {
        let mut prompt = LinePrompt::new(Cursor::new(""), io::sink());
        let question = ConflictQuestion {
            existing: "x".to_string(),
            existing_size: "empty".to_string(),
            incoming: "x".to_string(),
            incoming_size: "empty".to_string(),
        };
        let answer = prompt.ask(&question).unwrap();
        assert_eq!(answer, "");
        assert_eq!(
            decide(true, ConflictMode::Interactive, Some(answer.as_str())),
            MoveDecision::Skip
        );
    }
}
