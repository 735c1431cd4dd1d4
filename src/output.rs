//! Response text formatting for batch results.
//!
//! Every tool reports one human-readable line per input, in input order:
//!
//! ```text
//! Resized /photos/dawn.jpg → /photos/dawn_resized.jpg
//! Failed to resize /photos/dusk.jpg: Input file is missing: /photos/dusk.jpg
//! ```
//!
//! The past-tense verb on success and the infinitive on failure differ per
//! tool and are carried by [`Verbs`].
//!
//! # Architecture
//!
//! Format functions are pure and return `String`/`Vec<String>` for
//! testability. [`print_lines`] is the only function here that writes to
//! stdout, and it is only used by the one-shot `call` command.

use crate::batch::ProcessingOutcome;

/// Wording used when reporting a tool's outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verbs {
    /// Success verb, e.g. "Converted".
    pub done: &'static str,
    /// Failure verb, e.g. "convert".
    pub action: &'static str,
}

impl Verbs {
    pub const CONVERT: Verbs = Verbs {
        done: "Converted",
        action: "convert",
    };
    pub const COMPRESS: Verbs = Verbs {
        done: "Compressed",
        action: "compress",
    };
    pub const RESIZE: Verbs = Verbs {
        done: "Resized",
        action: "resize",
    };
    pub const PROCESS: Verbs = Verbs {
        done: "Processed",
        action: "process",
    };
}

/// Format a single outcome as its response line.
pub fn format_outcome(outcome: &ProcessingOutcome, verbs: Verbs) -> String {
    match &outcome.result {
        Ok(output) => format!(
            "{} {} \u{2192} {}",
            verbs.done,
            outcome.source.display(),
            output.display()
        ),
        Err(error) => format!(
            "Failed to {} {}: {}",
            verbs.action,
            outcome.source.display(),
            error
        ),
    }
}

/// Format every outcome, preserving order.
pub fn format_outcomes(outcomes: &[ProcessingOutcome], verbs: Verbs) -> Vec<String> {
    outcomes.iter().map(|o| format_outcome(o, verbs)).collect()
}

/// Print lines to stdout.
pub fn print_lines<S: AsRef<str>>(lines: &[S]) {
    for line in lines {
        println!("{}", line.as_ref());
    }
}
