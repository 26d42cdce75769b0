//! Terminal output for teardown progress.

use crate::ui;
use teardown::{ReportSink, Tone};

/// Prints report lines with the terminal helpers in [`ui`].
///
/// In quiet mode only warnings and failures are shown.
pub struct TerminalSink {
    quiet: bool,
}

impl TerminalSink {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Whether a line of this tone is printed.
    pub fn shows(&self, tone: Tone) -> bool {
        match tone {
            Tone::Warn | Tone::Failure | Tone::Plain => true,
            Tone::Section | Tone::Step | Tone::Success => !self.quiet,
        }
    }
}

impl ReportSink for TerminalSink {
    fn emit(&mut self, tone: Tone, text: &str) {
        if !self.shows(tone) {
            return;
        }
        match tone {
            Tone::Section => ui::section(text),
            Tone::Step => ui::step(text),
            Tone::Success => ui::success(text),
            Tone::Warn => ui::warn(text),
            Tone::Failure => ui::error(text),
            Tone::Plain => println!("{text}"),
        }
    }
}
