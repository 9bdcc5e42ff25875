//! The run console: what the user sees after pressing "run".

use crate::client::{RunReport, RunStatus};
use crate::format::escape_html;

pub const WAITING_TEXT: &str = "Waiting for code execution...";
pub const NO_OUTPUT_TEXT: &str = "Code executed successfully (no output).";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Stdout,
    Stderr,
    Info,
    Error,
}

impl LineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::Stdout => "stdout",
            LineKind::Stderr => "stderr",
            LineKind::Info => "info",
            LineKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEntry {
    Status(RunStatus),
    Line { kind: LineKind, text: String },
    AiFix(String),
}

/// Console contents. An empty console is in the waiting state.
#[derive(Debug, Clone, Default)]
pub struct Console {
    entries: Vec<ConsoleEntry>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_waiting(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ConsoleEntry] {
        &self.entries
    }

    /// Append `text` one line per entry. Blank lines are dropped unless the
    /// text is a single line.
    pub fn push_text(&mut self, kind: LineKind, text: &str) {
        let lines: Vec<&str> = text.split('\n').collect();
        let single = lines.len() == 1;

        for line in lines {
            if single || !line.trim().is_empty() {
                self.entries.push(ConsoleEntry::Line {
                    kind,
                    text: line.to_string(),
                });
            }
        }
    }

    pub fn push_status(&mut self, status: RunStatus) {
        self.entries.push(ConsoleEntry::Status(status));
    }

    pub fn push_ai_fix(&mut self, fix: &str) {
        self.entries.push(ConsoleEntry::AiFix(fix.to_string()));
    }

    /// Replace the console contents with a finished run.
    pub fn show_report(&mut self, report: &RunReport) {
        self.clear();

        if let Some(status) = &report.status {
            self.push_status(status.clone());
        }
        if !report.stdout.is_empty() {
            self.push_text(LineKind::Stdout, &report.stdout);
        }
        if !report.stderr.is_empty() {
            self.push_text(LineKind::Stderr, &report.stderr);
        }
        if !report.ai_fix.is_empty() {
            self.push_ai_fix(&report.ai_fix);
        }

        if report.stdout.is_empty()
            && report.stderr.is_empty()
            && report.status == Some(RunStatus::Accepted)
        {
            self.push_text(LineKind::Info, NO_OUTPUT_TEXT);
        }
    }

    pub fn to_html(&self) -> String {
        if self.is_waiting() {
            return format!(
                "<div class=\"console-waiting\"><span class=\"terminal-prompt\">~</span> {}</div>",
                WAITING_TEXT
            );
        }

        let mut html = String::new();
        for entry in &self.entries {
            match entry {
                ConsoleEntry::Status(status) => {
                    html.push_str(&format!(
                        "<div class=\"console-line\"><span class=\"status-badge {}\">{}</span></div>",
                        status.badge_class(),
                        escape_html(status.as_str())
                    ));
                }
                ConsoleEntry::Line { kind: LineKind::Stdout, text } => {
                    html.push_str(&format!(
                        "<div class=\"console-line console-stdout\"><span class=\"terminal-prompt\">~</span> {}</div>",
                        escape_html(text)
                    ));
                }
                ConsoleEntry::Line { kind, text } => {
                    html.push_str(&format!(
                        "<div class=\"console-line console-{}\">{}</div>",
                        kind.as_str(),
                        escape_html(text)
                    ));
                }
                ConsoleEntry::AiFix(fix) => {
                    html.push_str(&format!(
                        "<div class=\"ai-fix-container\"><h4>AI Suggestion:</h4><div class=\"ai-fix\">{}</div></div>",
                        escape_html(fix)
                    ));
                }
            }
        }
        html
    }
}
