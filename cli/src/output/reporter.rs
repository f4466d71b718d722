//! `TerminalReporter` — Presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::ProgressReporter`
//! trait so application services can emit progress events without depending on
//! any presentation type directly.

use std::sync::{Mutex, PoisonError};

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// The status line opened by `start` and closed by `end`.
struct StatusLine {
    message: String,
    spinner: Option<ProgressBar>,
}

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// - `start()` opens a spinner on a TTY, or prints `" • {message}"` otherwise
/// - `end()` closes it with `✓` or `✗`
/// - `step()`, `success()` and `warn()` print one marked line
///
/// Everything is suppressed when `ctx.quiet`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    status: Mutex<Option<StatusLine>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            status: Mutex::new(None),
        }
    }

    fn take_status(&self) -> Option<StatusLine> {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn close(&self, line: StatusLine, success: bool) {
        match (line.spinner, success) {
            (Some(spinner), true) => progress::finish_ok(&spinner, &line.message),
            (Some(spinner), false) => progress::finish_error(&spinner, &line.message),
            (None, true) => eprintln!(" {} {}", "✓".style(self.ctx.styles.success), line.message),
            (None, false) => eprintln!(" {} {}", "✗".style(self.ctx.styles.error), line.message),
        }
    }

    fn print(&self, marker: String, message: &str) {
        let status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        match status.as_ref().and_then(|line| line.spinner.as_ref()) {
            Some(spinner) => spinner.println(format!(" {marker} {message}")),
            None => eprintln!(" {marker} {message}"),
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn start(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        // A status line left open by a failed stage is closed first.
        if let Some(line) = self.take_status() {
            self.close(line, false);
        }
        let spinner = if self.ctx.show_progress() {
            Some(progress::spinner(message))
        } else {
            eprintln!(" {} {message}", "•".style(self.ctx.styles.step));
            None
        };
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = Some(StatusLine {
            message: message.to_string(),
            spinner,
        });
    }

    fn end(&self, success: bool) {
        if let Some(line) = self.take_status() {
            self.close(line, success);
        }
    }

    fn step(&self, message: &str) {
        if !self.ctx.quiet {
            self.print("→".style(self.ctx.styles.step).to_string(), message);
        }
    }

    fn success(&self, message: &str) {
        if !self.ctx.quiet {
            self.print("✓".style(self.ctx.styles.success).to_string(), message);
        }
    }

    fn warn(&self, message: &str) {
        if !self.ctx.quiet {
            self.print("⚠".style(self.ctx.styles.warning).to_string(), message);
        }
    }
}
