//! Budgeted diagnostic sink shared by the lexer and the parser.

use crate::error::{Diagnostic, Severity};
use crate::model::Database;
use crate::options::ReadOptions;

#[derive(Debug, Clone)]
pub struct Reporter {
    max_errors: usize,
    max_warnings: usize,
    diagnostics: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl Reporter {
    pub fn new(options: &ReadOptions) -> Self {
        Reporter {
            max_errors: options.max_errors,
            max_warnings: options.max_warnings,
            diagnostics: Vec::new(),
            errors: 0,
            warnings: 0,
        }
    }

    /// Record a diagnostic. Returns `true` when this report took its
    /// counter past the configured budget.
    pub fn report(&mut self, diagnostic: Diagnostic) -> bool {
        let exceeded = match diagnostic.severity {
            Severity::Error => {
                self.errors += 1;
                self.errors > self.max_errors
            }
            Severity::Warning => {
                self.warnings += 1;
                self.warnings > self.max_warnings
            }
        };
        self.diagnostics.push(diagnostic);
        exceeded
    }

    pub fn error(&mut self, line: u32, column: u32, message: impl Into<String>) -> bool {
        self.report(Diagnostic::error(line, column, message))
    }

    pub fn warning(&mut self, line: u32, column: u32, message: impl Into<String>) -> bool {
        self.report(Diagnostic::warning(line, column, message))
    }

    /// Whether either counter is currently past its budget.
    pub fn exhausted(&self) -> bool {
        self.errors > self.max_errors || self.warnings > self.max_warnings
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Outcome of one read: the database built so far plus everything
/// reported while building it.
#[derive(Debug)]
pub struct ReadReport {
    pub database: Database,
    pub diagnostics: Vec<Diagnostic>,
    pub error_count: usize,
    pub warning_count: usize,
    /// A budget was exceeded and reading stopped early.
    pub aborted: bool,
    /// Token listing lines; empty unless requested.
    pub listing: Vec<String>,
}

impl ReadReport {
    pub(crate) fn new(
        database: Database,
        reporter: Reporter,
        aborted: bool,
        listing: Vec<String>,
    ) -> Self {
        ReadReport {
            database,
            error_count: reporter.error_count(),
            warning_count: reporter.warning_count(),
            diagnostics: reporter.into_diagnostics(),
            aborted,
            listing,
        }
    }

    /// No errors, no warnings and no abort: the database is trustworthy.
    pub fn is_clean(&self) -> bool {
        self.error_count == 0 && self.warning_count == 0 && !self.aborted
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// Summary object printed by `--output json`.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "aborted":     self.aborted,
            "diagnostics": self.diagnostics.iter().map(Diagnostic::to_json_value).collect::<Vec<_>>(),
            "errors":      self.error_count,
            "warnings":    self.warning_count,
        })
    }
}
