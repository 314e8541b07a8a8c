use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Severity of a reported diagnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// A lexical or syntax diagnostic recorded against the input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, line: u32, column: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            line,
            column,
            message: message.into(),
        }
    }

    pub fn error(line: u32, column: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Error, line, column, message)
    }

    pub fn warning(line: u32, column: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Warning, line, column, message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Serialize to the JSON shape used by the error stream and the
    /// negative conformance fixtures.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "column":   self.column,
            "line":     self.line,
            "message":  self.message,
            "severity": self.severity,
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.line, self.column, self.severity, self.message
        )
    }
}

/// Contract violations on the object model.
///
/// Every model operation returns these immediately; they are never
/// counted against the diagnostic budget.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("invalid formal argument '{text}': {reason}")]
    InvalidFormalArg { text: String, reason: String },

    #[error("formal argument <{arg}> already declared in '{vocab}'")]
    DuplicateFormalArg { vocab: String, arg: String },

    #[error("'{vocab}' is a system element; cannot {op}")]
    SystemProtected { vocab: String, op: &'static str },

    #[error("index {index} out of range for {len} formal argument(s)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("'{vocab}' has no formal arguments and cannot become a system element")]
    EmptyArgList { vocab: String },

    #[error("matrix '{vocab}' cannot take a variable-length argument list")]
    MatrixVarLen { vocab: String },

    #[error("vocabulary element '{name}' already exists")]
    DuplicateVocab { name: String },

    #[error("column '{name}' already exists")]
    DuplicateColumn { name: String },

    #[error("no vocabulary element with id {0}")]
    UnknownVocab(usize),

    #[error("no column with id {0}")]
    UnknownColumn(u32),

    #[error("vocabulary element '{name}' is still referenced")]
    VocabInUse { name: String },

    #[error("'{name}' is not a {expected} element")]
    WrongVocabKind { name: String, expected: &'static str },

    #[error("matrix column '{column}' has no matrix element of the same name")]
    MissingMatrixVocab { column: String },

    #[error("'{vocab}' expects {expected} argument(s), found {found}")]
    ArityMismatch {
        vocab: String,
        expected: String,
        found: usize,
    },

    #[error("argument {position} <{formal}> of '{vocab}': {reason}")]
    ArgMismatch {
        vocab: String,
        position: usize,
        formal: String,
        reason: String,
    },

    #[error("column '{column}' of type {expected} cannot hold {found}")]
    ColumnTypeMismatch {
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error("column '{column}': {reason}")]
    UnwritableValue { column: String, reason: &'static str },

    #[error("cell offset {offset} precedes onset {onset}")]
    CellTimes { onset: String, offset: String },
}

impl ModelError {
    /// Whether the failure is fully explained by the input data, as opposed
    /// to a broken caller invariant. The parser downgrades these to error
    /// diagnostics and keeps going.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ModelError::InvalidName { .. }
                | ModelError::InvalidFormalArg { .. }
                | ModelError::DuplicateFormalArg { .. }
                | ModelError::EmptyArgList { .. }
                | ModelError::MatrixVarLen { .. }
                | ModelError::DuplicateVocab { .. }
                | ModelError::DuplicateColumn { .. }
                | ModelError::WrongVocabKind { .. }
                | ModelError::MissingMatrixVocab { .. }
                | ModelError::ArityMismatch { .. }
                | ModelError::ArgMismatch { .. }
                | ModelError::ColumnTypeMismatch { .. }
                | ModelError::UnwritableValue { .. }
                | ModelError::CellTimes { .. }
        )
    }
}

/// Error type of every fallible public entry point.
#[derive(Debug, thiserror::Error)]
pub enum OdbError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("cannot {op} '{}': {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl OdbError {
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OdbError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}
