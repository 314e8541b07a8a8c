//! Per-call configuration for reading and writing ODB text.

use crate::error::OdbError;
use serde::{Deserialize, Serialize};

/// Default error budget for a single read.
pub const DEFAULT_MAX_ERRORS: usize = 10;
/// Default warning budget for a single read.
pub const DEFAULT_MAX_WARNINGS: usize = 50;

/// Budget and tracing switches for [`crate::read_database`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadOptions {
    /// Errors tolerated before the read aborts.
    pub max_errors: usize,
    /// Warnings tolerated before the read aborts.
    pub max_warnings: usize,
    /// Lexer only: keep scanning after the budget is exceeded.
    pub continue_on_error: bool,
    /// Record one listing line per token.
    pub listing: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            max_errors: DEFAULT_MAX_ERRORS,
            max_warnings: DEFAULT_MAX_WARNINGS,
            continue_on_error: false,
            listing: false,
        }
    }
}

impl ReadOptions {
    pub fn validate(&self) -> Result<(), OdbError> {
        if self.max_errors == 0 {
            return Err(OdbError::Config("max_errors must be positive".to_owned()));
        }
        if self.max_warnings == 0 {
            return Err(OdbError::Config("max_warnings must be positive".to_owned()));
        }
        Ok(())
    }
}

/// Line terminator used by the serializer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    Cr,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Cr => "\r",
        }
    }

    /// Rewrite LF-terminated text to this convention.
    pub fn convert(self, text: &str) -> String {
        match self {
            LineEnding::Lf => text.to_owned(),
            LineEnding::Cr => text.replace('\n', "\r"),
        }
    }
}
