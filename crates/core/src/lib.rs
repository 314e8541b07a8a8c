//! odb-core: reader, object model and writer for ODB text databases.
//!
//! An ODB file is a parenthesized document holding a vocabulary of
//! predicate and matrix templates, typed columns, and time-stamped cells
//! whose values may apply those templates.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`read_database()`] / [`read_database_file()`] -- lex and parse,
//!   returning a [`ReadReport`] with the database and its diagnostics
//! - [`write_database()`] and friends -- canonical serialization
//! - [`Database`], [`VocabElement`], [`FormalArgument`], [`Value`] -- the
//!   object model
//! - [`ReadOptions`] / [`LineEnding`] -- per-call configuration
//! - [`Diagnostic`], [`ModelError`], [`OdbError`] -- error types
//!
//! The lexer is public for tools that want raw tokens.

/// ODB format version written in every header.
pub const ODB_VERSION: i64 = 1;

pub mod error;
pub mod lexer;
pub mod model;
pub mod options;
pub mod parser;
pub mod report;
pub mod serialize;

// ── Convenience re-exports: key types ────────────────────────────────

pub use error::{Diagnostic, ModelError, OdbError, Severity};
pub use model::{
    Cell, Column, ColumnId, ColumnType, Database, FormalArgKind, FormalArgs, FormalArgument,
    SystemRenamePolicy, TimeStamp, Value, VocabElement, VocabId,
};
pub use options::{LineEnding, ReadOptions, DEFAULT_MAX_ERRORS, DEFAULT_MAX_WARNINGS};
pub use report::ReadReport;

// ── Convenience re-exports: entry points ─────────────────────────────

pub use parser::{read_database, read_database_file};
pub use serialize::{write_database, write_database_file, write_database_to};
