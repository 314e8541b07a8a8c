//! In-memory object model: vocabulary, columns and cells.

mod column;
mod database;
mod formal_arg;
mod timestamp;
mod value;
mod vocab;

pub use column::{Cell, Column, ColumnId, ColumnType};
pub use database::{Database, DatabaseListener, DbEvent, ListenerId};
pub use formal_arg::{FormalArgKind, FormalArgument};
pub use timestamp::{TimeStamp, TimeStampError};
pub use value::{MatrixValue, PredValue, Value, VocabId};
pub(crate) use value::float_text;
pub use vocab::{FormalArgs, MatrixVocab, PredicateVocab, SystemRenamePolicy, VocabCore, VocabElement};
