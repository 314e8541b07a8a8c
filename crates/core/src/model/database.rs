use super::column::{Cell, Column, ColumnId, ColumnType};
use super::value::{MatrixValue, PredValue, Value, VocabId};
use super::vocab::{validate_name, FormalArgs, SystemRenamePolicy, VocabElement};
use crate::error::ModelError;
use crate::lexer::is_bareword;
use std::collections::HashMap;
use std::fmt;

/// Change notifications delivered to registered listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum DbEvent {
    VocabAdded { id: VocabId, name: String },
    VocabChanged { id: VocabId, name: String },
    VocabRemoved { id: VocabId, name: String },
    ColumnAdded { id: ColumnId, name: String },
    ColumnRemoved { id: ColumnId, name: String },
    CellAppended { column: ColumnId, index: usize },
}

pub trait DatabaseListener {
    fn notify(&mut self, event: &DbEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

/// Vocabulary and columns of one ODB database.
///
/// Vocabulary elements live in an arena addressed by [`VocabId`]; cell
/// values refer to them by id, so renames never touch cells and removals
/// are checked here.
pub struct Database {
    name: String,
    vocab: Vec<Option<VocabElement>>,
    vocab_index: HashMap<String, VocabId>,
    columns: Vec<Column>,
    next_column_id: u32,
    listeners: Vec<(ListenerId, Box<dyn DatabaseListener>)>,
    next_listener_id: u32,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Applied {
    Pred,
    Matrix,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Database {
            name: name.into(),
            vocab: Vec::new(),
            vocab_index: HashMap::new(),
            columns: Vec::new(),
            next_column_id: 1,
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    // -- Listeners -----------------------------------------------

    pub fn add_listener(&mut self, listener: Box<dyn DatabaseListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: DbEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener.notify(&event);
        }
    }

    // -- Vocabulary ----------------------------------------------

    pub fn add_vocab(&mut self, element: VocabElement) -> Result<VocabId, ModelError> {
        let name = element.name().to_owned();
        if self.vocab_index.contains_key(&name) {
            return Err(ModelError::DuplicateVocab { name });
        }
        let id = VocabId(self.vocab.len());
        self.vocab.push(Some(element));
        self.vocab_index.insert(name.clone(), id);
        self.emit(DbEvent::VocabAdded { id, name });
        Ok(id)
    }

    pub fn vocab(&self, id: VocabId) -> Option<&VocabElement> {
        self.vocab.get(id.0).and_then(Option::as_ref)
    }

    pub fn vocab_id(&self, name: &str) -> Option<VocabId> {
        self.vocab_index.get(name).copied()
    }

    pub fn vocab_by_name(&self, name: &str) -> Option<&VocabElement> {
        self.vocab_id(name).and_then(|id| self.vocab(id))
    }

    pub fn vocab_name(&self, id: VocabId) -> Option<&str> {
        self.vocab(id).map(|v| v.name())
    }

    /// Live elements in declaration order.
    pub fn vocab_elements(&self) -> impl Iterator<Item = (VocabId, &VocabElement)> {
        self.vocab
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (VocabId(i), v)))
    }

    pub fn num_vocab(&self) -> usize {
        self.vocab_index.len()
    }

    fn existing_vocab(&self, id: VocabId) -> Result<&VocabElement, ModelError> {
        self.vocab(id).ok_or(ModelError::UnknownVocab(id.0))
    }

    /// Whether any cell value or matrix column depends on `id`.
    pub fn is_vocab_referenced(&self, id: VocabId) -> bool {
        self.columns.iter().any(|c| {
            c.matrix_vocab() == Some(id) || c.cells().iter().any(|cell| cell.value().references(id))
        })
    }

    fn shapes_column(&self, id: VocabId) -> bool {
        self.columns.iter().any(|c| c.matrix_vocab() == Some(id))
    }

    /// Whether any `pred{...}` constraint lists `name`.
    fn named_in_pred_constraint(&self, name: &str) -> bool {
        self.vocab_elements()
            .flat_map(|(_, v)| v.formal_args())
            .any(|a| a.permits_pred(name))
    }

    /// Constraint lists only hold plain names, so an element listed in one
    /// cannot be renamed to anything else.
    fn constraint_rename_error(&self, old: &str, new: &str) -> Option<ModelError> {
        if old == new || is_bareword(new) || !self.named_in_pred_constraint(old) {
            return None;
        }
        Some(ModelError::InvalidName {
            name: new.to_owned(),
            reason: "elements listed in a pred{} constraint need a plain name",
        })
    }

    fn rewrite_pred_constraints(&mut self, old: &str, new: &str) {
        for element in self.vocab.iter_mut().flatten() {
            element.core_mut().rename_permitted_pred(old, new);
        }
    }

    pub fn rename_vocab(
        &mut self,
        id: VocabId,
        name: &str,
        policy: SystemRenamePolicy,
    ) -> Result<(), ModelError> {
        let old = self.existing_vocab(id)?.name().to_owned();
        if old != name && self.vocab_index.contains_key(name) {
            return Err(ModelError::DuplicateVocab {
                name: name.to_owned(),
            });
        }
        if old != name && self.shapes_column(id) {
            return Err(ModelError::VocabInUse { name: old });
        }
        if let Some(e) = self.constraint_rename_error(&old, name) {
            return Err(e);
        }
        if let Some(element) = self.vocab.get_mut(id.0).and_then(Option::as_mut) {
            element.set_name(name, policy)?;
        }
        self.vocab_index.remove(&old);
        self.vocab_index.insert(name.to_owned(), id);
        self.rewrite_pred_constraints(&old, name);
        self.emit(DbEvent::VocabChanged {
            id,
            name: name.to_owned(),
        });
        Ok(())
    }

    /// Edit an element in place. The element is restored when `edit` fails,
    /// when it renames into an existing name, or when it reshapes an element
    /// that cells or a matrix column depend on. A rename is carried into
    /// every `pred{...}` constraint that lists the old name.
    pub fn update_vocab<R>(
        &mut self,
        id: VocabId,
        edit: impl FnOnce(&mut VocabElement) -> Result<R, ModelError>,
    ) -> Result<R, ModelError> {
        let before = self.existing_vocab(id)?.clone();
        let referenced = self.is_vocab_referenced(id);
        let Some(element) = self.vocab[id.0].as_mut() else {
            return Err(ModelError::UnknownVocab(id.0));
        };

        let result = edit(element);
        let after = element.name().to_owned();
        let reshaped = element.formal_args() != before.formal_args()
            || element.var_len() != before.var_len();
        let renamed = after != before.name();
        let constraint = self.constraint_rename_error(before.name(), &after);

        let failure = match (result, constraint) {
            (Err(e), _) => e,
            (Ok(_), _) if renamed && self.vocab_index.contains_key(&after) => {
                ModelError::DuplicateVocab { name: after }
            }
            (Ok(_), Some(e)) => e,
            (Ok(_), None) if referenced && (reshaped || (renamed && self.shapes_column(id))) => {
                ModelError::VocabInUse {
                    name: before.name().to_owned(),
                }
            }
            (Ok(r), None) => {
                if renamed {
                    self.vocab_index.remove(before.name());
                    self.vocab_index.insert(after.clone(), id);
                    self.rewrite_pred_constraints(before.name(), &after);
                }
                self.emit(DbEvent::VocabChanged { id, name: after });
                return Ok(r);
            }
        };

        self.vocab[id.0] = Some(before);
        Err(failure)
    }

    /// Remove an element. Refused while anything still references it.
    pub fn remove_vocab(&mut self, id: VocabId) -> Result<VocabElement, ModelError> {
        let name = self.existing_vocab(id)?.name().to_owned();
        if self.is_vocab_referenced(id) {
            return Err(ModelError::VocabInUse { name });
        }
        let element = self.vocab[id.0]
            .take()
            .ok_or(ModelError::UnknownVocab(id.0))?;
        self.vocab_index.remove(&name);
        self.emit(DbEvent::VocabRemoved { id, name });
        Ok(element)
    }

    // -- Values --------------------------------------------------

    fn check_applied(
        &self,
        id: VocabId,
        applied: Applied,
        args: &mut [Value],
    ) -> Result<(), ModelError> {
        let element = self.existing_vocab(id)?;
        match (applied, element) {
            (Applied::Pred, VocabElement::Matrix(_)) => {
                return Err(ModelError::WrongVocabKind {
                    name: element.name().to_owned(),
                    expected: "predicate",
                })
            }
            (Applied::Matrix, VocabElement::Predicate(_)) => {
                return Err(ModelError::WrongVocabKind {
                    name: element.name().to_owned(),
                    expected: "matrix",
                })
            }
            _ => {}
        }

        let formals = element.formal_args();
        let n = formals.len();
        let arity_ok = if element.var_len() && n > 0 {
            args.len() >= n
        } else {
            args.len() == n
        };
        if !arity_ok {
            return Err(ModelError::ArityMismatch {
                vocab: element.name().to_owned(),
                expected: if element.var_len() {
                    format!("at least {}", n)
                } else {
                    n.to_string()
                },
                found: args.len(),
            });
        }

        for (i, arg) in args.iter_mut().enumerate() {
            self.verify_applied(arg)?;
            let formal = &formals[i.min(n - 1)];
            formal
                .check(arg, self)
                .map_err(|reason| ModelError::ArgMismatch {
                    vocab: element.name().to_owned(),
                    position: i + 1,
                    formal: formal.name().to_owned(),
                    reason,
                })?;
        }
        Ok(())
    }

    /// Re-check a nested or externally built value against this database's
    /// vocabulary. Ids that do not resolve here, or resolve to an element
    /// the value does not fit, are refused.
    fn verify_applied(&self, value: &Value) -> Result<(), ModelError> {
        let (id, applied, args) = match value {
            Value::Pred(p) => (p.vocab(), Applied::Pred, p.args()),
            Value::Matrix(m) => (m.vocab(), Applied::Matrix, m.args()),
            _ => return Ok(()),
        };
        self.check_applied(id, applied, &mut args.to_vec())
    }

    /// Build a predicate value, checking arity and argument kinds.
    pub fn make_pred(&self, id: VocabId, mut args: Vec<Value>) -> Result<Value, ModelError> {
        self.check_applied(id, Applied::Pred, &mut args)?;
        Ok(Value::Pred(PredValue::new(id, args)))
    }

    /// Build a matrix value, checking arity and argument kinds.
    pub fn make_matrix(&self, id: VocabId, mut args: Vec<Value>) -> Result<Value, ModelError> {
        self.check_applied(id, Applied::Matrix, &mut args)?;
        Ok(Value::Matrix(MatrixValue::new(id, args)))
    }

    // -- Columns -------------------------------------------------

    pub fn create_variable(
        &mut self,
        name: &str,
        column_type: ColumnType,
    ) -> Result<ColumnId, ModelError> {
        validate_name(name)?;
        if self.column_id(name).is_some() {
            return Err(ModelError::DuplicateColumn {
                name: name.to_owned(),
            });
        }
        let matrix_vocab = match column_type {
            ColumnType::Matrix => match self.vocab_id(name) {
                Some(id) if self.vocab(id).is_some_and(VocabElement::is_matrix) => Some(id),
                _ => {
                    return Err(ModelError::MissingMatrixVocab {
                        column: name.to_owned(),
                    })
                }
            },
            _ => None,
        };
        let id = ColumnId(self.next_column_id);
        self.next_column_id += 1;
        self.columns
            .push(Column::new(id, name.to_owned(), column_type, matrix_vocab));
        self.emit(DbEvent::ColumnAdded {
            id,
            name: name.to_owned(),
        });
        Ok(id)
    }

    pub fn remove_variable(&mut self, id: ColumnId) -> Result<Column, ModelError> {
        let pos = self
            .columns
            .iter()
            .position(|c| c.id() == id)
            .ok_or(ModelError::UnknownColumn(id.0))?;
        let column = self.columns.remove(pos);
        self.emit(DbEvent::ColumnRemoved {
            id,
            name: column.name().to_owned(),
        });
        Ok(column)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id() == id)
    }

    pub fn column_mut(&mut self, id: ColumnId) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.id() == id)
    }

    pub fn column_id(&self, name: &str) -> Option<ColumnId> {
        self.columns.iter().find(|c| c.name() == name).map(Column::id)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Add a cell in onset order after checking its value against the
    /// column type. Returns the index it landed at.
    pub fn append_cell(&mut self, column: ColumnId, mut cell: Cell) -> Result<usize, ModelError> {
        let col = self
            .column(column)
            .ok_or(ModelError::UnknownColumn(column.0))?;
        let column_type = col.column_type();
        if column_type == ColumnType::Float {
            if let Value::Int(n) = *cell.value() {
                *cell.value_mut() = Value::Float(n as f64);
            }
        }
        let fits = match (column_type, cell.value()) {
            (_, Value::Undefined) => true,
            (ColumnType::Integer, Value::Int(_))
            | (ColumnType::Float, Value::Float(_))
            | (ColumnType::Text, Value::Text(_))
            | (ColumnType::Nominal, Value::Nominal(_))
            | (ColumnType::Predicate, Value::Pred(_)) => true,
            (ColumnType::Matrix, Value::Matrix(m)) => Some(m.vocab()) == col.matrix_vocab(),
            _ => false,
        };
        if !fits {
            return Err(ModelError::ColumnTypeMismatch {
                column: col.name().to_owned(),
                expected: column_type.keyword(),
                found: cell.value().kind_name().to_owned(),
            });
        }
        if let Some(reason) = cell.value().unwritable() {
            return Err(ModelError::UnwritableValue {
                column: col.name().to_owned(),
                reason,
            });
        }
        self.verify_applied(cell.value())?;
        let index = self
            .column_mut(column)
            .map(|c| c.insert_cell(cell))
            .ok_or(ModelError::UnknownColumn(column.0))?;
        self.emit(DbEvent::CellAppended { column, index });
        Ok(index)
    }

    // -- Structural comparison -----------------------------------

    fn value_eq(&self, a: &Value, other: &Database, b: &Value) -> bool {
        let applied_eq = |va: VocabId, aa: &[Value], vb: VocabId, ab: &[Value]| {
            self.vocab_name(va) == other.vocab_name(vb)
                && aa.len() == ab.len()
                && aa.iter().zip(ab).all(|(x, y)| self.value_eq(x, other, y))
        };
        match (a, b) {
            (Value::Pred(x), Value::Pred(y)) => applied_eq(x.vocab(), x.args(), y.vocab(), y.args()),
            (Value::Matrix(x), Value::Matrix(y)) => {
                applied_eq(x.vocab(), x.args(), y.vocab(), y.args())
            }
            (x, y) => x == y,
        }
    }

    fn column_eq(&self, a: &Column, other: &Database, b: &Column) -> bool {
        a.name() == b.name()
            && a.column_type() == b.column_type()
            && a.selected() == b.selected()
            && a.hidden() == b.hidden()
            && a.num_cells() == b.num_cells()
            && a.cells().iter().zip(b.cells()).all(|(x, y)| {
                x.onset() == y.onset()
                    && x.offset() == y.offset()
                    && self.value_eq(x.value(), other, y.value())
            })
    }
}

/// Structural equality: ids, arena holes and listeners are ignored; values
/// compare by the names of the elements they apply.
impl PartialEq for Database {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self
                .vocab_elements()
                .map(|(_, v)| v)
                .eq(other.vocab_elements().map(|(_, v)| v))
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| self.column_eq(a, other, b))
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("vocab", &self.vocab)
            .field("columns", &self.columns)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Database {
    fn default() -> Self {
        Database::new("")
    }
}
