use super::timestamp::TimeStamp;
use super::value::{Value, VocabId};
use crate::error::ModelError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnId(pub(crate) u32);

impl ColumnId {
    pub fn get(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Nominal,
    Predicate,
    Matrix,
    Float,
    Integer,
}

impl ColumnType {
    pub const ALL: [ColumnType; 6] = [
        ColumnType::Text,
        ColumnType::Nominal,
        ColumnType::Predicate,
        ColumnType::Matrix,
        ColumnType::Float,
        ColumnType::Integer,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Nominal => "NOMINAL",
            ColumnType::Predicate => "PREDICATE",
            ColumnType::Matrix => "MATRIX",
            ColumnType::Float => "FLOAT",
            ColumnType::Integer => "INTEGER",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        ColumnType::ALL.into_iter().find(|t| t.keyword() == word)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    onset: TimeStamp,
    offset: TimeStamp,
    value: Value,
}

impl Cell {
    pub fn new(onset: TimeStamp, offset: TimeStamp, value: Value) -> Result<Self, ModelError> {
        if offset < onset {
            return Err(ModelError::CellTimes {
                onset: onset.to_string(),
                offset: offset.to_string(),
            });
        }
        Ok(Cell {
            onset,
            offset,
            value,
        })
    }

    pub fn onset(&self) -> TimeStamp {
        self.onset
    }

    pub fn offset(&self) -> TimeStamp {
        self.offset
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }
}

/// A variable: a named, typed, temporally ordered sequence of cells.
#[derive(Debug, Clone)]
pub struct Column {
    id: ColumnId,
    name: String,
    column_type: ColumnType,
    selected: bool,
    hidden: bool,
    /// Matrix element giving the cell shape; set for matrix columns only.
    matrix_vocab: Option<VocabId>,
    cells: Vec<Cell>,
}

impl Column {
    pub(crate) fn new(
        id: ColumnId,
        name: String,
        column_type: ColumnType,
        matrix_vocab: Option<VocabId>,
    ) -> Self {
        Column {
            id,
            name,
            column_type,
            selected: false,
            hidden: false,
            matrix_vocab,
            cells: Vec::new(),
        }
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn matrix_vocab(&self) -> Option<VocabId> {
        self.matrix_vocab
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Insert after every cell whose onset is not later, keeping onset
    /// order stable. Returns the insertion index.
    pub(crate) fn insert_cell(&mut self, cell: Cell) -> usize {
        let index = self.cells.partition_point(|c| c.onset <= cell.onset);
        self.cells.insert(index, cell);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ms: u64) -> TimeStamp {
        TimeStamp::from_millis(ms)
    }

    #[test]
    fn cells_reject_offset_before_onset() {
        assert!(Cell::new(ts(10), ts(10), Value::Undefined).is_ok());
        assert!(matches!(
            Cell::new(ts(10), ts(9), Value::Undefined),
            Err(ModelError::CellTimes { .. })
        ));
    }

    #[test]
    fn insertion_is_stable_by_onset() {
        let mut col = Column::new(ColumnId(1), "c".into(), ColumnType::Integer, None);
        for (onset, v) in [(100, 1), (0, 2), (100, 3), (50, 4)] {
            col.insert_cell(Cell::new(ts(onset), ts(onset), Value::Int(v)).unwrap());
        }
        let order: Vec<&Value> = col.cells().iter().map(Cell::value).collect();
        assert_eq!(
            order,
            [&Value::Int(2), &Value::Int(4), &Value::Int(1), &Value::Int(3)]
        );
    }

    #[test]
    fn type_keywords_round_trip() {
        for t in ColumnType::ALL {
            assert_eq!(ColumnType::from_keyword(t.keyword()), Some(t));
        }
        assert_eq!(ColumnType::from_keyword("matrix"), None);
    }
}
