use super::{PResult, Parser};
use crate::lexer::TokenKind;
use crate::model::{Cell, ColumnId, TimeStamp};

/// Placeholder name expected for an empty cell.
pub const CELL_PLACEHOLDER: &str = "val";

impl Parser {
    /// `(column ( (onset offset value) ... ))`
    pub(super) fn column_cells(&mut self) -> PResult<()> {
        self.expect_open()?;
        let name_at = self.pos();
        let name = self.take_nominal()?;
        let Some(id) = self.db.column_id(&name) else {
            self.error_at(name_at, format!("cells for unknown column '{}'", name))?;
            return self.skip_rest();
        };
        let mut latest = None;
        self.list(|p| p.cell(id, &mut latest))?;
        self.expect_close()
    }

    fn cell(&mut self, column: ColumnId, latest: &mut Option<TimeStamp>) -> PResult<()> {
        let at = self.pos();
        self.expect_open()?;
        let onset = self.take_timestamp()?;
        let offset = self.take_timestamp()?;
        let value = self.value(CELL_PLACEHOLDER)?;
        self.expect_close()?;

        let Some(cell) = self.model(at, Cell::new(onset, offset, value))? else {
            return Ok(());
        };
        let appended = self.db.append_cell(column, cell);
        if self.model(at, appended)?.is_none() {
            return Ok(());
        }
        match *latest {
            Some(prev) if onset < prev => {
                let message = format!(
                    "cell onset {} precedes earlier onset {}; inserted in time order",
                    onset, prev
                );
                self.warning_at(at, message)?;
            }
            _ => *latest = Some(onset),
        }
        Ok(())
    }

    fn take_timestamp(&mut self) -> PResult<TimeStamp> {
        if !self.at(TokenKind::TimeStamp) {
            return self.unexpected("a timestamp");
        }
        match self.tok.lexeme.parse::<TimeStamp>() {
            Ok(t) => {
                self.bump()?;
                Ok(t)
            }
            Err(e) => self.fail(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{TimeStamp, Value};
    use crate::{read_database, ReadOptions, ReadReport};

    fn read_cells(columns: &str, cells: &str) -> ReadReport {
        let src = format!(
            "(ODB>\n (COLUMNS> ({}))\n (CELLS> (\n{}\n ))\n)",
            columns, cells
        );
        read_database(&src, &ReadOptions::default()).unwrap()
    }

    fn onsets(report: &ReadReport, column: &str) -> Vec<u64> {
        report
            .database
            .column_by_name(column)
            .unwrap()
            .cells()
            .iter()
            .map(|c| c.onset().millis())
            .collect()
    }

    #[test]
    fn out_of_order_cells_warn_and_are_sorted_in() {
        let report = read_cells(
            "(n ((TYPE> INTEGER)))",
            "(n ((00:00:05:000 00:00:05:000 1) (00:00:01:000 00:00:02:000 2) (00:00:09:000 00:00:09:000 3)))",
        );
        assert_eq!(report.error_count, 0);
        assert_eq!(report.warning_count, 1, "{:?}", report.diagnostics);
        assert_eq!(onsets(&report, "n"), [1000, 5000, 9000]);
    }

    #[test]
    fn offset_before_onset_drops_the_cell() {
        let report = read_cells(
            "(n ((TYPE> INTEGER)))",
            "(n ((00:00:05:000 00:00:04:999 1) (00:00:06:000 00:00:07:000 2)))",
        );
        assert_eq!(report.error_count, 1);
        assert!(report.diagnostics[0].message.contains("precedes onset"));
        assert_eq!(onsets(&report, "n"), [6000]);
    }

    #[test]
    fn unknown_columns_are_skipped() {
        let report = read_cells(
            "(n ((TYPE> INTEGER)))",
            "(ghost ((00:00:00:000 00:00:00:000 1)))\n(n ((00:00:00:000 00:00:00:000 7)))",
        );
        assert_eq!(report.error_count, 1);
        assert!(report.diagnostics[0].message.contains("unknown column 'ghost'"));
        assert_eq!(onsets(&report, "n"), [0]);
    }

    #[test]
    fn values_must_suit_the_column() {
        let report = read_cells(
            "(i ((TYPE> INTEGER))) (f ((TYPE> FLOAT))) (t ((TYPE> TEXT))) (k ((TYPE> NOMINAL)))",
            "(i ((00:00:00:000 00:00:00:000 1.500000) (00:00:00:000 00:00:00:000 <val>)))\n\
             (f ((00:00:00:000 00:00:00:000 2)))\n\
             (t ((00:00:00:000 00:00:00:000 \"hello\") (00:00:01:000 00:00:01:000 hello)))\n\
             (k ((00:00:00:000 00:00:00:000 hello) (00:00:01:000 00:00:01:000 TRUE)))",
        );
        assert_eq!(report.error_count, 3, "{:?}", report.diagnostics);
        let db = &report.database;
        let value = |col: &str| db.column_by_name(col).unwrap().cells()[0].value().clone();
        assert_eq!(value("i"), Value::Undefined);
        assert_eq!(value("f"), Value::Float(2.0));
        assert_eq!(value("t"), Value::Text("hello".into()));
        assert_eq!(value("k"), Value::Nominal("hello".into()));
        assert_eq!(
            db.column_by_name("k").unwrap().cells()[0].offset(),
            TimeStamp::ZERO
        );
    }
}
