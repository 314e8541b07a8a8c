use super::{PResult, Parser, Stop};
use crate::lexer::TokenKind;
use crate::model::{FormalArgs, FormalArgument, Value};
use std::str::FromStr;

impl Parser {
    /// One value. `placeholder` is the name an empty slot should carry
    /// here: the formal argument's name, or `val` for a whole cell.
    pub(super) fn value(&mut self, placeholder: &str) -> PResult<Value> {
        let value = match self.tok.kind {
            TokenKind::Int => Value::Int(self.literal("an integer")?),
            TokenKind::Float => Value::Float(self.literal("a float")?),
            TokenKind::TimeStamp => Value::TimeStamp(self.literal("a timestamp")?),
            TokenKind::QuotedString => Value::Text(std::mem::take(&mut self.tok.lexeme)),
            TokenKind::Nominal => {
                let at = self.pos();
                let name = std::mem::take(&mut self.tok.lexeme);
                self.bump()?;
                if self.at(TokenKind::PredOpen) {
                    return self.applied(name, at);
                }
                return Ok(Value::Nominal(name));
            }
            TokenKind::Symbol if self.tok.lexeme.starts_with('<') => {
                return self.placeholder(placeholder);
            }
            TokenKind::Bool => {
                let message = format!("'{}' cannot be used as a value", self.tok.lexeme);
                return self.fail(message);
            }
            _ => return self.unexpected("a value"),
        };
        self.bump()?;
        Ok(value)
    }

    fn literal<T: FromStr>(&mut self, what: &str) -> PResult<T> {
        match self.tok.lexeme.parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => self.unexpected(what),
        }
    }

    /// `<name>` standing for an unfilled slot.
    fn placeholder(&mut self, expected: &str) -> PResult<Value> {
        let at = self.pos();
        let text = std::mem::take(&mut self.tok.lexeme);
        self.bump()?;
        match text.parse::<FormalArgument>() {
            Ok(arg) if arg.kind().keyword().is_some() => {
                self.error_at(at, format!("typed placeholder '{}' in value position", text))?;
                Err(Stop::Recover)
            }
            Ok(arg) => {
                if arg.name() != expected {
                    let message = format!(
                        "placeholder {} does not match the expected <{}>",
                        text, expected
                    );
                    self.warning_at(at, message)?;
                }
                Ok(Value::Undefined)
            }
            Err(e) => {
                self.error_at(at, e.to_string())?;
                Err(Stop::Recover)
            }
        }
    }

    /// `name(arg, ...)` once `name` is consumed; builds a predicate or a
    /// matrix value depending on what `name` declares.
    fn applied(&mut self, name: String, at: (u32, u32)) -> PResult<Value> {
        let Some(id) = self.db.vocab_id(&name) else {
            self.error_at(at, format!("unknown vocabulary element '{}'", name))?;
            return Err(Stop::Recover);
        };
        let (is_matrix, slots) = match self.db.vocab(id) {
            Some(element) => (
                element.is_matrix(),
                element
                    .formal_args()
                    .iter()
                    .map(|f| f.name().to_owned())
                    .collect::<Vec<_>>(),
            ),
            None => return Err(Stop::Recover),
        };

        self.bump()?;
        let mut args = Vec::new();
        while !self.at(TokenKind::PredClose) {
            if !args.is_empty() {
                if !self.tok.is_symbol(",") {
                    return self.unexpected("',' or ')'");
                }
                self.bump()?;
            }
            let slot = slots
                .get(args.len())
                .or(slots.last())
                .map_or(super::cells::CELL_PLACEHOLDER, String::as_str);
            args.push(self.value(slot)?);
        }
        self.bump()?;

        let made = if is_matrix {
            self.db.make_matrix(id, args)
        } else {
            self.db.make_pred(id, args)
        };
        match self.model(at, made)? {
            Some(value) => Ok(value),
            None => Err(Stop::Recover),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::Value;
    use crate::{read_database, ReadOptions, ReadReport};

    const VOCAB: &str = "(VOCAB> (\n\
        (PREDICATE> afraid(<who:nominal>, <level:int[0,10]>))\n\
        (PREDICATE> says(<who>, <what:quote>))\n\
        (PREDICATE> list(<item>) ((VARLEN> TRUE)))\n\
        (MATRIX> trial(<n:int>, <rt:float>, <mood:pred>))\n\
        ))";

    fn read_values(column_type: &str, values: &[&str]) -> ReadReport {
        let cells: String = values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("(00:00:{:02}:000 00:00:{:02}:000 {})", i, i, v))
            .collect();
        let name = if column_type == "MATRIX" { "trial" } else { "c" };
        let src = format!(
            "(ODB> {} (COLUMNS> (({} ((TYPE> {}))))) (CELLS> (({} ({})))))",
            VOCAB, name, column_type, name, cells
        );
        read_database(&src, &ReadOptions::default()).unwrap()
    }

    fn cell_values(report: &ReadReport) -> Vec<Value> {
        report.database.columns()[0]
            .cells()
            .iter()
            .map(|c| c.value().clone())
            .collect()
    }

    #[test]
    fn nested_and_var_len_predicates() {
        let report = read_values(
            "PREDICATE",
            &[
                "says(bob, \"hi\")",
                "list(1, 2.500000, afraid(cat, <level>), 00:00:01:000)",
                "afraid(<who>, <level>)",
            ],
        );
        assert!(report.is_clean(), "{:?}", report.diagnostics);
        let values = cell_values(&report);
        assert_eq!(values.len(), 3);
        match &values[1] {
            Value::Pred(p) => {
                assert_eq!(p.args().len(), 4);
                assert!(matches!(&p.args()[2], Value::Pred(inner) if inner.args()[1] == Value::Undefined));
            }
            other => panic!("expected a predicate, got {:?}", other),
        }
    }

    #[test]
    fn argument_problems_drop_the_cell() {
        let report = read_values(
            "PREDICATE",
            &[
                "afraid(cat, 11)",
                "afraid(3, 1)",
                "says(bob, 2)",
                "nobody(x)",
                "afraid(<who:nominal>, 1)",
                "afraid(cat, 1)",
            ],
        );
        assert_eq!(report.error_count, 5, "{:?}", report.diagnostics);
        assert_eq!(cell_values(&report).len(), 1);
    }

    #[test]
    fn misnamed_placeholders_warn() {
        let report = read_values("PREDICATE", &["afraid(<someone>, 1)", "<empty>"]);
        assert_eq!(report.error_count, 0);
        assert_eq!(report.warning_count, 2, "{:?}", report.diagnostics);
        assert_eq!(cell_values(&report).len(), 2);
    }

    #[test]
    fn matrix_cells() {
        let report = read_values(
            "MATRIX",
            &[
                "trial(1, 2, says(<who>, \"x\"))",
                "trial(<n>, <rt>, <mood>)",
                "afraid(cat, 1)",
            ],
        );
        assert_eq!(report.error_count, 1, "{:?}", report.diagnostics);
        let values = cell_values(&report);
        match &values[0] {
            Value::Matrix(m) => assert_eq!(m.args()[1], Value::Float(2.0)),
            other => panic!("expected a matrix, got {:?}", other),
        }
    }
}
