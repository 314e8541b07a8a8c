//! Canonical ODB text output.
//!
//! The layout is fixed: sections in reading order, one space of indent per
//! nesting level, every column listed under `CELLS>`. Reading the output
//! back yields a structurally equal database, and canonical input is
//! reproduced byte for byte.

use crate::error::OdbError;
use crate::lexer::is_bareword;
use crate::model::{float_text, Column, Database, FormalArgs, Value, VocabElement, VocabId};
use crate::options::LineEnding;
use crate::ODB_VERSION;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Serialize `db`, ending every line with `line_ending`.
pub fn write_database(db: &Database, line_ending: LineEnding) -> String {
    let mut w = Writer {
        db,
        out: String::new(),
        nl: line_ending.as_str(),
    };
    w.database();
    w.out
}

pub fn write_database_to(
    db: &Database,
    line_ending: LineEnding,
    mut out: impl Write,
) -> io::Result<()> {
    out.write_all(write_database(db, line_ending).as_bytes())?;
    out.flush()
}

/// Write `db` to `path`, replacing any existing file.
pub fn write_database_file(
    db: &Database,
    path: impl AsRef<Path>,
    line_ending: LineEnding,
) -> Result<(), OdbError> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| OdbError::io("create", path, e))?;
    write_database_to(db, line_ending, BufWriter::new(file))
        .map_err(|e| OdbError::io("write", path, e))
}

/// Name as a nominal token: bare when it lexes back unchanged, otherwise
/// bar-quoted.
pub fn quote_name(name: &str) -> Cow<'_, str> {
    if is_bareword(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("|{}|", escape(name, '|')))
    }
}

fn quote_text(text: &str) -> String {
    format!("\"{}\"", escape(text, '"'))
}

fn escape(s: &str, delim: char) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == delim || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn flag(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

struct Writer<'a> {
    db: &'a Database,
    out: String,
    nl: &'static str,
}

// `write!` into a String is infallible.
impl Writer<'_> {
    fn line(&mut self, indent: usize, text: &str) {
        for _ in 0..indent {
            self.out.push(' ');
        }
        self.out.push_str(text);
        self.out.push_str(self.nl);
    }

    /// `(LABEL> (` + entries + `))`, or `(LABEL> ())` when there are none.
    fn section(&mut self, label: &str, entries: Vec<String>) {
        if entries.is_empty() {
            self.line(1, &format!("({} ())", label));
            return;
        }
        self.line(1, &format!("({} (", label));
        for entry in &entries {
            self.out.push_str(entry);
        }
        self.line(1, "))");
    }

    fn database(&mut self) {
        self.line(0, "(ODB>");
        let header = format!(
            "(HEADER> ((VERSION> {}) (NAME> {})))",
            ODB_VERSION,
            quote_text(self.db.name())
        );
        self.line(1, &header);

        let vocab = self
            .db
            .vocab_elements()
            .map(|(_, v)| self.vocab_decl(v))
            .collect();
        self.section("VOCAB>", vocab);

        let columns = self
            .db
            .columns()
            .iter()
            .map(|c| self.column_decl(c))
            .collect();
        self.section("COLUMNS>", columns);

        let cells = self
            .db
            .columns()
            .iter()
            .map(|c| self.column_cells(c))
            .collect();
        self.section("CELLS>", cells);

        self.line(0, ")");
    }

    fn vocab_decl(&self, v: &VocabElement) -> String {
        let label = if v.is_matrix() { "MATRIX>" } else { "PREDICATE>" };
        let args: Vec<String> = v.formal_args().iter().map(|f| f.to_string()).collect();
        format!(
            "  ({} {}({}) ((VARLEN> {}) (SYSTEM> {}))){}",
            label,
            quote_name(v.name()),
            args.join(", "),
            flag(v.var_len()),
            flag(v.is_system()),
            self.nl
        )
    }

    fn column_decl(&self, column: &Column) -> String {
        format!(
            "  ({} ((TYPE> {}) (SELECTED> {}) (HIDDEN> {}))){}",
            quote_name(column.name()),
            column.column_type(),
            flag(column.selected()),
            flag(column.hidden()),
            self.nl
        )
    }

    fn column_cells(&self, column: &Column) -> String {
        let name = quote_name(column.name());
        if column.cells().is_empty() {
            return format!("  ({} ()){}", name, self.nl);
        }
        let mut s = format!("  ({} ({}", name, self.nl);
        for cell in column.cells() {
            let _ = write!(s, "   ({} {} ", cell.onset(), cell.offset());
            self.value(&mut s, cell.value(), "val");
            let _ = write!(s, "){}", self.nl);
        }
        let _ = write!(s, "  )){}", self.nl);
        s
    }

    /// `placeholder` names the slot, for writing an undefined value.
    fn value(&self, s: &mut String, value: &Value, placeholder: &str) {
        match value {
            Value::Undefined => {
                let _ = write!(s, "<{}>", placeholder);
            }
            Value::Int(n) => {
                let _ = write!(s, "{}", n);
            }
            Value::Float(f) => s.push_str(&float_text(*f)),
            Value::Text(t) => s.push_str(&quote_text(t)),
            Value::Nominal(n) => s.push_str(&quote_name(n)),
            Value::TimeStamp(t) => {
                let _ = write!(s, "{}", t);
            }
            Value::Pred(p) => self.applied(s, p.vocab(), p.args()),
            Value::Matrix(m) => self.applied(s, m.vocab(), m.args()),
        }
    }

    fn applied(&self, s: &mut String, id: VocabId, args: &[Value]) {
        let element = self.db.vocab(id);
        let name = element.map_or("", |v| v.name());
        let formals = element.map(|v| v.formal_args()).unwrap_or_default();
        let _ = write!(s, "{}(", quote_name(name));
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                s.push_str(", ");
            }
            let slot = formals
                .get(i)
                .or(formals.last())
                .map_or("val", |f| f.name());
            self.value(s, arg, slot);
        }
        s.push(')');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, ColumnType, FormalArgument, TimeStamp};
    use crate::{read_database, ReadOptions};

    const SAMPLE: &str = "(ODB>
 (HEADER> ((VERSION> 1) (NAME> \"Sample\")))
 (VOCAB> (
  (PREDICATE> afraid(<who:nominal>, <level:int[0,10]>) ((VARLEN> FALSE) (SYSTEM> FALSE)))
 ))
 (COLUMNS> (
  (mood ((TYPE> PREDICATE) (SELECTED> FALSE) (HIDDEN> FALSE)))
 ))
 (CELLS> (
  (mood (
   (00:00:01:000 00:00:02:500 afraid(cat, 3))
  ))
 ))
)
";

    fn sample() -> Database {
        let mut db = Database::new("Sample");
        let mut afraid = VocabElement::predicate("afraid").unwrap();
        afraid
            .append_formal_arg("<who:nominal>".parse::<FormalArgument>().unwrap())
            .unwrap();
        afraid
            .append_formal_arg("<level:int[0,10]>".parse::<FormalArgument>().unwrap())
            .unwrap();
        let id = db.add_vocab(afraid).unwrap();
        let mood = db.create_variable("mood", ColumnType::Predicate).unwrap();
        let value = db
            .make_pred(id, vec![Value::Nominal("cat".into()), Value::Int(3)])
            .unwrap();
        let cell = Cell::new(
            TimeStamp::from_millis(1_000),
            TimeStamp::from_millis(2_500),
            value,
        )
        .unwrap();
        db.append_cell(mood, cell).unwrap();
        db
    }

    #[test]
    fn canonical_layout() {
        assert_eq!(write_database(&sample(), LineEnding::Lf), SAMPLE);
    }

    #[test]
    fn cr_differs_only_in_terminators() {
        let lf = write_database(&sample(), LineEnding::Lf);
        let cr = write_database(&sample(), LineEnding::Cr);
        assert!(!cr.contains('\n'));
        assert_eq!(cr.replace('\r', "\n"), lf);
    }

    #[test]
    fn empty_database() {
        assert_eq!(
            write_database(&Database::new(""), LineEnding::Lf),
            "(ODB>\n (HEADER> ((VERSION> 1) (NAME> \"\")))\n (VOCAB> ())\n (COLUMNS> ())\n (CELLS> ())\n)\n"
        );
    }

    #[test]
    fn awkward_names_are_bar_quoted() {
        assert_eq!(quote_name("plain_name-1.2"), "plain_name-1.2");
        assert_eq!(quote_name("TRUE"), "|TRUE|");
        assert_eq!(quote_name("two words"), "|two words|");
        assert_eq!(quote_name("a|b\\c"), "|a\\|b\\\\c|");
        assert_eq!(quote_name("9lives"), "|9lives|");
    }

    #[test]
    fn output_reads_back_equal() {
        let mut db = sample();
        db.set_name("quote \" and \\ slash");
        let mut odd = VocabElement::matrix("odd name").unwrap();
        odd.append_formal_arg(FormalArgument::untyped("x").unwrap())
            .unwrap();
        odd.append_formal_arg("<y:float>".parse().unwrap()).unwrap();
        odd.set_system().unwrap();
        let odd = db.add_vocab(odd).unwrap();
        let col = db.create_variable("odd name", ColumnType::Matrix).unwrap();
        db.column_mut(col).unwrap().set_selected(true);
        for (ms, v) in [
            (0, vec![Value::Nominal("FALSE".into()), Value::Float(-0.25)]),
            (10, vec![Value::Undefined, Value::Int(2)]),
            (5, vec![Value::Text("line\nbreak".into()), Value::Undefined]),
        ] {
            let value = db.make_matrix(odd, v).unwrap();
            let cell = Cell::new(TimeStamp::from_millis(ms), TimeStamp::from_millis(ms), value);
            db.append_cell(col, cell.unwrap()).unwrap();
        }
        let text = db.create_variable("notes", ColumnType::Text).unwrap();
        db.append_cell(text, Cell::new(TimeStamp::ZERO, TimeStamp::ZERO, Value::Undefined).unwrap())
            .unwrap();

        let written = write_database(&db, LineEnding::Lf);
        let report = read_database(&written, &ReadOptions::default()).unwrap();
        assert!(report.is_clean(), "{:?}\n{}", report.diagnostics, written);
        assert_eq!(report.database, db);
        assert_eq!(write_database(&report.database, LineEnding::Lf), written);
    }

    fn read_back(db: &Database) -> String {
        let written = write_database(db, LineEnding::Lf);
        let report = read_database(&written, &ReadOptions::default()).unwrap();
        assert!(report.is_clean(), "{:?}\n{}", report.diagnostics, written);
        assert_eq!(&report.database, db);
        assert_eq!(write_database(&report.database, LineEnding::Lf), written);
        written
    }

    #[test]
    fn fine_floats_and_edge_nominals_read_back_equal() {
        let mut db = Database::new("edges");
        let mut m = VocabElement::predicate("m").unwrap();
        m.append_formal_arg("<x:float[-0.0000001,1000.0000001]>".parse().unwrap())
            .unwrap();
        m.append_formal_arg("<tag:nominal>".parse().unwrap()).unwrap();
        let m = db.add_vocab(m).unwrap();
        let preds = db.create_variable("preds", ColumnType::Predicate).unwrap();
        let rates = db.create_variable("rates", ColumnType::Float).unwrap();
        let tags = db.create_variable("tags", ColumnType::Nominal).unwrap();

        for (ms, x, tag) in [
            (0, 1e-7, "TRUE"),
            (1, 0.1234567, "9lives"),
            (2, -1e-7, "FALSE"),
            (3, 1000.0000001, "plain"),
        ] {
            let at = TimeStamp::from_millis(ms);
            let value = db
                .make_pred(m, vec![Value::Float(x), Value::Nominal(tag.into())])
                .unwrap();
            db.append_cell(preds, Cell::new(at, at, value).unwrap()).unwrap();
            db.append_cell(rates, Cell::new(at, at, Value::Float(x)).unwrap())
                .unwrap();
            db.append_cell(tags, Cell::new(at, at, Value::Nominal(tag.into())).unwrap())
                .unwrap();
        }

        let written = read_back(&db);
        assert!(written.contains("m(<x:float[-0.0000001,1000.0000001]>, <tag:nominal>)"));
        assert!(written.contains(" m(0.0000001, |TRUE|))"));
        assert!(written.contains(" 0.1234567)"));
        assert!(written.contains(" |9lives|)"));
    }

    #[test]
    fn renamed_constraint_targets_read_back_clean() {
        let mut db = sample();
        let afraid = db.vocab_id("afraid").unwrap();
        let mut wrap = VocabElement::predicate("wrap").unwrap();
        wrap.append_formal_arg("<p:pred{afraid}>".parse().unwrap())
            .unwrap();
        let wrap = db.add_vocab(wrap).unwrap();
        let inner = db
            .make_pred(afraid, vec![Value::Nominal("cat".into()), Value::Int(1)])
            .unwrap();
        let value = db.make_pred(wrap, vec![inner]).unwrap();
        let mood = db.column_id("mood").unwrap();
        let at = TimeStamp::from_millis(3_000);
        db.append_cell(mood, Cell::new(at, at, value).unwrap())
            .unwrap();

        db.rename_vocab(afraid, "scared", crate::model::SystemRenamePolicy::Refuse)
            .unwrap();
        let written = read_back(&db);
        assert!(written.contains("wrap(<p:pred{scared}>)"));
        assert!(written.contains("wrap(scared(cat, 1))"));
    }

    #[test]
    fn file_output_is_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.odb");
        write_database_file(&sample(), &path, LineEnding::Cr).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, SAMPLE.replace('\n', "\r").into_bytes());
    }
}
