//! Recursive-descent reader for ODB text.
//!
//! Every production returns `PResult`. A syntax problem is reported to the
//! shared [`Reporter`] and unwinds with [`Stop::Recover`] to the nearest
//! list loop, which skips the rest of the broken entry and resumes with its
//! next sibling. Budget exhaustion unwinds all the way out with
//! [`Stop::Abort`], keeping whatever was built so far.

use crate::error::{ModelError, OdbError};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::model::Database;
use crate::options::ReadOptions;
use crate::report::{ReadReport, Reporter};
use std::path::Path;

mod cells;
mod columns;
mod header;
mod values;
mod vocab;

pub(crate) enum Stop {
    /// Reported; resynchronize at the enclosing list entry.
    Recover,
    /// A diagnostic budget was exceeded.
    Abort,
    /// A model invariant broke for reasons the input does not explain.
    Fatal(ModelError),
}

pub(crate) type PResult<T> = Result<T, Stop>;

/// Read a database from ODB source text.
///
/// Diagnostics never make this fail; they are counted in the returned
/// report. `Err` means the options were invalid or the object model
/// refused an operation for a reason unrelated to the input.
pub fn read_database(source: &str, options: &ReadOptions) -> Result<ReadReport, OdbError> {
    options.validate()?;
    let mut parser = Parser::new(source, options);

    let aborted = match parser.run() {
        Ok(()) | Err(Stop::Recover) => false,
        Err(Stop::Abort) => {
            tracing::warn!(
                errors = parser.lexer.error_count(),
                warnings = parser.lexer.warning_count(),
                "read aborted: diagnostic budget exceeded"
            );
            true
        }
        Err(Stop::Fatal(e)) => return Err(e.into()),
    };

    let Parser { lexer, db, .. } = parser;
    let (reporter, listing) = lexer.into_parts();
    Ok(ReadReport::new(db, reporter, aborted, listing))
}

/// Read a database from a file. I/O failures carry the path.
pub fn read_database_file(
    path: impl AsRef<Path>,
    options: &ReadOptions,
) -> Result<ReadReport, OdbError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|e| OdbError::io("read", path, e))?;
    read_database(&source, options)
}

pub(crate) struct Parser {
    lexer: Lexer,
    tok: Token,
    /// Open parens consumed so far.
    depth: usize,
    eof_reported: bool,
    /// The current token directly follows a malformed lexeme that was
    /// reported as an error.
    after_error: bool,
    db: Database,
}

impl Parser {
    fn new(source: &str, options: &ReadOptions) -> Self {
        Parser {
            lexer: Lexer::new(source, options),
            tok: Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                line: 1,
                column: 1,
            },
            depth: 0,
            eof_reported: false,
            after_error: false,
            db: Database::default(),
        }
    }

    fn run(&mut self) -> PResult<()> {
        self.fetch()?;
        self.database()
    }

    // -- Token cursor --------------------------------------------

    fn fetch(&mut self) -> PResult<()> {
        let errors = self.lexer.error_count();
        self.tok = loop {
            let t = self.lexer.next_token();
            if t.kind != TokenKind::Error {
                break t;
            }
        };
        self.after_error = self.lexer.error_count() > errors;
        if self.lexer.abort_scan() {
            return Err(Stop::Abort);
        }
        Ok(())
    }

    /// Consume the current token, tracking nesting depth.
    fn bump(&mut self) -> PResult<()> {
        if self.tok.kind.is_open() {
            self.depth += 1;
        } else if self.tok.kind.is_close() {
            self.depth = self.depth.saturating_sub(1);
        }
        self.fetch()
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.tok.kind == kind
    }

    fn at_eof(&self) -> bool {
        self.at(TokenKind::Eof)
    }

    fn pos(&self) -> (u32, u32) {
        (self.tok.line, self.tok.column)
    }

    // -- Diagnostics ---------------------------------------------

    fn reporter(&mut self) -> &mut Reporter {
        self.lexer.reporter_mut()
    }

    fn error_at(&mut self, (line, column): (u32, u32), message: impl Into<String>) -> PResult<()> {
        if self.reporter().error(line, column, message) {
            return Err(Stop::Abort);
        }
        Ok(())
    }

    fn warning_at(
        &mut self,
        (line, column): (u32, u32),
        message: impl Into<String>,
    ) -> PResult<()> {
        if self.reporter().warning(line, column, message) {
            return Err(Stop::Abort);
        }
        Ok(())
    }

    /// Report an error at the current token and start recovery. Running
    /// out of input is reported once per read. Failing at the token right
    /// after a malformed lexeme adds no second report.
    fn fail<T>(&mut self, message: impl Into<String>) -> PResult<T> {
        if self.after_error {
            self.eof_reported |= self.at_eof();
        } else if self.at_eof() {
            if !self.eof_reported {
                self.eof_reported = true;
                self.error_at(self.pos(), "unexpected end of input")?;
            }
        } else {
            self.error_at(self.pos(), message)?;
        }
        Err(Stop::Recover)
    }

    fn unexpected<T>(&mut self, expected: &str) -> PResult<T> {
        let found = self.tok.describe();
        self.fail(format!("expected {}, found {}", expected, found))
    }

    /// Route a model result: input-caused failures become error
    /// diagnostics (`Ok(None)`), anything else is fatal.
    fn model<T>(&mut self, at: (u32, u32), result: Result<T, ModelError>) -> PResult<Option<T>> {
        match result {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_input_error() => {
                self.error_at(at, e.to_string())?;
                Ok(None)
            }
            Err(e) => Err(Stop::Fatal(e)),
        }
    }

    // -- Expectations --------------------------------------------

    fn expect_open(&mut self) -> PResult<()> {
        if self.at(TokenKind::AlistOpen) {
            self.bump()
        } else {
            self.unexpected("'('")
        }
    }

    fn expect_close(&mut self) -> PResult<()> {
        if self.at(TokenKind::AlistClose) {
            self.bump()
        } else {
            self.unexpected("')'")
        }
    }

    fn is_label(&self) -> bool {
        self.at(TokenKind::Symbol) && self.tok.lexeme.ends_with('>') && !self.tok.lexeme.starts_with('<')
    }

    fn take_label(&mut self) -> PResult<String> {
        if !self.is_label() {
            return self.unexpected("a label");
        }
        let label = std::mem::take(&mut self.tok.lexeme);
        self.bump()?;
        Ok(label)
    }

    fn expect_label(&mut self, label: &str) -> PResult<()> {
        if self.tok.is_symbol(label) {
            self.bump()
        } else {
            self.unexpected(&format!("'{}'", label))
        }
    }

    fn take_nominal(&mut self) -> PResult<String> {
        if !self.at(TokenKind::Nominal) {
            return self.unexpected("a name");
        }
        let name = std::mem::take(&mut self.tok.lexeme);
        self.bump()?;
        Ok(name)
    }

    fn take_bool(&mut self) -> PResult<bool> {
        if !self.at(TokenKind::Bool) {
            return self.unexpected("TRUE or FALSE");
        }
        let b = self.tok.lexeme == "TRUE";
        self.bump()?;
        Ok(b)
    }

    /// `(LABEL> value)` entry whose value is a single boolean.
    fn bool_entry(&mut self) -> PResult<bool> {
        let b = self.take_bool()?;
        self.expect_close()?;
        Ok(b)
    }

    // -- Lists and recovery --------------------------------------

    /// Skip the broken entry that began at `depth`: a stray token, or a
    /// whole group including its closer.
    fn recover(&mut self, depth: usize) -> PResult<()> {
        if self.depth == depth && !self.tok.kind.is_close() && !self.at_eof() {
            self.bump()?;
        }
        while self.depth > depth && !self.at_eof() {
            self.bump()?;
        }
        Ok(())
    }

    /// Consume the remainder of the group whose opener was just taken.
    fn skip_rest(&mut self) -> PResult<()> {
        let target = self.depth.saturating_sub(1);
        while self.depth > target && !self.at_eof() {
            self.bump()?;
        }
        Ok(())
    }

    /// Like `skip_rest`, with lexer diagnostics dropped inside the group.
    /// Reporting resumes before the closer is consumed, so the token after
    /// the group is checked normally.
    fn skip_quietly(&mut self) -> PResult<()> {
        let target = self.depth.saturating_sub(1);
        while self.depth > target && !self.at_eof() {
            if self.depth == target + 1 && self.tok.kind.is_close() {
                self.lexer.set_quiet(false);
            }
            self.bump()?;
        }
        self.lexer.set_quiet(false);
        Ok(())
    }

    /// Entries up to and including the closer of an already opened list.
    fn entries(&mut self, mut entry: impl FnMut(&mut Self) -> PResult<()>) -> PResult<()> {
        loop {
            if self.tok.kind.is_close() {
                return self.bump();
            }
            if self.at_eof() {
                return self.fail("unexpected end of input");
            }
            let depth = self.depth;
            match entry(self) {
                Ok(()) => {}
                Err(Stop::Recover) => self.recover(depth)?,
                Err(stop) => return Err(stop),
            }
        }
    }

    /// `( entry* )`
    fn list(&mut self, entry: impl FnMut(&mut Self) -> PResult<()>) -> PResult<()> {
        self.expect_open()?;
        self.entries(entry)
    }

    // -- Document ------------------------------------------------

    fn database(&mut self) -> PResult<()> {
        if !self.at(TokenKind::AlistOpen) {
            return self.unexpected("'(ODB>'");
        }
        self.bump()?;
        self.expect_label("ODB>")?;

        let mut last = Section::Start;
        self.entries(|p| p.section(&mut last))?;

        if !self.at_eof() {
            let at = self.pos();
            self.error_at(at, "unexpected content after the database")?;
        }
        Ok(())
    }

    fn section(&mut self, last: &mut Section) -> PResult<()> {
        let at = self.pos();
        self.expect_open()?;
        if self.is_label() && SKIPPED_SECTIONS.contains(&self.tok.lexeme.as_str()) {
            tracing::debug!(section = %self.tok.lexeme, "skipping unsupported section");
            self.lexer.set_quiet(true);
            self.bump()?;
            return self.skip_quietly();
        }
        let label = self.take_label()?;
        let section = match label.as_str() {
            "HEADER>" => Section::Header,
            "VOCAB>" => Section::Vocab,
            "COLUMNS>" => Section::Columns,
            "CELLS>" => Section::Cells,
            other => {
                self.warning_at(at, format!("unknown section '{}' skipped", other))?;
                return self.skip_rest();
            }
        };

        if section <= *last {
            let problem = if section == *last {
                "repeated"
            } else {
                "out of order"
            };
            self.error_at(at, format!("section '{}' is {}", label, problem))?;
            return self.skip_rest();
        }
        *last = section;

        tracing::debug!(section = %label, line = at.0, "reading section");
        match section {
            Section::Header => self.header()?,
            Section::Vocab => self.list(|p| p.vocab_decl())?,
            Section::Columns => self.list(|p| p.column_decl())?,
            Section::Cells => self.list(|p| p.column_cells())?,
            Section::Start => {}
        }
        self.expect_close()
    }
}

/// Sections of the format this reader accepts without reading them.
const SKIPPED_SECTIONS: &[&str] = &["ALIGNMENTS>", "GROUPS>", "IMPORT-FORMATS>"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
    Start,
    Header,
    Vocab,
    Columns,
    Cells,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnType, FormalArgs, Value};

    const AFRAID: &str = r#"(ODB>
 (VOCAB> (
  (PREDICATE> predicate_name(<alpha:nominal>, <bravo:int>) ((VARLEN> FALSE) (SYSTEM> FALSE)))
 ))
 (COLUMNS> (
  (mood ((TYPE> PREDICATE) (SELECTED> FALSE) (HIDDEN> FALSE)))
 ))
 (CELLS> (
  (mood (
   (00:00:01:000 00:00:02:000 predicate_name(cat, 3))
   (00:00:03:000 00:00:04:000 predicate_name(cat, 3, 4))
  ))
 ))
)
"#;

    fn read(src: &str) -> ReadReport {
        read_database(src, &ReadOptions::default()).expect("read should not be fatal")
    }

    fn read_with(src: &str, max_errors: usize) -> ReadReport {
        let options = ReadOptions {
            max_errors,
            ..ReadOptions::default()
        };
        read_database(src, &options).expect("read should not be fatal")
    }

    #[test]
    fn pred_values_type_check_and_arity_is_a_diagnostic() {
        let report = read(AFRAID);
        assert_eq!(report.error_count, 1, "{:?}", report.diagnostics);
        assert_eq!(report.warning_count, 0);
        assert!(!report.aborted);
        assert!(report.diagnostics[0].message.contains("expects 2"));
        assert_eq!(report.diagnostics[0].line, 11);

        let db = &report.database;
        let vocab = db.vocab_by_name("predicate_name").unwrap();
        assert_eq!(vocab.num_formal_args(), 2);
        let mood = db.column_by_name("mood").unwrap();
        assert_eq!(mood.column_type(), ColumnType::Predicate);
        assert_eq!(mood.num_cells(), 1);
        match mood.cells()[0].value() {
            Value::Pred(p) => {
                assert_eq!(db.vocab_name(p.vocab()), Some("predicate_name"));
                assert_eq!(p.args(), &[Value::Nominal("cat".into()), Value::Int(3)]);
            }
            other => panic!("expected a predicate, got {:?}", other),
        }
    }

    #[test]
    fn recovery_resumes_at_next_sibling() {
        let src = r#"(ODB>
 (VOCAB> (
  (PREDICATE> good(<a>) ())
  (PREDICATE> 42 junk (more junk))
  (PREDICATE> alsogood(<b>) ())
 ))
)"#;
        let report = read(src);
        assert_eq!(report.error_count, 1, "{:?}", report.diagnostics);
        let names: Vec<&str> = report
            .database
            .vocab_elements()
            .map(|(_, v)| v.name())
            .collect();
        assert_eq!(names, ["good", "alsogood"]);
    }

    #[test]
    fn skipped_sections_are_silent() {
        let src = "(ODB> (GROUPS> (a (b c))) (HEADER> ((NAME> \"x\"))) (ALIGNMENTS> ()) (IMPORT-FORMATS> x))";
        let report = read(src);
        assert!(report.is_clean(), "{:?}", report.diagnostics);
        assert_eq!(report.database.name(), "x");
    }

    #[test]
    fn skipped_sections_do_not_report_lexical_noise() {
        let src = "(ODB> (IMPORT-FORMATS> (csv \"%d\" %d/%m)) (GROUPS> (12ab \"\\q\")) (HEADER> ((NAME> \"x\"))))";
        let report = read(src);
        assert!(report.is_clean(), "{:?}", report.diagnostics);
        assert_eq!(report.database.name(), "x");
    }

    #[test]
    fn noise_right_after_a_skipped_section_is_reported() {
        let report = read("(ODB> (GROUPS> @)@ (HEADER> ((NAME> \"x\"))))");
        assert_eq!(report.warning_count, 1, "{:?}", report.diagnostics);
        assert_eq!(report.diagnostics[0].column, 18);
        assert_eq!(report.database.name(), "x");
    }

    #[test]
    fn a_malformed_lexeme_counts_once() {
        let src = "(ODB> (COLUMNS> ((n ((TYPE> INTEGER))))) (CELLS> ((n (\n\
                   (00:00:00:000 00:00:00:000 12ab)\n\
                   (00:00:01:000 00:00:01:000 7))))))";
        let report = read(src);
        assert_eq!(report.error_count, 1, "{:?}", report.diagnostics);
        assert!(report.diagnostics[0].message.contains("malformed number '12ab'"));
        assert_eq!(report.database.column_by_name("n").unwrap().num_cells(), 1);
    }

    #[test]
    fn unterminated_string_counts_once() {
        let report = read("(ODB> (HEADER> ((NAME> \"open");
        assert_eq!(report.error_count, 1, "{:?}", report.diagnostics);
        assert!(!report.diagnostics[0].message.contains("end of input"));
    }

    #[test]
    fn unknown_and_misordered_sections() {
        let src = "(ODB> (COLUMNS> ()) (VOCAB> ()) (MYSTERY> 1 2) (COLUMNS> ()))";
        let report = read(src);
        assert_eq!(report.error_count, 2, "{:?}", report.diagnostics);
        assert_eq!(report.warning_count, 1);
        assert!(report.diagnostics[0].message.contains("out of order"));
        assert!(report.diagnostics[2].message.contains("repeated"));
    }

    fn n_bad_columns(n: usize) -> String {
        let mut src = String::from("(ODB> (COLUMNS> (\n");
        for i in 0..n {
            src.push_str(&format!("  (c{} ((TYPE> BOGUS)))\n", i));
        }
        src.push_str("  (last ((TYPE> TEXT)))\n ))\n)\n");
        src
    }

    #[test]
    fn budget_of_n_tolerates_n_errors() {
        let report = read_with(&n_bad_columns(3), 3);
        assert_eq!(report.error_count, 3);
        assert!(!report.aborted);
        assert!(report.database.column_by_name("last").is_some());
    }

    #[test]
    fn budget_of_n_aborts_on_the_next_error() {
        let report = read_with(&n_bad_columns(4), 3);
        assert_eq!(report.error_count, 4);
        assert!(report.aborted);
        assert!(report.database.column_by_name("last").is_none());
    }

    #[test]
    fn lexer_budget_aborts_the_read() {
        let options = ReadOptions {
            max_warnings: 1,
            ..ReadOptions::default()
        };
        let report = read_database("(ODB> # # (HEADER> ()))", &options).unwrap();
        assert!(report.aborted);
        assert_eq!(report.warning_count, 2);
    }

    #[test]
    fn end_of_input_is_reported_once() {
        let report = read("(ODB> (VOCAB> ((PREDICATE> p(<a>)");
        assert_eq!(report.error_count, 1, "{:?}", report.diagnostics);
        assert!(report.diagnostics[0].message.contains("end of input"));
    }

    #[test]
    fn missing_database_label() {
        let report = read("(HEADER> ())");
        assert_eq!(report.error_count, 1);
        assert!(report.diagnostics[0].message.contains("'ODB>'"));
    }

    #[test]
    fn zero_budgets_are_rejected() {
        let options = ReadOptions {
            max_errors: 0,
            ..ReadOptions::default()
        };
        assert!(matches!(
            read_database("(ODB>)", &options),
            Err(OdbError::Config(_))
        ));
    }

    #[test]
    fn listing_is_collected_on_request() {
        let options = ReadOptions {
            listing: true,
            ..ReadOptions::default()
        };
        let report = read_database("(ODB>)", &options).unwrap();
        assert_eq!(
            report.listing,
            ["1:1 ALIST_OPEN \"(\"", "1:2 SYMBOL \"ODB>\"", "1:6 ALIST_CLOSE \")\"", "1:7 EOF \"\""]
        );
    }

    #[test]
    fn missing_file_carries_path() {
        let err = read_database_file("/nonexistent/x.odb", &ReadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/x.odb"));
    }
}
