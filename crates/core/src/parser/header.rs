use super::{PResult, Parser};
use crate::lexer::TokenKind;
use crate::ODB_VERSION;

impl Parser {
    /// `( (VERSION> n) (NAME> "...") )`
    pub(super) fn header(&mut self) -> PResult<()> {
        self.list(|p| p.header_entry())
    }

    fn header_entry(&mut self) -> PResult<()> {
        let at = self.pos();
        self.expect_open()?;
        match self.take_label()?.as_str() {
            "VERSION>" => {
                if !self.at(TokenKind::Int) {
                    return self.unexpected("a version number");
                }
                let version = self.tok.lexeme.parse::<i64>().ok();
                self.bump()?;
                if version != Some(ODB_VERSION) {
                    self.warning_at(
                        at,
                        format!(
                            "unsupported version {}, reading as version {}",
                            version.map_or_else(|| "?".to_owned(), |v| v.to_string()),
                            ODB_VERSION
                        ),
                    )?;
                }
                self.expect_close()
            }
            "NAME>" => {
                if !self.at(TokenKind::QuotedString) {
                    return self.unexpected("a quoted database name");
                }
                let name = std::mem::take(&mut self.tok.lexeme);
                self.bump()?;
                self.db.set_name(name);
                self.expect_close()
            }
            other => {
                self.warning_at(at, format!("unknown header entry '{}' ignored", other))?;
                self.skip_rest()
            }
        }
    }
}
