use super::{PResult, Parser, Stop};
use crate::error::ModelError;
use crate::lexer::TokenKind;
use crate::model::{FormalArgs, FormalArgument, VocabElement};

impl Parser {
    /// `(PREDICATE> name(<a>, <b:int>) ((VARLEN> b) (SYSTEM> b)))`, and the
    /// same with `MATRIX>`. A declaration the model refuses is dropped.
    pub(super) fn vocab_decl(&mut self) -> PResult<()> {
        let at = self.pos();
        self.expect_open()?;
        let label_at = self.pos();
        let is_matrix = match self.take_label()?.as_str() {
            "PREDICATE>" => false,
            "MATRIX>" => true,
            other => {
                let message = format!("expected PREDICATE> or MATRIX>, found '{}'", other);
                self.error_at(label_at, message)?;
                return Err(Stop::Recover);
            }
        };

        let name_at = self.pos();
        let name = self.take_nominal()?;
        if !self.at(TokenKind::PredOpen) {
            return self.unexpected("'(' directly after the element name");
        }
        self.bump()?;
        let formals = self.formal_list()?;

        let mut var_len = false;
        let mut system = false;
        if self.at(TokenKind::AlistOpen) {
            self.list(|p| p.vocab_attr(&mut var_len, &mut system))?;
        }
        self.expect_close()?;

        tracing::trace!(
            name = %name,
            matrix = is_matrix,
            args = formals.len(),
            "vocabulary declaration"
        );

        if formals.is_empty() {
            return self.error_at(name_at, format!("'{}' declares no formal arguments", name));
        }
        let element = if is_matrix {
            VocabElement::matrix(name)
        } else {
            VocabElement::predicate(name)
        };
        let Some(mut element) = self.model(name_at, element)? else {
            return Ok(());
        };
        for (arg_at, arg) in formals {
            let appended = arg.and_then(|arg| element.append_formal_arg(arg));
            if self.model(arg_at, appended)?.is_none() {
                return Ok(());
            }
        }
        let flags = element.set_var_len(var_len).and_then(|()| {
            if system {
                element.set_system()
            } else {
                Ok(())
            }
        });
        if self.model(at, flags)?.is_none() {
            return Ok(());
        }
        let added = self.db.add_vocab(element);
        self.model(name_at, added)?;
        Ok(())
    }

    /// Formal arguments up to and including the closing `)`. Declaration
    /// text is parsed here but judged by the caller.
    #[allow(clippy::type_complexity)]
    fn formal_list(&mut self) -> PResult<Vec<((u32, u32), Result<FormalArgument, ModelError>)>> {
        let mut formals = Vec::new();
        while !self.at(TokenKind::PredClose) {
            if !formals.is_empty() {
                if !self.tok.is_symbol(",") {
                    return self.unexpected("',' or ')'");
                }
                self.bump()?;
            }
            let at = self.pos();
            if !(self.at(TokenKind::Symbol) && self.tok.lexeme.starts_with('<')) {
                return self.unexpected("a formal argument");
            }
            let text = std::mem::take(&mut self.tok.lexeme);
            self.bump()?;
            formals.push((at, text.parse::<FormalArgument>()));
        }
        self.bump()?;
        Ok(formals)
    }

    fn vocab_attr(&mut self, var_len: &mut bool, system: &mut bool) -> PResult<()> {
        let at = self.pos();
        self.expect_open()?;
        match self.take_label()?.as_str() {
            "VARLEN>" => *var_len = self.bool_entry()?,
            "SYSTEM>" => *system = self.bool_entry()?,
            other => {
                self.warning_at(at, format!("unknown vocabulary attribute '{}' ignored", other))?;
                self.skip_rest()?;
            }
        }
        Ok(())
    }
}
