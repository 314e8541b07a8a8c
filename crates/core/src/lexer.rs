use crate::error::{Diagnostic, Severity};
use crate::model::TimeStamp;
use crate::options::ReadOptions;
use crate::report::Reporter;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Int,
    Float,
    /// Content without quotes, escapes resolved
    QuotedString,
    /// Bareword or bar-quoted name (bars stripped)
    Nominal,
    TimeStamp,
    Bool,
    AlistOpen,
    AlistClose,
    /// `(` written directly after a nominal
    PredOpen,
    PredClose,
    /// Alist label (`NAME>`), formal argument (`<name>`) or `,`
    Symbol,
    Eof,
    /// Malformed input, already reported when produced
    Error,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Int => "INT",
            TokenKind::Float => "FLOAT",
            TokenKind::QuotedString => "STRING",
            TokenKind::Nominal => "NOMINAL",
            TokenKind::TimeStamp => "TIMESTAMP",
            TokenKind::Bool => "BOOL",
            TokenKind::AlistOpen => "ALIST_OPEN",
            TokenKind::AlistClose => "ALIST_CLOSE",
            TokenKind::PredOpen => "PRED_OPEN",
            TokenKind::PredClose => "PRED_CLOSE",
            TokenKind::Symbol => "SYMBOL",
            TokenKind::Eof => "EOF",
            TokenKind::Error => "ERROR",
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, TokenKind::AlistOpen | TokenKind::PredOpen)
    }

    pub fn is_close(self) -> bool {
        matches!(self, TokenKind::AlistClose | TokenKind::PredClose)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_symbol(&self, text: &str) -> bool {
        self.kind == TokenKind::Symbol && self.lexeme == text
    }

    /// Short human form used in diagnostics.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_owned(),
            TokenKind::AlistOpen | TokenKind::PredOpen => "'('".to_owned(),
            TokenKind::AlistClose | TokenKind::PredClose => "')'".to_owned(),
            TokenKind::QuotedString => format!("string {:?}", self.lexeme),
            kind => format!("{} '{}'", kind.name().to_lowercase(), self.lexeme),
        }
    }
}

fn is_bareword_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_bareword_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Whether `s` lexes back as a single plain nominal.
pub fn is_bareword(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_bareword_start(c) => {}
        _ => return false,
    }
    chars.all(is_bareword_char) && s != "TRUE" && s != "FALSE"
}

/// On-demand tokenizer over an ODB source text.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    /// Open paren kinds, so each `)` closes the matching kind.
    parens: Vec<TokenKind>,
    /// Source position just past the last nominal token.
    nominal_end: Option<usize>,
    reporter: Reporter,
    abort_scan: bool,
    continue_on_error: bool,
    /// Drop diagnostics while the parser skips a section it does not read.
    quiet: bool,
    listing: Option<Vec<String>>,
}

impl Lexer {
    pub fn new(source: &str, options: &ReadOptions) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            parens: Vec::new(),
            nominal_end: None,
            reporter: Reporter::new(options),
            abort_scan: false,
            continue_on_error: options.continue_on_error,
            quiet: false,
            listing: options.listing.then(Vec::new),
        }
    }

    /// Produce the next token. Past end of input, and while a budget abort
    /// is in effect, this keeps returning `Eof`.
    pub fn next_token(&mut self) -> Token {
        let token = if self.abort_scan {
            self.token(TokenKind::Eof, String::new(), self.line, self.column)
        } else {
            self.scan()
        };
        if let Some(listing) = self.listing.as_mut() {
            listing.push(format!(
                "{}:{} {} {:?}",
                token.line, token.column, token.kind, token.lexeme
            ));
        }
        token
    }

    pub fn abort_scan(&self) -> bool {
        self.abort_scan
    }

    /// Lift a budget abort so scanning can continue.
    pub fn reset_abort(&mut self) {
        self.abort_scan = false;
    }

    pub fn error_count(&self) -> usize {
        self.reporter.error_count()
    }

    pub fn warning_count(&self) -> usize {
        self.reporter.warning_count()
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub(crate) fn reporter_mut(&mut self) -> &mut Reporter {
        &mut self.reporter
    }

    /// Release the reporter and the listing lines (empty unless enabled).
    pub fn into_parts(self) -> (Reporter, Vec<String>) {
        (self.reporter, self.listing.unwrap_or_default())
    }

    // -- Character cursor ----------------------------------------

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            // A CR directly before LF is part of the same line break.
            '\r' if self.peek() != Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            _ => self.column += 1,
        }
        Some(c)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            s.push(c);
            self.bump();
        }
        s
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == ';' {
                while let Some(c) = self.peek() {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    // -- Diagnostics ---------------------------------------------

    pub(crate) fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    fn report(&mut self, severity: Severity, line: u32, column: u32, message: String) {
        if self.quiet {
            return;
        }
        let exceeded = self
            .reporter
            .report(Diagnostic::new(severity, line, column, message));
        if exceeded && !self.continue_on_error {
            self.abort_scan = true;
        }
    }

    fn token(&self, kind: TokenKind, lexeme: String, line: u32, column: u32) -> Token {
        Token {
            kind,
            lexeme,
            line,
            column,
        }
    }

    fn error_token(
        &mut self,
        severity: Severity,
        lexeme: String,
        line: u32,
        column: u32,
        message: String,
    ) -> Token {
        self.report(severity, line, column, message);
        self.token(TokenKind::Error, lexeme, line, column)
    }

    // -- Scanning ------------------------------------------------

    fn scan(&mut self) -> Token {
        self.skip_trivia();
        let (line, column, start) = (self.line, self.column, self.pos);
        let Some(c) = self.peek() else {
            return self.token(TokenKind::Eof, String::new(), line, column);
        };

        let token = match c {
            '(' => {
                self.bump();
                let kind = if self.nominal_end == Some(start) {
                    TokenKind::PredOpen
                } else {
                    TokenKind::AlistOpen
                };
                self.parens.push(kind);
                self.token(kind, "(".to_owned(), line, column)
            }
            ')' => {
                self.bump();
                let kind = match self.parens.pop() {
                    Some(TokenKind::PredOpen) => TokenKind::PredClose,
                    _ => TokenKind::AlistClose,
                };
                self.token(kind, ")".to_owned(), line, column)
            }
            ',' => {
                self.bump();
                self.token(TokenKind::Symbol, ",".to_owned(), line, column)
            }
            '"' => self.scan_quoted(line, column),
            '|' => self.scan_bar_quoted(line, column),
            '<' => self.scan_formal(line, column),
            c if c.is_ascii_digit() => self.scan_number(line, column),
            '-' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => {
                self.scan_number(line, column)
            }
            c if is_bareword_start(c) => self.scan_word(line, column),
            other => {
                self.bump();
                self.error_token(
                    Severity::Warning,
                    other.to_string(),
                    line,
                    column,
                    format!("unexpected character '{}'", other),
                )
            }
        };

        self.nominal_end = (token.kind == TokenKind::Nominal).then_some(self.pos);
        token
    }

    fn scan_word(&mut self, line: u32, column: u32) -> Token {
        let word = self.take_while(is_bareword_char);
        if self.peek() == Some('>') {
            self.bump();
            return self.token(TokenKind::Symbol, format!("{}>", word), line, column);
        }
        let kind = match word.as_str() {
            "TRUE" | "FALSE" => TokenKind::Bool,
            _ => TokenKind::Nominal,
        };
        self.token(kind, word, line, column)
    }

    /// Shared body of `"..."` and `|...|`: `\<delim>` and `\\` escape,
    /// anything else after a backslash is kept with a warning.
    fn scan_delimited(&mut self, delim: char, line: u32, column: u32) -> Result<String, Token> {
        self.bump(); // opening delimiter
        let what = if delim == '"' {
            "string literal"
        } else {
            "bar-quoted name"
        };
        let mut s = String::new();
        loop {
            match self.bump() {
                None => {
                    let lexeme = format!("{}{}", delim, s);
                    return Err(self.error_token(
                        Severity::Error,
                        lexeme,
                        line,
                        column,
                        format!("unterminated {}", what),
                    ));
                }
                Some(c) if c == delim => return Ok(s),
                Some('\\') => {
                    let (esc_line, esc_column) = (self.line, self.column);
                    match self.bump() {
                        None => {
                            let lexeme = format!("{}{}\\", delim, s);
                            return Err(self.error_token(
                                Severity::Error,
                                lexeme,
                                line,
                                column,
                                format!("unterminated {}", what),
                            ));
                        }
                        Some(e) if e == delim || e == '\\' => s.push(e),
                        Some(e) => {
                            self.report(
                                Severity::Warning,
                                esc_line,
                                esc_column.saturating_sub(1),
                                format!("unknown escape '\\{}' in {}", e, what),
                            );
                            s.push(e);
                        }
                    }
                }
                Some(c) => s.push(c),
            }
        }
    }

    fn scan_quoted(&mut self, line: u32, column: u32) -> Token {
        match self.scan_delimited('"', line, column) {
            Ok(s) => self.token(TokenKind::QuotedString, s, line, column),
            Err(tok) => tok,
        }
    }

    fn scan_bar_quoted(&mut self, line: u32, column: u32) -> Token {
        match self.scan_delimited('|', line, column) {
            Ok(s) if s.is_empty() => self.error_token(
                Severity::Error,
                "||".to_owned(),
                line,
                column,
                "empty bar-quoted name".to_owned(),
            ),
            Ok(s) => self.token(TokenKind::Nominal, s, line, column),
            Err(tok) => tok,
        }
    }

    fn scan_formal(&mut self, line: u32, column: u32) -> Token {
        let mut s = String::new();
        s.push('<');
        self.bump();
        loop {
            match self.peek() {
                Some('>') => {
                    self.bump();
                    s.push('>');
                    return self.token(TokenKind::Symbol, s, line, column);
                }
                None | Some('\n') | Some('\r') => {
                    return self.error_token(
                        Severity::Error,
                        s,
                        line,
                        column,
                        "unterminated formal argument".to_owned(),
                    );
                }
                Some(c) => {
                    s.push(c);
                    self.bump();
                }
            }
        }
    }

    fn scan_number(&mut self, line: u32, column: u32) -> Token {
        let mut text = String::new();
        if self.peek() == Some('-') {
            self.bump();
            text.push('-');
        }
        text.push_str(&self.take_while(|c| c.is_ascii_digit()));

        let kind = match self.peek() {
            Some(':') if !text.starts_with('-') => {
                text.push_str(&self.take_while(|c| c.is_ascii_digit() || c == ':'));
                TokenKind::TimeStamp
            }
            Some('.') => {
                self.bump();
                text.push('.');
                let frac = self.take_while(|c| c.is_ascii_digit());
                if frac.is_empty() {
                    return self.malformed_number(text, line, column);
                }
                text.push_str(&frac);
                TokenKind::Float
            }
            _ => TokenKind::Int,
        };

        if self.peek().is_some_and(|c| is_bareword_char(c) || c == ':') {
            return self.malformed_number(text, line, column);
        }

        match kind {
            TokenKind::TimeStamp => match text.parse::<TimeStamp>() {
                Ok(_) => self.token(TokenKind::TimeStamp, text, line, column),
                Err(e) => self.error_token(Severity::Error, text, line, column, e.to_string()),
            },
            TokenKind::Int if text.parse::<i64>().is_err() => {
                let message = format!("integer literal '{}' out of range", text);
                self.error_token(Severity::Error, text, line, column, message)
            }
            TokenKind::Float if text.parse::<f64>().map_or(true, |f| !f.is_finite()) => {
                let message = format!("float literal '{}' out of range", text);
                self.error_token(Severity::Error, text, line, column, message)
            }
            kind => self.token(kind, text, line, column),
        }
    }

    fn malformed_number(&mut self, mut text: String, line: u32, column: u32) -> Token {
        text.push_str(&self.take_while(|c| is_bareword_char(c) || c == ':'));
        let message = format!("malformed number '{}'", text);
        self.error_token(Severity::Error, text, line, column, message)
    }
}
