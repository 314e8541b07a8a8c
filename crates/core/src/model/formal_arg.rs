use super::database::Database;
use super::timestamp::TimeStamp;
use super::value::{float_text, Value};
use crate::error::ModelError;
use crate::lexer::is_bareword;
use std::fmt;
use std::str::FromStr;

/// Kind of a formal argument slot, with its optional constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum FormalArgKind {
    UnTyped,
    Int { range: Option<(i64, i64)> },
    Float { range: Option<(f64, f64)> },
    Nominal { permitted: Option<Vec<String>> },
    TimeStamp { range: Option<(TimeStamp, TimeStamp)> },
    QuoteString,
    Pred { permitted: Option<Vec<String>> },
}

impl FormalArgKind {
    /// Declaration keyword; `None` for untyped slots.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            FormalArgKind::UnTyped => None,
            FormalArgKind::Int { .. } => Some("int"),
            FormalArgKind::Float { .. } => Some("float"),
            FormalArgKind::Nominal { .. } => Some("nominal"),
            FormalArgKind::TimeStamp { .. } => Some("timestamp"),
            FormalArgKind::QuoteString => Some("quote"),
            FormalArgKind::Pred { .. } => Some("pred"),
        }
    }
}

/// A named, typed parameter slot of a vocabulary element.
#[derive(Debug, Clone, PartialEq)]
pub struct FormalArgument {
    name: String,
    kind: FormalArgKind,
}

const RESERVED_ARG_CHARS: &[char] = &[
    '<', '>', ':', ',', '(', ')', '[', ']', '{', '}', '|', '"', ';',
];

fn invalid(text: &str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidFormalArg {
        text: text.to_owned(),
        reason: reason.into(),
    }
}

impl FormalArgument {
    pub fn new(name: impl Into<String>, kind: FormalArgKind) -> Result<Self, ModelError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelError::InvalidName {
                name,
                reason: "formal argument names must not be empty",
            });
        }
        if name
            .chars()
            .any(|c| c.is_whitespace() || RESERVED_ARG_CHARS.contains(&c))
        {
            return Err(ModelError::InvalidName {
                name,
                reason: "formal argument names must not contain whitespace or delimiters",
            });
        }
        let arg = FormalArgument { name, kind };
        arg.validate_kind()?;
        Ok(arg)
    }

    pub fn untyped(name: impl Into<String>) -> Result<Self, ModelError> {
        FormalArgument::new(name, FormalArgKind::UnTyped)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FormalArgKind {
        &self.kind
    }

    fn validate_kind(&self) -> Result<(), ModelError> {
        let text = self.to_string();
        match &self.kind {
            FormalArgKind::Int { range: Some((lo, hi)) } if lo > hi => {
                Err(invalid(&text, "range lower bound exceeds upper bound"))
            }
            FormalArgKind::Float { range: Some((lo, hi)) } => {
                if !lo.is_finite() || !hi.is_finite() {
                    Err(invalid(&text, "range bounds must be finite"))
                } else if lo > hi {
                    Err(invalid(&text, "range lower bound exceeds upper bound"))
                } else {
                    Ok(())
                }
            }
            FormalArgKind::TimeStamp { range: Some((lo, hi)) } if lo > hi => {
                Err(invalid(&text, "range lower bound exceeds upper bound"))
            }
            FormalArgKind::Nominal {
                permitted: Some(list),
            }
            | FormalArgKind::Pred {
                permitted: Some(list),
            } => {
                if list.is_empty() {
                    return Err(invalid(&text, "permitted list must not be empty"));
                }
                for (i, entry) in list.iter().enumerate() {
                    if !is_bareword(entry) {
                        return Err(invalid(
                            &text,
                            format!("permitted entry '{}' is not a plain name", entry),
                        ));
                    }
                    if list[..i].contains(entry) {
                        return Err(invalid(
                            &text,
                            format!("permitted entry '{}' is repeated", entry),
                        ));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Check `value` against this slot. An `Int` offered to a float slot is
    /// converted in place. The error string explains the mismatch.
    pub(crate) fn check(&self, value: &mut Value, db: &Database) -> Result<(), String> {
        if matches!(value, Value::Undefined) {
            return Ok(());
        }
        if let Some(reason) = value.unwritable() {
            return Err(reason.to_owned());
        }
        let mismatch = |value: &Value| {
            format!(
                "expected {}, found {}",
                self.kind.keyword().unwrap_or("a value"),
                value.kind_name()
            )
        };
        match &self.kind {
            FormalArgKind::UnTyped => match &*value {
                Value::Matrix(_) => Err("a matrix cannot be an argument".to_owned()),
                _ => Ok(()),
            },
            FormalArgKind::Int { range } => match &*value {
                Value::Int(n) => match range {
                    Some((lo, hi)) if n < lo || n > hi => {
                        Err(format!("{} is outside [{},{}]", n, lo, hi))
                    }
                    _ => Ok(()),
                },
                other => Err(mismatch(other)),
            },
            FormalArgKind::Float { range } => {
                if let Value::Int(n) = *value {
                    *value = Value::Float(n as f64);
                }
                match &*value {
                    Value::Float(f) => match range {
                        Some((lo, hi)) if f < lo || f > hi => {
                            Err(format!(
                                "{} is outside [{},{}]",
                                float_text(*f),
                                float_text(*lo),
                                float_text(*hi)
                            ))
                        }
                        _ => Ok(()),
                    },
                    other => Err(mismatch(other)),
                }
            }
            FormalArgKind::Nominal { permitted } => match &*value {
                Value::Nominal(s) => match permitted {
                    Some(list) if !list.contains(s) => {
                        Err(format!("'{}' is not a permitted value", s))
                    }
                    _ => Ok(()),
                },
                other => Err(mismatch(other)),
            },
            FormalArgKind::TimeStamp { range } => match &*value {
                Value::TimeStamp(t) => match range {
                    Some((lo, hi)) if t < lo || t > hi => {
                        Err(format!("{} is outside [{},{}]", t, lo, hi))
                    }
                    _ => Ok(()),
                },
                other => Err(mismatch(other)),
            },
            FormalArgKind::QuoteString => match &*value {
                Value::Text(_) => Ok(()),
                other => Err(mismatch(other)),
            },
            FormalArgKind::Pred { permitted } => match &*value {
                Value::Pred(p) => {
                    let name = db.vocab_name(p.vocab()).unwrap_or_default();
                    match permitted {
                        Some(list) if !list.iter().any(|n| n == name) => {
                            Err(format!("predicate '{}' is not permitted", name))
                        }
                        _ => Ok(()),
                    }
                }
                other => Err(mismatch(other)),
            },
        }
    }
}

impl FormalArgument {
    /// Whether `name` appears in this slot's `pred{...}` constraint.
    pub(crate) fn permits_pred(&self, name: &str) -> bool {
        match &self.kind {
            FormalArgKind::Pred {
                permitted: Some(list),
            } => list.iter().any(|n| n == name),
            _ => false,
        }
    }

    /// Follow a vocabulary rename into the `pred{...}` constraint.
    pub(crate) fn rename_permitted_pred(&mut self, old: &str, new: &str) {
        let FormalArgKind::Pred {
            permitted: Some(list),
        } = &mut self.kind
        else {
            return;
        };
        if old == new {
            return;
        }
        if list.iter().any(|n| n == new) {
            list.retain(|n| n != old);
        } else {
            for entry in list.iter_mut().filter(|n| n.as_str() == old) {
                *entry = new.to_owned();
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, list: &[String]) -> fmt::Result {
    write!(f, "{{{}}}", list.join(","))
}

impl fmt::Display for FormalArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        if let Some(kw) = self.kind.keyword() {
            write!(f, ":{}", kw)?;
        }
        match &self.kind {
            FormalArgKind::Int {
                range: Some((lo, hi)),
            } => write!(f, "[{},{}]", lo, hi)?,
            FormalArgKind::Float {
                range: Some((lo, hi)),
            } => write!(f, "[{},{}]", float_text(*lo), float_text(*hi))?,
            FormalArgKind::TimeStamp {
                range: Some((lo, hi)),
            } => write!(f, "[{},{}]", lo, hi)?,
            FormalArgKind::Nominal {
                permitted: Some(list),
            }
            | FormalArgKind::Pred {
                permitted: Some(list),
            } => write_list(f, list)?,
            _ => {}
        }
        f.write_str(">")
    }
}

fn parse_range<T: FromStr>(text: &str, body: &str) -> Result<Option<(T, T)>, ModelError> {
    if body.is_empty() {
        return Ok(None);
    }
    let inner = body
        .strip_prefix('[')
        .and_then(|b| b.strip_suffix(']'))
        .ok_or_else(|| invalid(text, "expected a [lo,hi] range"))?;
    let (lo, hi) = inner
        .split_once(',')
        .ok_or_else(|| invalid(text, "expected a [lo,hi] range"))?;
    let lo = lo
        .parse::<T>()
        .map_err(|_| invalid(text, format!("bad lower bound '{}'", lo)))?;
    let hi = hi
        .parse::<T>()
        .map_err(|_| invalid(text, format!("bad upper bound '{}'", hi)))?;
    Ok(Some((lo, hi)))
}

fn parse_permitted(text: &str, body: &str) -> Result<Option<Vec<String>>, ModelError> {
    if body.is_empty() {
        return Ok(None);
    }
    let inner = body
        .strip_prefix('{')
        .and_then(|b| b.strip_suffix('}'))
        .ok_or_else(|| invalid(text, "expected a {a,b,...} list"))?;
    Ok(Some(inner.split(',').map(str::to_owned).collect()))
}

impl FromStr for FormalArgument {
    type Err = ModelError;

    /// Parse declaration text such as `<level:int[0,10]>`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let inner = text
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .ok_or_else(|| invalid(text, "formal arguments are written <name> or <name:kind>"))?;
        let Some((name, typed)) = inner.split_once(':') else {
            return FormalArgument::untyped(inner);
        };
        let split = typed
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(typed.len());
        let (keyword, body) = typed.split_at(split);
        let kind = match keyword {
            "int" => FormalArgKind::Int {
                range: parse_range(text, body)?,
            },
            "float" => FormalArgKind::Float {
                range: parse_range(text, body)?,
            },
            "timestamp" => FormalArgKind::TimeStamp {
                range: parse_range(text, body)?,
            },
            "nominal" => FormalArgKind::Nominal {
                permitted: parse_permitted(text, body)?,
            },
            "pred" => FormalArgKind::Pred {
                permitted: parse_permitted(text, body)?,
            },
            "quote" if body.is_empty() => FormalArgKind::QuoteString,
            "quote" => return Err(invalid(text, "quote arguments take no constraint")),
            other => return Err(invalid(text, format!("unknown argument kind '{}'", other))),
        };
        FormalArgument::new(name, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> FormalArgument {
        s.parse().unwrap_or_else(|e| panic!("{} should parse: {}", s, e))
    }

    #[test]
    fn declaration_text_is_canonical() {
        for text in [
            "<alpha>",
            "<bravo:int>",
            "<level:int[-3,10]>",
            "<x:float[-1.500000,2.000000]>",
            "<who:nominal{cat,dog}>",
            "<when:timestamp[00:00:00:000,00:01:00:000]>",
            "<note:quote>",
            "<p:pred{afraid,happy}>",
        ] {
            assert_eq!(parse(text).to_string(), text);
        }
    }

    #[test]
    fn float_bounds_are_normalised() {
        assert_eq!(parse("<x:float[0,1.5]>").to_string(), "<x:float[0.000000,1.500000]>");
    }

    #[test]
    fn fine_float_bounds_survive_reparsing() {
        let arg = parse("<x:float[-0.0000001,2.1234567]>");
        assert_eq!(arg.to_string(), "<x:float[-0.0000001,2.1234567]>");
        assert_eq!(parse(&arg.to_string()), arg);
        assert_eq!(
            arg.kind(),
            &FormalArgKind::Float {
                range: Some((-1e-7, 2.1234567))
            }
        );
    }

    #[test]
    fn rejects_malformed_declarations() {
        for text in [
            "alpha",
            "<>",
            "<a b>",
            "<a:integer>",
            "<a:int[5,1]>",
            "<a:int[1]>",
            "<a:nominal{}>",
            "<a:nominal{x,x}>",
            "<a:pred{TRUE}>",
            "<a:quote[1,2]>",
        ] {
            assert!(text.parse::<FormalArgument>().is_err(), "{} should fail", text);
        }
    }

    #[test]
    fn names_reject_delimiters() {
        assert!(FormalArgument::untyped("ok-name_1").is_ok());
        assert!(matches!(
            FormalArgument::untyped("bad,name"),
            Err(ModelError::InvalidName { .. })
        ));
    }
}
