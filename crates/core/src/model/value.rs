use super::timestamp::TimeStamp;
use std::fmt;

/// Handle into a database's vocabulary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VocabId(pub(crate) usize);

impl VocabId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VocabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A predicate applied to arguments. Built by `Database::make_pred`, which
/// checks the arguments against the element's formal arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct PredValue {
    vocab: VocabId,
    args: Vec<Value>,
}

/// One row of a matrix column, shaped by its matrix element.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixValue {
    vocab: VocabId,
    args: Vec<Value>,
}

macro_rules! applied_value {
    ($ty:ident) => {
        impl $ty {
            pub(crate) fn new(vocab: VocabId, args: Vec<Value>) -> Self {
                $ty { vocab, args }
            }

            pub fn vocab(&self) -> VocabId {
                self.vocab
            }

            pub fn args(&self) -> &[Value] {
                &self.args
            }
        }
    };
}

applied_value!(PredValue);
applied_value!(MatrixValue);

/// Text for a finite float that reads back as the same `f64`. Six
/// decimals when they are exact, otherwise the shortest exact decimal.
/// Never uses an exponent and always carries a `.`.
pub(crate) fn float_text(f: f64) -> String {
    let fixed = format!("{:.6}", f);
    if fixed.parse::<f64>() == Ok(f) {
        return fixed;
    }
    let mut shortest = f.to_string();
    if !shortest.contains('.') {
        shortest.push_str(".0");
    }
    shortest
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Empty cell or unfilled argument slot
    Undefined,
    Int(i64),
    Float(f64),
    Text(String),
    Nominal(String),
    TimeStamp(TimeStamp),
    Pred(PredValue),
    Matrix(MatrixValue),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "quote",
            Value::Nominal(_) => "nominal",
            Value::TimeStamp(_) => "timestamp",
            Value::Pred(_) => "pred",
            Value::Matrix(_) => "matrix",
        }
    }

    fn applied(&self) -> Option<(VocabId, &[Value])> {
        match self {
            Value::Pred(p) => Some((p.vocab, &p.args)),
            Value::Matrix(m) => Some((m.vocab, &m.args)),
            _ => None,
        }
    }

    /// Scalar contents the text format has no way to write.
    pub(crate) fn unwritable(&self) -> Option<&'static str> {
        match self {
            Value::Nominal(n) if n.is_empty() => Some("nominal values must not be empty"),
            Value::Float(f) if !f.is_finite() => Some("float values must be finite"),
            _ => None,
        }
    }

    /// Whether this value or any nested argument refers to `id`.
    pub fn references(&self, id: VocabId) -> bool {
        match self.applied() {
            Some((vocab, args)) => vocab == id || args.iter().any(|a| a.references(id)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_look_through_nesting() {
        let inner = Value::Pred(PredValue::new(VocabId(2), vec![Value::Int(1)]));
        let outer = Value::Matrix(MatrixValue::new(VocabId(0), vec![Value::Undefined, inner]));
        assert!(outer.references(VocabId(0)));
        assert!(outer.references(VocabId(2)));
        assert!(!outer.references(VocabId(1)));
        assert!(!Value::Nominal("x".into()).references(VocabId(0)));
    }

    #[test]
    fn float_text_keeps_six_decimals_when_exact() {
        assert_eq!(float_text(2.5), "2.500000");
        assert_eq!(float_text(-0.25), "-0.250000");
        assert_eq!(float_text(0.1), "0.100000");
        assert_eq!(float_text(0.0), "0.000000");
    }

    #[test]
    fn float_text_is_exact_past_six_decimals() {
        assert_eq!(float_text(1e-7), "0.0000001");
        assert_eq!(float_text(0.1234567), "0.1234567");
        assert_eq!(float_text(-2.0000005), "-2.0000005");
        for f in [1e-7, 0.1234567, 1.0 / 3.0, 123456.789012345, 5e-324, 1e300] {
            let text = float_text(f);
            assert!(text.contains('.') && !text.contains('e'), "{}", text);
            assert_eq!(text.parse::<f64>(), Ok(f), "{}", text);
        }
    }

    #[test]
    fn unwritable_scalars() {
        assert!(Value::Nominal(String::new()).unwritable().is_some());
        assert!(Value::Float(f64::NAN).unwritable().is_some());
        assert!(Value::Float(f64::INFINITY).unwritable().is_some());
        assert!(Value::Nominal("TRUE".into()).unwritable().is_none());
        assert!(Value::Text(String::new()).unwritable().is_none());
    }
}
