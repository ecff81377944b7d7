//! Runtime values and the loose comparisons scripts see.

use crate::{context::Reified, list::*};
use blox_syntax::prelude::{Literal, RingKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{fmt, rc::Rc};

#[derive(Clone, Debug)]
pub enum Value {
    Nothing,
    Bool(bool),
    Number(f64),
    Text(Rc<str>),
    List(ListRef),
    /// a closure or a continuation
    Context(Rc<Reified>),
}

impl Value {
    pub fn text(s: impl AsRef<str>) -> Self {
        Value::Text(s.as_ref().into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(List::new(items).into_ref())
    }

    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            | Value::List(list) => Some(list),
            | _ => None,
        }
    }

    /// Numeric reading of a value, as the arithmetic primitives coerce it.
    /// Unparsable text is NaN; blank text is 0.
    pub fn to_number(&self) -> f64 {
        match self {
            | Value::Nothing => 0.0,
            | Value::Bool(b) => f64::from(u8::from(*b)),
            | Value::Number(n) => *n,
            | Value::Text(text) => parse_number(text).unwrap_or(f64::NAN),
            | Value::List(_) | Value::Context(_) => f64::NAN,
        }
    }

    /// Reads the longest numeric prefix, like the variable increment does.
    pub fn parse_float(&self) -> f64 {
        match self {
            | Value::Number(n) => *n,
            | Value::Text(text) => parse_float_prefix(text),
            | _ => f64::NAN,
        }
    }

    pub fn to_bool(&self) -> bool {
        match self {
            | Value::Nothing => false,
            | Value::Bool(b) => *b,
            | Value::Number(n) => *n != 0.0 && !n.is_nan(),
            | Value::Text(text) => !text.is_empty(),
            | Value::List(_) | Value::Context(_) => true,
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }

    /// the type names offered by `is _ a _?`
    pub fn type_of(&self) -> &'static str {
        match self {
            | Value::Nothing => "nothing",
            | Value::Bool(_) => "Boolean",
            | Value::Number(_) => "number",
            | Value::Text(text) if !parse_float_prefix(text).is_nan() => "number",
            | Value::Text(_) => "text",
            | Value::List(_) => "list",
            | Value::Context(reified) => match reified.kind() {
                | RingKind::Command => "command",
                | RingKind::Reporter => "reporter",
                | RingKind::Predicate => "predicate",
            },
        }
    }

    /// the name used in type errors
    pub fn describe(&self) -> &'static str {
        match self {
            | Value::Number(_) => "number",
            | Value::Text(_) => "text",
            | other => other.type_of(),
        }
    }

    fn is_special(&self) -> bool {
        match self {
            | Value::Bool(_) => true,
            | Value::Text(text) => {
                text.is_empty()
                    || matches!(&**text, "\t" | "\n" | "\u{b}" | "\u{c}" | "\r" | "\u{a0}")
                    || text.contains(' ')
            }
            | _ => false,
        }
    }
}

/// Loose equality: numeric when both sides read as plain numbers, else
/// case-insensitive text. Lists only ever equal lists.
pub fn snap_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        | (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y) || x.borrow().equal_to(&y.borrow()),
        | (Value::List(_), _) | (_, Value::List(_)) => false,
        | _ => {
            let (x, y) = (a.to_number(), b.to_number());
            if !(x.is_nan() || y.is_nan() || a.is_special() || b.is_special()) {
                return x == y;
            }
            match (a, b) {
                | (Value::Text(x), Value::Text(y)) => x.to_lowercase() == y.to_lowercase(),
                | (Value::Nothing, Value::Nothing) => true,
                | (Value::Bool(x), Value::Bool(y)) => x == y,
                | (Value::Number(x), Value::Number(y)) => x == y,
                | (Value::Context(x), Value::Context(y)) => Rc::ptr_eq(x, y),
                | _ => false,
            }
        }
    }
}

/// Identity for lists and closures, loose equality for everything else.
pub fn is_identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        | (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y),
        | (Value::Context(x), Value::Context(y)) => Rc::ptr_eq(x, y),
        | (Value::List(_) | Value::Context(_), _) | (_, Value::List(_) | Value::Context(_)) => false,
        | _ => snap_equals(a, b),
    }
}

/// Strict numeric reading of a whole text: surrounding whitespace is
/// ignored, blank text is 0, and hex, binary and octal prefixes are allowed.
pub fn parse_number(text: &str) -> Option<f64> {
    let s = text.trim();
    if s.is_empty() {
        return Some(0.0);
    }
    match s {
        | "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        | "-Infinity" => return Some(f64::NEG_INFINITY),
        | _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0b", 2), ("0B", 2), ("0o", 8), ("0O", 8)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).ok().map(|n| n as f64);
        }
    }
    if s.chars().any(|c| c.is_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    s.parse::<f64>().ok()
}

static FLOAT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(Infinity|\d+\.?\d*(?:[eE][+-]?\d+)?|\.\d+(?:[eE][+-]?\d+)?)")
        .expect("float prefix pattern")
});

pub fn parse_float_prefix(text: &str) -> f64 {
    let Some(found) = FLOAT_PREFIX.find(text.trim_start()) else { return f64::NAN };
    match found.as_str().trim_start_matches('+') {
        | "Infinity" => f64::INFINITY,
        | "-Infinity" => f64::NEG_INFINITY,
        | digits => digits.parse().unwrap_or(f64::NAN),
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
    } else if n == 0.0 {
        "0".to_owned()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | Value::Nothing => Ok(()),
            | Value::Bool(b) => write!(f, "{}", b),
            | Value::Number(n) => f.write_str(&format_number(*n)),
            | Value::Text(text) => f.write_str(text),
            | Value::List(list) => {
                let items = list.borrow().items();
                let items = items.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(f, "[{}]", items.join(", "))
            }
            | Value::Context(reified) => match &**reified {
                | Reified::Continuation(_) => f.write_str("a continuation"),
                | Reified::Lambda(_) => write!(f, "a {}", self.type_of()),
            },
        }
    }
}

/* ---------------------------------- Impls --------------------------------- */

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list.into_ref())
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        match lit {
            | Literal::Text(text) | Literal::Option(text) => Value::Text(text.clone()),
            | Literal::Number(n) => Value::Number(*n),
            | Literal::Bool(b) => Value::Bool(*b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers_compare_across_text() {
        assert!(snap_equals(&Value::text("2"), &Value::Number(2.0)));
        assert!(snap_equals(&Value::text("0x10"), &Value::Number(16.0)));
        assert!(!snap_equals(&Value::text(" 2"), &Value::Number(2.0)));
        assert!(!snap_equals(&Value::Bool(true), &Value::Number(1.0)));
    }

    #[test]
    fn text_compares_without_case() {
        assert!(snap_equals(&Value::text("Hello"), &Value::text("hELLO")));
        assert!(!snap_equals(&Value::text(""), &Value::Nothing));
        assert!(snap_equals(&Value::Nothing, &Value::Number(0.0)));
    }

    #[test]
    fn words_are_not_numbers() {
        assert_eq!(parse_number("Infinity"), Some(f64::INFINITY));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(" 1e3 "), Some(1000.0));
        assert!(Value::text("nan").to_number().is_nan());
    }

    #[test]
    fn float_prefix_reads_leading_digits() {
        assert_eq!(parse_float_prefix("3abc"), 3.0);
        assert_eq!(parse_float_prefix("  -.5e1x"), -5.0);
        assert!(parse_float_prefix("").is_nan());
        assert_eq!(Value::text("12 apples").type_of(), "number");
    }

    #[test]
    fn numbers_print_like_scripts_expect() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(0.1 + 0.2).to_string(), "0.30000000000000004");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::list(vec![1.0.into(), "a".into()]).to_string(), "[1, a]");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Number(f64::NAN).to_bool());
        assert!(Value::text("false").to_bool());
        assert!(!Value::Nothing.to_bool());
    }
}
