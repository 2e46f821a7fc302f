//! Runtime values: exact decimal numbers, strings, and sparse nested arrays.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Canonical string form of a number; trailing zeros are stripped so that
/// `0.1 + 0.2` and `0.3` produce the same array key.
pub fn canonical_num(d: &Decimal) -> String {
    d.normalize().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(Decimal),
    Str(String),
    Array(IndexMap<String, Value>),
}

impl Value {
    /// The value an unset register, variable, or array slot reads as.
    pub fn empty() -> Self {
        Value::Str(String::new())
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Numeric view. Strings parse as decimal, anything else is zero.
    pub fn to_number(&self) -> Decimal {
        self.as_number().unwrap_or(Decimal::ZERO)
    }

    /// The numeric view when one genuinely exists; `None` for non-numeric
    /// strings and arrays. Ordering falls back to string comparison when
    /// either side returns `None`.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Num(d) => Some(*d),
            Value::Str(s) => Decimal::from_str(s.trim()).ok(),
            Value::Array(_) => None,
        }
    }

    /// String view. Arrays read as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Value::Num(d) => canonical_num(d),
            Value::Str(s) => s.clone(),
            Value::Array(_) => String::new(),
        }
    }

    /// Boolean view: non-zero number; non-empty string that is not literal
    /// "false" (case-insensitive); arrays are always true.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Num(d) => !d.is_zero(),
            Value::Str(s) => !s.is_empty() && !s.eq_ignore_ascii_case("false"),
            Value::Array(_) => true,
        }
    }

    /// Array-key form of this value; numeric keys normalize to their
    /// canonical decimal string.
    pub fn to_key(&self) -> String {
        match self {
            Value::Num(d) => canonical_num(d),
            Value::Str(s) => s.clone(),
            Value::Array(_) => String::new(),
        }
    }

    /// Ordering: numeric when both sides coerce to numbers, lexicographic on
    /// the string forms otherwise.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.to_text().cmp(&other.to_text()),
        }
    }

    pub fn loose_eq(&self, other: &Value) -> bool {
        self.compare(other) == Ordering::Equal
    }

    /// Write through a key path, promoting `self` and any intermediate slot
    /// to an array (scalars on the path are overwritten).
    pub fn set_path(&mut self, keys: &[String], value: Value) {
        let (first, rest) = match keys.split_first() {
            Some(p) => p,
            None => { *self = value; return; }
        };
        if !self.is_array() {
            *self = Value::Array(IndexMap::new());
        }
        let Value::Array(map) = self else { unreachable!() };
        if rest.is_empty() {
            map.insert(first.clone(), value);
        } else {
            map.entry(first.clone()).or_insert_with(Value::empty).set_path(rest, value);
        }
    }

    /// Read through a key path; any missing key or scalar along the way
    /// yields the empty string, never an error.
    pub fn get_path(&self, keys: &[String]) -> Value {
        let mut cur = self;
        for k in keys {
            match cur {
                Value::Array(map) => match map.get(k) {
                    Some(v) => cur = v,
                    None => return Value::empty(),
                },
                _ => return Value::empty(),
            }
        }
        cur.clone()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(d) => write!(f, "{}", canonical_num(d)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(map) => {
                write!(f, "[")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "]")
            }
        }
    }
}
