//! Plain application values.
//!
//! [`Value`] is what callers hand to builders and get back from result pages.
//! It mirrors the store's type system (strings, arbitrary precision numbers,
//! booleans, binary, null, lists, mappings and the three set kinds) without
//! the wire tagging.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::ModelError;

/// A decoded item: attribute name to plain value.
pub type Document = HashMap<String, Value>;

/// Arbitrary precision number kept in its decimal text form.
///
/// Equality is textual: `"5"` and `"5.0"` are different numbers here, which is
/// also how the store echoes back what it was given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number(String);

impl Number {
    /// Wrap a decimal string received from the wire without validating it.
    #[must_use]
    pub fn from_wire(text: String) -> Self {
        Self(text)
    }

    /// The decimal text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the decimal text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Lossy `f64` view, used for ordering comparisons.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.0.parse().ok()
    }

    /// Exact `i64` view when the text is an integer in range.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

/// Checks `[+-]digits[.digits][(e|E)[+-]digits]`.
fn is_decimal(text: &str) -> bool {
    let body = text.strip_prefix(['-', '+']).unwrap_or(text);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (mantissa, None),
    };
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok = digits(int_part)
        && frac_part.is_none_or(digits)
        && !(int_part.is_empty() && frac_part.is_none_or(str::is_empty));
    let exponent_ok = exponent.is_none_or(|e| {
        let e = e.strip_prefix(['-', '+']).unwrap_or(e);
        !e.is_empty() && digits(e)
    });
    mantissa_ok && exponent_ok
}

impl FromStr for Number {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_decimal(s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(ModelError::InvalidNumber(s.to_owned()))
        }
    }
}

impl TryFrom<f64> for Number {
    type Error = ModelError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_finite() {
            Ok(Self(value.to_string()))
        } else {
            Err(ModelError::InvalidNumber(value.to_string()))
        }
    }
}

macro_rules! number_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Number {
                fn from(value: $ty) -> Self {
                    Self(value.to_string())
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Number(Number::from(value))
                }
            }
        )*
    };
}

number_from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Ok(i) = self.0.parse::<i64>() {
            serializer.serialize_i64(i)
        } else if let Ok(u) = self.0.parse::<u64>() {
            serializer.serialize_u64(u)
        } else if let Some(f) = self.as_f64() {
            serializer.serialize_f64(f)
        } else {
            serializer.serialize_str(&self.0)
        }
    }
}

/// A plain, untagged value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(Number),
    /// UTF-8 string.
    String(String),
    /// Raw bytes.
    Binary(Bytes),
    /// Ordered list.
    List(Vec<Value>),
    /// Nested mapping.
    Map(HashMap<String, Value>),
    /// Set of strings.
    StringSet(Vec<String>),
    /// Set of numbers.
    NumberSet(Vec<Number>),
    /// Set of byte strings.
    BinarySet(Vec<Bytes>),
}

impl Value {
    /// Returns the string if this is a `String` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a `Number` value.
    #[must_use]
    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the boolean if this is a `Bool` value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert any serializable structure into a `Value` through its JSON form.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if `value` cannot be represented as JSON.
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Self::Number(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Self::Binary(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(Number(n.to_string())),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Binary(b) => serializer.serialize_bytes(b),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Self::StringSet(items) => items.serialize(serializer),
            Self::NumberSet(items) => items.serialize(serializer),
            Self::BinarySet(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&Value::Binary(item.clone()))?;
                }
                seq.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_accept_decimal_text() {
        for ok in ["0", "-12", "3.25", ".5", "5.", "1e10", "-2.5E-3", "+7"] {
            assert!(ok.parse::<Number>().is_ok(), "{ok} should parse");
        }
        for bad in ["", "-", ".", "1e", "abc", "NaN", "inf", "1.2.3", "e5"] {
            assert!(bad.parse::<Number>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_should_reject_non_finite_floats() {
        assert!(Number::try_from(f64::NAN).is_err());
        assert_eq!(Number::try_from(2.5).unwrap().as_str(), "2.5");
    }

    #[test]
    fn test_should_convert_from_json() {
        let value = Value::from(serde_json::json!({"a": [1, "x", null], "b": true}));
        let Value::Map(map) = value else {
            panic!("expected a map");
        };
        assert_eq!(
            map["a"],
            Value::List(vec![Value::from(1), Value::from("x"), Value::Null])
        );
        assert_eq!(map["b"], Value::Bool(true));
    }

    #[test]
    fn test_should_serialize_numbers_as_json_numbers() {
        let json = serde_json::to_value(Value::from(7_u8)).unwrap();
        assert_eq!(json, serde_json::json!(7));
        let json = serde_json::to_value(Value::Number("2.5".parse().unwrap())).unwrap();
        assert_eq!(json, serde_json::json!(2.5));
    }

    #[test]
    fn test_should_convert_serializable_struct() {
        #[derive(Serialize)]
        struct Session<'a> {
            #[serde(rename = "user-id")]
            user: &'a str,
            attempts: u32,
            tags: Vec<&'a str>,
        }

        let value = Value::from_serializable(&Session {
            user: "u1",
            attempts: 3,
            tags: vec!["a"],
        })
        .unwrap();
        let Value::Map(map) = value else {
            panic!("expected a map");
        };
        assert_eq!(map["user-id"], Value::from("u1"));
        assert_eq!(map["attempts"], Value::from(3));
        assert_eq!(map["tags"], Value::List(vec![Value::from("a")]));
    }
}
