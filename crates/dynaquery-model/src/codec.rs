//! Conversions between plain [`Value`]s and wire [`AttributeValue`]s.
//!
//! Serialization is infallible: every plain value has exactly one wire form.
//! Deserialization is infallible as well; number text coming off the wire is
//! trusted as-is and a `NULL` marker always decodes to [`Value::Null`].

use crate::attribute_value::{AttributeValue, Item};
use crate::value::{Document, Number, Value};

/// Encode a plain value into its wire form.
#[must_use]
pub fn serialize(value: &Value) -> AttributeValue {
    AttributeValue::from(value.clone())
}

/// Decode a wire value into a plain value.
#[must_use]
pub fn deserialize(value: AttributeValue) -> Value {
    Value::from(value)
}

/// Encode every attribute of a document.
#[must_use]
pub fn serialize_document(document: &Document) -> Item {
    document
        .iter()
        .map(|(name, value)| (name.clone(), serialize(value)))
        .collect()
}

/// Decode every attribute of a wire item.
#[must_use]
pub fn deserialize_item(item: Item) -> Document {
    item.into_iter()
        .map(|(name, value)| (name, deserialize(value)))
        .collect()
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null(true),
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::N(n.into_string()),
            Value::String(s) => Self::S(s),
            Value::Binary(b) => Self::B(b),
            Value::List(items) => Self::L(items.into_iter().map(Self::from).collect()),
            Value::Map(map) => Self::M(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
            Value::StringSet(items) => Self::Ss(items),
            Value::NumberSet(items) => Self::Ns(items.into_iter().map(Number::into_string).collect()),
            Value::BinarySet(items) => Self::Bs(items),
        }
    }
}

impl From<AttributeValue> for Value {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Null(_) => Self::Null,
            AttributeValue::Bool(b) => Self::Bool(b),
            AttributeValue::N(n) => Self::Number(Number::from_wire(n)),
            AttributeValue::S(s) => Self::String(s),
            AttributeValue::B(b) => Self::Binary(b),
            AttributeValue::L(items) => Self::List(items.into_iter().map(Self::from).collect()),
            AttributeValue::M(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
            AttributeValue::Ss(items) => Self::StringSet(items),
            AttributeValue::Ns(items) => {
                Self::NumberSet(items.into_iter().map(Number::from_wire).collect())
            }
            AttributeValue::Bs(items) => Self::BinarySet(items),
        }
    }
}
