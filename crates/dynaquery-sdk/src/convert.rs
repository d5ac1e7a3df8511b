//! Conversions between model and SDK attribute values.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue as SdkValue;
use bytes::Bytes;
use dynaquery_model::{AttributeValue, Item};

use crate::error::SdkExecutorError;

/// Model value to SDK value.
#[must_use]
pub fn to_sdk(value: AttributeValue) -> SdkValue {
    match value {
        AttributeValue::S(s) => SdkValue::S(s),
        AttributeValue::N(n) => SdkValue::N(n),
        AttributeValue::B(b) => SdkValue::B(Blob::new(b.to_vec())),
        AttributeValue::Ss(v) => SdkValue::Ss(v),
        AttributeValue::Ns(v) => SdkValue::Ns(v),
        AttributeValue::Bs(v) => SdkValue::Bs(v.into_iter().map(|b| Blob::new(b.to_vec())).collect()),
        AttributeValue::Bool(b) => SdkValue::Bool(b),
        AttributeValue::Null(b) => SdkValue::Null(b),
        AttributeValue::L(v) => SdkValue::L(v.into_iter().map(to_sdk).collect()),
        AttributeValue::M(m) => SdkValue::M(to_sdk_item(m)),
    }
}

/// Model item to SDK item.
#[must_use]
pub fn to_sdk_item(item: Item) -> HashMap<String, SdkValue> {
    item.into_iter().map(|(k, v)| (k, to_sdk(v))).collect()
}

/// SDK value to model value.
///
/// # Errors
///
/// Returns `SdkExecutorError::UnknownAttributeValue` for variants the SDK
/// added after this crate was written.
pub fn from_sdk(value: SdkValue) -> Result<AttributeValue, SdkExecutorError> {
    Ok(match value {
        SdkValue::S(s) => AttributeValue::S(s),
        SdkValue::N(n) => AttributeValue::N(n),
        SdkValue::B(b) => AttributeValue::B(Bytes::from(b.into_inner())),
        SdkValue::Ss(v) => AttributeValue::Ss(v),
        SdkValue::Ns(v) => AttributeValue::Ns(v),
        SdkValue::Bs(v) => {
            AttributeValue::Bs(v.into_iter().map(|b| Bytes::from(b.into_inner())).collect())
        }
        SdkValue::Bool(b) => AttributeValue::Bool(b),
        SdkValue::Null(b) => AttributeValue::Null(b),
        SdkValue::L(v) => AttributeValue::L(v.into_iter().map(from_sdk).collect::<Result<_, _>>()?),
        SdkValue::M(m) => AttributeValue::M(from_sdk_item(m)?),
        other => return Err(SdkExecutorError::UnknownAttributeValue(format!("{other:?}"))),
    })
}

/// SDK item to model item.
///
/// # Errors
///
/// Same as [`from_sdk`].
pub fn from_sdk_item(item: HashMap<String, SdkValue>) -> Result<Item, SdkExecutorError> {
    item.into_iter()
        .map(|(k, v)| from_sdk(v).map(|v| (k, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_convert_nested_values_both_ways() {
        let item = Item::from([
            ("PK".to_owned(), AttributeValue::S("FluentAPITest".to_owned())),
            ("blob".to_owned(), AttributeValue::B(Bytes::from_static(b"\x00\x01"))),
            (
                "nested".to_owned(),
                AttributeValue::M(HashMap::from([(
                    "list".to_owned(),
                    AttributeValue::L(vec![
                        AttributeValue::N("1".to_owned()),
                        AttributeValue::Null(true),
                    ]),
                )])),
            ),
        ]);

        let sdk = to_sdk_item(item.clone());
        assert_eq!(sdk["blob"], SdkValue::B(Blob::new(vec![0, 1])));
        assert_eq!(from_sdk_item(sdk).unwrap(), item);
    }

    #[test]
    fn test_should_reject_unknown_variant() {
        assert!(matches!(
            from_sdk(SdkValue::Unknown),
            Err(SdkExecutorError::UnknownAttributeValue(_))
        ));
    }
}
