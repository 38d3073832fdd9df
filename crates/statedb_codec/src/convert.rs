//! Serde bridge between typed state and document values.
//!
//! Typed values go through `ciborium`'s own value model and are then mapped
//! onto [`Value`], which sorts map keys canonically on the way in.

use ciborium::value::{Integer, Value as CborValue};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Convert any serializable value into a document [`Value`].
///
/// # Errors
///
/// Returns an error if serialization fails, if the value contains integers
/// outside the signed 64-bit range, or if it uses CBOR tags.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> CodecResult<Value> {
    let cbor = CborValue::serialized(value)
        .map_err(|e| CodecError::serialize_failed(e.to_string()))?;
    from_cbor_value(cbor)
}

/// Convert a document [`Value`] back into a typed value.
///
/// # Errors
///
/// Returns an error if the document shape does not match `T`.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> CodecResult<T> {
    into_cbor_value(value.clone())
        .deserialized()
        .map_err(|e| CodecError::deserialize_failed(e.to_string()))
}

fn from_cbor_value(cbor: CborValue) -> CodecResult<Value> {
    Ok(match cbor {
        CborValue::Null => Value::Null,
        CborValue::Bool(b) => Value::Bool(b),
        CborValue::Integer(n) => {
            let wide = i128::from(n);
            Value::Integer(i64::try_from(wide).map_err(|_| CodecError::IntegerOverflow)?)
        }
        CborValue::Float(f) => Value::Float(f),
        CborValue::Bytes(b) => Value::Bytes(b),
        CborValue::Text(s) => Value::Text(s),
        CborValue::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_cbor_value)
                .collect::<CodecResult<_>>()?,
        ),
        CborValue::Map(pairs) => Value::map(
            pairs
                .into_iter()
                .map(|(k, v)| Ok((from_cbor_value(k)?, from_cbor_value(v)?)))
                .collect::<CodecResult<_>>()?,
        ),
        CborValue::Tag(tag, _) => {
            return Err(CodecError::unsupported_type(format!("tag {tag}")));
        }
        other => {
            return Err(CodecError::unsupported_type(format!("{other:?}")));
        }
    })
}

fn into_cbor_value(value: Value) -> CborValue {
    match value {
        Value::Null => CborValue::Null,
        Value::Bool(b) => CborValue::Bool(b),
        Value::Integer(n) => CborValue::Integer(Integer::from(n)),
        Value::Float(f) => CborValue::Float(f),
        Value::Bytes(b) => CborValue::Bytes(b),
        Value::Text(s) => CborValue::Text(s),
        Value::Array(items) => CborValue::Array(items.into_iter().map(into_cbor_value).collect()),
        Value::Map(pairs) => CborValue::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (into_cbor_value(k), into_cbor_value(v)))
                .collect(),
        ),
    }
}
