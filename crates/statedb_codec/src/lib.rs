//! # StateDB Codec
//!
//! Document values and canonical CBOR encoding for StateDB.
//!
//! Every persisted game state is represented as a [`Value::Map`]. The
//! canonical encoding gives each document exactly one byte form, so the
//! change tracker can fingerprint a state by hashing its encoded bytes.
//!
//! ## Canonical CBOR Rules
//!
//! - Maps are sorted by key (length first, then bytewise on encoded keys)
//! - Integers use the shortest head and must fit a signed 64-bit range
//! - Floats are always 64-bit doubles; NaN is rejected
//! - Strings must be UTF-8
//! - No indefinite-length items and no tags
//!
//! ## Usage
//!
//! ```
//! use statedb_codec::{from_cbor, to_canonical_cbor, to_value, Value};
//!
//! let doc = to_value(&("hero", 42)).unwrap();
//! let bytes = to_canonical_cbor(&doc).unwrap();
//! assert_eq!(from_cbor(&bytes).unwrap(), doc);
//! assert_eq!(doc, Value::Array(vec![Value::from("hero"), Value::from(42i64)]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod convert;
mod decoder;
mod encoder;
mod error;
mod value;

pub use convert::{from_value, to_value};
pub use decoder::{from_cbor, CanonicalDecoder};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Integer),
            any::<f64>()
                .prop_filter("NaN has no encoding", |f| !f.is_nan())
                .prop_map(Value::Float),
            "[a-z]{0,12}".prop_map(Value::Text),
            proptest::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
        ]
    }

    fn document() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                proptest::collection::btree_map("[a-z_]{1,8}", inner, 0..6).prop_map(|m| {
                    Value::map(m.into_iter().map(|(k, v)| (Value::Text(k), v)).collect())
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn decoded_equals_encoded(doc in document()) {
            let bytes = to_canonical_cbor(&doc).unwrap();
            prop_assert_eq!(from_cbor(&bytes).unwrap(), doc);
        }

        #[test]
        fn encoding_is_stable_across_reencode(doc in document()) {
            let first = to_canonical_cbor(&doc).unwrap();
            let second = to_canonical_cbor(&from_cbor(&first).unwrap()).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
