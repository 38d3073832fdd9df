//! Dynamic document value type.

use std::cmp::Ordering;

/// A dynamic CBOR value.
///
/// Every persisted state document is a `Value::Map` with text keys. Floats
/// are supported but always canonicalised to 64-bit doubles; NaN is rejected
/// at encode time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (supports full i64 range).
    Integer(i64),
    /// Double-precision float.
    Float(f64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Text string (UTF-8).
    Text(String),
    /// Array of values.
    Array(Vec<Value>),
    /// Map of key-value pairs (keys are sorted for canonical encoding).
    Map(Vec<(Value, Value)>),
}

/// Generates a variant accessor returning `None` for other variants.
macro_rules! accessor {
    ($name:ident, $variant:ident, $ty:ty, copied, $doc:literal) => {
        #[doc = $doc]
        pub fn $name(&self) -> Option<$ty> {
            match self {
                Value::$variant(inner) => Some(*inner),
                _ => None,
            }
        }
    };
    ($name:ident, $variant:ident, $ty:ty, borrowed, $doc:literal) => {
        #[doc = $doc]
        pub fn $name(&self) -> Option<$ty> {
            match self {
                Value::$variant(inner) => Some(inner),
                _ => None,
            }
        }
    };
}

impl Value {
    /// Create a map value with sorted keys.
    ///
    /// Keys are sorted by their canonical CBOR encoding (bytewise comparison).
    pub fn map(mut pairs: Vec<(Value, Value)>) -> Self {
        pairs.sort_by(|a, b| a.0.cmp_canonical(&b.0));
        Value::Map(pairs)
    }

    /// Create an empty map.
    pub fn empty_map() -> Self {
        Value::Map(Vec::new())
    }

    /// Compare two values for canonical ordering.
    ///
    /// This matches the bytewise comparison of canonical CBOR encodings,
    /// which is required for map key sorting.
    #[allow(clippy::match_same_arms)]
    pub fn cmp_canonical(&self, other: &Self) -> Ordering {
        let self_type = self.major_type();
        let other_type = other.major_type();

        if self_type != other_type {
            return self_type.cmp(&other_type);
        }

        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => {
                // Same sign here: positive and negative integers have
                // different major types and were separated above.
                #[allow(clippy::cast_sign_loss)]
                if *a >= 0 {
                    Self::cmp_unsigned_canonical(*a as u64, *b as u64)
                } else {
                    // CBOR encodes -1-n as the argument
                    let arg_a = (-1 - *a) as u64;
                    let arg_b = (-1 - *b) as u64;
                    Self::cmp_unsigned_canonical(arg_a, arg_b)
                }
            }
            (Value::Bytes(a), Value::Bytes(b)) => match a.len().cmp(&b.len()) {
                Ordering::Equal => a.cmp(b),
                ord => ord,
            },
            (Value::Text(a), Value::Text(b)) => match a.len().cmp(&b.len()) {
                Ordering::Equal => a.cmp(b),
                ord => ord,
            },
            (Value::Array(a), Value::Array(b)) => match a.len().cmp(&b.len()) {
                Ordering::Equal => a
                    .iter()
                    .zip(b.iter())
                    .map(|(av, bv)| av.cmp_canonical(bv))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal),
                ord => ord,
            },
            (Value::Map(a), Value::Map(b)) => match a.len().cmp(&b.len()) {
                Ordering::Equal => a
                    .iter()
                    .zip(b.iter())
                    .map(|((ak, av), (bk, bv))| ak.cmp_canonical(bk).then(av.cmp_canonical(bv)))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal),
                ord => ord,
            },
            // Major type 7: one-byte simple values sort before 9-byte doubles.
            _ => self.simple_rank().cmp(&other.simple_rank()),
        }
    }

    /// Compare two unsigned integers by their canonical CBOR encoding.
    ///
    /// Comparison is length-first, then numeric (which equals lexicographic
    /// for big-endian bytes of the same length).
    fn cmp_unsigned_canonical(a: u64, b: u64) -> Ordering {
        let len_a = Self::cbor_uint_encoded_len(a);
        let len_b = Self::cbor_uint_encoded_len(b);

        match len_a.cmp(&len_b) {
            Ordering::Equal => a.cmp(&b),
            ord => ord,
        }
    }

    /// Returns the encoded length (in bytes) of an unsigned integer in CBOR.
    fn cbor_uint_encoded_len(n: u64) -> usize {
        if n <= 23 {
            1
        } else if n <= 0xFF {
            2
        } else if n <= 0xFFFF {
            3
        } else if n <= 0xFFFF_FFFF {
            5
        } else {
            9
        }
    }

    /// Get the CBOR major type for this value.
    fn major_type(&self) -> u8 {
        match self {
            Value::Integer(n) if *n >= 0 => 0,
            Value::Integer(_) => 1,
            Value::Bytes(_) => 2,
            Value::Text(_) => 3,
            Value::Array(_) => 4,
            Value::Map(_) => 5,
            Value::Bool(_) | Value::Null | Value::Float(_) => 7,
        }
    }

    /// Encoded-form ordering key for major type 7 values.
    fn simple_rank(&self) -> (u8, u64) {
        match self {
            Value::Bool(false) => (0xf4, 0),
            Value::Bool(true) => (0xf5, 0),
            Value::Null => (0xf6, 0),
            Value::Float(f) => (0xfb, crate::encoder::canonical_float(*f).to_bits()),
            _ => (0, 0),
        }
    }

    /// Compare two values the way a document query orders them.
    ///
    /// Values of different kinds order as
    /// `Null < numbers < Text < Map < Array < Bytes < Bool`.
    /// Integers and floats compare numerically with each other.
    pub fn cmp_query(&self, other: &Self) -> Ordering {
        let rank = self.query_rank().cmp(&other.query_rank());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Value::Integer(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Value::Float(a), Value::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(av, bv)| av.cmp_query(bv))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Value::Map(a), Value::Map(b)) => a
                .iter()
                .zip(b.iter())
                .map(|((ak, av), (bk, bv))| ak.cmp_query(bk).then_with(|| av.cmp_query(bv)))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => Ordering::Equal,
        }
    }

    fn query_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::Text(_) => 2,
            Value::Map(_) => 3,
            Value::Array(_) => 4,
            Value::Bytes(_) => 5,
            Value::Bool(_) => 6,
        }
    }

    /// Short name of this value's kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    accessor!(as_bool, Bool, bool, copied, "The boolean, if this is `Bool`.");
    accessor!(as_integer, Integer, i64, copied, "The integer, if this is `Integer`.");
    accessor!(as_float, Float, f64, copied, "The float, if this is `Float`.");
    accessor!(as_bytes, Bytes, &[u8], borrowed, "The byte string, if this is `Bytes`.");
    accessor!(as_text, Text, &str, borrowed, "The text, if this is `Text`.");
    accessor!(as_array, Array, &[Value], borrowed, "The elements, if this is `Array`.");
    accessor!(as_map, Map, &[(Value, Value)], borrowed, "The pairs in key order, if this is `Map`.");

    /// Look up a text key in this map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(pairs) => pairs
                .iter()
                .find(|(k, _)| k.as_text() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Look up a dotted path (`bag.gold`) through nested maps.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(self, |current, segment| current.get(segment))
    }

    /// Insert or replace a text key in this map value.
    ///
    /// Returns the previous value. Does nothing on non-map values.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
        let Value::Map(pairs) = self else {
            return None;
        };
        let value = value.into();
        match pairs.iter_mut().find(|(k, _)| k.as_text() == Some(key)) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                pairs.push((Value::Text(key.to_string()), value));
                pairs.sort_by(|a, b| a.0.cmp_canonical(&b.0));
                None
            }
        }
    }

    /// Remove a text key from this map value, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let Value::Map(pairs) = self else {
            return None;
        };
        let index = pairs.iter().position(|(k, _)| k.as_text() == Some(key))?;
        Some(pairs.remove(index).1)
    }
}

macro_rules! from_lossless {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(inner: $source) -> Self {
                    Value::$variant(inner.into())
                }
            }
        )*
    };
}

from_lossless! {
    bool => Bool,
    i64 => Integer,
    i32 => Integer,
    u32 => Integer,
    f64 => Float,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}
