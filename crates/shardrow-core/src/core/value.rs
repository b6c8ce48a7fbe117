// crates/shardrow-core/src/core/value.rs
// ============================================================================
// Module: Shardrow Value Model
// Description: Attribute values, attribute maps, and the body codec.
// Purpose: Represent cell bodies and index values with a MessagePack codec.
// Dependencies: serde, rmp-serde, serde_json
// ============================================================================

//! ## Overview
//! Cell bodies are string-keyed maps of scalar [`Value`]s. Bodies are encoded
//! to an opaque binary blob with MessagePack; `decode_body(encode_body(m))`
//! is the identity for every representable map. Attribute keys are normalized
//! to plain strings at the API edge: a leading `:` (a symbol-style spelling)
//! is stripped so both spellings address the same attribute.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Visitor;

use crate::core::errors::StoreError;

// ============================================================================
// SECTION: Values
// ============================================================================

/// Scalar attribute value stored in cell bodies and index columns.
///
/// # Invariants
/// - The variant set is closed over what the MessagePack codec can round-trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / nil value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Opaque binary payload.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true when the value is `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integer payload when present.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string payload when present.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the binary payload when present.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(value) => Some(value),
            _ => None,
        }
    }

    /// Derives the integer used for shard routing from this value.
    ///
    /// Integers route on their own magnitude; integer-looking strings are
    /// parsed but stored verbatim. Other variants are not shardable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotShardable`] when no integer can be derived.
    pub fn shardable_value(&self) -> Result<u64, StoreError> {
        match self {
            Self::Integer(value) => u64::try_from(*value)
                .map_err(|_| StoreError::NotShardable(format!("negative integer {value}"))),
            Self::String(value) => value
                .parse::<u64>()
                .map_err(|_| StoreError::NotShardable(format!("non-numeric string {value:?}"))),
            other => Err(StoreError::NotShardable(format!("{other:?}"))),
        }
    }

    /// Projects the value into JSON for diagnostics.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Integer(value) => serde_json::Value::from(*value),
            Self::Float(value) => {
                serde_json::Number::from_f64(*value).map_or(serde_json::Value::Null, Into::into)
            }
            Self::String(value) => serde_json::Value::String(value.clone()),
            Self::Bytes(value) => {
                serde_json::Value::Array(value.iter().map(|byte| (*byte).into()).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::String(value) => serializer.serialize_str(value),
            Self::Bytes(value) => serializer.serialize_bytes(value),
        }
    }
}

/// Visitor decoding any self-describing scalar into a [`Value`].
struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a nil, bool, integer, float, string, or binary value")
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(Self)
    }

    fn visit_bool<E: serde::de::Error>(self, value: bool) -> Result<Value, E> {
        Ok(Value::Bool(value))
    }

    fn visit_i8<E: serde::de::Error>(self, value: i8) -> Result<Value, E> {
        Ok(Value::Integer(i64::from(value)))
    }

    fn visit_i16<E: serde::de::Error>(self, value: i16) -> Result<Value, E> {
        Ok(Value::Integer(i64::from(value)))
    }

    fn visit_i32<E: serde::de::Error>(self, value: i32) -> Result<Value, E> {
        Ok(Value::Integer(i64::from(value)))
    }

    fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<Value, E> {
        Ok(Value::Integer(value))
    }

    fn visit_u8<E: serde::de::Error>(self, value: u8) -> Result<Value, E> {
        Ok(Value::Integer(i64::from(value)))
    }

    fn visit_u16<E: serde::de::Error>(self, value: u16) -> Result<Value, E> {
        Ok(Value::Integer(i64::from(value)))
    }

    fn visit_u32<E: serde::de::Error>(self, value: u32) -> Result<Value, E> {
        Ok(Value::Integer(i64::from(value)))
    }

    fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<Value, E> {
        i64::try_from(value)
            .map(Value::Integer)
            .map_err(|_| E::custom(format!("integer {value} out of range")))
    }

    fn visit_f32<E: serde::de::Error>(self, value: f32) -> Result<Value, E> {
        Ok(Value::Float(f64::from(value)))
    }

    fn visit_f64<E: serde::de::Error>(self, value: f64) -> Result<Value, E> {
        Ok(Value::Float(value))
    }

    fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Value, E> {
        Ok(Value::String(value.to_string()))
    }

    fn visit_string<E: serde::de::Error>(self, value: String) -> Result<Value, E> {
        Ok(Value::String(value))
    }

    fn visit_bytes<E: serde::de::Error>(self, value: &[u8]) -> Result<Value, E> {
        Ok(Value::Bytes(value.to_vec()))
    }

    fn visit_byte_buf<E: serde::de::Error>(self, value: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Bytes(value))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

// ============================================================================
// SECTION: Attribute Maps
// ============================================================================

/// Ordered string-keyed map of attribute values.
///
/// # Invariants
/// - Keys are stored normalized (see [`normalize_key`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, Value>);

impl AttributeMap {
    /// Creates an empty attribute map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the value stored under `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(normalize_key(key))
    }

    /// Stores `value` under the normalized form of `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let key = normalize_key(&key).to_string();
        self.0.insert(key, value.into());
    }

    /// Returns true when `key` is present, regardless of the stored value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(normalize_key(key))
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(normalize_key(key))
    }

    /// Returns the number of stored attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no attributes are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over key/value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Iterates over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Projects the map into a JSON object for diagnostics.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0.iter().map(|(key, value)| (key.clone(), value.to_json())).collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for AttributeMap {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Normalizes an attribute key by stripping a symbol-style leading colon.
#[must_use]
pub fn normalize_key(key: &str) -> &str {
    key.strip_prefix(':').unwrap_or(key)
}

// ============================================================================
// SECTION: Body Codec
// ============================================================================

/// Encodes a cell body into its opaque MessagePack blob.
///
/// # Errors
///
/// Returns [`StoreError::Codec`] when the map cannot be encoded.
pub fn encode_body(body: &AttributeMap) -> Result<Vec<u8>, StoreError> {
    rmp_serde::to_vec(body).map_err(|err| StoreError::Codec(err.to_string()))
}

/// Decodes an opaque MessagePack blob back into a cell body.
///
/// # Errors
///
/// Returns [`StoreError::Codec`] when the blob is not a valid encoded body.
pub fn decode_body(bytes: &[u8]) -> Result<AttributeMap, StoreError> {
    rmp_serde::from_slice(bytes).map_err(|err| StoreError::Codec(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
