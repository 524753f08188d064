//! CBOR payload decoding.
//!
//! A payload is one CBOR map with text keys. Decoding goes through two fixed
//! pools: a chunk pool for the scratch copy handed to the CBOR parser and a
//! representation pool for the decoded field list. Both are released on drop,
//! so every exit path returns what it took.

use std::fmt;

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::codec::FrameBuf;
use crate::error::{DecodeError, FrameError};
use crate::pool::{BufferPool, PoolLease};

/// One decoded `(name, value)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A decoded field value, forwarded unconverted to listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Null,
    Array(Vec<FieldValue>),
    Map(Vec<Field>),
}

impl FieldValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as a float; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Short type label for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "text",
            FieldValue::Bool(_) => "bool",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Null => "null",
            FieldValue::Array(_) => "array",
            FieldValue::Map(_) => "map",
        }
    }

    fn to_cbor(&self) -> Value {
        match self {
            FieldValue::Integer(v) => Value::Integer((*v).into()),
            FieldValue::Float(v) => Value::Float(*v),
            FieldValue::Text(v) => Value::Text(v.clone()),
            FieldValue::Bool(v) => Value::Bool(*v),
            FieldValue::Bytes(v) => Value::Bytes(v.clone()),
            FieldValue::Null => Value::Null,
            FieldValue::Array(items) => Value::Array(items.iter().map(Self::to_cbor).collect()),
            FieldValue::Map(fields) => Value::Map(
                fields
                    .iter()
                    .map(|f| (Value::Text(f.name.clone()), f.value.to_cbor()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(v) => write!(f, "{v:?}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            FieldValue::Null => f.write_str("null"),
            FieldValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            FieldValue::Map(fields) => {
                f.write_str("{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.value)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(v.into())
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Integer(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// What to do with a frame whose payload is empty after reclaiming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPayload {
    /// A valid frame carrying zero fields.
    #[default]
    Accept,
    /// A transport anomaly, reported as malformed.
    Reject,
}

/// Decode budgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Scratch chunks available to the CBOR parser.
    pub chunk_slots: usize,
    /// Decoded field lists that may be alive at once.
    pub rep_slots: usize,
    /// Maximum top-level fields in one payload.
    pub max_fields: usize,
    /// Maximum nesting of arrays and maps inside a field value.
    pub max_depth: usize,
    /// Policy for empty payloads.
    pub empty_payload: EmptyPayload,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            chunk_slots: 2,
            rep_slots: 4,
            max_fields: 16,
            max_depth: 4,
            empty_payload: EmptyPayload::Accept,
        }
    }
}

/// Decoded fields of one payload, in encoding order.
///
/// Holds a slot of the decoder's representation pool until dropped.
#[derive(Debug)]
pub struct DecodedPayload {
    fields: Vec<Field>,
    _lease: PoolLease,
}

impl DecodedPayload {
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field by name; the first one wins if a name repeats.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }
}

impl<'a> IntoIterator for &'a DecodedPayload {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Decodes reclaimed payloads into field lists.
#[derive(Debug, Clone)]
pub struct PayloadDecoder {
    config: DecoderConfig,
    chunks: BufferPool,
    reps: BufferPool,
}

impl PayloadDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            chunks: BufferPool::new("chunk", config.chunk_slots),
            reps: BufferPool::new("field list", config.rep_slots),
            config,
        }
    }

    /// Decode one reclaimed payload.
    pub fn decode(&self, payload: &[u8]) -> Result<DecodedPayload, DecodeError> {
        if payload.is_empty() {
            return match self.config.empty_payload {
                EmptyPayload::Accept => Ok(DecodedPayload {
                    fields: Vec::new(),
                    _lease: self.lease_rep()?,
                }),
                EmptyPayload::Reject => Err(DecodeError::Malformed("empty payload".to_string())),
            };
        }

        let value = self.parse(payload)?;
        let lease = self.lease_rep()?;

        let entries = match value {
            Value::Map(entries) => entries,
            other => {
                return Err(DecodeError::Malformed(format!(
                    "payload is {} rather than a map",
                    cbor_kind(&other)
                )))
            }
        };
        if entries.len() > self.config.max_fields {
            return Err(DecodeError::OutOfResources("too many fields"));
        }

        let fields = convert_entries(entries, 0, self.config.max_depth)?;
        trace!(fields = fields.len(), "payload decoded");
        Ok(DecodedPayload {
            fields,
            _lease: lease,
        })
    }

    /// Parse CBOR from a pooled chunk; the chunk is released before returning.
    fn parse(&self, payload: &[u8]) -> Result<Value, DecodeError> {
        let _chunk = self
            .chunks
            .acquire()
            .ok_or(DecodeError::OutOfResources("no free chunk"))?;
        let chunk = FrameBuf::from_slice(payload)
            .map_err(|_| DecodeError::OutOfResources("payload larger than a chunk"))?;

        let mut reader: &[u8] = &chunk;
        let value: Value = ciborium::de::from_reader(&mut reader).map_err(|err| match err {
            ciborium::de::Error::Io(_) => DecodeError::Malformed("truncated payload".to_string()),
            other => DecodeError::Malformed(other.to_string()),
        })?;
        if !reader.is_empty() {
            return Err(DecodeError::Malformed(format!(
                "{} trailing bytes after payload",
                reader.len()
            )));
        }
        Ok(value)
    }

    fn lease_rep(&self) -> Result<PoolLease, DecodeError> {
        self.reps
            .acquire()
            .ok_or(DecodeError::OutOfResources("no free field list"))
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Scratch chunk pool, exposed for diagnostics.
    pub fn chunk_pool(&self) -> &BufferPool {
        &self.chunks
    }

    /// Field-list pool, exposed for diagnostics.
    pub fn rep_pool(&self) -> &BufferPool {
        &self.reps
    }
}

impl Default for PayloadDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

fn convert_entries(
    entries: Vec<(Value, Value)>,
    depth: usize,
    max_depth: usize,
) -> Result<Vec<Field>, DecodeError> {
    entries
        .into_iter()
        .map(|(key, value)| {
            let name = match key {
                Value::Text(name) => name,
                other => {
                    return Err(DecodeError::Malformed(format!(
                        "field name is {} rather than text",
                        cbor_kind(&other)
                    )))
                }
            };
            let value = convert_value(value, depth, max_depth)?;
            Ok(Field { name, value })
        })
        .collect()
}

fn convert_value(value: Value, depth: usize, max_depth: usize) -> Result<FieldValue, DecodeError> {
    match value {
        Value::Integer(v) => i64::try_from(v)
            .map(FieldValue::Integer)
            .map_err(|_| DecodeError::Malformed("integer out of range".to_string())),
        Value::Float(v) => Ok(FieldValue::Float(v)),
        Value::Text(v) => Ok(FieldValue::Text(v)),
        Value::Bool(v) => Ok(FieldValue::Bool(v)),
        Value::Bytes(v) => Ok(FieldValue::Bytes(v)),
        Value::Null => Ok(FieldValue::Null),
        Value::Tag(_, inner) => convert_value(*inner, depth, max_depth),
        Value::Array(items) => {
            let depth = nest(depth, max_depth)?;
            items
                .into_iter()
                .map(|item| convert_value(item, depth, max_depth))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::Array)
        }
        Value::Map(entries) => {
            let depth = nest(depth, max_depth)?;
            convert_entries(entries, depth, max_depth).map(FieldValue::Map)
        }
        other => Err(DecodeError::Malformed(format!(
            "unsupported value {}",
            cbor_kind(&other)
        ))),
    }
}

fn nest(depth: usize, max_depth: usize) -> Result<usize, DecodeError> {
    if depth >= max_depth {
        return Err(DecodeError::Malformed(format!(
            "nesting deeper than {max_depth}"
        )));
    }
    Ok(depth + 1)
}

fn cbor_kind(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "an integer",
        Value::Bytes(_) => "a byte string",
        Value::Float(_) => "a float",
        Value::Text(_) => "text",
        Value::Bool(_) => "a bool",
        Value::Null => "null",
        Value::Tag(_, _) => "a tag",
        Value::Array(_) => "an array",
        Value::Map(_) => "a map",
        _ => "an unknown item",
    }
}

/// Encode `fields` as a CBOR map, in order. Used by senders and tooling.
pub fn encode_payload(fields: &[Field]) -> Result<Vec<u8>, FrameError> {
    let map = Value::Map(
        fields
            .iter()
            .map(|f| (Value::Text(f.name.clone()), f.value.to_cbor()))
            .collect(),
    );
    let mut out = Vec::new();
    ciborium::ser::into_writer(&map, &mut out).map_err(|err| FrameError::Encode(err.to_string()))?;
    Ok(out)
}
