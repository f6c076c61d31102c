//! Canonical JSON encoding.
//!
//! Signatures are computed over the canonical bytes of a payload and the
//! sentinel recomputes the same bytes to verify them, so the encoding must be
//! stable across implementations: every object, at every depth, is emitted
//! with its keys in lexicographic byte order, with no insignificant
//! whitespace. Arrays keep their element order.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::WeilError;

/// Borrowed view of a JSON value that serializes with sorted keys.
///
/// Sorting happens at serialization time so the result does not depend on
/// whether `serde_json::Map` preserves insertion order in this build.
struct Canonical<'a>(&'a Value);

impl Serialize for Canonical<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Value::Object(map) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
                let mut out = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    out.serialize_entry(key, &Canonical(value))?;
                }
                out.end()
            }
            Value::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(&Canonical(item))?;
                }
                out.end()
            }
            other => other.serialize(serializer),
        }
    }
}

/// Encode a JSON value canonically.
pub fn encode_value(value: &Value) -> Result<Vec<u8>, WeilError> {
    serde_json::to_vec(&Canonical(value)).map_err(|e| WeilError::Encoding {
        reason: e.to_string(),
    })
}

/// Encode any serializable value canonically.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, WeilError> {
    let value = serde_json::to_value(value).map_err(|e| WeilError::Encoding {
        reason: e.to_string(),
    })?;
    encode_value(&value)
}
