//! Payload codecs converting cached values to and from stored bytes

use std::fmt::{self, Debug};
use std::marker::PhantomData;

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::domain::CacheError;

/// Strategy for encoding cached values into bytes and back
pub trait PayloadCodec<V>: Send + Sync + Debug {
    /// Encodes a value into its storable form
    fn encode(&self, value: &V) -> Result<Bytes, CacheError>;

    /// Decodes stored bytes; corrupted or foreign bytes must fail
    fn decode(&self, bytes: &[u8]) -> Result<V, CacheError>;
}

/// JSON codec backed by serde_json
pub struct JsonCodec<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V> fmt::Debug for JsonCodec<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<V> JsonCodec<V> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<V> Default for JsonCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for JsonCodec<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<V> PayloadCodec<V> for JsonCodec<V>
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Bytes, CacheError> {
        serde_json::to_vec(value).map(Bytes::from).map_err(|e| {
            CacheError::serialization(format!("Failed to serialize cache value: {}", e))
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<V, CacheError> {
        serde_json::from_slice(bytes).map_err(|e| {
            CacheError::deserialization(format!("Failed to deserialize cache value: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::{Value, json};
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct MatchResult {
        file: String,
        score: f64,
        reasons: Vec<String>,
        extra: Option<BTreeMap<String, i64>>,
    }

    #[test]
    fn test_round_trip_struct() {
        let codec = JsonCodec::<MatchResult>::new();
        let value = MatchResult {
            file: "src/lib.rs".to_string(),
            score: 0.9,
            reasons: vec!["mentions parser".to_string()],
            extra: Some(BTreeMap::from([("line".to_string(), 42)])),
        };

        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_round_trip_dynamic_value() {
        let codec = JsonCodec::<Value>::new();
        let value = json!({"match": 0.9, "files": [{"path": "a.rs"}], "note": null});

        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_decode_corrupted_bytes() {
        let codec = JsonCodec::<Value>::new();

        let result = codec.decode(b"\x80\x04\x95pickle");
        assert!(matches!(result, Err(CacheError::Deserialization { .. })));
    }

    #[test]
    fn test_decode_foreign_shape() {
        let codec = JsonCodec::<MatchResult>::new();

        let result = codec.decode(br#"{"match": 0.9}"#);
        assert!(matches!(result, Err(CacheError::Deserialization { .. })));
    }

    #[test]
    fn test_encode_unrepresentable_value() {
        let codec = JsonCodec::<BTreeMap<(u8, u8), String>>::new();
        let value = BTreeMap::from([((1, 2), "x".to_string())]);

        let result = codec.encode(&value);
        assert!(matches!(result, Err(CacheError::Serialization { .. })));
    }
}
