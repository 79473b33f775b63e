//! Codec Module
//!
//! Turns typed values into the opaque byte strings the caches store.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CacheError, Result};

// == Codec Trait ==
/// Serialization port shared by every cache backend.
///
/// Any format that round-trips arbitrary serde values is acceptable; the
/// caches never inspect the bytes.
pub trait Codec: Send + Sync + 'static {
    /// Encodes `value` into bytes.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decodes bytes previously produced by [`Codec::encode`].
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

// == MessagePack ==
/// Compact binary codec backed by `rmp-serde`.
///
/// Structs are written as maps keyed by field name, so adding optional fields
/// does not invalidate bytes that are already cached.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePack;

impl Codec for MessagePack {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        rmp_serde::from_slice(bytes).map_err(|e| CacheError::Serialization(e.to_string()))
    }
}

// == Json ==
/// Human-readable codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Codec for Json {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        id: u64,
        name: String,
        tags: Vec<String>,
        scores: HashMap<String, f64>,
        nickname: Option<String>,
    }

    fn sample() -> Profile {
        Profile {
            id: 7,
            name: "ada".to_string(),
            tags: vec!["admin".to_string()],
            scores: HashMap::from([("math".to_string(), 99.5)]),
            nickname: None,
        }
    }

    #[test]
    fn test_msgpack_structured_value() {
        let codec = MessagePack;
        let bytes = codec.encode(&sample()).unwrap();
        let decoded: Profile = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_json_structured_value() {
        let codec = Json;
        let bytes = codec.encode(&sample()).unwrap();
        assert!(std::str::from_utf8(&bytes).unwrap().contains("\"name\":\"ada\""));
        let decoded: Profile = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_msgpack_decode_wrong_shape() {
        let codec = MessagePack;
        let bytes = codec.encode("just a string").unwrap();
        let result: Result<Profile> = codec.decode(&bytes);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_json_encode_failure() {
        // JSON object keys must be strings
        let map = HashMap::from([((1, 2), "pair")]);
        let result = Json.encode(&map);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_decode_garbage() {
        let result: Result<u32> = MessagePack.decode(&[0xc1]);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }
}
