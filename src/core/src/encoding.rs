//! Canonical binary encoding and hex helpers.
//!
//! Structured values that get hashed (predicate parameters, transaction data,
//! coin maps) are encoded with bincode: fixed-width little-endian integers,
//! length-prefixed byte strings and sequences, and maps in iteration order.
//! Maps are always `BTreeMap`s so the encoding is key-sorted.

use crate::errors::CoreError;
use crate::hash::{DataHash, DataHasher, HashAlgorithm};
use serde::Serialize;

/// Encodes a value into its canonical byte form.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CoreError> {
    Ok(bincode::serialize(value)?)
}

/// Hashes the canonical encoding of a value.
pub fn hash_encoded<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<DataHash, CoreError> {
    let bytes = encode(value)?;
    Ok(DataHasher::new(algorithm).update(bytes).digest())
}

/// Serde adapter for `Vec<u8>` fields encoded as lowercase hex.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        hex::decode(&value).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<Vec<u8>>` fields encoded as lowercase hex.
pub mod hex_bytes_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        value
            .map(|value| hex::decode(&value).map_err(serde::de::Error::custom))
            .transpose()
    }
}
