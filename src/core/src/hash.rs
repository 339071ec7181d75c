//! Algorithm-tagged hashing.
//!
//! Every hash in the protocol is a [`DataHash`]: a digest together with the
//! algorithm that produced it. Hashes are compared and serialized through
//! their imprint (2-byte big-endian algorithm tag followed by the digest), so
//! a SHA-256 digest can never be mistaken for the same bytes produced by a
//! different algorithm.

use crate::errors::CoreError;
use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;

/// Hash algorithms recognised in imprints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashAlgorithm {
    /// SHA-256, the protocol default
    Sha256,
    /// SHA-224
    Sha224,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashAlgorithm {
    /// Returns the numeric tag written into imprints.
    pub fn tag(&self) -> u16 {
        match self {
            HashAlgorithm::Sha256 => 0,
            HashAlgorithm::Sha224 => 1,
            HashAlgorithm::Sha384 => 2,
            HashAlgorithm::Sha512 => 3,
        }
    }

    /// Looks up an algorithm by its imprint tag.
    pub fn from_tag(tag: u16) -> Result<Self, CoreError> {
        match tag {
            0 => Ok(HashAlgorithm::Sha256),
            1 => Ok(HashAlgorithm::Sha224),
            2 => Ok(HashAlgorithm::Sha384),
            3 => Ok(HashAlgorithm::Sha512),
            other => Err(CoreError::InvalidImprint(format!(
                "unknown hash algorithm tag {}",
                other
            ))),
        }
    }

    /// Returns the digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha224 => 28,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "SHA256"),
            HashAlgorithm::Sha224 => write!(f, "SHA224"),
            HashAlgorithm::Sha384 => write!(f, "SHA384"),
            HashAlgorithm::Sha512 => write!(f, "SHA512"),
        }
    }
}

// Serialized as the numeric imprint tag
impl Serialize for HashAlgorithm {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u16(self.tag())
    }
}

impl<'de> Deserialize<'de> for HashAlgorithm {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = u16::deserialize(deserializer)?;
        HashAlgorithm::from_tag(tag).map_err(serde::de::Error::custom)
    }
}

/// A digest tagged with the algorithm that produced it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataHash {
    algorithm: HashAlgorithm,
    data: Vec<u8>,
}

impl DataHash {
    /// Creates a hash from an algorithm and digest bytes, copying the digest.
    pub fn new(algorithm: HashAlgorithm, data: &[u8]) -> Result<Self, CoreError> {
        if data.len() != algorithm.digest_len() {
            return Err(CoreError::InvalidImprint(format!(
                "{} digest must be {} bytes, got {}",
                algorithm,
                algorithm.digest_len(),
                data.len()
            )));
        }

        Ok(Self {
            algorithm,
            data: data.to_vec(),
        })
    }

    /// Wraps a known SHA-256 digest.
    pub fn from_sha256_digest(digest: [u8; 32]) -> Self {
        Self {
            algorithm: HashAlgorithm::Sha256,
            data: digest.to_vec(),
        }
    }

    /// Parses an imprint (algorithm tag followed by digest).
    pub fn from_imprint(imprint: &[u8]) -> Result<Self, CoreError> {
        if imprint.len() < 2 {
            return Err(CoreError::InvalidImprint(format!(
                "imprint too short: {} bytes",
                imprint.len()
            )));
        }

        let algorithm = HashAlgorithm::from_tag(BigEndian::read_u16(&imprint[..2]))?;
        Self::new(algorithm, &imprint[2..])
    }

    /// Parses a hex-encoded imprint.
    pub fn from_hex(value: &str) -> Result<Self, CoreError> {
        Self::from_imprint(&hex::decode(value)?)
    }

    /// Hashes `data` with the given algorithm.
    pub fn of(algorithm: HashAlgorithm, data: &[u8]) -> Self {
        DataHasher::new(algorithm).update(data).digest()
    }

    /// Hashes `data` with SHA-256.
    pub fn sha256(data: &[u8]) -> Self {
        Self::of(HashAlgorithm::Sha256, data)
    }

    /// The algorithm that produced this hash.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The raw digest bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The imprint: 2-byte algorithm tag followed by the digest.
    pub fn imprint(&self) -> Vec<u8> {
        let mut imprint = vec![0u8; 2 + self.data.len()];
        BigEndian::write_u16(&mut imprint[..2], self.algorithm.tag());
        imprint[2..].copy_from_slice(&self.data);
        imprint
    }

    /// Hex encoding of the imprint.
    pub fn to_hex(&self) -> String {
        hex::encode(self.imprint())
    }
}

impl fmt::Display for DataHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for DataHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataHash({}:{})", self.algorithm, hex::encode(&self.data))
    }
}

impl Serialize for DataHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for DataHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        DataHash::from_hex(&value).map_err(serde::de::Error::custom)
    }
}

enum HasherState {
    Sha256(Sha256),
    Sha224(Sha224),
    Sha384(Sha384),
    Sha512(Sha512),
}

/// Incremental hasher producing a [`DataHash`].
pub struct DataHasher {
    algorithm: HashAlgorithm,
    state: HasherState,
}

impl DataHasher {
    /// Creates a hasher for the given algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
            HashAlgorithm::Sha224 => HasherState::Sha224(Sha224::new()),
            HashAlgorithm::Sha384 => HasherState::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => HasherState::Sha512(Sha512::new()),
        };

        Self { algorithm, state }
    }

    /// Feeds more bytes into the hasher.
    pub fn update(mut self, data: impl AsRef<[u8]>) -> Self {
        let data = data.as_ref();
        match &mut self.state {
            HasherState::Sha256(hasher) => hasher.update(data),
            HasherState::Sha224(hasher) => hasher.update(data),
            HasherState::Sha384(hasher) => hasher.update(data),
            HasherState::Sha512(hasher) => hasher.update(data),
        }
        self
    }

    /// Finishes hashing.
    pub fn digest(self) -> DataHash {
        let data = match self.state {
            HasherState::Sha256(hasher) => hasher.finalize().to_vec(),
            HasherState::Sha224(hasher) => hasher.finalize().to_vec(),
            HasherState::Sha384(hasher) => hasher.finalize().to_vec(),
            HasherState::Sha512(hasher) => hasher.finalize().to_vec(),
        };

        DataHash {
            algorithm: self.algorithm,
            data,
        }
    }
}
