//! Signing keys, signatures and the universal minter convention.

use crate::errors::CoreError;
use crate::hash::DataHash;
use crate::types::TokenId;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Public secret from which the per-token minter key is derived.
///
/// This is a shared convention, not a credential: anyone can derive the
/// minter key for any token id and so anyone can check a genesis commitment.
pub const MINTER_SECRET: &[u8] = b"I_AM_UNIVERSAL_MINTER_FOR_";

/// Signature algorithms understood by predicates and authenticators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// Ed25519 over the hash imprint
    #[serde(rename = "ed25519")]
    Ed25519,
}

impl SignatureAlgorithm {
    /// The identifier used in serialized predicates and authenticators.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Signature, represented as a 64-byte array.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Creates a signature from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() != 64 {
            return Err(CoreError::InvalidKey(format!(
                "invalid signature length: {} (expected 64)",
                bytes.len()
            )));
        }

        let mut signature = [0u8; 64];
        signature.copy_from_slice(bytes);
        Ok(Signature(signature))
    }

    /// Returns the signature bytes.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.0[..8]))
    }
}

// Serialized as a hex string
impl serde::Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> serde::Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct SignatureVisitor;

        impl<'de> serde::de::Visitor<'de> for SignatureVisitor {
            type Value = Signature;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a hex-encoded 64-byte signature")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let bytes = hex::decode(v).map_err(E::custom)?;
                Signature::from_slice(&bytes).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(SignatureVisitor)
    }
}

/// Holds a private key and signs hash imprints with it.
pub struct SigningService {
    signing_key: SigningKey,
}

impl SigningService {
    /// Creates a signing service from raw private key bytes.
    pub fn new(private_key: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&private_key),
        }
    }

    /// Derives a signing service deterministically from a secret and optional nonce.
    ///
    /// The private key is `SHA256(secret || nonce)`.
    pub fn from_secret(secret: &[u8], nonce: Option<&[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(secret);
        if let Some(nonce) = nonce {
            hasher.update(nonce);
        }

        let mut private_key = [0u8; 32];
        private_key.copy_from_slice(&hasher.finalize());
        Self::new(private_key)
    }

    /// The signature algorithm of this key.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ed25519
    }

    /// The public key bytes.
    pub fn public_key(&self) -> Vec<u8> {
        self.signing_key.verifying_key().to_bytes().to_vec()
    }

    /// Signs the imprint of a hash.
    pub fn sign(&self, hash: &DataHash) -> Signature {
        Signature(self.signing_key.sign(&hash.imprint()).to_bytes())
    }

    /// Verifies a signature made by this key.
    pub fn verify(&self, hash: &DataHash, signature: &Signature) -> bool {
        Self::verify_with_public_key(hash, signature, &self.public_key())
    }

    /// Verifies a signature over a hash imprint against raw public key bytes.
    ///
    /// Malformed keys verify as `false`.
    pub fn verify_with_public_key(hash: &DataHash, signature: &Signature, public_key: &[u8]) -> bool {
        let key_bytes: [u8; 32] = match public_key.try_into() {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        let verifying_key = match VerifyingKey::from_bytes(&key_bytes) {
            Ok(key) => key,
            Err(_) => return false,
        };

        let signature = ed25519_dalek::Signature::from_bytes(&signature.0);
        verifying_key.verify(&hash.imprint(), &signature).is_ok()
    }
}

impl fmt::Debug for SigningService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningService {{ public_key: {} }}", hex::encode(self.public_key()))
    }
}

/// Derives the universal minter key for a token.
///
/// Pure function of the token id. It authenticates nothing on its own; it
/// only makes the genesis commitment of every token recomputable by anyone.
pub fn deterministic_minter_key(token_id: &TokenId) -> SigningService {
    SigningService::from_secret(MINTER_SECRET, Some(token_id.as_bytes()))
}
