//! Recipient addresses.
//!
//! The string form is `SCHEME://hex(data)hex(checksum)` where the checksum is
//! the first four bytes of `SHA256(data)`.

use crate::errors::CoreError;
use crate::hash::DataHash;
use crate::types::TokenId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const CHECKSUM_LEN: usize = 4;
const SCHEME_SEPARATOR: &str = "://";

/// Address schemes, named by the prefix of the string form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressScheme {
    /// `DIRECT`: a predicate reference
    Direct,
    /// `POINTER`: a hash of a predicate reference
    Pointer,
    /// `ONE_TIME`: a one-time predicate reference, usable once
    OneTime,
    /// `NAMETAG`: a name-tag token id, resolved through the tag's state data
    NameTag,
    /// `PK`: a bare public key
    PublicKey,
}

impl AddressScheme {
    /// The scheme prefix of the string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressScheme::Direct => "DIRECT",
            AddressScheme::Pointer => "POINTER",
            AddressScheme::OneTime => "ONE_TIME",
            AddressScheme::NameTag => "NAMETAG",
            AddressScheme::PublicKey => "PK",
        }
    }
}

impl fmt::Display for AddressScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AddressScheme {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DIRECT" => Ok(AddressScheme::Direct),
            "POINTER" => Ok(AddressScheme::Pointer),
            "ONE_TIME" => Ok(AddressScheme::OneTime),
            "NAMETAG" => Ok(AddressScheme::NameTag),
            "PK" => Ok(AddressScheme::PublicKey),
            other => Err(CoreError::InvalidAddress(format!("unknown scheme {}", other))),
        }
    }
}

/// A recipient address.
///
/// Two addresses are equal when scheme and data are equal; the checksum is
/// derived and never stored.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    /// A predicate reference
    Direct(DataHash),
    /// `SHA256(reference.imprint)`, hiding the reference until it is spent to
    Pointer(DataHash),
    /// The reference of a one-time address predicate
    OneTime(DataHash),
    /// A name-tag token whose state names the real recipient
    NameTag(TokenId),
    /// An owner public key
    PublicKey(Vec<u8>),
}

impl Address {
    /// Direct address of a predicate reference.
    pub fn direct(reference: &DataHash) -> Self {
        Address::Direct(reference.clone())
    }

    /// Pointer address of a predicate reference.
    pub fn pointer(reference: &DataHash) -> Self {
        Address::Pointer(DataHash::sha256(&reference.imprint()))
    }

    pub fn scheme(&self) -> AddressScheme {
        match self {
            Address::Direct(_) => AddressScheme::Direct,
            Address::Pointer(_) => AddressScheme::Pointer,
            Address::OneTime(_) => AddressScheme::OneTime,
            Address::NameTag(_) => AddressScheme::NameTag,
            Address::PublicKey(_) => AddressScheme::PublicKey,
        }
    }

    /// The address payload.
    pub fn data(&self) -> Vec<u8> {
        match self {
            Address::Direct(hash) | Address::Pointer(hash) | Address::OneTime(hash) => hash.imprint(),
            Address::NameTag(token_id) => token_id.as_bytes().to_vec(),
            Address::PublicKey(public_key) => public_key.clone(),
        }
    }

    fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
        let hash = DataHash::sha256(data);
        let mut checksum = [0u8; CHECKSUM_LEN];
        checksum.copy_from_slice(&hash.data()[..CHECKSUM_LEN]);
        checksum
    }

    fn from_parts(scheme: AddressScheme, data: &[u8]) -> Result<Self, CoreError> {
        match scheme {
            AddressScheme::Direct => Ok(Address::Direct(DataHash::from_imprint(data)?)),
            AddressScheme::Pointer => Ok(Address::Pointer(DataHash::from_imprint(data)?)),
            AddressScheme::OneTime => Ok(Address::OneTime(DataHash::from_imprint(data)?)),
            AddressScheme::NameTag => Ok(Address::NameTag(TokenId::from_slice(data)?)),
            AddressScheme::PublicKey => {
                if data.len() != 32 {
                    return Err(CoreError::InvalidAddress(format!(
                        "public key address must carry 32 bytes, got {}",
                        data.len()
                    )));
                }
                Ok(Address::PublicKey(data.to_vec()))
            }
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data();
        write!(
            f,
            "{}{}{}{}",
            self.scheme(),
            SCHEME_SEPARATOR,
            hex::encode(&data),
            hex::encode(Self::checksum(&data))
        )
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, payload) = s
            .split_once(SCHEME_SEPARATOR)
            .ok_or_else(|| CoreError::InvalidAddress(format!("missing scheme in {}", s)))?;
        let scheme = AddressScheme::from_str(scheme)?;

        let bytes = hex::decode(payload)
            .map_err(|e| CoreError::InvalidAddress(format!("invalid hex payload: {}", e)))?;
        if bytes.len() <= CHECKSUM_LEN {
            return Err(CoreError::InvalidAddress("payload too short".to_string()));
        }

        let (data, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if checksum != Self::checksum(data) {
            return Err(CoreError::InvalidChecksum(s.to_string()));
        }

        Self::from_parts(scheme, data)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Address::from_str(&value).map_err(serde::de::Error::custom)
    }
}
