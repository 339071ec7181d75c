//! Identifier and value types for tokens.

use crate::errors::CoreError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wraps 32 raw bytes.
            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Copies an identifier out of a slice.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
                let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
                    CoreError::InvalidFormat(format!(
                        "{} must be 32 bytes, got {}",
                        stringify!($name),
                        bytes.len()
                    ))
                })?;
                Ok(Self(bytes))
            }

            /// Parses a hex-encoded identifier.
            pub fn from_hex(value: &str) -> Result<Self, CoreError> {
                Self::from_slice(&hex::decode(value)?)
            }

            /// The raw identifier bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Hex encoding of the identifier.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let value = String::deserialize(deserializer)?;
                $name::from_hex(&value).map_err(serde::de::Error::custom)
            }
        }
    };
}

id_type!(
    /// Token identifier, chosen at mint time and never recomputed.
    TokenId
);

id_type!(
    /// Token type identifier.
    TokenType
);

id_type!(
    /// Identifier of a fungible coin carried by a token.
    CoinId
);

/// Coin balances carried by a token, keyed and encoded in coin id order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenCoinData {
    coins: BTreeMap<CoinId, u128>,
}

impl TokenCoinData {
    /// Creates coin data from (coin id, amount) pairs.
    ///
    /// Duplicate coin ids are rejected rather than merged.
    pub fn new(coins: impl IntoIterator<Item = (CoinId, u128)>) -> Result<Self, CoreError> {
        let mut map = BTreeMap::new();
        for (coin_id, amount) in coins {
            if map.insert(coin_id, amount).is_some() {
                return Err(CoreError::InvalidFormat(format!(
                    "duplicate coin id {}",
                    coin_id
                )));
            }
        }
        Ok(Self { coins: map })
    }

    /// Amount of a given coin, if present.
    pub fn get(&self, coin_id: &CoinId) -> Option<u128> {
        self.coins.get(coin_id).copied()
    }

    /// Iterates coins in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&CoinId, &u128)> {
        self.coins.iter()
    }

    /// Number of distinct coins.
    pub fn len(&self) -> usize {
        self.coins.len()
    }

    /// Whether no coins are carried.
    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    /// Canonical form used when hashing: key-sorted map of raw ids to amounts.
    pub fn to_canonical(&self) -> BTreeMap<[u8; 32], u128> {
        self.coins
            .iter()
            .map(|(coin_id, amount)| (*coin_id.as_bytes(), *amount))
            .collect()
    }
}

// Serialized as [[coinId_hex, amount_string], ...]
impl Serialize for TokenCoinData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<(String, String)> = self
            .coins
            .iter()
            .map(|(coin_id, amount)| (coin_id.to_hex(), amount.to_string()))
            .collect();
        entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TokenCoinData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<(String, String)>::deserialize(deserializer)?;
        let mut coins = Vec::with_capacity(entries.len());
        for (coin_id, amount) in entries {
            let coin_id = CoinId::from_hex(&coin_id).map_err(serde::de::Error::custom)?;
            let amount = amount
                .parse::<u128>()
                .map_err(|e| serde::de::Error::custom(format!("invalid coin amount: {}", e)))?;
            coins.push((coin_id, amount));
        }
        TokenCoinData::new(coins).map_err(serde::de::Error::custom)
    }
}
