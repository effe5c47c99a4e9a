//! Canonical key types: entity ids, addresses and chain tags

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Chain tag for the Starknet mainnet deployment
pub const SN_MAIN: &str = "SN_MAIN";

/// Chain tag for the Starknet Sepolia (prerelease) deployment
pub const SN_SEPOLIA: &str = "SN_SEPOLIA";

/// Identifier of an entity in the upstream index.
///
/// Always held in canonical numeric form, so `10`, `"10"` and `"010"`
/// are the same key. Serializes as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Parse a caller-supplied id, tolerating surrounding whitespace and leading zeros.
    pub fn parse(raw: &str) -> Result<Self> {
        raw.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| Error::InvalidId(raw.to_string()))
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntityIdVisitor;

        impl Visitor<'_> for EntityIdVisitor {
            type Value = EntityId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or numeric string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<EntityId, E> {
                Ok(EntityId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<EntityId, E> {
                u64::try_from(v)
                    .map(EntityId)
                    .map_err(|_| E::custom(format!("negative id {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<EntityId, E> {
                EntityId::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(EntityIdVisitor)
    }
}

/// Wallet address, lowercased on construction so it can be used as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Address::new)
    }
}

/// Opaque tag selecting an upstream deployment. Data under different
/// chains is unrelated, even for equal ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChainId {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize and de-duplicate a batch of ids, keeping first-seen order.
pub fn dedup_ids(ids: &[EntityId]) -> Vec<EntityId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
