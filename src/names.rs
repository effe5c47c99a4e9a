//! Address → player display name lookup

use std::collections::HashMap;
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::models::Address;

/// Read-only directory of display names for wallet addresses.
pub trait NameDirectory: Send + Sync {
    fn lookup(&self, address: &Address) -> Option<String>;
}

/// Directory backed by an in-memory table.
///
/// Keys are lowercased on insert, so the table may be written with
/// checksummed (mixed-case) addresses.
#[derive(Debug, Clone, Default)]
pub struct StaticNameDirectory {
    names: HashMap<Address, String>,
}

impl StaticNameDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<A, N>(pairs: impl IntoIterator<Item = (A, N)>) -> Self
    where
        A: AsRef<str>,
        N: Into<String>,
    {
        Self {
            names: pairs
                .into_iter()
                .map(|(address, name)| (Address::new(address), name.into()))
                .collect(),
        }
    }

    /// Load a YAML mapping of `address: name`.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        let table: HashMap<String, String> =
            serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        log::debug!("Loaded {} player names from {}", table.len(), path.display());
        Ok(Self::from_pairs(table))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl NameDirectory for StaticNameDirectory {
    fn lookup(&self, address: &Address) -> Option<String> {
        self.names.get(address).cloned()
    }
}
