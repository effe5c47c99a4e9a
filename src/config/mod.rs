//! Configuration management for the Influence cache

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::FreshnessWindows;
use crate::error::{ConfigError, Result};
use crate::models::{ChainId, SN_MAIN, SN_SEPOLIA};

/// Mainnet search API
pub const INFLUENCE_API_URL: &str = "https://api.influenceth.io";

/// Prerelease (Sepolia) search API
pub const INFLUENCE_API_URL_SEPOLIA: &str = "https://api-prerelease.influenceth.io";

/// Upper bound on hits the search API returns per query
pub const SEARCH_SIZE_MAX: usize = 1000;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Upstream deployments, keyed by chain tag
    #[serde(default = "default_chains")]
    pub chains: BTreeMap<ChainId, ChainConfig>,

    /// Freshness window per entity collection (seconds)
    #[serde(default)]
    pub freshness: FreshnessWindows,

    /// HTTP request timeout for search calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Page-size ceiling for open-ended queries (controlled crews/buildings)
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Requests per second per chain once the upstream has rate limited us
    #[serde(default = "default_rate_limit_per_second")]
    pub rate_limit_per_second: u32,

    /// YAML file mapping addresses to player display names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names_file: Option<PathBuf>,
}

/// Connection settings for one upstream deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub base_url: String,

    /// OAuth client id for the client-credentials grant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Pre-issued bearer token, used instead of the grant when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl ChainConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: None,
            client_secret: None,
            access_token: None,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.access_token.is_some() || (self.client_id.is_some() && self.client_secret.is_some())
    }
}

fn default_chains() -> BTreeMap<ChainId, ChainConfig> {
    BTreeMap::from([
        (ChainId::from(SN_MAIN), ChainConfig::new(INFLUENCE_API_URL)),
        (
            ChainId::from(SN_SEPOLIA),
            ChainConfig::new(INFLUENCE_API_URL_SEPOLIA),
        ),
    ])
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_page_size() -> usize {
    SEARCH_SIZE_MAX
}

fn default_rate_limit_per_second() -> u32 {
    6
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or(ConfigError::Invalid(
            "Could not determine config directory".to_string(),
        ))?;

        Ok(base.join("influence-cache").join("config.yaml"))
    }

    /// Load configuration from the default path, then apply credential
    /// overrides from the environment
    pub fn load() -> Result<Self> {
        Self::load_with(&Self::default_path()?, |key| std::env::var(key).ok())
    }

    fn load_with(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides_from(lookup);
        Ok(config)
    }

    /// Load configuration from a specific path. Environment overrides are
    /// not applied.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        // Credentials live in this file
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Fill in credentials from `INFLUENCE_<CHAIN>_CLIENT_ID`,
    /// `INFLUENCE_<CHAIN>_CLIENT_SECRET` and `INFLUENCE_<CHAIN>_ACCESS_TOKEN`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (chain, settings) in self.chains.iter_mut() {
            let prefix = format!("INFLUENCE_{}", chain.as_str().to_uppercase());
            if let Some(id) = lookup(&format!("{}_CLIENT_ID", prefix)) {
                settings.client_id = Some(id);
            }
            if let Some(secret) = lookup(&format!("{}_CLIENT_SECRET", prefix)) {
                settings.client_secret = Some(secret);
            }
            if let Some(token) = lookup(&format!("{}_ACCESS_TOKEN", prefix)) {
                settings.access_token = Some(token);
            }
        }
    }

    /// Validate that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.chains.is_empty() {
            return Err(ConfigError::Invalid("no chains configured".to_string()).into());
        }
        for (chain, settings) in &self.chains {
            if !settings.base_url.starts_with("http://")
                && !settings.base_url.starts_with("https://")
            {
                return Err(ConfigError::Invalid(format!(
                    "chain {} has invalid base_url {:?}",
                    chain, settings.base_url
                ))
                .into());
            }
        }
        if self.max_page_size == 0 || self.max_page_size > SEARCH_SIZE_MAX {
            return Err(ConfigError::Invalid(format!(
                "max_page_size must be between 1 and {}",
                SEARCH_SIZE_MAX
            ))
            .into());
        }
        if self.request_timeout_secs == 0 {
            return Err(
                ConfigError::Invalid("request_timeout_secs must be positive".to_string()).into(),
            );
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn chain(&self, chain: &ChainId) -> Option<&ChainConfig> {
        self.chains.get(chain)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            freshness: FreshnessWindows::default(),
            request_timeout_secs: default_request_timeout_secs(),
            max_page_size: default_max_page_size(),
            rate_limit_per_second: default_rate_limit_per_second(),
            names_file: None,
        }
    }
}
