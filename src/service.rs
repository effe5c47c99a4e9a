//! Fetch-through entry points
//!
//! Every `get_*` call follows the same pattern: split the requested ids by
//! freshness, hand the stale ones to the [`DependencyResolver`], then read
//! every requested id back from the cache. Ids the upstream does not know
//! are absent from the returned map (lots and buildings always resolve).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::cache::{CachedEntity, ChainStats, EntityCache, FreshnessWindows, is_fresh};
use crate::client::{InfluenceClient, SearchApi};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{
    Address, BuildingSlot, ChainId, ControlledBuildingsSnapshot, CrewRecord, EntityId, LotRecord,
    ShipRecord, dedup_ids,
};
use crate::names::{NameDirectory, StaticNameDirectory};
use crate::resolver::DependencyResolver;

/// Read-through cache over the Influence search API.
pub struct FetchThroughService {
    resolver: DependencyResolver,
}

impl FetchThroughService {
    pub fn new(resolver: DependencyResolver) -> Self {
        Self { resolver }
    }

    /// Build the HTTP client, name directory and cache described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let api: Arc<dyn SearchApi> = Arc::new(InfluenceClient::new(config)?);
        let names: Arc<dyn NameDirectory> = match &config.names_file {
            Some(path) => Arc::new(StaticNameDirectory::load_from(path)?),
            None => Arc::new(StaticNameDirectory::new()),
        };
        let cache = Arc::new(EntityCache::new(config.chains.keys().cloned()));

        log::debug!(
            "Fetch-through cache ready for {} chains",
            config.chains.len()
        );
        Ok(Self::new(DependencyResolver::new(
            api,
            cache,
            names,
            config.freshness,
            config.max_page_size,
        )))
    }

    pub fn cache(&self) -> &Arc<EntityCache> {
        self.resolver.cache()
    }

    /// Per-chain cache entry counts.
    pub fn stats(&self) -> Vec<ChainStats> {
        self.cache().stats()
    }

    fn windows(&self) -> &FreshnessWindows {
        self.resolver.windows()
    }

    /// Reject unknown chains and collapse duplicate ids.
    fn prepare(&self, chain: &ChainId, ids: &[EntityId]) -> Result<Vec<EntityId>> {
        if !self.cache().supports(chain) {
            return Err(Error::UnknownChain(chain.to_string()));
        }
        Ok(dedup_ids(ids))
    }

    fn stale<T: CachedEntity>(
        &self,
        chain: &ChainId,
        ids: &[EntityId],
        window: Duration,
    ) -> Vec<EntityId> {
        self.cache()
            .partition_by_freshness::<T>(chain, ids, window)
            .stale
    }

    fn read_back<T: CachedEntity>(
        &self,
        chain: &ChainId,
        ids: &[EntityId],
    ) -> HashMap<EntityId, T> {
        ids.iter()
            .filter_map(|id| self.cache().get::<T>(chain, *id).map(|record| (*id, record)))
            .collect()
    }

    pub async fn get_crews(
        &self,
        chain: &ChainId,
        ids: &[EntityId],
    ) -> Result<HashMap<EntityId, CrewRecord>> {
        let ids = self.prepare(chain, ids)?;
        let stale = self.stale::<CrewRecord>(chain, &ids, self.windows().crews);
        if !stale.is_empty() {
            self.resolver.resolve_crews(chain, &stale).await?;
        }
        Ok(self.read_back(chain, &ids))
    }

    /// Lots with the building standing on each, or an empty-lot placeholder.
    pub async fn get_lots(
        &self,
        chain: &ChainId,
        ids: &[EntityId],
    ) -> Result<HashMap<EntityId, LotRecord>> {
        let ids = self.prepare(chain, ids)?;
        let stale = self.stale::<LotRecord>(chain, &ids, self.windows().lots);
        if !stale.is_empty() {
            self.resolver.resolve_lots(chain, &stale).await?;
        }
        Ok(self.read_back(chain, &ids))
    }

    /// Building slots keyed by lot id.
    pub async fn get_buildings(
        &self,
        chain: &ChainId,
        lot_ids: &[EntityId],
    ) -> Result<HashMap<EntityId, BuildingSlot>> {
        let ids = self.prepare(chain, lot_ids)?;
        let stale = self.stale::<BuildingSlot>(chain, &ids, self.windows().buildings);
        if !stale.is_empty() {
            self.resolver.resolve_buildings_for_lots(chain, &stale).await?;
        }
        Ok(self.read_back(chain, &ids))
    }

    pub async fn get_ships(
        &self,
        chain: &ChainId,
        ids: &[EntityId],
    ) -> Result<HashMap<EntityId, ShipRecord>> {
        let ids = self.prepare(chain, ids)?;
        let stale = self.stale::<ShipRecord>(chain, &ids, self.windows().ships);
        if !stale.is_empty() {
            self.resolver.resolve_ships(chain, &stale).await?;
        }
        Ok(self.read_back(chain, &ids))
    }

    /// Buildings controlled by `address` through the crews delegated to it.
    pub async fn get_controlled_buildings(
        &self,
        chain: &ChainId,
        address: &str,
    ) -> Result<ControlledBuildingsSnapshot> {
        if !self.cache().supports(chain) {
            return Err(Error::UnknownChain(chain.to_string()));
        }

        let key = Address::new(address);
        let cached = self.cache().get_controlled_snapshot(chain, &key);
        if let Some(snapshot) = cached {
            if is_fresh(Some(snapshot.captured_at), self.windows().controlled_buildings) {
                log::debug!("Controlled buildings for {} on {}: cache hit", key, chain);
                return Ok(snapshot);
            }
        }

        self.resolver.resolve_controlled_buildings(chain, address).await?;

        Ok(self
            .cache()
            .get_controlled_snapshot(chain, &key)
            .unwrap_or_else(|| ControlledBuildingsSnapshot {
                buildings: Vec::new(),
                captured_at: Utc::now(),
            }))
    }
}
