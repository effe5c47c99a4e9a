//! Concurrent in-memory storage for entity records
//!
//! One map per (chain, entity type), each behind its own `RwLock`. Writes
//! are whole-record overwrites; concurrent writers race benignly and the
//! last write wins.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::freshness::is_fresh_at;
use crate::models::{
    Address, BuildingSlot, Captured, ChainId, ControlledBuildingsSnapshot, CrewIdSetRecord,
    CrewRecord, EntityId, LotRecord, ShipRecord,
};

/// One keyed map of records.
pub struct Partition<K, T> {
    entries: RwLock<HashMap<K, T>>,
}

impl<K, T> Default for Partition<K, T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, T: Clone + Captured> Partition<K, T> {
    pub fn get(&self, key: &K) -> Option<T> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    pub fn set(&self, key: K, record: T) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, record);
    }

    fn captured_at(&self, key: &K) -> Option<DateTime<Utc>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).map(Captured::captured_at)
    }

    fn split(&self, keys: &[K], window: Duration, now: DateTime<Utc>) -> (Vec<K>, Vec<K>) {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        keys.iter().cloned().partition(|key| {
            is_fresh_at(entries.get(key).map(Captured::captured_at), window, now)
        })
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// All partitions of a single chain.
#[derive(Default)]
pub struct ChainPartitions {
    crews: Partition<EntityId, CrewRecord>,
    lots: Partition<EntityId, LotRecord>,
    buildings: Partition<EntityId, BuildingSlot>,
    ships: Partition<EntityId, ShipRecord>,
    controlled_crews: Partition<Address, CrewIdSetRecord>,
    controlled_buildings: Partition<Address, ControlledBuildingsSnapshot>,
}

/// Record types stored per entity id.
pub trait CachedEntity: Captured + Clone + Send + Sync + 'static {
    /// Collection name, used in log lines
    const COLLECTION: &'static str;

    fn partition(chain: &ChainPartitions) -> &Partition<EntityId, Self>;
}

impl CachedEntity for CrewRecord {
    const COLLECTION: &'static str = "crews";

    fn partition(chain: &ChainPartitions) -> &Partition<EntityId, Self> {
        &chain.crews
    }
}

impl CachedEntity for LotRecord {
    const COLLECTION: &'static str = "lots";

    fn partition(chain: &ChainPartitions) -> &Partition<EntityId, Self> {
        &chain.lots
    }
}

/// Keyed by lot id, not building id.
impl CachedEntity for BuildingSlot {
    const COLLECTION: &'static str = "buildings";

    fn partition(chain: &ChainPartitions) -> &Partition<EntityId, Self> {
        &chain.buildings
    }
}

impl CachedEntity for ShipRecord {
    const COLLECTION: &'static str = "ships";

    fn partition(chain: &ChainPartitions) -> &Partition<EntityId, Self> {
        &chain.ships
    }
}

/// Requested ids split by freshness, each side in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreshnessSplit {
    pub fresh: Vec<EntityId>,
    pub stale: Vec<EntityId>,
}

/// Entry counts for one chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStats {
    pub chain: ChainId,
    pub crews: usize,
    pub lots: usize,
    pub buildings: usize,
    pub ships: usize,
    pub controlled_crews: usize,
    pub controlled_buildings: usize,
}

/// In-memory cache for every configured chain.
///
/// The chain set is fixed at construction. Reads against an unknown chain
/// come back empty and writes to it are dropped.
pub struct EntityCache {
    chains: HashMap<ChainId, ChainPartitions>,
}

impl EntityCache {
    pub fn new(chains: impl IntoIterator<Item = ChainId>) -> Self {
        Self {
            chains: chains
                .into_iter()
                .map(|chain| (chain, ChainPartitions::default()))
                .collect(),
        }
    }

    pub fn supports(&self, chain: &ChainId) -> bool {
        self.chains.contains_key(chain)
    }

    fn partitions(&self, chain: &ChainId) -> Option<&ChainPartitions> {
        let partitions = self.chains.get(chain);
        if partitions.is_none() {
            log::warn!("Cache access for unconfigured chain {}", chain);
        }
        partitions
    }

    pub fn get<T: CachedEntity>(&self, chain: &ChainId, id: EntityId) -> Option<T> {
        T::partition(self.partitions(chain)?).get(&id)
    }

    pub fn set<T: CachedEntity>(&self, chain: &ChainId, id: EntityId, record: T) {
        if let Some(partitions) = self.partitions(chain) {
            T::partition(partitions).set(id, record);
        }
    }

    /// Capture time of the cached record for `id`, if any.
    pub fn captured_at<T: CachedEntity>(
        &self,
        chain: &ChainId,
        id: EntityId,
    ) -> Option<DateTime<Utc>> {
        T::partition(self.partitions(chain)?).captured_at(&id)
    }

    /// Split `ids` into fresh and stale under `window`. Ids with no record are stale.
    pub fn partition_by_freshness<T: CachedEntity>(
        &self,
        chain: &ChainId,
        ids: &[EntityId],
        window: Duration,
    ) -> FreshnessSplit {
        self.partition_by_freshness_at::<T>(chain, ids, window, Utc::now())
    }

    pub fn partition_by_freshness_at<T: CachedEntity>(
        &self,
        chain: &ChainId,
        ids: &[EntityId],
        window: Duration,
        now: DateTime<Utc>,
    ) -> FreshnessSplit {
        let Some(partitions) = self.partitions(chain) else {
            return FreshnessSplit {
                fresh: Vec::new(),
                stale: ids.to_vec(),
            };
        };
        let (fresh, stale) = T::partition(partitions).split(ids, window, now);
        log::debug!(
            "{} on {}: {} fresh, {} stale",
            T::COLLECTION,
            chain,
            fresh.len(),
            stale.len()
        );
        FreshnessSplit { fresh, stale }
    }

    pub fn get_controlled_crews(
        &self,
        chain: &ChainId,
        address: &Address,
    ) -> Option<CrewIdSetRecord> {
        self.partitions(chain)?.controlled_crews.get(address)
    }

    pub fn set_controlled_crews(&self, chain: &ChainId, address: Address, record: CrewIdSetRecord) {
        if let Some(partitions) = self.partitions(chain) {
            partitions.controlled_crews.set(address, record);
        }
    }

    pub fn get_controlled_snapshot(
        &self,
        chain: &ChainId,
        address: &Address,
    ) -> Option<ControlledBuildingsSnapshot> {
        self.partitions(chain)?.controlled_buildings.get(address)
    }

    pub fn set_controlled_snapshot(
        &self,
        chain: &ChainId,
        address: Address,
        snapshot: ControlledBuildingsSnapshot,
    ) {
        if let Some(partitions) = self.partitions(chain) {
            partitions.controlled_buildings.set(address, snapshot);
        }
    }

    /// Per-chain entry counts, sorted by chain.
    pub fn stats(&self) -> Vec<ChainStats> {
        let mut stats: Vec<ChainStats> = self
            .chains
            .iter()
            .map(|(chain, p)| ChainStats {
                chain: chain.clone(),
                crews: p.crews.len(),
                lots: p.lots.len(),
                buildings: p.buildings.len(),
                ships: p.ships.len(),
                controlled_crews: p.controlled_crews.len(),
                controlled_buildings: p.controlled_buildings.len(),
            })
            .collect();
        stats.sort_by(|a, b| a.chain.cmp(&b.chain));
        stats
    }
}
