//! In-memory entity cache and freshness policy
//!
//! Records are partitioned by chain, entity type and id. Nothing is ever
//! evicted; entries are judged stale by their per-type freshness window
//! and superseded by the next write.

pub mod freshness;
pub mod store;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use freshness::{is_fresh, is_fresh_at};
pub use store::{CachedEntity, ChainStats, EntityCache, FreshnessSplit};

/// Freshness window per entity collection.
///
/// Defaults mirror how often each kind of game state changes; every value
/// can be overridden from configuration (in seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessWindows {
    #[serde(with = "duration_secs")]
    pub crews: Duration,

    /// Crew id sets controlled by an address
    #[serde(with = "duration_secs")]
    pub controlled_crews: Duration,

    #[serde(with = "duration_secs")]
    pub lots: Duration,

    /// Building-or-empty-lot state per lot
    #[serde(with = "duration_secs")]
    pub buildings: Duration,

    #[serde(with = "duration_secs")]
    pub controlled_buildings: Duration,

    #[serde(with = "duration_secs")]
    pub ships: Duration,
}

impl FreshnessWindows {
    // Crew delegation and ownership change rarely
    pub const CREWS: Duration = Duration::from_secs(60 * 60); // 1 hr
    pub const CONTROLLED_CREWS: Duration = Duration::from_secs(60 * 60); // 1 hr

    // Construction on lots is the most volatile state
    pub const LOTS: Duration = Duration::from_secs(60); // 1 min
    pub const BUILDINGS: Duration = Duration::from_secs(60); // 1 min

    pub const CONTROLLED_BUILDINGS: Duration = Duration::from_secs(60 * 60); // 1 hr
    pub const SHIPS: Duration = Duration::from_secs(60 * 60); // 1 hr

    /// Same window for every collection.
    pub fn uniform(window: Duration) -> Self {
        Self {
            crews: window,
            controlled_crews: window,
            lots: window,
            buildings: window,
            controlled_buildings: window,
            ships: window,
        }
    }
}

impl Default for FreshnessWindows {
    fn default() -> Self {
        Self {
            crews: Self::CREWS,
            controlled_crews: Self::CONTROLLED_CREWS,
            lots: Self::LOTS,
            buildings: Self::BUILDINGS,
            controlled_buildings: Self::CONTROLLED_BUILDINGS,
            ships: Self::SHIPS,
        }
    }
}

/// Serialize a `Duration` as whole seconds.
pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
