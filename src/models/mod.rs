//! Normalized entity records held by the cache
//!
//! Records are organized by entity type. Every record carries the moment it
//! was written to the cache, which the freshness policy compares against
//! the per-type window.

use chrono::{DateTime, Utc};

mod building;
mod crew;
mod ids;
mod lot;
mod ship;

pub use building::{
    BuildingRecord, BuildingSlot, ControlledBuildingsSnapshot, DryDock, EmptyLotRecord,
    OutputShip,
};
pub use crew::{CrewIdSetRecord, CrewRecord};
pub use ids::{Address, ChainId, EntityId, SN_MAIN, SN_SEPOLIA, dedup_ids};
pub use lot::LotRecord;
pub use ship::ShipRecord;

/// A record stamped with its cache-write time.
pub trait Captured {
    fn captured_at(&self) -> DateTime<Utc>;
}
