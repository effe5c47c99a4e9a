use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Captured, EntityId};

/// A real (non-empty) building standing on a lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingRecord {
    pub building_id: EntityId,

    /// Raw `Building` component (status, type, timings), passed through untouched
    pub building_details: Value,

    pub building_name: Option<String>,

    /// Name of the crew occupying the building
    pub crew_name: Option<String>,

    pub lot_id: EntityId,

    #[serde(default)]
    pub dry_docks: Vec<DryDock>,

    #[serde(default)]
    pub extractors: Vec<Value>,

    #[serde(default)]
    pub processors: Vec<Value>,

    pub is_empty_lot: bool,

    #[serde(rename = "_timestamp", with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
}

impl BuildingRecord {
    /// Ship currently being assembled in the first dry dock, if any.
    pub fn output_ship(&self) -> Option<&OutputShip> {
        self.dry_docks.first()?.output_ship.as_ref()
    }

    pub fn output_ship_mut(&mut self) -> Option<&mut OutputShip> {
        self.dry_docks.first_mut()?.output_ship.as_mut()
    }
}

/// Dry dock component. Opaque apart from the ship it is building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryDock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_ship: Option<OutputShip>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reference to a ship in a dry dock, enriched with the ship type after resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputShip {
    pub id: EntityId,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ship_type: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Placeholder for a lot with no building on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyLotRecord {
    pub lot_id: EntityId,

    pub is_empty_lot: bool,

    #[serde(rename = "_timestamp", with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
}

impl EmptyLotRecord {
    pub fn new(lot_id: EntityId, captured_at: DateTime<Utc>) -> Self {
        Self {
            lot_id,
            is_empty_lot: true,
            captured_at,
        }
    }
}

/// What occupies a lot: a real building or nothing.
///
/// The building partition of the cache is keyed by lot id and stores one
/// of these per lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildingSlot {
    Building(BuildingRecord),
    EmptyLot(EmptyLotRecord),
}

impl BuildingSlot {
    pub fn is_empty_lot(&self) -> bool {
        matches!(self, BuildingSlot::EmptyLot(_))
    }

    pub fn as_building(&self) -> Option<&BuildingRecord> {
        match self {
            BuildingSlot::Building(b) => Some(b),
            BuildingSlot::EmptyLot(_) => None,
        }
    }
}

impl Captured for BuildingSlot {
    fn captured_at(&self) -> DateTime<Utc> {
        match self {
            BuildingSlot::Building(b) => b.captured_at,
            BuildingSlot::EmptyLot(e) => e.captured_at,
        }
    }
}

/// All buildings controlled (through controlled crews) by one address at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlledBuildingsSnapshot {
    pub buildings: Vec<BuildingRecord>,

    #[serde(rename = "_timestamp", with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
}

impl Captured for ControlledBuildingsSnapshot {
    fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
