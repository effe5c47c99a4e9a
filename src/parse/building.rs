use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::non_empty;
use crate::error::ParseError;
use crate::models::{BuildingRecord, DryDock, EntityId};

#[derive(Deserialize)]
struct RawBuilding {
    id: EntityId,
    #[serde(rename = "Building", default)]
    building: Value,
    #[serde(rename = "Name", default)]
    name: Option<NameComponent>,
    #[serde(default)]
    meta: Option<Meta>,
    #[serde(rename = "Location")]
    location: LocationComponent,
    #[serde(rename = "DryDocks", default)]
    dry_docks: Option<Vec<DryDock>>,
    #[serde(rename = "Extractors", default)]
    extractors: Option<Vec<Value>>,
    #[serde(rename = "Processors", default)]
    processors: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct NameComponent {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct Meta {
    #[serde(default)]
    crew: Option<NameComponent>,
}

#[derive(Deserialize)]
struct LocationComponent {
    location: EntityRef,
}

#[derive(Deserialize)]
struct EntityRef {
    id: EntityId,
}

/// Parse a building document. Ship types in dry docks are left unresolved.
pub fn parse_building(
    doc: &Value,
    captured_at: DateTime<Utc>,
) -> Result<BuildingRecord, ParseError> {
    let raw =
        RawBuilding::deserialize(doc).map_err(|e| ParseError::new("building", e.to_string()))?;

    Ok(BuildingRecord {
        building_id: raw.id,
        building_details: raw.building,
        building_name: non_empty(raw.name.and_then(|n| n.name)),
        crew_name: non_empty(raw.meta.and_then(|m| m.crew).and_then(|c| c.name)),
        lot_id: raw.location.location.id,
        dry_docks: raw.dry_docks.unwrap_or_default(),
        extractors: raw.extractors.unwrap_or_default(),
        processors: raw.processors.unwrap_or_default(),
        is_empty_lot: false,
        captured_at,
    })
}

/// Best-effort lot id of a building document, even one that fails to parse.
pub fn building_lot_id(doc: &Value) -> Option<EntityId> {
    let id = doc.get("Location")?.get("location")?.get("id")?;
    EntityId::deserialize(id).ok()
}
