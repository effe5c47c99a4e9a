use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::models::{EntityId, ShipRecord};

#[derive(Deserialize)]
struct RawShip {
    id: EntityId,
    #[serde(rename = "Ship")]
    ship: ShipComponent,
}

#[derive(Deserialize)]
struct ShipComponent {
    #[serde(rename = "shipType")]
    ship_type: u32,
}

pub fn parse_ship(doc: &Value, captured_at: DateTime<Utc>) -> Result<ShipRecord, ParseError> {
    let raw = RawShip::deserialize(doc).map_err(|e| ParseError::new("ship", e.to_string()))?;

    Ok(ShipRecord {
        ship_id: raw.id,
        ship_type: raw.ship.ship_type,
        captured_at,
    })
}
