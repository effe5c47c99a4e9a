use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::models::EntityId;

#[derive(Deserialize)]
struct RawLot {
    id: EntityId,
}

/// Lot documents only contribute their id; the building data is joined from the cache.
pub fn parse_lot_id(doc: &Value) -> Result<EntityId, ParseError> {
    RawLot::deserialize(doc)
        .map(|raw| raw.id)
        .map_err(|e| ParseError::new("lot", e.to_string()))
}
