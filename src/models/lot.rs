use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BuildingSlot, Captured, EntityId};

/// A lot joined with whatever occupies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotRecord {
    pub lot_id: EntityId,

    /// `None` only when the building step failed and nothing was cached for this lot before
    pub building_data: Option<BuildingSlot>,

    #[serde(rename = "_timestamp", with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
}

impl Captured for LotRecord {
    fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
