use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Captured, EntityId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipRecord {
    pub ship_id: EntityId,

    /// Upstream ship type code
    pub ship_type: u32,

    #[serde(rename = "_timestamp", with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
}

impl Captured for ShipRecord {
    fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
