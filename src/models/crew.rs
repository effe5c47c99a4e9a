use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Captured, EntityId};

/// Crew with its controller (delegate) and owner, enriched with display names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewRecord {
    pub crew_id: EntityId,

    /// Address the crew is delegated to (the controller)
    pub delegated_to_address: String,

    pub delegated_to_name: Option<String>,

    /// Owner address, picked by namespace preference
    pub owner_address: String,

    pub owner_name: Option<String>,

    #[serde(rename = "_timestamp", with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
}

/// Ids of the crews an address controls (as opposed to owns).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewIdSetRecord {
    pub crew_ids: BTreeSet<u64>,

    #[serde(rename = "_timestamp", with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
}

impl Captured for CrewRecord {
    fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

impl Captured for CrewIdSetRecord {
    fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
