use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::models::{Address, CrewRecord, EntityId};
use crate::names::NameDirectory;

/// Owner address namespaces in order of preference.
///
/// Crews bridged from L1 report their Ethereum owner first; the Starknet
/// owner is only used when no Ethereum owner is set.
pub const OWNER_NAMESPACES: [&str; 2] = ["ethereum", "starknet"];

#[derive(Deserialize)]
struct RawCrew {
    id: EntityId,
    #[serde(rename = "Crew")]
    crew: CrewComponent,
    #[serde(rename = "Nft")]
    nft: NftComponent,
}

#[derive(Deserialize)]
struct CrewComponent {
    #[serde(rename = "delegatedTo")]
    delegated_to: String,
}

#[derive(Deserialize)]
struct NftComponent {
    #[serde(default)]
    owners: HashMap<String, Option<String>>,
}

#[derive(Deserialize)]
struct RawCrewId {
    id: EntityId,
}

fn owner_address(owners: &HashMap<String, Option<String>>) -> Option<String> {
    OWNER_NAMESPACES.iter().find_map(|namespace| {
        owners
            .get(*namespace)
            .and_then(|owner| owner.as_ref())
            .filter(|owner| !owner.trim().is_empty())
            .cloned()
    })
}

/// Parse a crew document, resolving the owner and both display names.
pub fn parse_crew(
    doc: &Value,
    names: &dyn NameDirectory,
    captured_at: DateTime<Utc>,
) -> Result<CrewRecord, ParseError> {
    let raw = RawCrew::deserialize(doc).map_err(|e| ParseError::new("crew", e.to_string()))?;

    let owner_address = owner_address(&raw.nft.owners)
        .ok_or_else(|| ParseError::new("crew", format!("crew {} has no owner", raw.id)))?;

    Ok(CrewRecord {
        crew_id: raw.id,
        delegated_to_name: names.lookup(&Address::new(&raw.crew.delegated_to)),
        delegated_to_address: raw.crew.delegated_to,
        owner_name: names.lookup(&Address::new(&owner_address)),
        owner_address,
        captured_at,
    })
}

/// Extract just the crew id, for controlled-crew queries.
pub fn parse_crew_id(doc: &Value) -> Result<u64, ParseError> {
    RawCrewId::deserialize(doc)
        .map(|raw| raw.id.value())
        .map_err(|e| ParseError::new("crew", e.to_string()))
}
