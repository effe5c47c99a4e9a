//! Raw search hits → normalized records
//!
//! Each entity type has a narrow serde schema for the parts of the upstream
//! document it needs. Parsers are pure: the capture timestamp is passed in
//! by the caller at cache-write time.

use serde_json::Value;

use crate::error::ParseError;

mod building;
mod crew;
mod lot;
mod ship;

pub use building::{building_lot_id, parse_building};
pub use crew::{OWNER_NAMESPACES, parse_crew, parse_crew_id};
pub use lot::parse_lot_id;
pub use ship::parse_ship;

/// Parse every hit with `parse`, logging and skipping the ones that fail.
pub fn parse_hits<T>(
    hits: &[Value],
    mut parse: impl FnMut(&Value) -> Result<T, ParseError>,
) -> Vec<T> {
    hits.iter()
        .filter_map(|hit| match parse(hit) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping hit: {}", e);
                None
            }
        })
        .collect()
}

/// Treat empty display strings as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
