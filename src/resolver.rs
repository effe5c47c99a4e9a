//! Dependency resolution between entity types
//!
//! Fetching one entity type can require fetching another first:
//!
//! - lots embed the building on the lot, so buildings are resolved before
//!   the lot records are assembled
//! - buildings with a dry dock carry the type of the ship they output,
//!   taken from the ship collection
//! - controlled buildings are found through the crews an address controls
//!
//! The resolver writes everything it fetches into the [`EntityCache`]; the
//! service reads the results back from there.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cache::{EntityCache, FreshnessWindows, is_fresh};
use crate::client::{SearchApi, SearchIndex, SearchQuery};
use crate::error::Result;
use crate::models::{
    Address, BuildingRecord, BuildingSlot, ChainId, ControlledBuildingsSnapshot, CrewIdSetRecord,
    EmptyLotRecord, EntityId, LotRecord, ShipRecord, dedup_ids,
};
use crate::names::NameDirectory;
use crate::parse::{
    building_lot_id, parse_building, parse_crew, parse_crew_id, parse_hits, parse_lot_id,
    parse_ship,
};

/// `Building.status` of a building that has not been planned yet.
const STATUS_UNPLANNED: u64 = 0;

/// `Control.controller.label` for crew controllers.
const CONTROLLER_LABEL_CREW: u64 = 1;

fn id_values(ids: &[EntityId]) -> impl Iterator<Item = u64> + '_ {
    ids.iter().map(|id| id.value())
}

/// Fetches entities from the search API and writes them into the cache,
/// resolving the entities they depend on along the way.
pub struct DependencyResolver {
    api: Arc<dyn SearchApi>,
    cache: Arc<EntityCache>,
    names: Arc<dyn NameDirectory>,
    windows: FreshnessWindows,
    page_size: usize,
}

impl DependencyResolver {
    pub fn new(
        api: Arc<dyn SearchApi>,
        cache: Arc<EntityCache>,
        names: Arc<dyn NameDirectory>,
        windows: FreshnessWindows,
        page_size: usize,
    ) -> Self {
        Self {
            api,
            cache,
            names,
            windows,
            page_size,
        }
    }

    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.cache
    }

    pub fn windows(&self) -> &FreshnessWindows {
        &self.windows
    }

    /// Fetch and cache crews by id.
    pub async fn resolve_crews(&self, chain: &ChainId, ids: &[EntityId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let query = SearchQuery::new().filter_terms("id", id_values(ids));
        let hits = self.api.search(chain, SearchIndex::Crew, &query, ids.len()).await?;

        let captured_at = Utc::now();
        let crews = parse_hits(&hits, |doc| parse_crew(doc, self.names.as_ref(), captured_at));
        log::debug!("Fetched {}/{} crews on {}", crews.len(), ids.len(), chain);

        for crew in crews {
            self.cache.set(chain, crew.crew_id, crew);
        }
        Ok(())
    }

    /// Fetch and cache ships by id.
    pub async fn resolve_ships(&self, chain: &ChainId, ids: &[EntityId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let query = SearchQuery::new().filter_terms("id", id_values(ids));
        let hits = self.api.search(chain, SearchIndex::Ship, &query, ids.len()).await?;

        let captured_at = Utc::now();
        let ships = parse_hits(&hits, |doc| parse_ship(doc, captured_at));
        log::debug!("Fetched {}/{} ships on {}", ships.len(), ids.len(), chain);

        for ship in ships {
            self.cache.set(chain, ship.ship_id, ship);
        }
        Ok(())
    }

    /// Fetch and cache the buildings standing on `lot_ids`.
    ///
    /// Every requested lot ends up with a building slot in the cache: the
    /// building found on it, or an empty-lot placeholder when the search
    /// returned nothing for it.
    pub async fn resolve_buildings_for_lots(
        &self,
        chain: &ChainId,
        lot_ids: &[EntityId],
    ) -> Result<()> {
        if lot_ids.is_empty() {
            return Ok(());
        }

        let query = SearchQuery::new()
            .must_not_term("Building.status", STATUS_UNPLANNED)
            .filter_terms("Location.location.id", id_values(lot_ids));
        let hits = self
            .api
            .search(chain, SearchIndex::Building, &query, lot_ids.len())
            .await?;

        let captured_at = Utc::now();
        let (mut buildings, mut occupied) = split_building_hits(&hits, captured_at);
        self.enrich_ship_types(chain, &mut buildings).await;

        for building in buildings {
            occupied.insert(building.lot_id);
            self.cache.set(chain, building.lot_id, BuildingSlot::Building(building));
        }

        let mut empty = 0;
        for lot_id in lot_ids.iter().filter(|id| !occupied.contains(*id)) {
            self.cache.set(
                chain,
                *lot_id,
                BuildingSlot::EmptyLot(EmptyLotRecord::new(*lot_id, captured_at)),
            );
            empty += 1;
        }

        log::debug!(
            "Resolved buildings for {} lots on {} ({} empty)",
            lot_ids.len(),
            chain,
            empty
        );
        Ok(())
    }

    /// Fill in the output ship type of every building with a dry dock.
    ///
    /// Stale or missing ships are fetched first. A failed ship fetch is
    /// logged; buildings whose ship is not cached keep an unset type.
    pub async fn enrich_ship_types(&self, chain: &ChainId, buildings: &mut [BuildingRecord]) {
        let referenced: Vec<EntityId> = buildings
            .iter()
            .filter_map(|building| building.output_ship().map(|ship| ship.id))
            .collect();
        let ship_ids = dedup_ids(&referenced);
        if ship_ids.is_empty() {
            return;
        }

        let split = self
            .cache
            .partition_by_freshness::<ShipRecord>(chain, &ship_ids, self.windows.ships);
        if let Err(e) = self.resolve_ships(chain, &split.stale).await {
            log::warn!(
                "Ship lookup for {} dry docks on {} failed, types left unresolved: {}",
                split.stale.len(),
                chain,
                e
            );
        }

        for building in buildings.iter_mut() {
            let Some(output) = building.output_ship_mut() else {
                continue;
            };
            if let Some(ship) = self.cache.get::<ShipRecord>(chain, output.id) {
                output.ship_type = Some(ship.ship_type);
            }
        }
    }

    /// Fetch and cache lots, joined with the buildings standing on them.
    ///
    /// The building step and the lot query run concurrently. A failed
    /// building step is logged; a failed lot query is returned.
    pub async fn resolve_lots(&self, chain: &ChainId, lot_ids: &[EntityId]) -> Result<()> {
        if lot_ids.is_empty() {
            return Ok(());
        }

        let query = SearchQuery::new().filter_terms("id", id_values(lot_ids));
        let (buildings, hits) = tokio::join!(
            self.resolve_buildings_for_lots(chain, lot_ids),
            self.api.search(chain, SearchIndex::Lot, &query, lot_ids.len()),
        );
        if let Err(e) = buildings {
            log::warn!("Building lookup for {} lots on {} failed: {}", lot_ids.len(), chain, e);
        }
        let hits = hits?;

        let captured_at = Utc::now();
        let found: HashSet<EntityId> = parse_hits(&hits, parse_lot_id).into_iter().collect();

        for lot_id in lot_ids {
            let building_data = match self.cache.get::<BuildingSlot>(chain, *lot_id) {
                Some(slot) => Some(slot),
                None if !found.contains(lot_id) => {
                    Some(BuildingSlot::EmptyLot(EmptyLotRecord::new(*lot_id, captured_at)))
                }
                None => None,
            };
            self.cache.set(
                chain,
                *lot_id,
                LotRecord {
                    lot_id: *lot_id,
                    building_data,
                    captured_at,
                },
            );
        }

        log::debug!("Fetched {}/{} lots on {}", found.len(), lot_ids.len(), chain);
        Ok(())
    }

    /// Fetch and cache the buildings controlled by `address` through its crews.
    ///
    /// The crew search and the cache both use the lowercased address. When
    /// the crew search fails and a stale crew set is used instead, the
    /// snapshot keeps the stale set's capture time.
    pub async fn resolve_controlled_buildings(
        &self,
        chain: &ChainId,
        address: &str,
    ) -> Result<()> {
        let key = Address::new(address);
        let crews = self.controlled_crew_ids(chain, &key).await?;
        let crew_ids = crews.crew_ids;

        if crew_ids.is_empty() {
            log::debug!("{} controls no crews on {}", key, chain);
            self.cache.set_controlled_snapshot(
                chain,
                key,
                ControlledBuildingsSnapshot {
                    buildings: Vec::new(),
                    captured_at: crews.stale_since.unwrap_or_else(Utc::now),
                },
            );
            return Ok(());
        }

        let query = SearchQuery::new()
            .must_not_term("Building.status", STATUS_UNPLANNED)
            .must_term("Control.controller.label", CONTROLLER_LABEL_CREW)
            .filter_terms("Control.controller.id", crew_ids.iter().copied());
        let hits = self
            .api
            .search(chain, SearchIndex::Building, &query, self.page_size)
            .await?;

        let captured_at = Utc::now();
        let (mut buildings, _) = split_building_hits(&hits, captured_at);
        self.enrich_ship_types(chain, &mut buildings).await;

        for building in &buildings {
            self.cache
                .set(chain, building.lot_id, BuildingSlot::Building(building.clone()));
        }

        log::debug!(
            "{} controls {} buildings through {} crews on {}",
            key,
            buildings.len(),
            crew_ids.len(),
            chain
        );
        self.cache.set_controlled_snapshot(
            chain,
            key,
            ControlledBuildingsSnapshot {
                buildings,
                captured_at: crews.stale_since.map_or(captured_at, |t| t.min(captured_at)),
            },
        );
        Ok(())
    }

    /// Ids of the crews delegated to `address`, from cache when fresh.
    ///
    /// A failed crew search falls back to a stale cached set if there is one.
    async fn controlled_crew_ids(
        &self,
        chain: &ChainId,
        address: &Address,
    ) -> Result<ControlledCrews> {
        let cached = self.cache.get_controlled_crews(chain, address);
        if let Some(record) = &cached {
            if is_fresh(Some(record.captured_at), self.windows.controlled_crews) {
                log::debug!("Controlled crews for {} on {}: cache hit", address, chain);
                return Ok(ControlledCrews {
                    crew_ids: record.crew_ids.clone(),
                    stale_since: None,
                });
            }
        }

        let query = SearchQuery::new().filter_term("Crew.delegatedTo", address.as_str());
        match self
            .api
            .search(chain, SearchIndex::Crew, &query, self.page_size)
            .await
        {
            Ok(hits) => {
                let crew_ids: BTreeSet<u64> =
                    parse_hits(&hits, parse_crew_id).into_iter().collect();
                self.cache.set_controlled_crews(
                    chain,
                    address.clone(),
                    CrewIdSetRecord {
                        crew_ids: crew_ids.clone(),
                        captured_at: Utc::now(),
                    },
                );
                Ok(ControlledCrews {
                    crew_ids,
                    stale_since: None,
                })
            }
            Err(e) => match cached {
                Some(record) => {
                    log::warn!(
                        "Controlled crew lookup for {} on {} failed, using stale set: {}",
                        address,
                        chain,
                        e
                    );
                    Ok(ControlledCrews {
                        crew_ids: record.crew_ids,
                        stale_since: Some(record.captured_at),
                    })
                }
                None => Err(e),
            },
        }
    }
}

/// Crew ids controlled by an address. `stale_since` is set when the ids
/// come from an expired cache entry because the crew search failed.
struct ControlledCrews {
    crew_ids: BTreeSet<u64>,
    stale_since: Option<DateTime<Utc>>,
}

/// Parse building hits. Returns the parsed buildings and the lots of hits
/// that failed to parse but still name a lot; those lots are occupied and
/// must not be marked empty.
fn split_building_hits(
    hits: &[Value],
    captured_at: DateTime<Utc>,
) -> (Vec<BuildingRecord>, HashSet<EntityId>) {
    let mut buildings = Vec::with_capacity(hits.len());
    let mut unparsed_lots = HashSet::new();

    for hit in hits {
        match parse_building(hit, captured_at) {
            Ok(building) => buildings.push(building),
            Err(e) => {
                log::warn!("Skipping hit: {}", e);
                if let Some(lot_id) = building_lot_id(hit) {
                    unparsed_lots.insert(lot_id);
                }
            }
        }
    }

    (buildings, unparsed_lots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Clause, MockSearchClient};
    use crate::error::{Error, UpstreamError};
    use crate::models::{CrewRecord, SN_MAIN, SN_SEPOLIA};
    use crate::names::StaticNameDirectory;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

    fn chain() -> ChainId {
        ChainId::from(SN_MAIN)
    }

    fn resolver(mock: Arc<MockSearchClient>) -> DependencyResolver {
        let cache = Arc::new(EntityCache::new([ChainId::from(SN_MAIN), ChainId::from(SN_SEPOLIA)]));
        let names = StaticNameDirectory::from_pairs([("0xabc", "Alice")]);
        DependencyResolver::new(mock, cache, Arc::new(names), FreshnessWindows::default(), 1000)
    }

    fn building_doc(id: u64, lot: u64) -> Value {
        json!({
            "id": id,
            "Building": { "status": 3 },
            "Name": { "name": format!("Building {}", id) },
            "meta": { "crew": { "name": "Crew" } },
            "Location": { "location": { "id": lot } },
            "Control": { "controller": { "id": 7, "label": 1 } }
        })
    }

    fn dock_doc(id: u64, lot: u64, ship: u64) -> Value {
        let mut doc = building_doc(id, lot);
        doc["DryDocks"] = json!([{ "slot": 1, "outputShip": { "id": ship, "label": 6 } }]);
        doc
    }

    fn ship_doc(id: u64, ship_type: u32) -> Value {
        json!({ "id": id, "Ship": { "shipType": ship_type } })
    }

    fn lot_doc(id: u64) -> Value {
        json!({ "id": id, "Lot": { "lotType": 1 } })
    }

    fn ids(values: &[u64]) -> Vec<EntityId> {
        values.iter().copied().map(EntityId::from).collect()
    }

    fn building_slot(resolver: &DependencyResolver, lot: u64) -> Option<BuildingSlot> {
        resolver.cache().get::<BuildingSlot>(&chain(), EntityId::from(lot))
    }

    #[tokio::test]
    async fn test_lot_batch_marks_lots_without_building_empty() {
        let mock = Arc::new(
            MockSearchClient::new()
                .with_documents(SearchIndex::Building, vec![building_doc(501, 10)])
                .await
                .with_documents(SearchIndex::Lot, vec![lot_doc(10), lot_doc(11)])
                .await,
        );
        let resolver = resolver(mock.clone());
        let lots = vec![EntityId::parse("10").unwrap(), EntityId::parse("11").unwrap()];

        resolver.resolve_lots(&chain(), &lots).await.unwrap();

        let real: LotRecord = resolver.cache().get(&chain(), EntityId::from(10)).unwrap();
        let building = real.building_data.unwrap();
        assert!(!building.is_empty_lot());
        assert_eq!(building.as_building().unwrap().building_id, EntityId::from(501));

        let empty: LotRecord = resolver.cache().get(&chain(), EntityId::from(11)).unwrap();
        assert!(empty.building_data.unwrap().is_empty_lot());

        let counts = mock.call_counts().await;
        assert_eq!(counts.building, 1);
        assert_eq!(counts.lot, 1);
    }

    #[tokio::test]
    async fn test_building_query_excludes_unplanned_and_filters_lots() {
        let mock = Arc::new(
            MockSearchClient::new()
                .with_documents(
                    SearchIndex::Building,
                    vec![
                        building_doc(1, 20),
                        json!({
                            "id": 2,
                            "Building": { "status": 0 },
                            "Location": { "location": { "id": 21 } }
                        }),
                    ],
                )
                .await,
        );
        let resolver = resolver(mock.clone());

        resolver
            .resolve_buildings_for_lots(&chain(), &ids(&[20, 21, 22]))
            .await
            .unwrap();

        let requests = mock.requests_for(SearchIndex::Building).await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].size, 3);
        assert_eq!(
            requests[0].query.terms_for("Location.location.id"),
            Some(&[json!(20), json!(21), json!(22)][..])
        );
        assert_eq!(requests[0].query.must_not().len(), 1);

        assert!(!building_slot(&resolver, 20).unwrap().is_empty_lot());
        assert!(building_slot(&resolver, 21).unwrap().is_empty_lot());
        assert!(building_slot(&resolver, 22).unwrap().is_empty_lot());
    }

    #[tokio::test]
    async fn test_unparsable_building_does_not_mark_lot_empty() {
        let broken = json!({ "id": "nope", "Location": { "location": { "id": 30 } } });
        let mock = Arc::new(
            MockSearchClient::new()
                .with_documents(SearchIndex::Building, vec![broken, building_doc(3, 31)])
                .await,
        );
        let resolver = resolver(mock);

        resolver
            .resolve_buildings_for_lots(&chain(), &ids(&[30, 31, 32]))
            .await
            .unwrap();

        assert!(building_slot(&resolver, 30).is_none());
        assert!(!building_slot(&resolver, 31).unwrap().is_empty_lot());
        assert!(building_slot(&resolver, 32).unwrap().is_empty_lot());
    }

    #[tokio::test]
    async fn test_ship_type_filled_from_fetched_ship() {
        let mock = Arc::new(
            MockSearchClient::new()
                .with_documents(
                    SearchIndex::Building,
                    vec![dock_doc(1, 40, 900), dock_doc(2, 41, 900)],
                )
                .await
                .with_documents(SearchIndex::Ship, vec![ship_doc(900, 2)])
                .await,
        );
        let resolver = resolver(mock.clone());

        resolver
            .resolve_buildings_for_lots(&chain(), &ids(&[40, 41]))
            .await
            .unwrap();

        for lot in [40, 41] {
            let slot = building_slot(&resolver, lot).unwrap();
            let ship = slot.as_building().unwrap().output_ship().unwrap();
            assert_eq!(ship.ship_type, Some(2));
        }

        let ships = mock.requests_for(SearchIndex::Ship).await;
        assert_eq!(ships.len(), 1);
        assert_eq!(ships[0].query.terms_for("id"), Some(&[json!(900)][..]));
    }

    #[tokio::test]
    async fn test_ship_type_filled_from_cached_ship() {
        let mock = Arc::new(
            MockSearchClient::new()
                .with_documents(SearchIndex::Building, vec![dock_doc(1, 42, 901)])
                .await,
        );
        let resolver = resolver(mock.clone());
        resolver.cache().set(
            &chain(),
            EntityId::from(901),
            ShipRecord {
                ship_id: EntityId::from(901),
                ship_type: 4,
                captured_at: Utc::now(),
            },
        );

        resolver
            .resolve_buildings_for_lots(&chain(), &ids(&[42]))
            .await
            .unwrap();

        let slot = building_slot(&resolver, 42).unwrap();
        assert_eq!(slot.as_building().unwrap().output_ship().unwrap().ship_type, Some(4));
        assert_eq!(mock.call_counts().await.ship, 0);
    }

    #[tokio::test]
    async fn test_ship_failure_keeps_buildings() {
        let mock = Arc::new(
            MockSearchClient::new()
                .with_documents(SearchIndex::Building, vec![dock_doc(1, 43, 902)])
                .await
                .with_error(SearchIndex::Ship, UpstreamError::ServerError("down".to_string()))
                .await,
        );
        let resolver = resolver(mock);

        resolver
            .resolve_buildings_for_lots(&chain(), &ids(&[43]))
            .await
            .unwrap();

        let slot = building_slot(&resolver, 43).unwrap();
        assert_eq!(slot.as_building().unwrap().output_ship().unwrap().ship_type, None);
    }

    #[tokio::test]
    async fn test_building_failure_does_not_fail_lots() {
        let mock = Arc::new(
            MockSearchClient::new()
                .with_documents(SearchIndex::Lot, vec![lot_doc(50)])
                .await
                .with_error(SearchIndex::Building, UpstreamError::Timeout)
                .await,
        );
        let resolver = resolver(mock);

        resolver.resolve_lots(&chain(), &ids(&[50, 51])).await.unwrap();

        let found: LotRecord = resolver.cache().get(&chain(), EntityId::from(50)).unwrap();
        assert!(found.building_data.is_none());

        let missing: LotRecord = resolver.cache().get(&chain(), EntityId::from(51)).unwrap();
        assert!(missing.building_data.unwrap().is_empty_lot());
    }

    #[tokio::test]
    async fn test_lot_without_hit_keeps_cached_building() {
        let mock = Arc::new(
            MockSearchClient::new()
                .with_error(SearchIndex::Building, UpstreamError::Timeout)
                .await,
        );
        let resolver = resolver(mock);
        let existing = parse_building(&building_doc(5, 52), Utc::now()).unwrap();
        resolver
            .cache()
            .set(&chain(), EntityId::from(52), BuildingSlot::Building(existing));

        resolver.resolve_lots(&chain(), &ids(&[52])).await.unwrap();

        let lot: LotRecord = resolver.cache().get(&chain(), EntityId::from(52)).unwrap();
        let slot = lot.building_data.unwrap();
        assert!(!slot.is_empty_lot());
        assert_eq!(slot.as_building().unwrap().building_id, EntityId::from(5));
    }

    #[tokio::test]
    async fn test_lot_failure_is_returned() {
        let mock = Arc::new(
            MockSearchClient::new()
                .with_error(SearchIndex::Lot, UpstreamError::Unauthorized)
                .await,
        );
        let resolver = resolver(mock);

        let err = resolver.resolve_lots(&chain(), &ids(&[60])).await.unwrap_err();

        assert!(matches!(err, Error::Upstream(UpstreamError::Unauthorized)));
        assert!(resolver.cache().get::<LotRecord>(&chain(), EntityId::from(60)).is_none());
    }

    #[tokio::test]
    async fn test_resolve_crews_resolves_names() {
        let mock = Arc::new(
            MockSearchClient::new()
                .with_documents(
                    SearchIndex::Crew,
                    vec![
                        json!({
                            "id": 7,
                            "Crew": { "delegatedTo": "0xABC" },
                            "Nft": { "owners": { "ethereum": null, "starknet": "0xAbc" } }
                        }),
                        json!({ "id": 8, "Crew": {} }),
                    ],
                )
                .await,
        );
        let resolver = resolver(mock.clone());

        resolver.resolve_crews(&chain(), &ids(&[7, 8, 9])).await.unwrap();

        let crew: CrewRecord = resolver.cache().get(&chain(), EntityId::from(7)).unwrap();
        assert_eq!(crew.owner_address, "0xAbc");
        assert_eq!(crew.owner_name.as_deref(), Some("Alice"));
        assert_eq!(crew.delegated_to_name.as_deref(), Some("Alice"));
        assert!(resolver.cache().get::<CrewRecord>(&chain(), EntityId::from(8)).is_none());
        assert_eq!(mock.requests_for(SearchIndex::Crew).await[0].size, 3);
    }

    #[tokio::test]
    async fn test_controlled_buildings_without_crews_skips_building_query() {
        let mock = Arc::new(MockSearchClient::new());
        let resolver = resolver(mock.clone());

        resolver
            .resolve_controlled_buildings(&chain(), "0xNOBODY")
            .await
            .unwrap();

        let snapshot = resolver
            .cache()
            .get_controlled_snapshot(&chain(), &Address::new("0xnobody"))
            .unwrap();
        assert!(snapshot.buildings.is_empty());

        let counts = mock.call_counts().await;
        assert_eq!(counts.crew, 1);
        assert_eq!(counts.building, 0);
    }

    #[tokio::test]
    async fn test_controlled_buildings_through_crews() {
        let mock = Arc::new(
            MockSearchClient::new()
                .with_documents(
                    SearchIndex::Crew,
                    vec![
                        json!({ "id": 7, "Crew": { "delegatedTo": "0xabc" } }),
                        json!({ "id": 8, "Crew": { "delegatedTo": "0xother" } }),
                    ],
                )
                .await
                .with_documents(
                    SearchIndex::Building,
                    vec![dock_doc(1, 70, 903), building_doc(2, 71)],
                )
                .await
                .with_documents(SearchIndex::Ship, vec![ship_doc(903, 3)])
                .await,
        );
        let resolver = resolver(mock.clone());

        resolver
            .resolve_controlled_buildings(&chain(), "0xAbC")
            .await
            .unwrap();

        let snapshot = resolver
            .cache()
            .get_controlled_snapshot(&chain(), &Address::new("0xABC"))
            .unwrap();
        assert_eq!(snapshot.buildings.len(), 2);
        assert_eq!(snapshot.buildings[0].output_ship().unwrap().ship_type, Some(3));
        assert!(!building_slot(&resolver, 71).unwrap().is_empty_lot());

        let crews = resolver
            .cache()
            .get_controlled_crews(&chain(), &Address::new("0xabc"))
            .unwrap();
        assert_eq!(crews.crew_ids, BTreeSet::from([7]));

        let buildings = mock.requests_for(SearchIndex::Building).await;
        assert_eq!(buildings[0].size, 1000);
        assert_eq!(buildings[0].query.terms_for("Control.controller.id"), Some(&[json!(7)][..]));
        let crew_requests = mock.requests_for(SearchIndex::Crew).await;
        assert_eq!(crew_requests[0].size, 1000);
        assert_eq!(
            crew_requests[0].query.filter()[0],
            Clause::Term {
                field: "Crew.delegatedTo".to_string(),
                value: json!("0xabc"),
            }
        );
    }

    #[tokio::test]
    async fn test_controlled_crews_cached_within_window() {
        let mock = Arc::new(MockSearchClient::new());
        let resolver = resolver(mock.clone());

        resolver.resolve_controlled_buildings(&chain(), "0xabc").await.unwrap();
        resolver.resolve_controlled_buildings(&chain(), "0xABC").await.unwrap();

        assert_eq!(mock.call_counts().await.crew, 1);
    }

    #[tokio::test]
    async fn test_stale_crew_set_used_when_lookup_fails() {
        let mock = Arc::new(
            MockSearchClient::new()
                .with_documents(SearchIndex::Building, vec![building_doc(1, 80)])
                .await
                .with_error(SearchIndex::Crew, UpstreamError::Timeout)
                .await,
        );
        let resolver = resolver(mock);
        let key = Address::new("0xabc");
        let stale_at = Utc::now() - ChronoDuration::hours(2);
        resolver.cache().set_controlled_crews(
            &chain(),
            key.clone(),
            CrewIdSetRecord {
                crew_ids: BTreeSet::from([7]),
                captured_at: stale_at,
            },
        );

        resolver.resolve_controlled_buildings(&chain(), "0xabc").await.unwrap();

        let snapshot = resolver.cache().get_controlled_snapshot(&chain(), &key).unwrap();
        assert_eq!(snapshot.buildings.len(), 1);
        assert_eq!(snapshot.captured_at, stale_at);
        assert!(!is_fresh(
            Some(snapshot.captured_at),
            resolver.windows().controlled_buildings
        ));
    }

    #[tokio::test]
    async fn test_crew_lookup_failure_without_cache_is_returned() {
        let mock = Arc::new(
            MockSearchClient::new()
                .with_error(SearchIndex::Crew, UpstreamError::Timeout)
                .await,
        );
        let resolver = resolver(mock);

        let result = resolver.resolve_controlled_buildings(&chain(), "0xabc").await;

        assert!(matches!(result, Err(Error::Upstream(UpstreamError::Timeout))));
    }

    #[tokio::test]
    async fn test_chains_are_resolved_independently() {
        let mock = Arc::new(
            MockSearchClient::new()
                .with_documents(SearchIndex::Ship, vec![ship_doc(1, 1)])
                .await,
        );
        let resolver = resolver(mock.clone());

        resolver.resolve_ships(&chain(), &ids(&[1])).await.unwrap();

        let sepolia = ChainId::from(SN_SEPOLIA);
        assert!(resolver.cache().get::<ShipRecord>(&sepolia, EntityId::from(1)).is_none());
        assert_eq!(mock.captured_requests().await[0].chain, chain());
    }
}
