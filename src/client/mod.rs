//! Upstream search API client
//!
//! The resolver talks to the search index only through [`SearchApi`], so
//! tests can swap in [`MockSearchClient`] and deployments use
//! [`InfluenceClient`].

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::ChainId;

pub mod influence;
#[cfg(test)]
pub mod mock;
pub mod query;
pub mod rate_limit;

pub use influence::InfluenceClient;
#[cfg(test)]
pub use mock::MockSearchClient;
pub use query::{Clause, SearchQuery};

/// Search index per entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchIndex {
    Crew,
    Lot,
    Building,
    Ship,
}

impl SearchIndex {
    /// Index name as it appears in the upstream search path.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchIndex::Crew => "crew",
            SearchIndex::Lot => "lot",
            SearchIndex::Building => "building",
            SearchIndex::Ship => "ship",
        }
    }
}

impl std::fmt::Display for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search operations against the upstream game-state index
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Run `query` against `index` on `chain`, returning at most `size` hit documents.
    ///
    /// Each returned value is the hit's `_source` document.
    async fn search(
        &self,
        chain: &ChainId,
        index: SearchIndex,
        query: &SearchQuery,
        size: usize,
    ) -> Result<Vec<Value>>;
}
