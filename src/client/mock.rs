//! Mock search client for testing
//!
//! Holds documents per index and evaluates queries against them, so the
//! resolver's query construction is exercised without a real upstream.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{Clause, SearchApi, SearchIndex, SearchQuery};
use crate::error::{Result, UpstreamError};
use crate::models::ChainId;

/// Mock search client.
///
/// # Example
/// ```ignore
/// let mock = MockSearchClient::new()
///     .with_documents(SearchIndex::Ship, vec![json!({"id": 1, "Ship": {"shipType": 2}})])
///     .await;
/// ```
#[derive(Default)]
pub struct MockSearchClient {
    /// Documents per index
    documents: Arc<Mutex<HashMap<SearchIndex, Vec<Value>>>>,
    /// One-shot errors per index, consumed on first use
    errors: Arc<Mutex<HashMap<SearchIndex, UpstreamError>>>,
    /// Track number of calls for verification
    call_count: Arc<Mutex<CallCounts>>,
    /// Captured requests for test assertions
    captured_requests: Arc<Mutex<Vec<CapturedSearch>>>,
}

/// Tracks search calls per index
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub crew: usize,
    pub lot: usize,
    pub building: usize,
    pub ship: usize,
}

impl CallCounts {
    /// Get total number of search calls made.
    pub fn total(&self) -> usize {
        self.crew + self.lot + self.building + self.ship
    }
}

/// A captured search request for test assertions.
#[derive(Debug, Clone)]
pub struct CapturedSearch {
    pub chain: ChainId,
    pub index: SearchIndex,
    pub query: SearchQuery,
    pub size: usize,
}

impl MockSearchClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the documents held by an index.
    pub async fn with_documents(self, index: SearchIndex, docs: Vec<Value>) -> Self {
        self.set_documents(index, docs).await;
        self
    }

    /// Replace the documents of an index (simulates upstream changes).
    pub async fn set_documents(&self, index: SearchIndex, docs: Vec<Value>) {
        self.documents.lock().await.insert(index, docs);
    }

    /// Configure an error to return on the next search of `index`.
    pub async fn with_error(self, index: SearchIndex, error: UpstreamError) -> Self {
        self.fail_next(index, error).await;
        self
    }

    pub async fn fail_next(&self, index: SearchIndex, error: UpstreamError) {
        self.errors.lock().await.insert(index, error);
    }

    /// Get the call counts for verification in tests.
    pub async fn call_counts(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }

    /// Get all captured requests for test assertions.
    pub async fn captured_requests(&self) -> Vec<CapturedSearch> {
        self.captured_requests.lock().await.clone()
    }

    pub async fn requests_for(&self, index: SearchIndex) -> Vec<CapturedSearch> {
        self.captured_requests
            .lock()
            .await
            .iter()
            .filter(|r| r.index == index)
            .cloned()
            .collect()
    }
}

/// Resolve a dotted path such as `Location.location.id`.
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |value, key| value.get(key))
}

/// Compare scalars the way the index does: `10` matches `"10"`.
fn scalar_eq(a: &Value, b: &Value) -> bool {
    fn text(v: &Value) -> String {
        match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
    text(a) == text(b)
}

fn matches(doc: &Value, clause: &Clause) -> bool {
    let Some(actual) = lookup(doc, clause.field()) else {
        return false;
    };
    match clause {
        Clause::Term { value, .. } => scalar_eq(actual, value),
        Clause::Terms { values, .. } => values.iter().any(|v| scalar_eq(actual, v)),
    }
}

fn evaluate(doc: &Value, query: &SearchQuery) -> bool {
    query.filter().iter().all(|c| matches(doc, c))
        && query.must().iter().all(|c| matches(doc, c))
        && !query.must_not().iter().any(|c| matches(doc, c))
}

#[async_trait]
impl SearchApi for MockSearchClient {
    async fn search(
        &self,
        chain: &ChainId,
        index: SearchIndex,
        query: &SearchQuery,
        size: usize,
    ) -> Result<Vec<Value>> {
        self.captured_requests.lock().await.push(CapturedSearch {
            chain: chain.clone(),
            index,
            query: query.clone(),
            size,
        });

        {
            let mut counts = self.call_count.lock().await;
            match index {
                SearchIndex::Crew => counts.crew += 1,
                SearchIndex::Lot => counts.lot += 1,
                SearchIndex::Building => counts.building += 1,
                SearchIndex::Ship => counts.ship += 1,
            }
        }

        if let Some(error) = self.errors.lock().await.remove(&index) {
            return Err(error.into());
        }

        let documents = self.documents.lock().await;
        Ok(documents
            .get(&index)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| evaluate(doc, query))
                    .take(size)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SN_MAIN;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_evaluates_query() {
        let mock = MockSearchClient::new()
            .with_documents(
                SearchIndex::Building,
                vec![
                    json!({
                        "id": 1,
                        "Building": {"status": 3},
                        "Location": {"location": {"id": 10}}
                    }),
                    json!({
                        "id": 2,
                        "Building": {"status": 0},
                        "Location": {"location": {"id": 11}}
                    }),
                    json!({
                        "id": 3,
                        "Building": {"status": 3},
                        "Location": {"location": {"id": 12}}
                    }),
                ],
            )
            .await;

        let query = SearchQuery::new()
            .must_not_term("Building.status", 0)
            .filter_terms("Location.location.id", ["10", "11"]);
        let hits = mock
            .search(&ChainId::from(SN_MAIN), SearchIndex::Building, &query, 10)
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], json!(1));
    }

    #[tokio::test]
    async fn test_mock_error_is_one_shot() {
        let mock = MockSearchClient::new()
            .with_error(SearchIndex::Ship, UpstreamError::Timeout)
            .await;
        let chain = ChainId::from(SN_MAIN);

        assert!(
            mock.search(&chain, SearchIndex::Ship, &SearchQuery::new(), 1)
                .await
                .is_err()
        );
        assert!(
            mock.search(&chain, SearchIndex::Ship, &SearchQuery::new(), 1)
                .await
                .is_ok()
        );
        assert_eq!(mock.call_counts().await.ship, 2);
    }
}
