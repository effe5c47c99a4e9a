//! HTTP client for the Influence search API

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use super::rate_limit::RateLimiterSet;
use super::{SearchApi, SearchIndex, SearchQuery};
use crate::config::{ChainConfig, Config};
use crate::error::{Error, Result, UpstreamError};
use crate::models::ChainId;

/// Search API client covering every configured chain.
///
/// Access tokens are obtained lazily per chain with the client-credentials
/// grant and refreshed once when the upstream answers 401.
pub struct InfluenceClient {
    http: HttpClient,
    chains: HashMap<ChainId, ChainConfig>,
    rate_limiters: RateLimiterSet,
    tokens: RwLock<HashMap<ChainId, String>>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: Value,
}

impl InfluenceClient {
    /// Create a client for every chain in `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(UpstreamError::from)?;

        let chains: HashMap<ChainId, ChainConfig> = config
            .chains
            .iter()
            .map(|(chain, settings)| (chain.clone(), settings.clone()))
            .collect();

        Ok(Self {
            rate_limiters: RateLimiterSet::new(chains.keys(), config.rate_limit_per_second),
            http,
            chains,
            tokens: RwLock::new(HashMap::new()),
        })
    }

    fn settings(&self, chain: &ChainId) -> Result<&ChainConfig> {
        self.chains
            .get(chain)
            .ok_or_else(|| Error::UnknownChain(chain.to_string()))
    }

    /// Get the access token for a chain, requesting one if none is held.
    async fn access_token(&self, chain: &ChainId) -> Result<String> {
        if let Some(token) = self.tokens.read().await.get(chain) {
            return Ok(token.clone());
        }

        let token = self.fetch_access_token(chain).await?;
        self.tokens.write().await.insert(chain.clone(), token.clone());
        Ok(token)
    }

    async fn invalidate_token(&self, chain: &ChainId) {
        self.tokens.write().await.remove(chain);
    }

    /// Exchange client credentials for an access token.
    async fn fetch_access_token(&self, chain: &ChainId) -> Result<String> {
        let settings = self.settings(chain)?;

        if let Some(token) = &settings.access_token {
            return Ok(token.clone());
        }

        let (Some(client_id), Some(client_secret)) = (&settings.client_id, &settings.client_secret)
        else {
            return Err(UpstreamError::MissingCredentials(chain.to_string()).into());
        };

        self.rate_limiters.wait_for(chain).await;

        let url = format!("{}/v1/auth/token", settings.base_url);
        let response = self
            .http
            .post(&url)
            .json(&TokenRequest {
                grant_type: "client_credentials",
                client_id,
                client_secret,
            })
            .send()
            .await
            .map_err(UpstreamError::from)?;

        match response.status() {
            StatusCode::OK => {
                let body: TokenResponse = response.json().await.map_err(|e| {
                    UpstreamError::InvalidResponse(format!("Failed to parse token response: {}", e))
                })?;
                log::debug!("Obtained access token for {}", chain);
                Ok(body.access_token)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(UpstreamError::Unauthorized.into())
            }
            status => Err(self.status_error(chain, status, response).await.into()),
        }
    }

    /// Map a non-success response to an upstream error.
    async fn status_error(
        &self,
        chain: &ChainId,
        status: StatusCode,
        response: reqwest::Response,
    ) -> UpstreamError {
        match status {
            StatusCode::FORBIDDEN => UpstreamError::Forbidden,
            StatusCode::TOO_MANY_REQUESTS => {
                self.rate_limiters.activate(chain);
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                UpstreamError::RateLimit(Duration::from_secs(retry_after))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Bad request".to_string());
                UpstreamError::BadRequest(error_msg)
            }
            status if status.is_server_error() => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| format!("Server error: {}", status));
                UpstreamError::ServerError(error_msg)
            }
            _ => UpstreamError::InvalidResponse(format!("Unexpected status code: {}", status)),
        }
    }

    async fn search_inner(
        &self,
        chain: &ChainId,
        index: SearchIndex,
        body: &Value,
        retry_auth: bool,
    ) -> Result<Vec<Value>> {
        let settings = self.settings(chain)?;
        self.rate_limiters.wait_for(chain).await;

        let token = self.access_token(chain).await?;
        let url = format!("{}/_search/{}", settings.base_url, index);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await
            .map_err(UpstreamError::from)?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let data: SearchResponse = response.json().await.map_err(|e| {
                    UpstreamError::InvalidResponse(format!(
                        "Failed to parse search response: {}",
                        e
                    ))
                })?;
                Ok(data.hits.hits.into_iter().map(|hit| hit.source).collect())
            }
            StatusCode::UNAUTHORIZED if retry_auth => {
                log::debug!("Access token for {} rejected, refreshing", chain);
                self.invalidate_token(chain).await;
                Box::pin(self.search_inner(chain, index, body, false)).await
            }
            StatusCode::UNAUTHORIZED => Err(UpstreamError::Unauthorized.into()),
            status => Err(self.status_error(chain, status, response).await.into()),
        }
    }
}

#[async_trait]
impl SearchApi for InfluenceClient {
    async fn search(
        &self,
        chain: &ChainId,
        index: SearchIndex,
        query: &SearchQuery,
        size: usize,
    ) -> Result<Vec<Value>> {
        let body = query.to_request_body(size);
        log::debug!("Searching {} on {} (size {})", index, chain, size);
        self.search_inner(chain, index, &body, true).await
    }
}
