use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{info, instrument, warn};

use crate::common::error::{EtlError, Result};

pub const TOKEN_ENV_VAR: &str = "FR24_API_TOKEN";
const DEFAULT_BASE_URL: &str = "https://fr24api.flightradar24.com";
const POSITIONS_PATH: &str = "/api/historic/flight-positions/full";
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Endpoint filters forwarded with every position query.
#[derive(Debug, Clone, Default)]
pub struct PositionFilters {
    pub routes: Option<String>,
    pub bounds: Option<String>,
    pub operating_as: Option<String>,
    pub painted_as: Option<String>,
    pub limit: Option<u32>,
}

impl PositionFilters {
    fn query_params(&self, timestamp: i64) -> Vec<(&'static str, String)> {
        let mut params = vec![("timestamp", timestamp.to_string())];
        if let Some(routes) = &self.routes {
            params.push(("routes", routes.clone()));
        }
        if let Some(bounds) = &self.bounds {
            params.push(("bounds", bounds.clone()));
        }
        if let Some(operating_as) = &self.operating_as {
            params.push(("operating_as", operating_as.clone()));
        }
        if let Some(painted_as) = &self.painted_as {
            params.push(("painted_as", painted_as.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// Port for the historical-position service. The live implementation talks to
/// FR24; tests substitute an in-memory source.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Position records for one snapshot timestamp.
    async fn positions_at(
        &self,
        timestamp: i64,
        filters: &PositionFilters,
    ) -> Result<Vec<JsonValue>>;
}

#[derive(Debug, Deserialize)]
struct PositionsResponse {
    #[serde(default)]
    data: Vec<JsonValue>,
}

/// Bearer-token client for the FR24 historical position endpoint.
pub struct Fr24Client {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl Fr24Client {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
        }
    }

    /// Read the access token from the environment.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV_VAR)?;
        Ok(Self::new(token))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn send(&self, timestamp: i64, filters: &PositionFilters) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, POSITIONS_PATH);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("Accept-Version", "v1")
            .bearer_auth(&self.token)
            .query(&filters.query_params(timestamp))
            .send()
            .await?;
        Ok(resp)
    }
}

#[async_trait]
impl PositionSource for Fr24Client {
    /// One request per timestamp. A 429 honors Retry-After and is retried
    /// once; any other non-success status is fatal.
    #[instrument(skip(self, filters))]
    async fn positions_at(
        &self,
        timestamp: i64,
        filters: &PositionFilters,
    ) -> Result<Vec<JsonValue>> {
        let mut resp = self.send(timestamp, filters).await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let wait_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!("rate limit reached, sleeping {}s before retry", wait_secs);
            tokio::time::sleep(std::time::Duration::from_secs(wait_secs)).await;
            resp = self.send(timestamp, filters).await?;
        }

        if !resp.status().is_success() {
            return Err(EtlError::Api {
                message: format!(
                    "position query for timestamp {} failed with status {}",
                    timestamp,
                    resp.status()
                ),
            });
        }

        let body: PositionsResponse = resp.json().await?;
        info!("timestamp {}: retrieved {} records", timestamp, body.data.len());
        Ok(body.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_include_only_set_filters() {
        let filters = PositionFilters {
            routes: Some("JFK-LAX,LAX-JFK".into()),
            operating_as: Some("AAL".into()),
            ..Default::default()
        };
        let params = filters.query_params(1_704_067_200);
        assert_eq!(params[0], ("timestamp", "1704067200".to_string()));
        assert!(params.iter().any(|(k, v)| *k == "routes" && v.contains("JFK-LAX")));
        assert!(!params.iter().any(|(k, _)| *k == "bounds"));
    }
}
