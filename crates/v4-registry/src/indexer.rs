//! HTTP client for the indexer REST API.
//!
//! Serves market metadata (`GET /v4/perpetualMarkets?ticker=`) and the
//! latest indexed height (`GET /v4/height`).

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};
use v4_core::{BoxFuture, MarketInfo};

use crate::error::{RegistryError, RegistryResult};
use crate::json::string_or_number;
use crate::lookup::{HeightLookup, MarketLookup};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct PerpetualMarketsResponse {
    #[serde(default)]
    markets: HashMap<String, RawPerpetualMarket>,
}

/// Market entry as served by the indexer. Integers may arrive as strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPerpetualMarket {
    ticker: String,
    #[serde(deserialize_with = "string_or_number")]
    clob_pair_id: u32,
    #[serde(deserialize_with = "string_or_number")]
    atomic_resolution: i32,
    #[serde(deserialize_with = "string_or_number")]
    step_base_quantums: u64,
    #[serde(deserialize_with = "string_or_number")]
    quantum_conversion_exponent: i32,
    #[serde(deserialize_with = "string_or_number")]
    subticks_per_tick: u32,
}

impl From<RawPerpetualMarket> for MarketInfo {
    fn from(raw: RawPerpetualMarket) -> Self {
        Self {
            ticker: raw.ticker,
            clob_pair_id: raw.clob_pair_id,
            atomic_resolution: raw.atomic_resolution,
            step_base_quantums: raw.step_base_quantums,
            quantum_conversion_exponent: raw.quantum_conversion_exponent,
            subticks_per_tick: raw.subticks_per_tick,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HeightResponse {
    #[serde(deserialize_with = "string_or_number")]
    height: u32,
}

/// Pick `ticker` out of a `/v4/perpetualMarkets` body.
pub(crate) fn parse_market(ticker: &str, body: &str) -> RegistryResult<Option<MarketInfo>> {
    let mut response: PerpetualMarketsResponse = serde_json::from_str(body)?;
    Ok(response.markets.remove(ticker).map(MarketInfo::from))
}

pub(crate) fn parse_height(body: &str) -> RegistryResult<u32> {
    let response: HeightResponse = serde_json::from_str(body)?;
    Ok(response.height)
}

/// Client for the indexer REST API.
pub struct IndexerClient {
    client: Client,
    base_url: String,
}

impl IndexerClient {
    /// Create a new indexer client.
    ///
    /// # Arguments
    /// * `base_url` - Indexer root (e.g., "https://indexer.v4testnet.dydx.exchange")
    pub fn new(base_url: impl Into<String>) -> RegistryResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RegistryError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// GET `path` and return the body. `Ok(None)` on 404.
    async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> RegistryResult<Option<String>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::HttpClient(format!("HTTP {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("Failed to read response: {e}")))?;
        Ok(Some(body))
    }

    /// Fetch scaling metadata for one market.
    pub async fn fetch_market(&self, ticker: &str) -> RegistryResult<Option<MarketInfo>> {
        info!(url = %self.base_url, market = %ticker, "Fetching perpetual market");

        let Some(body) = self
            .get_text("/v4/perpetualMarkets", &[("ticker", ticker)])
            .await?
        else {
            return Ok(None);
        };

        let market = parse_market(ticker, &body)?;
        debug!(market = %ticker, found = market.is_some(), "Perpetual market response parsed");
        Ok(market)
    }

    /// Fetch the latest height seen by the indexer.
    pub async fn fetch_height(&self) -> RegistryResult<u32> {
        let body = self
            .get_text("/v4/height", &[])
            .await?
            .ok_or_else(|| RegistryError::Malformed("height endpoint returned 404".to_string()))?;
        let height = parse_height(&body)?;
        debug!(height, "Indexer height fetched");
        Ok(height)
    }
}

impl MarketLookup for IndexerClient {
    fn get_market<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, RegistryResult<Option<MarketInfo>>> {
        Box::pin(self.fetch_market(ticker))
    }
}

impl HeightLookup for IndexerClient {
    fn latest_height(&self) -> BoxFuture<'_, RegistryResult<u32>> {
        Box::pin(self.fetch_height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKETS_BODY: &str = r#"{
        "markets": {
            "ETH-USD": {
                "clobPairId": "1",
                "ticker": "ETH-USD",
                "status": "ACTIVE",
                "oraclePrice": "1350.25",
                "atomicResolution": -9,
                "quantumConversionExponent": -9,
                "stepBaseQuantums": 1000000,
                "subticksPerTick": 100000,
                "tickSize": "0.1",
                "stepSize": "0.001"
            }
        }
    }"#;

    #[test]
    fn test_parse_market() {
        let market = parse_market("ETH-USD", MARKETS_BODY).unwrap().unwrap();
        assert_eq!(market.clob_pair_id, 1);
        assert_eq!(market.atomic_resolution, -9);
        assert_eq!(market.quantum_conversion_exponent, -9);
        assert_eq!(market.step_base_quantums, 1_000_000);
        assert_eq!(market.subticks_per_tick, 100_000);
    }

    #[test]
    fn test_parse_market_missing_ticker() {
        assert!(parse_market("BTC-USD", MARKETS_BODY).unwrap().is_none());
        assert!(parse_market("BTC-USD", "{}").unwrap().is_none());
    }

    #[test]
    fn test_parse_market_malformed() {
        let body = r#"{"markets":{"ETH-USD":{"ticker":"ETH-USD","clobPairId":"one"}}}"#;
        assert!(matches!(
            parse_market("ETH-USD", body),
            Err(RegistryError::Json(_))
        ));
    }

    #[test]
    fn test_parse_height() {
        let body = r#"{"height":"12345678","time":"2024-01-01T00:00:00.000Z"}"#;
        assert_eq!(parse_height(body).unwrap(), 12_345_678);
    }

    #[test]
    fn test_client_creation() {
        let client = IndexerClient::new("https://indexer.example.com/").unwrap();
        assert_eq!(client.base_url, "https://indexer.example.com");
    }
}
