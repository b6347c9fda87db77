//! Validator REST (Cosmos LCD) client for block height and account state.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};
use v4_core::BoxFuture;

use crate::error::{RegistryError, RegistryResult};
use crate::json::string_or_number;
use crate::lookup::{Account, AccountLookup, HeightLookup};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const LATEST_BLOCK_PATH: &str = "/cosmos/base/tendermint/v1beta1/blocks/latest";
const ACCOUNTS_PATH: &str = "/cosmos/auth/v1beta1/accounts";

#[derive(Debug, Deserialize)]
struct LatestBlockResponse {
    block: BlockBody,
}

#[derive(Debug, Deserialize)]
struct BlockBody {
    header: BlockHeader,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    #[serde(deserialize_with = "string_or_number")]
    height: u32,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account: RawAccount,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    address: String,
    #[serde(deserialize_with = "string_or_number")]
    account_number: u64,
    #[serde(deserialize_with = "string_or_number")]
    sequence: u64,
}

pub(crate) fn parse_latest_height(body: &str) -> RegistryResult<u32> {
    let response: LatestBlockResponse = serde_json::from_str(body)?;
    Ok(response.block.header.height)
}

pub(crate) fn parse_account(address: &str, body: &str) -> RegistryResult<Account> {
    let response: AccountResponse = serde_json::from_str(body)?;
    if response.account.address != address {
        return Err(RegistryError::Malformed(format!(
            "asked for account {address}, got {}",
            response.account.address
        )));
    }
    Ok(Account {
        address: response.account.address,
        account_number: response.account.account_number,
        sequence: response.account.sequence,
    })
}

/// Client for a validator's REST endpoint.
pub struct ValidatorRestClient {
    client: Client,
    base_url: String,
}

impl ValidatorRestClient {
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

    async fn get_text(&self, path: &str) -> RegistryResult<Option<String>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
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

        response
            .text()
            .await
            .map(Some)
            .map_err(|e| RegistryError::HttpClient(format!("Failed to read response: {e}")))
    }

    /// Latest committed block height.
    pub async fn fetch_latest_height(&self) -> RegistryResult<u32> {
        let body = self.get_text(LATEST_BLOCK_PATH).await?.ok_or_else(|| {
            RegistryError::Malformed("latest block endpoint returned 404".to_string())
        })?;
        let height = parse_latest_height(&body)?;
        debug!(height, "Latest block height fetched");
        Ok(height)
    }

    /// Account number and sequence. `Ok(None)` if the chain has never seen the address.
    pub async fn fetch_account(&self, address: &str) -> RegistryResult<Option<Account>> {
        info!(url = %self.base_url, address = %address, "Fetching account");
        let Some(body) = self.get_text(&format!("{ACCOUNTS_PATH}/{address}")).await? else {
            return Ok(None);
        };
        let account = parse_account(address, &body)?;
        debug!(
            address = %address,
            account_number = account.account_number,
            sequence = account.sequence,
            "Account fetched"
        );
        Ok(Some(account))
    }
}

impl HeightLookup for ValidatorRestClient {
    fn latest_height(&self) -> BoxFuture<'_, RegistryResult<u32>> {
        Box::pin(self.fetch_latest_height())
    }
}

impl AccountLookup for ValidatorRestClient {
    fn get_account<'a>(&'a self, address: &'a str) -> BoxFuture<'a, RegistryResult<Option<Account>>> {
        Box::pin(self.fetch_account(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_latest_height() {
        let body = r#"{
            "block_id": {"hash": "AAAA"},
            "block": {
                "header": {"chain_id": "dydx-testnet-4", "height": "20931051", "time": "2024-01-01T00:00:00Z"},
                "data": {"txs": []}
            }
        }"#;
        assert_eq!(parse_latest_height(body).unwrap(), 20_931_051);
    }

    #[test]
    fn test_parse_latest_height_missing_header() {
        assert!(matches!(
            parse_latest_height(r#"{"block":{}}"#),
            Err(RegistryError::Json(_))
        ));
    }

    #[test]
    fn test_parse_account() {
        let body = r#"{
            "account": {
                "@type": "/cosmos.auth.v1beta1.BaseAccount",
                "address": "dydx14zzueazeh0hj67cghhf9jypslcf9sh2n5k6art",
                "pub_key": null,
                "account_number": "33",
                "sequence": "12"
            }
        }"#;
        let account = parse_account("dydx14zzueazeh0hj67cghhf9jypslcf9sh2n5k6art", body).unwrap();
        assert_eq!(account.account_number, 33);
        assert_eq!(account.sequence, 12);
    }

    #[test]
    fn test_parse_account_address_mismatch() {
        let body = r#"{"account":{"address":"dydx1other","account_number":"1","sequence":"0"}}"#;
        assert!(matches!(
            parse_account("dydx1mine", body),
            Err(RegistryError::Malformed(_))
        ));
    }
}
