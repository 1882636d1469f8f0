//! CoinCap price quote client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::ports::{PriceSource, QuoteError};

/// Body of `GET /v2/assets/{id}`; only the price is read.
#[derive(Debug, Deserialize)]
struct AssetResponse {
    data: AssetData,
}

#[derive(Debug, Deserialize)]
struct AssetData {
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
}

/// HTTP client for a CoinCap-compatible asset endpoint.
#[derive(Debug, Clone)]
pub struct CoinCapClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinCapClient {
    /// Creates a client for `base_url`, e.g. `https://api.coincap.io/v2/assets/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, QuoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuoteError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
        })
    }

    fn asset_url(&self, symbol: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{symbol}", self.base_url)
        } else {
            format!("{}/{symbol}", self.base_url)
        }
    }
}

#[async_trait]
impl PriceSource for CoinCapClient {
    async fn fetch_price(&self, symbol: &str) -> Result<String, QuoteError> {
        let url = self.asset_url(symbol);
        debug!("Fetching quote from {}", url);

        let mut request = self.http.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| QuoteError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| QuoteError::Http(e.to_string()))?;

        parse_price_body(&body)
    }
}

/// Extracts `data.priceUsd` from a response body.
fn parse_price_body(body: &str) -> Result<String, QuoteError> {
    let parsed: AssetResponse =
        serde_json::from_str(body).map_err(|e| QuoteError::Decode(e.to_string()))?;

    parsed
        .data
        .price_usd
        .filter(|price| !price.trim().is_empty())
        .ok_or_else(|| QuoteError::Decode("missing priceUsd".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_body() {
        let body = r#"{
            "data": {
                "id": "bitcoin",
                "rank": "1",
                "symbol": "BTC",
                "name": "Bitcoin",
                "priceUsd": "67012.3456789012345678",
                "changePercent24Hr": "-0.81"
            },
            "timestamp": 1718000000000
        }"#;
        assert_eq!(parse_price_body(body).unwrap(), "67012.3456789012345678");
    }

    #[test]
    fn test_parse_price_body_missing_price() {
        let body = r#"{"data": {"id": "bitcoin", "priceUsd": null}}"#;
        assert!(matches!(parse_price_body(body), Err(QuoteError::Decode(_))));
    }

    #[test]
    fn test_parse_price_body_malformed() {
        assert!(matches!(
            parse_price_body("<html>rate limited</html>"),
            Err(QuoteError::Decode(_))
        ));
    }

    #[test]
    fn test_asset_url() {
        let with_slash =
            CoinCapClient::new("https://api.coincap.io/v2/assets/", None, Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            with_slash.asset_url("bitcoin"),
            "https://api.coincap.io/v2/assets/bitcoin"
        );

        let without_slash =
            CoinCapClient::new("http://localhost:8080/assets", None, Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            without_slash.asset_url("ethereum"),
            "http://localhost:8080/assets/ethereum"
        );
    }
}
