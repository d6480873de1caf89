//! Rates from the exchangerate-api.com v6 API.

use super::util::{build_client, check_status, endpoint_url, redact};
use crate::core::currency::{CurrencyList, CurrencyRateProvider, Quote};
use crate::core::error::{LookupError, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: build_client(timeout)?,
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &[&str], what: &str) -> Result<T> {
        let mut segments = vec!["v6", self.api_key.as_str()];
        segments.extend_from_slice(endpoint);
        let url = endpoint_url(&self.base_url, &segments)?;
        debug!("Requesting {}", redact(url.as_str(), &self.api_key));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::Transport(format!("Request error: {e} for {what}")))?;
        let status = response.status();
        let text = response.text().await?;

        // Errors come back as a JSON envelope, usually with a 4xx status.
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&text) {
            if envelope.result == "error" {
                return Err(classify_error(
                    envelope.error_type.as_deref().unwrap_or("unknown"),
                    what,
                ));
            }
        }
        check_status(status, what)?;

        serde_json::from_str(&text).map_err(|e| {
            LookupError::InvalidResponse(format!("Failed to parse JSON response for {what}: {e}"))
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    base_code: String,
    target_code: String,
    conversion_rate: f64,
    time_last_update_unix: i64,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    base_code: String,
    conversion_rates: HashMap<String, f64>,
    time_last_update_unix: i64,
}

fn classify_error(error_type: &str, what: &str) -> LookupError {
    match error_type {
        "unsupported-code" => LookupError::UnknownIdentifier(what.to_string()),
        "quota-reached" => LookupError::RateLimited("exchangerate-api.com".to_string()),
        other => LookupError::Rejected(format!("{other} for {what}")),
    }
}

fn timestamp(unix: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(unix, 0)
        .single()
        .ok_or_else(|| LookupError::InvalidResponse(format!("Invalid timestamp: {unix}")))
}

#[async_trait]
impl CurrencyRateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRatePair", skip(self))]
    async fn get_quote(&self, from: &str, to: &str) -> Result<Quote> {
        let what = format!("{from}/{to}");
        let data: PairResponse = self.get(&["pair", from, to], &what).await?;

        if !(data.conversion_rate.is_finite() && data.conversion_rate > 0.0) {
            return Err(LookupError::InvalidResponse(format!(
                "Non-positive rate {} for {what}",
                data.conversion_rate
            )));
        }

        Ok(Quote {
            base_code: data.base_code,
            quote_code: data.target_code,
            rate: data.conversion_rate,
            as_of: timestamp(data.time_last_update_unix)?,
        })
    }

    #[instrument(name = "ExchangeRateLatest", skip(self))]
    async fn supported_codes(&self, base: &str) -> Result<CurrencyList> {
        let data: LatestResponse = self.get(&["latest", base], base).await?;

        let mut codes: Vec<String> = data.conversion_rates.into_keys().collect();
        if codes.is_empty() {
            return Err(LookupError::EmptyResult(format!("currencies for {base}")));
        }
        codes.sort();

        Ok(CurrencyList {
            base_code: data.base_code,
            codes,
            as_of: timestamp(data.time_last_update_unix)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "test-key";

    async fn create_mock_server(endpoint: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v6/{KEY}/{endpoint}")))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(server: &MockServer) -> ExchangeRateApiProvider {
        ExchangeRateApiProvider::new(&server.uri(), KEY, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_successful_pair_fetch() {
        let mock_response = r#"{
            "result": "success",
            "time_last_update_unix": 1740787201,
            "time_last_update_utc": "Sat, 01 Mar 2025 00:00:01 +0000",
            "base_code": "USD",
            "target_code": "IDR",
            "conversion_rate": 16485.5
        }"#;
        let server = create_mock_server("pair/USD/IDR", 200, mock_response).await;

        let quote = provider(&server).get_quote("USD", "IDR").await.unwrap();
        assert_eq!(quote.base_code, "USD");
        assert_eq!(quote.quote_code, "IDR");
        assert_eq!(quote.rate, 16485.5);
        assert_eq!(quote.as_of, Utc.timestamp_opt(1740787201, 0).unwrap());
    }

    #[tokio::test]
    async fn test_unsupported_code() {
        let body = r#"{"result": "error", "error-type": "unsupported-code"}"#;
        let server = create_mock_server("pair/USD/XXX", 404, body).await;

        let result = provider(&server).get_quote("USD", "XXX").await;
        assert_eq!(
            result.unwrap_err(),
            LookupError::UnknownIdentifier("USD/XXX".to_string())
        );
    }

    #[tokio::test]
    async fn test_codes_cannot_reshape_the_path() {
        let body = r#"{"result": "error", "error-type": "unsupported-code"}"#;
        let server = create_mock_server("pair/USD%2F..%2Flatest/EUR", 404, body).await;

        let result = provider(&server).get_quote("USD/../latest", "EUR").await;
        assert_eq!(
            result.unwrap_err(),
            LookupError::UnknownIdentifier("USD/../latest/EUR".to_string())
        );
    }

    #[tokio::test]
    async fn test_quota_reached() {
        let body = r#"{"result": "error", "error-type": "quota-reached"}"#;
        let server = create_mock_server("pair/USD/EUR", 429, body).await;

        let result = provider(&server).get_quote("USD", "EUR").await;
        assert!(matches!(result, Err(LookupError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_invalid_key_is_rejected() {
        let body = r#"{"result": "error", "error-type": "invalid-key"}"#;
        let server = create_mock_server("pair/USD/EUR", 403, body).await;

        let result = provider(&server).get_quote("USD", "EUR").await;
        assert_eq!(
            result.unwrap_err(),
            LookupError::Rejected("invalid-key for USD/EUR".to_string())
        );
    }

    #[tokio::test]
    async fn test_server_error_without_envelope() {
        let server = create_mock_server("pair/USD/EUR", 500, "").await;

        let result = provider(&server).get_quote("USD", "EUR").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Request failed: HTTP error: 500 Internal Server Error for USD/EUR"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let body = r#"{"result": "success", "rate": 1.0}"#;
        let server = create_mock_server("pair/USD/EUR", 200, body).await;

        let result = provider(&server).get_quote("USD", "EUR").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for USD/EUR")
        );
    }

    #[tokio::test]
    async fn test_supported_codes_are_sorted() {
        let body = r#"{
            "result": "success",
            "time_last_update_unix": 1740787201,
            "base_code": "USD",
            "conversion_rates": {"USD": 1, "IDR": 16485.5, "EUR": 0.96}
        }"#;
        let server = create_mock_server("latest/USD", 200, body).await;

        let list = provider(&server).supported_codes("USD").await.unwrap();
        assert_eq!(list.codes, vec!["EUR", "IDR", "USD"]);
        assert!(list.contains("IDR"));
        assert!(!list.contains("JPY"));
    }
}
