//! Daily aggregates, ticker search and ticker details from polygon.io.

use super::util::{build_client, endpoint_url, read_json, redact};
use crate::core::error::{LookupError, Result};
use crate::core::metadata::{EntityMetadata, MetadataProvider};
use crate::core::search::{SearchCandidate, SymbolSearchProvider};
use crate::core::series::{Bar, SeriesProvider};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

/// Upper bound on bars per aggregates request; a year of trading days fits.
const AGGREGATES_LIMIT: &str = "5000";

pub struct PolygonProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl PolygonProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(PolygonProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: build_client(timeout)?,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
        what: &str,
    ) -> Result<T> {
        let mut url = endpoint_url(&self.base_url, segments)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("apiKey", &self.api_key);
        }
        debug!("Requesting {}", redact(url.as_str(), &self.api_key));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::Transport(format!("Request error: {e} for {what}")))?;
        read_json(response, what).await
    }
}

#[derive(Debug, Deserialize)]
struct AggregatesResponse {
    #[serde(default)]
    results: Option<Vec<AggregateBar>>,
}

#[derive(Debug, Deserialize)]
struct AggregateBar {
    /// Start of the window, in Unix milliseconds.
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    /// Polygon reports volume as a float.
    v: f64,
}

impl AggregateBar {
    fn into_bar(self) -> Result<Bar> {
        let date = Utc
            .timestamp_millis_opt(self.t)
            .single()
            .ok_or_else(|| LookupError::InvalidResponse(format!("Invalid timestamp: {}", self.t)))?
            .date_naive();
        Ok(Bar {
            date,
            open: self.o,
            high: self.h,
            low: self.l,
            close: self.c,
            volume: self.v.max(0.0).round() as u64,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TickerSearchResponse {
    #[serde(default)]
    results: Option<Vec<TickerSummary>>,
}

#[derive(Debug, Deserialize)]
struct TickerSummary {
    ticker: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TickerDetailsResponse {
    results: TickerDetails,
}

#[derive(Debug, Deserialize)]
struct TickerDetails {
    name: String,
    #[serde(default)]
    branding: Option<Branding>,
}

#[derive(Debug, Deserialize)]
struct Branding {
    logo_url: Option<String>,
    icon_url: Option<String>,
}

#[async_trait]
impl SeriesProvider for PolygonProvider {
    #[instrument(name = "PolygonAggregates", skip(self), fields(symbol = %symbol))]
    async fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>> {
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let data: AggregatesResponse = self
            .get(
                &["v2", "aggs", "ticker", symbol, "range", "1", "day", &start, &end],
                &[
                    ("adjusted", "true"),
                    ("sort", "desc"),
                    ("limit", AGGREGATES_LIMIT),
                ],
                symbol,
            )
            .await?;

        data.results
            .unwrap_or_default()
            .into_iter()
            .map(AggregateBar::into_bar)
            .collect()
    }
}

#[async_trait]
impl SymbolSearchProvider for PolygonProvider {
    #[instrument(name = "PolygonSearch", skip(self))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchCandidate>> {
        let limit = limit.to_string();
        let data: TickerSearchResponse = self
            .get(
                &["v3", "reference", "tickers"],
                &[("search", query), ("active", "true"), ("limit", limit.as_str())],
                query,
            )
            .await?;

        Ok(data
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|t| SearchCandidate {
                display_name: t.name.unwrap_or_else(|| t.ticker.clone()),
                identifier: t.ticker,
            })
            .collect())
    }
}

#[async_trait]
impl MetadataProvider for PolygonProvider {
    #[instrument(name = "PolygonTickerDetails", skip(self))]
    async fn fetch_metadata(&self, identifier: &str) -> Result<EntityMetadata> {
        let data: TickerDetailsResponse = self
            .get(&["v3", "reference", "tickers", identifier], &[], identifier)
            .await?;
        let branding = data.results.branding;

        Ok(EntityMetadata {
            display_name: data.results.name,
            logo_url: branding.and_then(|b| b.logo_url.or(b.icon_url)),
        })
    }
}
