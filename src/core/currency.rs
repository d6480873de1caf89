//! Currency conversion abstractions

use crate::core::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversion rate between two currencies at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub base_code: String,
    pub quote_code: String,
    pub rate: f64,
    pub as_of: DateTime<Utc>,
}

/// Currency codes a rate service can convert from `base_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyList {
    pub base_code: String,
    pub codes: Vec<String>,
    pub as_of: DateTime<Utc>,
}

impl CurrencyList {
    pub fn contains(&self, code: &str) -> bool {
        self.codes.binary_search_by(|c| c.as_str().cmp(code)).is_ok()
    }
}

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_quote(&self, from: &str, to: &str) -> Result<Quote>;

    /// Codes are returned sorted ascending.
    async fn supported_codes(&self, base: &str) -> Result<CurrencyList>;
}
