//! Daily price bars and the summary derived from them.

use crate::core::error::{LookupError, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// One day's open/high/low/close/volume for a traded instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// How far back a series lookup reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum SeriesRange {
    Week,
    Month,
    Quarter,
    HalfYear,
    Year,
}

impl SeriesRange {
    pub const ALL: [SeriesRange; 5] = [
        SeriesRange::Week,
        SeriesRange::Month,
        SeriesRange::Quarter,
        SeriesRange::HalfYear,
        SeriesRange::Year,
    ];

    pub fn days(&self) -> i64 {
        match self {
            SeriesRange::Week => 7,
            SeriesRange::Month => 30,
            SeriesRange::Quarter => 90,
            SeriesRange::HalfYear => 180,
            SeriesRange::Year => 365,
        }
    }

    pub fn to_duration(&self) -> Duration {
        Duration::days(self.days())
    }

    /// Window ending on `today`, both ends inclusive.
    pub fn window_ending(&self, today: NaiveDate) -> DateWindow {
        DateWindow {
            start: today - self.to_duration(),
            end: today,
        }
    }
}

impl Display for SeriesRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SeriesRange::Week => "7 days",
                SeriesRange::Month => "30 days",
                SeriesRange::Quarter => "3 months",
                SeriesRange::HalfYear => "6 months",
                SeriesRange::Year => "1 year",
            }
        )
    }
}

impl FromStr for SeriesRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "7" | "7d" => Ok(SeriesRange::Week),
            "30" | "30d" | "1m" => Ok(SeriesRange::Month),
            "90" | "90d" | "3m" => Ok(SeriesRange::Quarter),
            "180" | "180d" | "6m" => Ok(SeriesRange::HalfYear),
            "365" | "365d" | "1y" => Ok(SeriesRange::Year),
            _ => Err(anyhow!(
                "Invalid range: {} (expected one of 7, 30, 90, 180, 365)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Latest bar plus the change from the first open to the latest close.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub latest: Bar,
    pub change_abs: f64,
    pub change_pct: f64,
}

impl SeriesSummary {
    /// Derives the summary from bars in ascending date order.
    pub fn from_bars(bars: &[Bar]) -> Option<Self> {
        let first = bars.first()?;
        let latest = bars.last()?;
        let change_abs = latest.close - first.open;
        let change_pct = if first.open > 0.0 {
            change_abs / first.open * 100.0
        } else {
            0.0
        };

        Some(SeriesSummary {
            latest: latest.clone(),
            change_abs,
            change_pct,
        })
    }

    pub fn change_abs_display(&self) -> String {
        format!("{:.2}", self.change_abs)
    }

    pub fn change_pct_display(&self) -> String {
        format!("{:.2}", self.change_pct)
    }
}

/// Sorts bars ascending by date. When the same date appears more than once
/// the bar seen last in the input wins.
pub fn normalize_bars(mut bars: Vec<Bar>) -> Vec<Bar> {
    // Stable sort keeps input order among equal dates.
    bars.sort_by_key(|bar| bar.date);
    let mut normalized: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match normalized.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => normalized.push(bar),
        }
    }
    normalized
}

#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Daily bars for `symbol` between `start` and `end` inclusive, in any order.
    async fn fetch_bars(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
    -> Result<Vec<Bar>>;
}

/// Rejects empty symbols before a request is made.
pub fn validate_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(LookupError::InvalidInput(
            "symbol must not be empty".to_string(),
        ));
    }
    Ok(symbol)
}
