pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::{PickerOptions, RateLookup, SeriesLookup, SeriesRange};
use crate::providers::{ExchangeRateApiProvider, PolygonProvider};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Convert {
        amount: Option<f64>,
        from: Option<String>,
        to: Option<String>,
    },
    Currencies {
        base: Option<String>,
    },
    Series {
        symbol: Option<String>,
        range: Option<SeriesRange>,
        show_bars: bool,
    },
    Search {
        query: String,
    },
    Pick {
        range: Option<SeriesRange>,
    },
}

fn rate_lookup(config: &AppConfig) -> Result<RateLookup> {
    let provider = ExchangeRateApiProvider::new(
        config.providers.exchange_rate_base_url(),
        &config.providers.exchange_rate_api_key()?,
        config.request_timeout(),
    )?;
    Ok(RateLookup::new(Arc::new(provider), config.conversion_trigger))
}

fn polygon_provider(config: &AppConfig) -> Result<Arc<PolygonProvider>> {
    let provider = PolygonProvider::new(
        config.providers.polygon_base_url(),
        &config.providers.polygon_api_key()?,
        config.request_timeout(),
    )?;
    Ok(Arc::new(provider))
}

fn series_lookup(polygon: &Arc<PolygonProvider>) -> SeriesLookup {
    SeriesLookup::new(polygon.clone()).with_metadata(polygon.clone())
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("marketpeek starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        trigger = ?config.conversion_trigger,
        timeout_secs = config.request_timeout_secs,
        "Loaded config"
    );
    let defaults = &config.defaults;

    match command {
        AppCommand::Convert { amount, from, to } => {
            let lookup = rate_lookup(&config)?;
            cli::convert::run(
                &lookup,
                amount.unwrap_or(defaults.amount),
                from.as_deref().unwrap_or(&defaults.from),
                to.as_deref().unwrap_or(&defaults.to),
            )
            .await
        }
        AppCommand::Currencies { base } => {
            let lookup = rate_lookup(&config)?;
            cli::convert::list_currencies(&lookup, base.as_deref().unwrap_or(&defaults.from))
                .await
        }
        AppCommand::Series {
            symbol,
            range,
            show_bars,
        } => {
            let range = match range {
                Some(range) => range,
                None => defaults.series_range()?,
            };
            let polygon = polygon_provider(&config)?;
            cli::series::run(
                &series_lookup(&polygon),
                symbol.as_deref().unwrap_or(&defaults.symbol),
                range,
                show_bars,
            )
            .await
        }
        AppCommand::Search { query } => {
            let polygon = polygon_provider(&config)?;
            cli::search::run(polygon.as_ref(), &query, config.picker.limit).await
        }
        AppCommand::Pick { range } => {
            let range = match range {
                Some(range) => range,
                None => defaults.series_range()?,
            };
            let polygon = polygon_provider(&config)?;
            cli::pick::run(
                polygon.clone(),
                PickerOptions::from(&config.picker),
                &series_lookup(&polygon),
                range,
            )
            .await
            .context("Picker session failed")
        }
    }
}
