use crate::core::picker::{DEFAULT_LIMIT, DEFAULT_MIN_QUERY_LEN, PickerOptions};
use crate::core::rate_lookup::TriggerPolicy;
use crate::core::series::SeriesRange;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const EXCHANGE_RATE_KEY_ENV: &str = "EXCHANGERATE_API_KEY";
pub const POLYGON_KEY_ENV: &str = "POLYGON_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PolygonProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub exchange_rate: Option<ExchangeRateProviderConfig>,
    pub polygon: Option<PolygonProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            exchange_rate: Some(ExchangeRateProviderConfig {
                base_url: "https://v6.exchangerate-api.com".to_string(),
                api_key: None,
            }),
            polygon: Some(PolygonProviderConfig {
                base_url: "https://api.polygon.io".to_string(),
                api_key: None,
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn exchange_rate_base_url(&self) -> &str {
        self.exchange_rate
            .as_ref()
            .map_or("https://v6.exchangerate-api.com", |p| &p.base_url)
    }

    pub fn polygon_base_url(&self) -> &str {
        self.polygon
            .as_ref()
            .map_or("https://api.polygon.io", |p| &p.base_url)
    }

    /// Key from the config file, falling back to `EXCHANGERATE_API_KEY`.
    pub fn exchange_rate_api_key(&self) -> Result<String> {
        resolve_key(
            self.exchange_rate.as_ref().and_then(|p| p.api_key.clone()),
            EXCHANGE_RATE_KEY_ENV,
        )
    }

    /// Key from the config file, falling back to `POLYGON_API_KEY`.
    pub fn polygon_api_key(&self) -> Result<String> {
        resolve_key(
            self.polygon.as_ref().and_then(|p| p.api_key.clone()),
            POLYGON_KEY_ENV,
        )
    }
}

fn resolve_key(configured: Option<String>, env_var: &str) -> Result<String> {
    configured
        .filter(|key| !key.trim().is_empty())
        .or_else(|| std::env::var(env_var).ok())
        .with_context(|| format!("No API key configured; set it in the config file or {env_var}"))
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DefaultsConfig {
    pub amount: f64,
    pub from: String,
    pub to: String,
    pub symbol: String,
    pub range: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        DefaultsConfig {
            amount: 1.0,
            from: "USD".to_string(),
            to: "IDR".to_string(),
            symbol: "AAPL".to_string(),
            range: "30".to_string(),
        }
    }
}

impl DefaultsConfig {
    pub fn series_range(&self) -> Result<SeriesRange> {
        self.range
            .parse()
            .with_context(|| format!("Invalid default range in config: {}", self.range))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PickerConfig {
    pub debounce_ms: u64,
    pub min_query_len: usize,
    pub limit: usize,
}

impl Default for PickerConfig {
    fn default() -> Self {
        PickerConfig {
            debounce_ms: 300,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl From<&PickerConfig> for PickerOptions {
    fn from(config: &PickerConfig) -> Self {
        PickerOptions {
            debounce: Duration::from_millis(config.debounce_ms),
            min_query_len: config.min_query_len,
            limit: config.limit,
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub picker: PickerConfig,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub conversion_trigger: TriggerPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            defaults: DefaultsConfig::default(),
            picker: PickerConfig::default(),
            request_timeout_secs: default_timeout_secs(),
            conversion_trigger: TriggerPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config at the default location, or built-in defaults when
    /// no file exists there yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "marketpeek", "marketpeek")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
