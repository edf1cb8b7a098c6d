// src/config.rs
// Scanner settings: what counts as a candidate, how often to scan, where to
// report. Defaults < scanner.toml < SCANNER_* environment variables.

use anyhow::{ensure, Result};
use config::{Environment, File, Source};
use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_CONFIG_FILE: &str = "scanner.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    /// Chain the scanner tracks, as named by DEX Screener
    pub chain_id: String,

    /// Seconds between scheduled scan cycles
    pub scan_interval_secs: u64,

    pub http: HttpConfig,
    pub filter: FilterConfig,
    pub dex_screener: DexScreenerConfig,
    pub rug_check: RugCheckConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum liquidity required (in USD)
    pub min_liquidity_usd: f64,

    /// Minimum 24h trading volume (in USD)
    pub min_volume_24h_usd: f64,

    /// Pairs older than this are no longer "new"
    pub max_pair_age_hours: u64,

    /// Candidates checked per cycle
    pub max_candidates: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DexScreenerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub requests_per_minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RugCheckConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub requests_per_minute: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: Option<String>,
    /// Numeric chat id or @channel username
    pub channel_id: Option<String>,
    /// Post a summary after every completed scan
    pub scan_summaries: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:token_scanner.db".to_string(),
            database_max_connections: 5,
            chain_id: "solana".to_string(),
            scan_interval_secs: 300,
            http: HttpConfig::default(),
            filter: FilterConfig::default(),
            dex_screener: DexScreenerConfig::default(),
            rug_check: RugCheckConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_liquidity_usd: 500.0,
            min_volume_24h_usd: 1000.0,
            max_pair_age_hours: 7 * 24,
            max_candidates: 30,
        }
    }
}

impl Default for DexScreenerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.dexscreener.com".to_string(),
            timeout_secs: 15,
            requests_per_minute: 60,
        }
    }
}

impl Default for RugCheckConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.rugcheck.xyz/v1".to_string(),
            timeout_secs: 15,
            requests_per_minute: 60,
        }
    }
}

impl Config {
    /// Reads `scanner.toml` (or the file named by `SCANNER_CONFIG`) when present,
    /// then applies `SCANNER_*` environment overrides.
    pub fn load() -> Result<Self> {
        let path = env::var("SCANNER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::load_from(File::with_name(&path).required(false))?;

        // Plain variable names are still honoured for the bot credentials
        if config.telegram.token.is_none() {
            config.telegram.token = env::var("TELEGRAM_BOT_TOKEN").ok();
        }
        if config.telegram.channel_id.is_none() {
            config.telegram.channel_id = env::var("TELEGRAM_CHANNEL_ID").ok();
        }

        config.validate()?;
        Ok(config)
    }

    fn load_from<S>(file: S) -> Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("SCANNER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.scan_interval_secs > 0, "scan_interval_secs must be > 0");
        ensure!(self.database_max_connections > 0, "database_max_connections must be > 0");
        ensure!(!self.chain_id.trim().is_empty(), "chain_id must not be empty");

        ensure!(self.filter.min_liquidity_usd >= 0.0, "filter.min_liquidity_usd must not be negative");
        ensure!(self.filter.min_volume_24h_usd >= 0.0, "filter.min_volume_24h_usd must not be negative");
        ensure!(self.filter.max_pair_age_hours > 0, "filter.max_pair_age_hours must be > 0");
        ensure!(self.filter.max_candidates > 0, "filter.max_candidates must be > 0");

        ensure!(self.dex_screener.requests_per_minute > 0, "dex_screener.requests_per_minute must be > 0");
        ensure!(self.dex_screener.timeout_secs > 0, "dex_screener.timeout_secs must be > 0");
        ensure!(self.rug_check.requests_per_minute > 0, "rug_check.requests_per_minute must be > 0");
        ensure!(self.rug_check.timeout_secs > 0, "rug_check.timeout_secs must be > 0");

        Ok(())
    }
}
