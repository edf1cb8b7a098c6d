// src/models.rs
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseToken {
    pub address: String,
    pub name: String,
    pub symbol: String,
}

/// Snapshot of one trading pair as reported by the discovery API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingPair {
    pub chain_id: String,
    pub base_token: BaseToken,
    /// Price in USD, kept as the decimal string the API sends
    pub price_usd: Option<String>,
    pub liquidity_usd: Option<f64>,
    pub volume_24h: Option<f64>,
    /// Fully diluted valuation
    pub fdv: Option<f64>,
    /// Pair creation time, epoch millis
    pub pair_created_at: Option<i64>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub website_url: Option<String>,
    pub twitter_url: Option<String>,
    pub telegram_url: Option<String>,
    pub price_change_24h: Option<f64>,
}

impl TradingPair {
    pub fn address(&self) -> &str {
        &self.base_token.address
    }

    pub fn launch_time(&self) -> Option<DateTime<Utc>> {
        self.pair_created_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    pub fn price_decimal(&self) -> Option<Decimal> {
        self.price_usd.as_deref().and_then(|p| p.trim().parse().ok())
    }

    /// Market fields refreshed when an already verified token is rediscovered.
    pub fn market_update(&self) -> MarketUpdate {
        MarketUpdate {
            current_price: self.price_decimal(),
            market_cap: to_decimal(self.fdv),
            liquidity_usd: to_decimal(self.liquidity_usd),
            volume_24h: to_decimal(self.volume_24h),
            price_change_24h: to_decimal(self.price_change_24h),
            image_url: self.image_url.clone(),
        }
    }
}

pub fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value.and_then(|v| Decimal::try_from(v).ok())
}

// ---------------------------------------------------------------------------
// Risk report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Danger,
    Other(String),
}

impl From<&str> for RiskLevel {
    fn from(level: &str) -> Self {
        match level.trim().to_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            "danger" => RiskLevel::Danger,
            other => RiskLevel::Other(other.to_string()),
        }
    }
}

impl RiskLevel {
    pub fn is_severe(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Danger)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub name: String,
    pub level: RiskLevel,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityPool {
    pub locked_pct: Option<f64>,
    pub locked_usd: Option<f64>,
}

/// Mint or freeze authority as reported. A report that never mentions the
/// authority leaves it `Unknown`, which is not the same as renounced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    #[default]
    Unknown,
    Renounced,
    Active(String),
}

impl Authority {
    pub fn is_renounced(&self) -> bool {
        matches!(self, Authority::Renounced)
    }
}

/// Point-in-time risk report. Every field absent means "unknown".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    pub score: Option<i64>,
    /// `None` when the report carried no risk list at all
    pub risks: Option<Vec<Risk>>,
    pub mint_authority: Authority,
    pub freeze_authority: Authority,
    pub markets: Vec<LiquidityPool>,
}

impl RiskReport {
    pub fn is_empty(&self) -> bool {
        *self == RiskReport::default()
    }

    /// Liquidity pool of the primary market, if the report lists one.
    pub fn primary_pool(&self) -> Option<&LiquidityPool> {
        self.markets.first()
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedToken {
    pub id: Option<i64>,
    pub token_name: String,
    pub token_symbol: String,
    pub contract_address: String,
    pub chain: String,
    pub launch_time: DateTime<Utc>,
    pub current_price: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub liquidity_usd: Option<Decimal>,
    pub volume_24h: Option<Decimal>,
    pub price_change_24h: Option<Decimal>,
    pub liquidity_locked: bool,
    pub liquidity_lock_duration_months: Option<i64>,
    pub ownership_renounced: bool,
    pub contract_verified: bool,
    pub honeypot_safe: bool,
    pub buy_tax: Decimal,
    pub sell_tax: Decimal,
    pub safety_score: i64,
    pub safety_reasons: Vec<String>,
    /// Only filled for live lookups
    pub risk_warnings: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub dexscreener_url: Option<String>,
    pub solscan_url: Option<String>,
    pub rugcheck_url: Option<String>,
    pub twitter_url: Option<String>,
    pub telegram_url: Option<String>,
    pub website_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Market fields that may change on rediscovery. Safety fields never do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketUpdate {
    pub current_price: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub liquidity_usd: Option<Decimal>,
    pub volume_24h: Option<Decimal>,
    pub price_change_24h: Option<Decimal>,
    /// Applied only when the stored token has no image yet
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedToken {
    pub id: Option<i64>,
    pub token_name: String,
    pub token_symbol: String,
    pub contract_address: String,
    pub failure_reasons: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTrigger {
    Manual,
    Scheduled,
}

impl ScanTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanTrigger::Manual => "manual",
            ScanTrigger::Scheduled => "scheduled",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub scanned: u32,
    pub passed: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanLog {
    pub id: Option<i64>,
    pub scan_type: String,
    pub tokens_scanned: u32,
    pub tokens_passed: u32,
    pub tokens_failed: u32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScanLog {
    pub fn new(trigger: ScanTrigger, summary: ScanSummary, error_message: Option<String>) -> Self {
        Self {
            id: None,
            scan_type: trigger.as_str().to_string(),
            tokens_scanned: summary.scanned,
            tokens_passed: summary.passed,
            tokens_failed: summary.failed,
            error_message,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPage {
    pub tokens: Vec<VerifiedToken>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    Database,
    Live,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupResult {
    pub token: VerifiedToken,
    pub source: TokenSource,
}
