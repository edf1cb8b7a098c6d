use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::config::RugCheckConfig;
use crate::errors::ScanError;
use crate::models::{Authority, LiquidityPool, Risk, RiskLevel, RiskReport};

#[async_trait]
pub trait RiskReports: Send + Sync {
    async fn fetch_risk_report(&self, address: &str) -> Result<RiskReport, ScanError>;
}

pub struct RugCheckClient {
    client: Client,
    base_url: String,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl RugCheckClient {
    pub fn new(config: &RugCheckConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("TokenScanner/1.0")
            .build()?;

        let per_minute = NonZeroU32::new(config.requests_per_minute)
            .ok_or_else(|| anyhow::anyhow!("rug_check.requests_per_minute must be > 0"))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        })
    }

    async fn request_report(&self, address: &str) -> anyhow::Result<RiskReport> {
        let url = format!("{}/tokens/{}/report", self.base_url, address);
        self.limiter.until_ready().await;

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("RugCheck API returned {}", response.status()));
        }

        let body = response.text().await?;
        Ok(parse_report(&body)?)
    }
}

#[async_trait]
impl RiskReports for RugCheckClient {
    /// Never fails: anything that goes wrong yields an empty (all unknown) report.
    async fn fetch_risk_report(&self, address: &str) -> Result<RiskReport, ScanError> {
        info!("🛡️ Fetching RugCheck report for {}", address);

        match self.request_report(address).await {
            Ok(report) => {
                if report.is_empty() {
                    debug!("RugCheck returned an empty report for {}", address);
                }
                Ok(report)
            }
            Err(e) => {
                warn!("RugCheck failed for {}: {}", address, e);
                Ok(RiskReport::default())
            }
        }
    }
}

pub fn parse_report(body: &str) -> Result<RiskReport, serde_json::Error> {
    let raw: RugCheckResponse = serde_json::from_str(body)?;
    Ok(raw.into())
}

#[derive(Debug, Deserialize)]
struct RugCheckResponse {
    score: Option<i64>,
    risks: Option<Vec<RawRisk>>,
    #[serde(rename = "mintAuthority", default, deserialize_with = "present")]
    mint_authority: Option<serde_json::Value>,
    #[serde(rename = "freezeAuthority", default, deserialize_with = "present")]
    freeze_authority: Option<serde_json::Value>,
    markets: Option<Vec<RawMarket>>,
}

#[derive(Debug, Deserialize)]
struct RawRisk {
    #[serde(default)]
    name: String,
    #[serde(default)]
    level: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawMarket {
    lp: Option<RawLp>,
}

#[derive(Debug, Deserialize)]
struct RawLp {
    #[serde(rename = "lpLockedPct")]
    lp_locked_pct: Option<f64>,
    #[serde(rename = "lpLockedUSD")]
    lp_locked_usd: Option<f64>,
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only a missing field stays `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Authorities arrive as null, an address string, or (Token-2022) an account object.
/// Null or an empty string is renounced, a missing field is unknown.
fn authority(value: Option<serde_json::Value>) -> Authority {
    match value {
        None => Authority::Unknown,
        Some(serde_json::Value::Null) => Authority::Renounced,
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Authority::Renounced,
        Some(serde_json::Value::String(s)) => Authority::Active(s),
        Some(other) => Authority::Active(other.to_string()),
    }
}

impl From<RugCheckResponse> for RiskReport {
    fn from(raw: RugCheckResponse) -> Self {
        RiskReport {
            score: raw.score,
            risks: raw.risks.map(|risks| {
                risks
                    .into_iter()
                    .map(|r| Risk {
                        level: RiskLevel::from(r.level.as_str()),
                        name: r.name,
                        description: r.description,
                    })
                    .collect()
            }),
            mint_authority: authority(raw.mint_authority),
            freeze_authority: authority(raw.freeze_authority),
            markets: raw
                .markets
                .unwrap_or_default()
                .into_iter()
                .map(|m| {
                    let lp = m.lp;
                    LiquidityPool {
                        locked_pct: lp.as_ref().and_then(|l| l.lp_locked_pct),
                        locked_usd: lp.as_ref().and_then(|l| l.lp_locked_usd),
                    }
                })
                .collect(),
        }
    }
}
