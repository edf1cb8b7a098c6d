// Test doubles shared by the unit tests of every module.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::analyzers::rug_check::RiskReports;
use crate::database::TokenStore;
use crate::errors::{ScanError, StoreError};
use crate::models::{
    Authority, BaseToken, FailedToken, LiquidityPool, MarketUpdate, Risk, RiskReport, ScanLog, ScanSummary,
    TradingPair, VerifiedToken,
};
use crate::scanners::dex_screener::MarketData;
use crate::telegram::Notifier;

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A Solana pair created `age_ms` ago, priced at 0.00042.
pub fn pair(address: &str, liquidity: f64, volume: f64, age_ms: i64) -> TradingPair {
    TradingPair {
        chain_id: "solana".to_string(),
        base_token: BaseToken {
            address: address.to_string(),
            name: format!("Token {}", address),
            symbol: "TKN".to_string(),
        },
        price_usd: Some("0.00042".to_string()),
        liquidity_usd: Some(liquidity),
        volume_24h: Some(volume),
        fdv: Some(250_000.0),
        pair_created_at: Some(now_ms() - age_ms),
        url: Some(format!("https://dexscreener.com/solana/{}", address)),
        image_url: None,
        website_url: None,
        twitter_url: None,
        telegram_url: None,
        price_change_24h: Some(12.5),
    }
}

/// Base58-looking address that passes Solana address validation.
pub fn mint(n: usize) -> String {
    let digits: String = n
        .to_string()
        .chars()
        .map(|c| if c == '0' { 'z' } else { c })
        .collect();
    format!("TokenMint{:x>30}", digits)
}

/// `None` authorities are renounced; the risk list is always present.
pub fn report(
    mint_authority: Option<&str>,
    freeze_authority: Option<&str>,
    locked_pct: Option<f64>,
    risks: Vec<Risk>,
) -> RiskReport {
    RiskReport {
        score: Some(100),
        risks: Some(risks),
        mint_authority: authority(mint_authority),
        freeze_authority: authority(freeze_authority),
        markets: locked_pct
            .map(|pct| {
                vec![LiquidityPool {
                    locked_pct: Some(pct),
                    locked_usd: Some(10_000.0),
                }]
            })
            .unwrap_or_default(),
    }
}

fn authority(address: Option<&str>) -> Authority {
    address.map_or(Authority::Renounced, |a| Authority::Active(a.to_string()))
}

/// Renounced authorities, 90% locked, no risks.
pub fn safe_report() -> RiskReport {
    report(None, None, Some(90.0), vec![])
}

/// Both authorities live, lock unknown, one danger flag.
pub fn risky_report() -> RiskReport {
    report(
        Some("MintAuthority111"),
        Some("FreezeAuthority111"),
        None,
        vec![Risk {
            name: "Top 10 holders".to_string(),
            level: "danger".into(),
            description: "Top holders own 90% of supply".to_string(),
        }],
    )
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockMarket {
    pub candidates: Vec<String>,
    pub pairs: Vec<TradingPair>,
    pub discovery_down: bool,
    batches: Mutex<Vec<usize>>,
}

impl MockMarket {
    /// Discovery returns every pair's address, in order.
    pub fn with_pairs(pairs: Vec<TradingPair>) -> Self {
        let mut seen = HashSet::new();
        let candidates = pairs
            .iter()
            .map(|p| p.address().to_string())
            .filter(|a| seen.insert(a.clone()))
            .collect();
        Self {
            candidates,
            pairs,
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            discovery_down: true,
            ..Default::default()
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketData for MockMarket {
    async fn discovery_candidates(&self) -> Result<Vec<String>, ScanError> {
        if self.discovery_down {
            return Err(ScanError::UpstreamUnavailable(
                "all discovery feeds failed".to_string(),
            ));
        }
        Ok(self.candidates.clone())
    }

    async fn fetch_pairs(&self, addresses: &[String]) -> Vec<TradingPair> {
        self.batches.lock().unwrap().push(addresses.len());
        self.pairs
            .iter()
            .filter(|p| addresses.iter().any(|a| a == p.address()))
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Risk reports
// ---------------------------------------------------------------------------

/// Addresses without a configured report get `safe_report()`.
#[derive(Default)]
pub struct MockRisk {
    reports: HashMap<String, RiskReport>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockRisk {
    pub fn with_report(mut self, address: &str, report: RiskReport) -> Self {
        self.reports.insert(address.to_string(), report);
        self
    }

    pub fn failing_for(mut self, address: &str) -> Self {
        self.failing.insert(address.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RiskReports for MockRisk {
    async fn fetch_risk_report(&self, address: &str) -> Result<RiskReport, ScanError> {
        self.calls.lock().unwrap().push(address.to_string());
        if self.failing.contains(address) {
            return Err(ScanError::RiskReport {
                address: address.to_string(),
                reason: "connection reset".to_string(),
            });
        }
        Ok(self
            .reports
            .get(address)
            .cloned()
            .unwrap_or_else(safe_report))
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// In-memory store with switches for the failure modes the pipeline must survive.
#[derive(Default)]
pub struct MemoryStore {
    verified: Mutex<Vec<VerifiedToken>>,
    failed: Mutex<Vec<FailedToken>>,
    logs: Mutex<Vec<ScanLog>>,
    updates: Mutex<Vec<String>>,
    writes: AtomicUsize,
    /// Reads fail as if the database were gone
    pub reads_unavailable: AtomicBool,
    /// Reads miss existing rows, like a concurrent writer racing the check
    pub stale_reads: AtomicBool,
}

impl MemoryStore {
    pub fn verified(&self) -> Vec<VerifiedToken> {
        self.verified.lock().unwrap().clone()
    }

    pub fn failed(&self) -> Vec<FailedToken> {
        self.failed.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<ScanLog> {
        self.logs.lock().unwrap().clone()
    }

    pub fn updated_addresses(&self) -> Vec<String> {
        self.updates.lock().unwrap().clone()
    }

    /// Every create/update call, including rejected ones.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get_by_contract(&self, address: &str) -> Result<Option<VerifiedToken>, StoreError> {
        if self.reads_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("pool closed".to_string()));
        }
        if self.stale_reads.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self
            .verified
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.contract_address == address)
            .cloned())
    }

    async fn create_verified_token(&self, token: &VerifiedToken) -> Result<i64, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut verified = self.verified.lock().unwrap();
        if verified.iter().any(|t| t.contract_address == token.contract_address) {
            return Err(StoreError::Duplicate(format!(
                "UNIQUE constraint failed: verified_tokens.contract_address ({})",
                token.contract_address
            )));
        }
        let id = verified.len() as i64 + 1;
        verified.push(VerifiedToken {
            id: Some(id),
            ..token.clone()
        });
        Ok(id)
    }

    async fn update_market_data(&self, address: &str, update: &MarketUpdate) -> Result<bool, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.updates.lock().unwrap().push(address.to_string());

        let mut verified = self.verified.lock().unwrap();
        let Some(token) = verified.iter_mut().find(|t| t.contract_address == address) else {
            return Ok(false);
        };
        token.current_price = update.current_price.or(token.current_price);
        token.market_cap = update.market_cap.or(token.market_cap);
        token.liquidity_usd = update.liquidity_usd.or(token.liquidity_usd);
        token.volume_24h = update.volume_24h.or(token.volume_24h);
        token.price_change_24h = update.price_change_24h.or(token.price_change_24h);
        if token.image_url.is_none() {
            token.image_url = update.image_url.clone();
        }
        token.updated_at = Utc::now();
        Ok(true)
    }

    async fn create_failed_token(&self, token: &FailedToken) -> Result<i64, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut failed = self.failed.lock().unwrap();
        failed.push(token.clone());
        Ok(failed.len() as i64)
    }

    async fn create_scan_log(&self, log: &ScanLog) -> Result<i64, StoreError> {
        let mut logs = self.logs.lock().unwrap();
        logs.push(log.clone());
        Ok(logs.len() as i64)
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    tokens: Mutex<Vec<String>>,
    summaries: Mutex<Vec<ScanSummary>>,
}

impl RecordingNotifier {
    pub fn notified(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn summaries(&self) -> Vec<ScanSummary> {
        self.summaries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_new_verified_token(&self, token: &VerifiedToken) -> bool {
        self.tokens.lock().unwrap().push(token.contract_address.clone());
        true
    }

    async fn notify_scan_summary(&self, summary: &ScanSummary) -> bool {
        self.summaries.lock().unwrap().push(*summary);
        true
    }
}
