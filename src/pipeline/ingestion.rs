// One scan cycle: discover, filter, then check/score/persist each candidate in turn.

use chrono::Utc;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::analyzers::rug_check::RiskReports;
use crate::analyzers::safety_scorer;
use crate::database::TokenStore;
use crate::errors::{ScanError, StoreError};
use crate::models::{ScanLog, ScanSummary, ScanTrigger, TradingPair};
use crate::pipeline::{build_failed_token, build_verified_token};
use crate::scanners::candidate_filter::CandidateFilter;
use crate::scanners::dex_screener::{fetch_pairs_chunked, MarketData};
use crate::telegram::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Already verified, market figures refreshed
    Refreshed,
    Accepted,
    Rejected,
}

pub struct TokenScanner {
    market: Arc<dyn MarketData>,
    risk: Arc<dyn RiskReports>,
    store: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
    filter: CandidateFilter,
    chain_id: String,
    scan_summaries: bool,
    cycle_lock: Mutex<()>,
    abort: AtomicBool,
}

impl TokenScanner {
    pub fn new(
        market: Arc<dyn MarketData>,
        risk: Arc<dyn RiskReports>,
        store: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
        filter: CandidateFilter,
        chain_id: &str,
    ) -> Self {
        Self {
            market,
            risk,
            store,
            notifier,
            filter,
            chain_id: chain_id.to_string(),
            scan_summaries: false,
            cycle_lock: Mutex::new(()),
            abort: AtomicBool::new(false),
        }
    }

    pub fn with_scan_summaries(mut self, enabled: bool) -> Self {
        self.scan_summaries = enabled;
        self
    }

    pub fn is_running(&self) -> bool {
        self.cycle_lock.try_lock().is_err()
    }

    /// Asks the running cycle to stop before its next candidate.
    /// Returns false when no cycle is running.
    pub fn request_abort(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        warn!("🛑 Abort requested for the running scan cycle");
        self.abort.store(true, Ordering::SeqCst);
        true
    }

    /// Runs one full cycle. Exactly one ScanLog is written per started cycle,
    /// carrying the error message when the cycle had to stop early.
    pub async fn run_cycle(&self, trigger: ScanTrigger) -> Result<ScanSummary, ScanError> {
        let _guard = self
            .cycle_lock
            .try_lock()
            .map_err(|_| ScanError::AlreadyRunning)?;
        self.abort.store(false, Ordering::SeqCst);

        info!("🚀 Starting {} scan cycle", trigger.as_str());
        let mut summary = ScanSummary::default();
        let result = self.scan(&mut summary).await;

        let error_message = result.as_ref().err().map(|e| e.to_string());
        let log = ScanLog::new(trigger, summary, error_message);
        if let Err(e) = self.store.create_scan_log(&log).await {
            error!("❌ Failed to write scan log: {}", e);
        }

        match result {
            Ok(()) => {
                info!(
                    "✅ Scan complete: {} scanned, {} passed, {} failed",
                    summary.scanned, summary.passed, summary.failed
                );
                if self.scan_summaries {
                    self.notifier.notify_scan_summary(&summary).await;
                }
                Ok(summary)
            }
            Err(e) => {
                error!(
                    "❌ Scan cycle stopped after {} candidates: {}",
                    summary.scanned, e
                );
                Err(e)
            }
        }
    }

    async fn scan(&self, summary: &mut ScanSummary) -> Result<(), ScanError> {
        let addresses = self.market.discovery_candidates().await?;
        if addresses.is_empty() {
            info!("No new tokens discovered");
            return Ok(());
        }

        let pairs = fetch_pairs_chunked(self.market.as_ref(), &addresses).await;
        let candidates = self.filter.apply(pairs, Utc::now().timestamp_millis());

        for pair in &candidates {
            if self.abort.load(Ordering::SeqCst) {
                return Err(ScanError::Aborted);
            }

            summary.scanned += 1;
            match self.process_candidate(pair).await {
                Ok(Outcome::Accepted) => summary.passed += 1,
                Ok(Outcome::Rejected) => summary.failed += 1,
                Ok(Outcome::Refreshed) => {}
                Err(e) if e.is_cycle_fatal() => return Err(e),
                Err(e) => {
                    warn!("⚠️ Error processing {}: {}", pair.address(), e);
                    summary.failed += 1;
                }
            }
        }

        Ok(())
    }

    async fn process_candidate(&self, pair: &TradingPair) -> Result<Outcome, ScanError> {
        let address = pair.address();

        if self.store.get_by_contract(address).await?.is_some() {
            return self.refresh_market_data(pair).await;
        }

        let launch_time = validate_candidate(pair)?;
        let report = self.risk.fetch_risk_report(address).await?;
        let assessment = safety_scorer::assess(pair, &report);
        let now = Utc::now();

        if !assessment.passes() {
            info!(
                "❌ FAILED: {} ({}) - Score: {}%",
                pair.base_token.symbol, address, assessment.score
            );
            let failed = build_failed_token(pair, assessment.failure_reasons(), now);
            self.store.create_failed_token(&failed).await?;
            return Ok(Outcome::Rejected);
        }

        let mut token = build_verified_token(pair, &assessment, &self.chain_id, launch_time, now);
        match self.store.create_verified_token(&token).await {
            Ok(id) => token.id = Some(id),
            Err(StoreError::Duplicate(_)) => {
                warn!("{} was verified concurrently, refreshing instead", address);
                return self.refresh_market_data(pair).await;
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            "✅ PASSED: {} ({}) - Score: {}%",
            token.token_symbol, address, token.safety_score
        );
        if !self.notifier.notify_new_verified_token(&token).await {
            warn!("Notification for {} was not delivered", token.token_symbol);
        }
        Ok(Outcome::Accepted)
    }

    async fn refresh_market_data(&self, pair: &TradingPair) -> Result<Outcome, ScanError> {
        self.store
            .update_market_data(pair.address(), &pair.market_update())
            .await?;
        info!("🔄 Updated market data for {}", pair.base_token.symbol);
        Ok(Outcome::Refreshed)
    }
}

fn validate_candidate(pair: &TradingPair) -> Result<chrono::DateTime<Utc>, ScanError> {
    let malformed = |reason: &str| ScanError::MalformedPair {
        address: pair.address().to_string(),
        reason: reason.to_string(),
    };

    if pair.base_token.name.trim().is_empty() || pair.base_token.symbol.trim().is_empty() {
        return Err(malformed("missing token name or symbol"));
    }
    pair.launch_time()
        .ok_or_else(|| malformed("missing or invalid pairCreatedAt"))
}
