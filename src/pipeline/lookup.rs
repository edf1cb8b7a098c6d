use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::analyzers::rug_check::RiskReports;
use crate::analyzers::safety_scorer;
use crate::database::TokenStore;
use crate::errors::LookupError;
use crate::models::{LookupResult, TokenSource, TradingPair};
use crate::pipeline::build_verified_token;
use crate::scanners::dex_screener::MarketData;
use crate::utils::is_valid_solana_address;

/// Read-only, single-address check used by the HTTP and Telegram surfaces.
pub struct TokenLookup {
    market: Arc<dyn MarketData>,
    risk: Arc<dyn RiskReports>,
    store: Arc<dyn TokenStore>,
    chain_id: String,
}

impl TokenLookup {
    pub fn new(
        market: Arc<dyn MarketData>,
        risk: Arc<dyn RiskReports>,
        store: Arc<dyn TokenStore>,
        chain_id: &str,
    ) -> Self {
        Self {
            market,
            risk,
            store,
            chain_id: chain_id.to_string(),
        }
    }

    /// Stored tokens are returned as-is. Anything else is scored live and
    /// never written back.
    pub async fn lookup(&self, address: &str) -> Result<LookupResult, LookupError> {
        let address = address.trim();
        if !is_valid_solana_address(address) {
            return Err(LookupError::InvalidAddress(address.to_string()));
        }

        if let Some(token) = self.store.get_by_contract(address).await? {
            info!("📦 {} served from database", token.token_symbol);
            return Ok(LookupResult {
                token,
                source: TokenSource::Database,
            });
        }

        let pairs = self.market.fetch_pairs(&[address.to_string()]).await;
        let pair = self
            .select_pair(&pairs)
            .ok_or_else(|| LookupError::NoTradingPair(address.to_string()))?;

        let report = self
            .risk
            .fetch_risk_report(address)
            .await
            .unwrap_or_default();
        let assessment = safety_scorer::assess(pair, &report);

        let now = Utc::now();
        let launch_time = pair.launch_time().unwrap_or(now);
        let mut token = build_verified_token(pair, &assessment, &self.chain_id, launch_time, now);
        token.risk_warnings = Some(assessment.warnings);

        info!(
            "🔎 Live lookup {} ({}) - Score: {}%",
            token.token_symbol, address, token.safety_score
        );
        Ok(LookupResult {
            token,
            source: TokenSource::Live,
        })
    }

    /// First pair on our chain, else the first pair at all.
    fn select_pair<'a>(&self, pairs: &'a [TradingPair]) -> Option<&'a TradingPair> {
        pairs
            .iter()
            .find(|p| p.chain_id == self.chain_id)
            .or_else(|| pairs.first())
    }
}
