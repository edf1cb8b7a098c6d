pub mod ingestion;
pub mod lookup;

use chrono::{DateTime, Utc};

use crate::analyzers::safety_scorer::SafetyAssessment;
use crate::models::{to_decimal, FailedToken, TradingPair, VerifiedToken};

pub fn solscan_url(address: &str) -> String {
    format!("https://solscan.io/token/{}", address)
}

pub fn rugcheck_url(address: &str) -> String {
    format!("https://rugcheck.xyz/tokens/{}", address)
}

/// Record for a token that cleared the safety check. Both the scan cycle and
/// interactive lookups build tokens through here so the two never drift.
pub fn build_verified_token(
    pair: &TradingPair,
    assessment: &SafetyAssessment,
    chain: &str,
    launch_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> VerifiedToken {
    let address = pair.address();

    VerifiedToken {
        id: None,
        token_name: pair.base_token.name.clone(),
        token_symbol: pair.base_token.symbol.clone(),
        contract_address: address.to_string(),
        chain: chain.to_string(),
        launch_time,
        current_price: pair.price_decimal(),
        market_cap: to_decimal(pair.fdv),
        liquidity_usd: to_decimal(pair.liquidity_usd),
        volume_24h: to_decimal(pair.volume_24h),
        price_change_24h: to_decimal(pair.price_change_24h),
        liquidity_locked: assessment.liquidity_locked,
        liquidity_lock_duration_months: assessment.liquidity_lock_duration_months,
        ownership_renounced: assessment.ownership_renounced,
        contract_verified: assessment.contract_verified,
        honeypot_safe: assessment.honeypot_safe,
        buy_tax: assessment.buy_tax,
        sell_tax: assessment.sell_tax,
        safety_score: i64::from(assessment.score),
        safety_reasons: assessment.reasons.clone(),
        risk_warnings: None,
        image_url: pair.image_url.clone(),
        dexscreener_url: Some(
            pair.url
                .clone()
                .unwrap_or_else(|| format!("https://dexscreener.com/{}/{}", chain, address)),
        ),
        solscan_url: Some(solscan_url(address)),
        rugcheck_url: Some(rugcheck_url(address)),
        twitter_url: pair.twitter_url.clone(),
        telegram_url: pair.telegram_url.clone(),
        website_url: pair.website_url.clone(),
        created_at: now,
        updated_at: now,
    }
}

pub fn build_failed_token(pair: &TradingPair, failure_reasons: Vec<String>, now: DateTime<Utc>) -> FailedToken {
    FailedToken {
        id: None,
        token_name: pair.base_token.name.clone(),
        token_symbol: pair.base_token.symbol.clone(),
        contract_address: pair.address().to_string(),
        failure_reasons,
        created_at: now,
    }
}
