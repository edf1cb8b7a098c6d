use log::debug;
use rust_decimal::Decimal;

use crate::models::{Authority, RiskReport, TradingPair};

/// Minimum score for a token to be verified.
pub const PASS_THRESHOLD: u8 = 50;

const OWNERSHIP_POINTS: u8 = 25;
const LIQUIDITY_LOCK_POINTS: u8 = 25;
const RISK_FLAGS_POINTS: u8 = 25;
const VISIBILITY_POINTS: u8 = 15;
const VISIBILITY_FLOOR_POINTS: u8 = 5;
const TAX_POINTS: u8 = 10;

const LOCKED_PCT_REQUIRED: f64 = 80.0;
const LOCKED_PCT_HIGH_RISK: f64 = 50.0;
const VISIBLE_LIQUIDITY_USD: f64 = 1000.0;
const MAX_ACCEPTABLE_TAX: i64 = 10;
/// Assumed lock length whenever the lock threshold is met
const ASSUMED_LOCK_MONTHS: i64 = 6;

pub fn passes_threshold(score: u8) -> bool {
    score >= PASS_THRESHOLD
}

/// Outcome of scoring one token. Reasons and warnings follow criterion order.
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyAssessment {
    pub score: u8,
    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
    pub ownership_renounced: bool,
    pub liquidity_locked: bool,
    pub liquidity_lock_duration_months: Option<i64>,
    pub honeypot_safe: bool,
    /// Severe flags were reported, as opposed to the risk list being unknown
    pub high_risks_found: bool,
    pub contract_verified: bool,
    pub buy_tax: Decimal,
    pub sell_tax: Decimal,
}

impl SafetyAssessment {
    pub fn passes(&self) -> bool {
        passes_threshold(self.score)
    }

    pub fn has_high_risks(&self) -> bool {
        self.high_risks_found
    }

    /// Audit reasons recorded for a rejected token.
    pub fn failure_reasons(&self) -> Vec<String> {
        let mut reasons = vec![format!("Safety score {}% below threshold", self.score)];
        if self.has_high_risks() {
            reasons.push("High-risk indicators found".to_string());
        }
        reasons
    }
}

/// Scores a token from its pair snapshot and risk report. Pure and deterministic.
pub fn assess(pair: &TradingPair, report: &RiskReport) -> SafetyAssessment {
    let mut card = ScoreCard::default();

    let ownership_renounced = score_ownership(report, &mut card);
    let liquidity_locked = score_liquidity_lock(report, &mut card);
    let (honeypot_safe, high_risks_found) = score_risk_flags(report, &mut card);
    score_visibility(pair, &mut card);
    let (buy_tax, sell_tax) = score_taxes(&mut card);

    debug!(
        "📊 {} scored {} ({} reasons, {} warnings)",
        pair.base_token.symbol,
        card.score,
        card.reasons.len(),
        card.warnings.len()
    );

    SafetyAssessment {
        score: card.score,
        reasons: card.reasons,
        warnings: card.warnings,
        ownership_renounced,
        liquidity_locked,
        liquidity_lock_duration_months: liquidity_locked.then_some(ASSUMED_LOCK_MONTHS),
        honeypot_safe,
        high_risks_found,
        // Having a Dexscreener pair at all is what "verified" means here
        contract_verified: true,
        buy_tax,
        sell_tax,
    }
}

#[derive(Debug, Default)]
struct ScoreCard {
    score: u8,
    reasons: Vec<String>,
    warnings: Vec<String>,
}

impl ScoreCard {
    fn award(&mut self, points: u8, reason: impl Into<String>) {
        self.score = self.score.saturating_add(points).min(100);
        self.reasons.push(reason.into());
    }

    fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

fn score_ownership(report: &RiskReport, card: &mut ScoreCard) -> bool {
    if report.mint_authority.is_renounced() && report.freeze_authority.is_renounced() {
        card.award(OWNERSHIP_POINTS, "Mint and freeze authority renounced");
        return true;
    }

    match report.mint_authority {
        Authority::Active(_) => card.warn("Mint authority not renounced - supply can be inflated"),
        Authority::Unknown => card.warn("Mint authority status unknown"),
        Authority::Renounced => {}
    }
    match report.freeze_authority {
        Authority::Active(_) => card.warn("Freeze authority not renounced - holder accounts can be frozen"),
        Authority::Unknown => card.warn("Freeze authority status unknown"),
        Authority::Renounced => {}
    }
    false
}

fn score_liquidity_lock(report: &RiskReport, card: &mut ScoreCard) -> bool {
    let locked_pct = report.primary_pool().and_then(|lp| lp.locked_pct);

    match locked_pct {
        Some(pct) if pct >= LOCKED_PCT_REQUIRED => {
            card.award(LIQUIDITY_LOCK_POINTS, format!("{}% liquidity locked", pct));
            true
        }
        Some(pct) if pct < LOCKED_PCT_HIGH_RISK => {
            card.warn(format!("Only {}% liquidity locked - high rug risk", pct));
            false
        }
        Some(pct) => {
            card.warn(format!("{}% liquidity locked - moderate risk", pct));
            false
        }
        None => {
            card.warn("Liquidity lock status unknown - high rug risk");
            false
        }
    }
}

/// Returns (no severe flags, severe flags reported).
fn score_risk_flags(report: &RiskReport, card: &mut ScoreCard) -> (bool, bool) {
    let Some(risks) = report.risks.as_deref() else {
        card.warn("Risk flags unknown - report unavailable");
        return (false, false);
    };
    let severe: Vec<_> = risks.iter().filter(|r| r.level.is_severe()).collect();

    if severe.is_empty() {
        card.award(RISK_FLAGS_POINTS, "No high-risk indicators detected");
        return (true, false);
    }

    for risk in severe {
        card.warn(format!("{}: {}", risk.name, risk.description));
    }
    (false, true)
}

fn score_visibility(pair: &TradingPair, card: &mut ScoreCard) {
    match pair.liquidity_usd {
        Some(usd) if usd > VISIBLE_LIQUIDITY_USD => {
            card.award(VISIBILITY_POINTS, "Contract visible on Dexscreener");
        }
        _ => {
            card.score = card.score.saturating_add(VISIBILITY_FLOOR_POINTS);
            card.warn("Very low liquidity - high slippage risk");
        }
    }
}

// TODO: replace the fixed 0/0 taxes with a buy/sell simulation result once one is available.
fn score_taxes(card: &mut ScoreCard) -> (Decimal, Decimal) {
    let buy_tax = Decimal::ZERO;
    let sell_tax = Decimal::ZERO;
    let limit = Decimal::from(MAX_ACCEPTABLE_TAX);

    if buy_tax < limit && sell_tax < limit {
        card.award(TAX_POINTS, "Taxes within acceptable range");
    }
    (buy_tax, sell_tax)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{pair, report, safe_report};
    use crate::models::{LiquidityPool, Risk, RiskLevel};

    fn risk(name: &str, level: &str, description: &str) -> Risk {
        Risk {
            name: name.into(),
            level: RiskLevel::from(level),
            description: description.into(),
        }
    }

    #[test]
    fn fully_safe_token_scores_one_hundred() {
        let assessment = assess(&pair("Mint1", 5000.0, 10000.0, 3_600_000), &report(None, None, Some(90.0), vec![]));

        assert_eq!(assessment.score, 100);
        assert!(assessment.passes());
        assert_eq!(
            assessment.reasons,
            vec![
                "Mint and freeze authority renounced",
                "90% liquidity locked",
                "No high-risk indicators detected",
                "Contract visible on Dexscreener",
                "Taxes within acceptable range",
            ]
        );
        assert!(assessment.warnings.is_empty());
        assert_eq!(assessment.liquidity_lock_duration_months, Some(6));
    }

    #[test]
    fn scoring_is_deterministic() {
        let p = pair("Mint1", 800.0, 2000.0, 0);
        let r = report(Some("Auth"), None, Some(60.0), vec![risk("Rug", "danger", "Creator sold")]);

        assert_eq!(assess(&p, &r), assess(&p, &r));
    }

    #[test]
    fn ownership_only_with_visible_liquidity_sits_on_the_threshold() {
        let r = report(None, None, None, vec![risk("Holders", "high", "Concentrated")]);

        let assessment = assess(&pair("Mint1", 1000.01, 5000.0, 0), &r);

        assert_eq!(assessment.score, 50);
        assert!(assessment.passes());
    }

    #[test]
    fn ownership_only_with_thin_liquidity_fails() {
        let r = report(None, None, None, vec![risk("Holders", "high", "Concentrated")]);

        let assessment = assess(&pair("Mint1", 1000.0, 5000.0, 0), &r);

        assert_eq!(assessment.score, 40);
        assert!(!assessment.passes());
        assert!(assessment.warnings.contains(&"Very low liquidity - high slippage risk".to_string()));
        assert_eq!(
            assessment.failure_reasons(),
            vec!["Safety score 40% below threshold", "High-risk indicators found"]
        );
    }

    #[test]
    fn threshold_boundary() {
        assert!(passes_threshold(50));
        assert!(!passes_threshold(49));
    }

    #[test]
    fn empty_report_awards_nothing_for_unknown_criteria() {
        let assessment = assess(&pair("Mint1", 5000.0, 5000.0, 0), &RiskReport::default());

        // Only visibility and the tax stand-in score
        assert_eq!(assessment.score, 25);
        assert!(!assessment.passes());
        assert!(!assessment.ownership_renounced);
        assert!(!assessment.liquidity_locked);
        assert!(!assessment.honeypot_safe);
        assert!(!assessment.has_high_risks());
        assert_eq!(
            assessment.reasons,
            vec!["Contract visible on Dexscreener", "Taxes within acceptable range"]
        );
        assert_eq!(
            assessment.warnings,
            vec![
                "Mint authority status unknown",
                "Freeze authority status unknown",
                "Liquidity lock status unknown - high rug risk",
                "Risk flags unknown - report unavailable",
            ]
        );
        assert_eq!(assessment.failure_reasons(), vec!["Safety score 25% below threshold"]);
    }

    #[test]
    fn one_unknown_authority_withholds_the_ownership_points() {
        let mut r = safe_report();
        r.freeze_authority = Authority::Unknown;

        let assessment = assess(&pair("Mint1", 5000.0, 5000.0, 0), &r);

        assert_eq!(assessment.score, 75);
        assert!(!assessment.ownership_renounced);
        assert_eq!(assessment.warnings, vec!["Freeze authority status unknown"]);
    }

    #[test]
    fn warnings_follow_criterion_order() {
        let r = report(
            Some("MintAuth"),
            Some("FreezeAuth"),
            Some(30.0),
            vec![
                risk("Top 10 holders", "danger", "High concentration"),
                risk("Mutable metadata", "warn", "Can change"),
                risk("Creator history", "HIGH", "Rugged before"),
            ],
        );

        let assessment = assess(&pair("Mint1", 700.0, 5000.0, 0), &r);

        assert_eq!(assessment.score, 15);
        assert_eq!(assessment.reasons, vec!["Taxes within acceptable range"]);
        assert_eq!(
            assessment.warnings,
            vec![
                "Mint authority not renounced - supply can be inflated",
                "Freeze authority not renounced - holder accounts can be frozen",
                "Only 30% liquidity locked - high rug risk",
                "Top 10 holders: High concentration",
                "Creator history: Rugged before",
                "Very low liquidity - high slippage risk",
            ]
        );
    }

    #[test]
    fn partial_lock_is_a_moderate_risk() {
        let assessment = assess(&pair("Mint1", 5000.0, 5000.0, 0), &report(None, None, Some(79.9), vec![]));

        assert!(!assessment.liquidity_locked);
        assert_eq!(assessment.liquidity_lock_duration_months, None);
        assert_eq!(assessment.warnings, vec!["79.9% liquidity locked - moderate risk"]);
        assert_eq!(assessment.score, 75);
    }

    #[test]
    fn only_the_primary_market_counts() {
        let mut r = report(None, None, Some(10.0), vec![]);
        r.markets.push(LiquidityPool {
            locked_pct: Some(100.0),
            locked_usd: None,
        });

        assert!(!assess(&pair("Mint1", 5000.0, 5000.0, 0), &r).liquidity_locked);
    }

    #[test]
    fn taxes_always_pass_for_now() {
        let assessment = assess(&pair("Mint1", 5000.0, 5000.0, 0), &RiskReport::default());
        assert_eq!(assessment.buy_tax, Decimal::ZERO);
        assert_eq!(assessment.sell_tax, Decimal::ZERO);
        assert_eq!(assessment.reasons.last().map(String::as_str), Some("Taxes within acceptable range"));
    }
}
