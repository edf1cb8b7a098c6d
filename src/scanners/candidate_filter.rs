// Decides which freshly fetched pairs are worth a risk check this cycle.

use log::info;
use std::collections::HashSet;

use crate::config::FilterConfig;
use crate::models::TradingPair;

const HOUR_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct CandidateFilter {
    chain_id: String,
    /// Must have skin in the game
    min_liquidity_usd: f64,
    /// Must have real trading activity
    min_volume_24h_usd: f64,
    max_pair_age_ms: i64,
    max_candidates: usize,
}

impl CandidateFilter {
    pub fn new(config: &FilterConfig, chain_id: &str) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            min_liquidity_usd: config.min_liquidity_usd,
            min_volume_24h_usd: config.min_volume_24h_usd,
            max_pair_age_ms: i64::try_from(config.max_pair_age_hours)
                .unwrap_or(i64::MAX)
                .saturating_mul(HOUR_MS),
            max_candidates: config.max_candidates,
        }
    }

    /// Ordered, first-seen-wins candidate list capped at `max_candidates`.
    pub fn apply(&self, pairs: Vec<TradingPair>, now_ms: i64) -> Vec<TradingPair> {
        let total = pairs.len();
        let mut seen = HashSet::new();

        let candidates: Vec<TradingPair> = pairs
            .into_iter()
            .filter(|pair| self.should_track(pair, now_ms))
            .filter(|pair| seen.insert(pair.base_token.address.clone()))
            .take(self.max_candidates)
            .collect();

        info!("🎯 {} of {} pairs match criteria after filtering", candidates.len(), total);
        candidates
    }

    fn should_track(&self, pair: &TradingPair, now_ms: i64) -> bool {
        if pair.chain_id != self.chain_id {
            return false;
        }

        match pair.liquidity_usd {
            Some(usd) if usd >= self.min_liquidity_usd => {}
            _ => return false,
        }

        match pair.volume_24h {
            Some(h24) if h24 >= self.min_volume_24h_usd => {}
            _ => return false,
        }

        // Pairs without a creation time are given the benefit of the doubt
        if let Some(created) = pair.pair_created_at {
            if created < now_ms.saturating_sub(self.max_pair_age_ms) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::pair;

    const NOW: i64 = 1_760_000_000_000;
    const WEEK_MS: i64 = 7 * 24 * HOUR_MS;

    fn filter() -> CandidateFilter {
        CandidateFilter::new(&FilterConfig::default(), "solana")
    }

    fn at(address: &str, liquidity: f64, volume: f64, created_at: i64) -> TradingPair {
        let mut p = pair(address, liquidity, volume, 0);
        p.pair_created_at = Some(created_at);
        p
    }

    fn addresses(pairs: &[TradingPair]) -> Vec<&str> {
        pairs.iter().map(|p| p.address()).collect()
    }

    #[test]
    fn liquidity_floor_is_inclusive() {
        let kept = filter().apply(
            vec![at("low", 499.0, 5000.0, NOW), at("ok", 500.0, 5000.0, NOW)],
            NOW,
        );
        assert_eq!(addresses(&kept), vec!["ok"]);
    }

    #[test]
    fn volume_floor_is_inclusive() {
        let kept = filter().apply(
            vec![at("quiet", 5000.0, 999.0, NOW), at("busy", 5000.0, 1000.0, NOW)],
            NOW,
        );
        assert_eq!(addresses(&kept), vec!["busy"]);
    }

    #[test]
    fn pairs_older_than_seven_days_are_dropped() {
        let kept = filter().apply(
            vec![
                at("stale", 5000.0, 5000.0, NOW - WEEK_MS - 1),
                at("edge", 5000.0, 5000.0, NOW - WEEK_MS),
            ],
            NOW,
        );
        assert_eq!(addresses(&kept), vec!["edge"]);
    }

    #[test]
    fn huge_age_window_keeps_everything_instead_of_overflowing() {
        let config = FilterConfig {
            max_pair_age_hours: u64::MAX,
            ..FilterConfig::default()
        };
        let filter = CandidateFilter::new(&config, "solana");

        let kept = filter.apply(vec![at("ancient", 5000.0, 5000.0, 0)], NOW);

        assert_eq!(addresses(&kept), vec!["ancient"]);
    }

    #[test]
    fn other_chains_and_missing_metrics_are_dropped() {
        let mut eth = at("eth", 5000.0, 5000.0, NOW);
        eth.chain_id = "ethereum".into();
        let mut no_liquidity = at("nolp", 5000.0, 5000.0, NOW);
        no_liquidity.liquidity_usd = None;
        let mut no_volume = at("novol", 5000.0, 5000.0, NOW);
        no_volume.volume_24h = None;
        let mut undated = at("undated", 5000.0, 5000.0, NOW);
        undated.pair_created_at = None;

        let kept = filter().apply(vec![eth, no_liquidity, no_volume, undated], NOW);

        assert_eq!(addresses(&kept), vec!["undated"]);
    }

    #[test]
    fn duplicates_collapse_to_first_seen() {
        let first = at("same", 800.0, 2000.0, NOW);
        let second = at("same", 90000.0, 50000.0, NOW);

        let kept = filter().apply(vec![first, second], NOW);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].liquidity_usd, Some(800.0));
    }

    #[test]
    fn duplicate_of_a_rejected_pair_can_still_qualify() {
        let kept = filter().apply(
            vec![at("dup", 10.0, 2000.0, NOW), at("dup", 900.0, 2000.0, NOW)],
            NOW,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].liquidity_usd, Some(900.0));
    }

    #[test]
    fn result_is_capped_at_thirty() {
        let pairs: Vec<_> = (0..45)
            .map(|i| at(&format!("t{}", i), 5000.0, 5000.0, NOW))
            .collect();

        let kept = filter().apply(pairs, NOW);

        assert_eq!(kept.len(), 30);
        assert_eq!(kept[0].address(), "t0");
        assert_eq!(kept[29].address(), "t29");
    }
}
