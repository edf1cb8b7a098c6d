// Market data side of the scanner:
// Pulls candidate addresses from the "latest profiles" and "boosted" feeds,
// then resolves them into trading pairs, at most 30 addresses per request.

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use log::{debug, info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::config::DexScreenerConfig;
use crate::errors::ScanError;
use crate::models::{BaseToken, TradingPair};

/// Provider limit on addresses per `/latest/dex/tokens` request.
pub const MAX_ADDRESSES_PER_REQUEST: usize = 30;
const PROFILES_CAP: usize = 50;
const BOOSTS_CAP: usize = 30;

#[async_trait]
pub trait MarketData: Send + Sync {
    /// Chain-filtered, deduplicated addresses from the discovery feeds.
    /// Errors only when every feed was unreachable.
    async fn discovery_candidates(&self) -> Result<Vec<String>, ScanError>;

    /// Pairs for one batch of at most `MAX_ADDRESSES_PER_REQUEST` addresses.
    /// Upstream failures yield an empty list. Use `fetch_pairs_chunked` for more.
    async fn fetch_pairs(&self, addresses: &[String]) -> Vec<TradingPair>;
}

/// Resolves any number of addresses, one request per chunk of 30.
pub async fn fetch_pairs_chunked(source: &dyn MarketData, addresses: &[String]) -> Vec<TradingPair> {
    let mut pairs = Vec::new();
    for batch in addresses.chunks(MAX_ADDRESSES_PER_REQUEST) {
        pairs.extend(source.fetch_pairs(batch).await);
    }
    pairs
}

/// Union of both feeds: chain filter, per-feed cap, first occurrence wins.
pub fn merge_discovery(profiles: &[TokenProfile], boosts: &[TokenProfile], chain_id: &str) -> Vec<String> {
    let from_feed = |feed: &[TokenProfile], cap: usize| -> Vec<String> {
        feed.iter()
            .filter(|p| p.chain_id == chain_id)
            .take(cap)
            .map(|p| p.token_address.clone())
            .collect()
    };

    let mut seen = HashSet::new();
    from_feed(profiles, PROFILES_CAP)
        .into_iter()
        .chain(from_feed(boosts, BOOSTS_CAP))
        .filter(|address| seen.insert(address.clone()))
        .collect()
}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct DexScreenerClient {
    client: Client,
    base_url: String,
    chain_id: String,
    limiter: DirectLimiter,
}

impl DexScreenerClient {
    pub fn new(config: &DexScreenerConfig, chain_id: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("TokenScanner/1.0")
            .build()?;

        let per_minute = NonZeroU32::new(config.requests_per_minute)
            .ok_or_else(|| anyhow::anyhow!("dex_screener.requests_per_minute must be > 0"))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chain_id: chain_id.to_string(),
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ScanError> {
        let url = format!("{}{}", self.base_url, path);
        self.limiter.until_ready().await;
        debug!("🌐 GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ScanError::UpstreamUnavailable(format!("DEX Screener request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ScanError::UpstreamUnavailable(format!(
                "DEX Screener API error: {} for {}",
                response.status(),
                path
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ScanError::UpstreamUnavailable(format!("DEX Screener body unreadable: {}", e)))
    }

    async fn fetch_feed(&self, path: &str) -> Result<Vec<TokenProfile>, ScanError> {
        let entries: Vec<serde_json::Value> = self.get_json(path).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect())
    }

}

/// Request path for one pair batch; `None` when the batch is empty or over the provider limit.
fn pair_request_path(addresses: &[String]) -> Option<String> {
    if addresses.is_empty() || addresses.len() > MAX_ADDRESSES_PER_REQUEST {
        return None;
    }
    Some(format!("/latest/dex/tokens/{}", addresses.join(",")))
}

#[async_trait]
impl MarketData for DexScreenerClient {
    async fn discovery_candidates(&self) -> Result<Vec<String>, ScanError> {
        let profiles = self.fetch_feed("/token-profiles/latest/v1").await;
        let boosts = self.fetch_feed("/token-boosts/latest/v1").await;

        if let (Err(profiles_err), Err(boosts_err)) = (&profiles, &boosts) {
            return Err(ScanError::UpstreamUnavailable(format!(
                "all discovery feeds failed ({}; {})",
                profiles_err, boosts_err
            )));
        }

        let profiles = profiles.unwrap_or_else(|e| {
            warn!("⚠️ Token profiles feed unavailable: {}", e);
            Vec::new()
        });
        let boosts = boosts.unwrap_or_else(|e| {
            warn!("⚠️ Token boosts feed unavailable: {}", e);
            Vec::new()
        });

        let addresses = merge_discovery(&profiles, &boosts, &self.chain_id);
        info!("🔍 Discovery: {} unique {} tokens to check", addresses.len(), self.chain_id);
        Ok(addresses)
    }

    async fn fetch_pairs(&self, addresses: &[String]) -> Vec<TradingPair> {
        let Some(path) = pair_request_path(addresses) else {
            if !addresses.is_empty() {
                warn!(
                    "Pair request with {} addresses exceeds the provider limit of {}, skipped",
                    addresses.len(),
                    MAX_ADDRESSES_PER_REQUEST
                );
            }
            return Vec::new();
        };

        match self.get_json::<PairsResponse>(&path).await {
            Ok(body) => parse_pairs(body),
            Err(e) => {
                warn!("⚠️ Pair batch of {} addresses skipped: {}", addresses.len(), e);
                Vec::new()
            }
        }
    }
}

/// Pairs that cannot be read individually are dropped; the rest of the batch survives.
fn parse_pairs(body: PairsResponse) -> Vec<TradingPair> {
    body.pairs
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<DexScreenerPair>(raw) {
            Ok(pair) => Some(pair.into()),
            Err(e) => {
                warn!("Skipping unreadable pair: {}", e);
                None
            }
        })
        .collect()
}

// DEX Screener API Response Types
#[derive(Debug, Clone, Deserialize)]
pub struct TokenProfile {
    #[serde(rename = "chainId")]
    pub chain_id: String,
    #[serde(rename = "tokenAddress")]
    pub token_address: String,
}

#[derive(Debug, Deserialize)]
struct PairsResponse {
    pairs: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct DexScreenerPair {
    #[serde(rename = "chainId")]
    chain_id: String,
    url: Option<String>,
    #[serde(rename = "baseToken")]
    base_token: RawBaseToken,
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
    fdv: Option<f64>,
    #[serde(rename = "pairCreatedAt")]
    pair_created_at: Option<i64>,
    liquidity: Option<Liquidity>,
    volume: Option<Volume>,
    #[serde(rename = "priceChange")]
    price_change: Option<PriceChange>,
    info: Option<PairInfo>,
}

#[derive(Debug, Deserialize)]
struct RawBaseToken {
    address: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct Liquidity {
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    h24: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PriceChange {
    h24: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PairInfo {
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
    #[serde(default)]
    websites: Vec<Website>,
    #[serde(default)]
    socials: Vec<Social>,
}

#[derive(Debug, Deserialize)]
struct Website {
    url: String,
}

#[derive(Debug, Deserialize)]
struct Social {
    #[serde(rename = "type")]
    kind: String,
    url: String,
}

impl From<DexScreenerPair> for TradingPair {
    fn from(raw: DexScreenerPair) -> Self {
        let info = raw.info;
        let social = |kind: &str| {
            info.as_ref()
                .and_then(|i| i.socials.iter().find(|s| s.kind == kind))
                .map(|s| s.url.clone())
        };

        TradingPair {
            chain_id: raw.chain_id,
            base_token: BaseToken {
                address: raw.base_token.address,
                name: raw.base_token.name,
                symbol: raw.base_token.symbol,
            },
            price_usd: raw.price_usd,
            liquidity_usd: raw.liquidity.and_then(|l| l.usd),
            volume_24h: raw.volume.and_then(|v| v.h24),
            fdv: raw.fdv,
            pair_created_at: raw.pair_created_at,
            url: raw.url,
            twitter_url: social("twitter"),
            telegram_url: social("telegram"),
            website_url: info.as_ref().and_then(|i| i.websites.first()).map(|w| w.url.clone()),
            image_url: info.as_ref().and_then(|i| i.image_url.clone()),
            price_change_24h: raw.price_change.and_then(|p| p.h24),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockMarket;

    fn profile(chain: &str, address: &str) -> TokenProfile {
        TokenProfile {
            chain_id: chain.to_string(),
            token_address: address.to_string(),
        }
    }

    #[tokio::test]
    async fn sixty_five_addresses_take_three_requests() {
        let market = MockMarket::default();
        let addresses: Vec<String> = (0..65).map(|i| format!("addr{}", i)).collect();

        fetch_pairs_chunked(&market, &addresses).await;

        assert_eq!(market.batch_sizes(), vec![30, 30, 5]);
    }

    #[test]
    fn pair_requests_never_exceed_the_provider_limit() {
        let full: Vec<String> = (0..30).map(|i| format!("addr{}", i)).collect();
        let over: Vec<String> = (0..31).map(|i| format!("addr{}", i)).collect();

        assert_eq!(
            pair_request_path(&full[..2]).as_deref(),
            Some("/latest/dex/tokens/addr0,addr1")
        );
        assert!(pair_request_path(&full).is_some());
        assert!(pair_request_path(&over).is_none());
        assert!(pair_request_path(&[]).is_none());
    }

    #[tokio::test]
    async fn no_addresses_means_no_requests() {
        let market = MockMarket::default();
        let pairs = fetch_pairs_chunked(&market, &[]).await;
        assert!(pairs.is_empty());
        assert!(market.batch_sizes().is_empty());
    }

    #[test]
    fn discovery_merge_filters_chain_and_dedupes() {
        let profiles = vec![
            profile("solana", "A"),
            profile("ethereum", "X"),
            profile("solana", "B"),
        ];
        let boosts = vec![profile("solana", "B"), profile("solana", "C")];

        let merged = merge_discovery(&profiles, &boosts, "solana");

        assert_eq!(merged, vec!["A", "B", "C"]);
    }

    #[test]
    fn discovery_feeds_are_capped_before_union() {
        let profiles: Vec<_> = (0..60).map(|i| profile("solana", &format!("p{}", i))).collect();
        let boosts: Vec<_> = (0..40).map(|i| profile("solana", &format!("b{}", i))).collect();

        let merged = merge_discovery(&profiles, &boosts, "solana");

        assert_eq!(merged.len(), 80);
        assert_eq!(merged[49], "p49");
        assert_eq!(merged[50], "b0");
        assert_eq!(merged.last().map(String::as_str), Some("b29"));
    }

    #[test]
    fn parses_pair_payload_and_skips_broken_entries() {
        let body: PairsResponse = serde_json::from_str(
            r#"{
                "pairs": [
                    {
                        "chainId": "solana",
                        "dexId": "raydium",
                        "url": "https://dexscreener.com/solana/pair1",
                        "pairAddress": "pair1",
                        "baseToken": {"address": "Mint1", "name": "Cat Coin", "symbol": "CAT"},
                        "priceUsd": "0.0012",
                        "priceChange": {"h1": 3.0, "h24": -12.5},
                        "liquidity": {"usd": 4200.5},
                        "volume": {"h24": 15000},
                        "fdv": 120000,
                        "pairCreatedAt": 1700000000000,
                        "info": {
                            "imageUrl": "https://img/cat.png",
                            "websites": [{"url": "https://cat.io"}],
                            "socials": [
                                {"type": "telegram", "url": "https://t.me/cat"},
                                {"type": "twitter", "url": "https://x.com/cat"}
                            ]
                        }
                    },
                    {"chainId": "solana", "baseToken": {"name": "no address"}}
                ]
            }"#,
        )
        .unwrap();

        let pairs = parse_pairs(body);

        assert_eq!(pairs.len(), 1);
        let pair = &pairs[0];
        assert_eq!(pair.address(), "Mint1");
        assert_eq!(pair.base_token.symbol, "CAT");
        assert_eq!(pair.liquidity_usd, Some(4200.5));
        assert_eq!(pair.volume_24h, Some(15000.0));
        assert_eq!(pair.price_change_24h, Some(-12.5));
        assert_eq!(pair.twitter_url.as_deref(), Some("https://x.com/cat"));
        assert_eq!(pair.telegram_url.as_deref(), Some("https://t.me/cat"));
        assert_eq!(pair.website_url.as_deref(), Some("https://cat.io"));
        assert_eq!(pair.image_url.as_deref(), Some("https://img/cat.png"));
    }

    #[test]
    fn missing_pairs_field_is_empty() {
        let body: PairsResponse = serde_json::from_str(r#"{"schemaVersion": "1.0.0", "pairs": null}"#).unwrap();
        assert!(parse_pairs(body).is_empty());
    }
}
