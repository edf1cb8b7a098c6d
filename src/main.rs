// src/main.rs
use anyhow::Result;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};

mod analyzers;
mod api;
mod config;
mod database;
mod errors;
mod models;
mod pipeline;
mod scanners;
mod telegram;
mod utils;

#[cfg(test)]
mod mocks;

use analyzers::rug_check::RugCheckClient;
use config::Config;
use database::Database;
use errors::ScanError;
use models::ScanTrigger;
use pipeline::{ingestion::TokenScanner, lookup::TokenLookup};
use scanners::{candidate_filter::CandidateFilter, dex_screener::DexScreenerClient};
use telegram::{DisabledNotifier, Notifier, TelegramBot};

/// 250ms polls, roughly 30 seconds
const SHUTDOWN_GRACE_POLLS: u32 = 120;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("🚀 Starting Solana Token Scanner");

    // Load configuration
    let config = Config::load()?;
    info!("✅ Configuration loaded");

    // Initialize database
    let db = Arc::new(Database::new(&config.database_url, config.database_max_connections).await?);
    db.migrate().await?;
    info!("✅ Database initialized");

    // Initialize Telegram bot
    let telegram = TelegramBot::from_config(&config.telegram).await?;
    let notifier: Arc<dyn Notifier> = match &telegram {
        Some(bot) => Arc::new(bot.clone()),
        None => Arc::new(DisabledNotifier),
    };

    let market = Arc::new(DexScreenerClient::new(&config.dex_screener, &config.chain_id)?);
    let risk = Arc::new(RugCheckClient::new(&config.rug_check)?);

    let scanner = TokenScanner::new(
        market.clone(),
        risk.clone(),
        db.clone(),
        notifier,
        CandidateFilter::new(&config.filter, &config.chain_id),
        &config.chain_id,
    )
    .with_scan_summaries(config.telegram.scan_summaries);
    let lookup = TokenLookup::new(market, risk, db.clone(), &config.chain_id);

    // Create shared state
    let app_state = Arc::new(AppState {
        config,
        db,
        scanner: Arc::new(scanner),
        lookup: Arc::new(lookup),
        telegram,
        running: RwLock::new(true),
    });

    let mut handles = vec![];

    handles.push(tokio::spawn(start_scheduled_scans(app_state.clone())));
    handles.push(tokio::spawn(start_http_api(app_state.clone())));
    if app_state.telegram.is_some() {
        handles.push(tokio::spawn(start_telegram_bot(app_state.clone())));
    }

    info!("🔥 All services started! Scanner is now running...");

    tokio::signal::ctrl_c().await?;
    warn!("🛑 Shutdown requested");
    *app_state.running.write().await = false;
    app_state.scanner.request_abort();

    // Let a running cycle stop at its next candidate and write its scan log
    for _ in 0..SHUTDOWN_GRACE_POLLS {
        if !app_state.scanner.is_running() {
            break;
        }
        sleep(Duration::from_millis(250)).await;
    }

    for handle in handles {
        handle.abort();
        if let Err(e) = handle.await {
            if !e.is_cancelled() {
                error!("Service error: {}", e);
            }
        }
    }

    info!("👋 Scanner stopped");
    Ok(())
}

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Arc<Database>,
    pub scanner: Arc<TokenScanner>,
    pub lookup: Arc<TokenLookup>,
    pub telegram: Option<TelegramBot>,
    pub running: RwLock<bool>,
}

async fn start_scheduled_scans(state: Arc<AppState>) {
    let mut ticker = interval(Duration::from_secs(state.config.scan_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        "⏰ Scheduled scans every {} seconds",
        state.config.scan_interval_secs
    );

    loop {
        ticker.tick().await;

        // Check if we should keep running
        if !*state.running.read().await {
            break;
        }

        // Other failures are already logged and recorded by the scanner
        if let Err(ScanError::AlreadyRunning) = state.scanner.run_cycle(ScanTrigger::Scheduled).await {
            info!("⏭️ Skipping scheduled scan, a manual scan is in progress");
        }
    }
}

async fn start_http_api(state: Arc<AppState>) {
    if let Err(e) = api::serve(state).await {
        error!("HTTP API stopped: {}", e);
    }
}

async fn start_telegram_bot(state: Arc<AppState>) {
    let Some(bot) = state.telegram.clone() else {
        return;
    };
    if let Err(e) = bot.start(state).await {
        error!("Telegram bot stopped: {}", e);
    }
}
