// src/telegram.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{ChatId, InputFile, ParseMode, Recipient},
    utils::command::BotCommands,
    Bot,
};

use crate::config::TelegramConfig;
use crate::errors::{LookupError, ScanError};
use crate::models::{LookupResult, ScanSummary, ScanTrigger, TokenSource, VerifiedToken};
use crate::utils::{format_change, format_price, format_usd};
use crate::AppState;

/// Telegram rejects photo captions longer than this
const MAX_CAPTION_LEN: usize = 1024;

/// Best-effort delivery of pipeline events. Never affects pipeline outcomes.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_new_verified_token(&self, token: &VerifiedToken) -> bool;

    async fn notify_scan_summary(&self, _summary: &ScanSummary) -> bool {
        false
    }
}

/// Used when no bot token or channel is configured.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify_new_verified_token(&self, _token: &VerifiedToken) -> bool {
        false
    }
}

#[derive(Clone)]
pub struct TelegramBot {
    bot: Bot,
    channel: Recipient,
}

impl TelegramBot {
    /// Returns `None` when Telegram is not configured.
    pub async fn from_config(config: &TelegramConfig) -> Result<Option<Self>> {
        match (&config.token, &config.channel_id) {
            (Some(token), Some(channel)) if !token.is_empty() && !channel.is_empty() => {
                Ok(Some(Self::new(token, channel).await?))
            }
            _ => {
                info!("Telegram token or channel not configured, notifications disabled");
                Ok(None)
            }
        }
    }

    pub async fn new(token: &str, channel_id: &str) -> Result<Self> {
        let bot = Bot::new(token);

        // Test the bot connection
        match bot.get_me().await {
            Ok(me) => {
                info!("✅ Telegram bot connected: @{}", me.username());
            }
            Err(e) => {
                error!("❌ Failed to connect to Telegram: {}", e);
                return Err(anyhow::anyhow!("Telegram connection failed: {}", e));
            }
        }

        Ok(Self {
            bot,
            channel: parse_recipient(channel_id),
        })
    }

    /// Serves operator commands until the process shuts down.
    pub async fn start(&self, state: Arc<AppState>) -> Result<()> {
        info!("🤖 Starting Telegram command handler...");

        let handler = Update::filter_message()
            .filter_command::<Command>()
            .endpoint(answer_command);

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![state])
            .default_handler(|upd| async move {
                log::debug!("Unhandled update: {:?}", upd);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }

    async fn send_alert(&self, token: &VerifiedToken) -> Result<()> {
        let message = format_token_alert(token);

        if let Some(image) = token.image_url.as_deref() {
            if message.chars().count() <= MAX_CAPTION_LEN {
                if let Ok(url) = reqwest::Url::parse(image) {
                    self.bot
                        .send_photo(self.channel.clone(), InputFile::url(url))
                        .caption(message)
                        .parse_mode(ParseMode::MarkdownV2)
                        .await?;
                    return Ok(());
                }
            }
        }

        self.bot
            .send_message(self.channel.clone(), message)
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramBot {
    async fn notify_new_verified_token(&self, token: &VerifiedToken) -> bool {
        match self.send_alert(token).await {
            Ok(()) => {
                info!("📨 Sent alert for {}", token.token_symbol);
                true
            }
            Err(e) => {
                error!("Failed to send token alert for {}: {}", token.token_symbol, e);
                false
            }
        }
    }

    async fn notify_scan_summary(&self, summary: &ScanSummary) -> bool {
        let result = self
            .bot
            .send_message(self.channel.clone(), format_scan_summary(summary))
            .parse_mode(ParseMode::MarkdownV2)
            .await;

        if let Err(e) = result {
            error!("Failed to send scan summary: {}", e);
            return false;
        }
        true
    }
}

/// Numeric ids address chats directly, anything else is treated as a channel username.
fn parse_recipient(channel_id: &str) -> Recipient {
    match channel_id.trim().parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(channel_id.trim().to_string()),
    }
}

// Helper function to escape MarkdownV2 special characters
fn escape_markdown_v2(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '=' | '|' | '{' | '}' | '.' | '!' | '\\' => {
                format!("\\{}", c)
            }
            _ => c.to_string(),
        })
        .collect()
}

/// Inside `(...)` of a link only `)` and `\` are special.
fn escape_link_url(url: &str) -> String {
    url.replace('\\', "\\\\").replace(')', "\\)")
}

fn safety_badge(score: i64) -> &'static str {
    match score {
        s if s >= 75 => "[SAFE]",
        s if s >= 50 => "[CAUTION]",
        _ => "[RISK]",
    }
}

fn token_links(token: &VerifiedToken) -> String {
    [
        ("Dexscreener", &token.dexscreener_url),
        ("Solscan", &token.solscan_url),
        ("RugCheck", &token.rugcheck_url),
        ("Twitter", &token.twitter_url),
        ("Telegram", &token.telegram_url),
        ("Website", &token.website_url),
    ]
    .iter()
    .filter_map(|(label, url)| {
        url.as_deref()
            .map(|u| format!("[{}]({})", label, escape_link_url(u)))
    })
    .collect::<Vec<_>>()
    .join(" \\| ")
}

fn token_details(token: &VerifiedToken) -> String {
    let price = token
        .current_price
        .map(format_price)
        .unwrap_or_else(|| "N/A".to_string());
    let change = match token.price_change_24h {
        Some(c) if c.is_sign_negative() => format!("📉 {}", format_change(c)),
        Some(c) => format!("📈 {}", format_change(c)),
        None => String::new(),
    };

    let mut message = format!(
        "*{}* \\- {}\n\n\
         {} Safety Score: *{}%*\n\n\
         💵 Price: {} {}\n\
         🏦 Market Cap: {}\n\
         💧 Liquidity: {}\n\
         📊 24h Volume: {}\n\n",
        escape_markdown_v2(&token.token_symbol),
        escape_markdown_v2(&token.token_name),
        escape_markdown_v2(safety_badge(token.safety_score)),
        token.safety_score,
        escape_markdown_v2(&price),
        escape_markdown_v2(&change),
        escape_markdown_v2(&format_usd(token.market_cap)),
        escape_markdown_v2(&format_usd(token.liquidity_usd)),
        escape_markdown_v2(&format_usd(token.volume_24h)),
    );

    message.push_str("*Safety Analysis:*\n");
    for reason in &token.safety_reasons {
        message.push_str(&format!("✅ {}\n", escape_markdown_v2(reason)));
    }
    for warning in token.risk_warnings.iter().flatten() {
        message.push_str(&format!("⚠️ {}\n", escape_markdown_v2(warning)));
    }

    message.push_str(&format!(
        "\n*Contract:*\n`{}`\n\n*Links:*\n{}",
        token.contract_address,
        token_links(token)
    ));
    message
}

pub fn format_token_alert(token: &VerifiedToken) -> String {
    format!("🚀 *NEW TOKEN VERIFIED*\n\n{}", token_details(token))
}

fn format_lookup(result: &LookupResult) -> String {
    let source = match result.source {
        TokenSource::Database => "📦 Verified earlier by the scanner",
        TokenSource::Live => "🔎 Live check, not stored",
    };
    format!("{}\n\n{}", source, token_details(&result.token))
}

pub fn format_scan_summary(summary: &ScanSummary) -> String {
    format!(
        "🔍 *Scan Complete*\n\n\
         Tokens Scanned: {}\n\
         ✅ Passed: {}\n\
         ❌ Failed: {}\n\n\
         _{}_",
        summary.scanned,
        summary.passed,
        summary.failed,
        escape_markdown_v2(&Utc::now().format("%Y-%m-%d %H:%M UTC").to_string())
    )
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Token Scanner Commands:")]
enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Show help message")]
    Help,
    #[command(description = "Run a scan cycle now")]
    Scan,
    #[command(description = "Check a token: /lookup <contract address>")]
    Lookup(String),
    #[command(description = "Show recently verified tokens")]
    Recent,
    #[command(description = "Show scanner status")]
    Status,
    #[command(description = "Abort the running scan")]
    Abort,
}

async fn answer_command(bot: Bot, msg: Message, cmd: Command, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id;

    let response = match cmd {
        Command::Start => {
            "🤖 Welcome to the Solana Token Scanner!\n\n\
             🔍 New tokens are checked for renounced authorities, locked liquidity and risk flags.\n\
             ✅ Tokens that pass are announced in the channel.\n\n\
             Use /help to see all available commands.".to_string()
        }
        Command::Help => Command::descriptions().to_string(),
        Command::Scan => {
            if state.scanner.is_running() {
                "⏳ A scan is already running".to_string()
            } else {
                let scanner = state.scanner.clone();
                let bot = bot.clone();
                tokio::spawn(async move {
                    let text = match scanner.run_cycle(ScanTrigger::Manual).await {
                        Ok(summary) => format!(
                            "✅ Scan finished: {} scanned, {} passed, {} failed",
                            summary.scanned, summary.passed, summary.failed
                        ),
                        Err(ScanError::AlreadyRunning) => "⏳ A scan is already running".to_string(),
                        Err(e) => format!("❌ Scan failed: {}", e),
                    };
                    if let Err(e) = bot.send_message(chat_id, text).await {
                        warn!("Failed to report scan result: {}", e);
                    }
                });
                "🚀 Scan started, results will follow".to_string()
            }
        }
        Command::Lookup(address) => {
            let address = address.trim();
            if address.is_empty() {
                "Usage: /lookup <contract address>".to_string()
            } else {
                match state.lookup.lookup(address).await {
                    Ok(result) => {
                        bot.send_message(chat_id, format_lookup(&result))
                            .parse_mode(ParseMode::MarkdownV2)
                            .await?;
                        return Ok(());
                    }
                    Err(LookupError::Store(e)) => {
                        error!("Lookup failed for {}: {}", address, e);
                        "❌ Lookup failed, try again later".to_string()
                    }
                    Err(e) => format!("❌ {}", e),
                }
            }
        }
        Command::Recent => {
            match state.db.list_verified_tokens(1, 5).await {
                Ok(page) => {
                    if page.tokens.is_empty() {
                        "📭 No verified tokens yet".to_string()
                    } else {
                        let mut response = "🆕 Recently Verified:\n\n".to_string();
                        for (i, token) in page.tokens.iter().enumerate() {
                            response.push_str(&format!(
                                "{}. {} ({}) • {}%\n   🔗 {}\n   ⏰ {}\n\n",
                                i + 1,
                                token.token_name,
                                token.token_symbol,
                                token.safety_score,
                                token.contract_address,
                                token.created_at.format("%Y-%m-%d %H:%M UTC")
                            ));
                        }
                        response
                    }
                }
                Err(e) => {
                    error!("Failed to get recent tokens: {}", e);
                    "❌ Failed to load recent tokens".to_string()
                }
            }
        }
        Command::Status => {
            let verified = state.db.list_verified_tokens(1, 1).await.map(|p| p.total);
            let failed = state.db.count_failed_tokens().await;
            let last_scan = state.db.recent_scan_logs(1).await;

            match (verified, failed, last_scan) {
                (Ok(verified), Ok(failed), Ok(logs)) => {
                    let last = logs
                        .first()
                        .map(|log| {
                            format!(
                                "{} at {} ({} scanned, {} passed, {} failed){}",
                                log.scan_type,
                                log.created_at.format("%H:%M UTC"),
                                log.tokens_scanned,
                                log.tokens_passed,
                                log.tokens_failed,
                                log.error_message
                                    .as_deref()
                                    .map(|e| format!("\n   ⚠️ {}", e))
                                    .unwrap_or_default()
                            )
                        })
                        .unwrap_or_else(|| "never".to_string());

                    format!(
                        "✅ Scanner Status: {}\n\n\
                         🔄 Scan in progress: {}\n\
                         ✅ Verified tokens: {}\n\
                         ❌ Failed checks: {}\n\
                         🕐 Last scan: {}",
                        if *state.running.read().await { "ACTIVE" } else { "STOPPING" },
                        if state.scanner.is_running() { "yes" } else { "no" },
                        verified,
                        failed,
                        last
                    )
                }
                _ => "✅ Scanner Status: ACTIVE\n\n📊 Stats loading...".to_string(),
            }
        }
        Command::Abort => {
            if state.scanner.request_abort() {
                "🛑 Abort requested, the scan stops before the next token".to_string()
            } else {
                "📭 No scan is running".to_string()
            }
        }
    };

    bot.send_message(chat_id, response).await?;
    Ok(())
}
