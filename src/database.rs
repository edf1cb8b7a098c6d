// src/database.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use crate::errors::StoreError;
use crate::models::{FailedToken, MarketUpdate, ScanLog, TokenPage, VerifiedToken};

/// Persistence the scan pipeline and lookups depend on.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_by_contract(&self, address: &str) -> Result<Option<VerifiedToken>, StoreError>;

    /// Fails with `StoreError::Duplicate` when the contract address is already stored.
    async fn create_verified_token(&self, token: &VerifiedToken) -> Result<i64, StoreError>;

    /// Refreshes market figures only. Returns false when no such token exists.
    async fn update_market_data(&self, address: &str, update: &MarketUpdate) -> Result<bool, StoreError>;

    async fn create_failed_token(&self, token: &FailedToken) -> Result<i64, StoreError>;

    async fn create_scan_log(&self, log: &ScanLog) -> Result<i64, StoreError>;
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        info!("Connecting to database: {}", database_url);
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Database { pool })
    }

    /// Throwaway database for tests and dry runs. One connection, so every
    /// query sees the same in-memory file.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let db = Database { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations to create tables
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");

        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS verified_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token_name TEXT NOT NULL,
                token_symbol TEXT NOT NULL,
                contract_address TEXT UNIQUE NOT NULL,
                chain TEXT NOT NULL,
                launch_time TEXT NOT NULL,
                current_price TEXT,
                market_cap TEXT,
                liquidity_usd TEXT,
                volume_24h TEXT,
                price_change_24h TEXT,
                liquidity_locked BOOLEAN NOT NULL DEFAULT FALSE,
                liquidity_lock_duration_months INTEGER,
                ownership_renounced BOOLEAN NOT NULL DEFAULT FALSE,
                contract_verified BOOLEAN NOT NULL DEFAULT FALSE,
                honeypot_safe BOOLEAN NOT NULL DEFAULT FALSE,
                buy_tax TEXT NOT NULL DEFAULT '0',
                sell_tax TEXT NOT NULL DEFAULT '0',
                safety_score INTEGER NOT NULL,
                safety_reasons TEXT NOT NULL,
                risk_warnings TEXT,
                image_url TEXT,
                dexscreener_url TEXT,
                solscan_url TEXT,
                rugcheck_url TEXT,
                twitter_url TEXT,
                telegram_url TEXT,
                website_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#).execute(&self.pool).await?;

        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS failed_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token_name TEXT NOT NULL,
                token_symbol TEXT NOT NULL,
                contract_address TEXT NOT NULL,
                failure_reasons TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
        "#).execute(&self.pool).await?;

        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS scan_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                scan_type TEXT NOT NULL,
                tokens_scanned INTEGER NOT NULL DEFAULT 0,
                tokens_passed INTEGER NOT NULL DEFAULT 0,
                tokens_failed INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                created_at TEXT NOT NULL
            )
        "#).execute(&self.pool).await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_verified_tokens_created ON verified_tokens(created_at)")
            .execute(&self.pool).await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_failed_tokens_address ON failed_tokens(contract_address)")
            .execute(&self.pool).await?;

        info!("✅ Database migrations completed");
        Ok(())
    }

    /// Newest first. `page` starts at 1.
    pub async fn list_verified_tokens(&self, page: u32, limit: u32) -> Result<TokenPage, StoreError> {
        let page = page.max(1);
        let offset = i64::from(page - 1) * i64::from(limit);

        let rows = sqlx::query(r#"
            SELECT * FROM verified_tokens
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
        "#)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM verified_tokens")
            .fetch_one(&self.pool)
            .await?;

        let tokens = rows.iter().map(verified_token_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(TokenPage { tokens, total, page, limit })
    }

    pub async fn recent_scan_logs(&self, limit: u32) -> Result<Vec<ScanLog>, StoreError> {
        let rows = sqlx::query(r#"
            SELECT * FROM scan_logs
            ORDER BY created_at DESC, id DESC
            LIMIT ?
        "#)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(ScanLog {
                id: Some(row.try_get("id")?),
                scan_type: row.try_get("scan_type")?,
                tokens_scanned: row.try_get::<i64, _>("tokens_scanned")? as u32,
                tokens_passed: row.try_get::<i64, _>("tokens_passed")? as u32,
                tokens_failed: row.try_get::<i64, _>("tokens_failed")? as u32,
                error_message: row.try_get("error_message")?,
                created_at: parse_time(&row, "created_at")?,
            });
        }

        Ok(logs)
    }

    pub async fn count_failed_tokens(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM failed_tokens")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl TokenStore for Database {
    async fn get_by_contract(&self, address: &str) -> Result<Option<VerifiedToken>, StoreError> {
        let row = sqlx::query(r#"
            SELECT * FROM verified_tokens WHERE contract_address = ?
        "#)
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(verified_token_from_row).transpose()
    }

    async fn create_verified_token(&self, token: &VerifiedToken) -> Result<i64, StoreError> {
        let result = sqlx::query(r#"
            INSERT INTO verified_tokens
            (token_name, token_symbol, contract_address, chain, launch_time,
             current_price, market_cap, liquidity_usd, volume_24h, price_change_24h,
             liquidity_locked, liquidity_lock_duration_months, ownership_renounced,
             contract_verified, honeypot_safe, buy_tax, sell_tax, safety_score,
             safety_reasons, risk_warnings, image_url, dexscreener_url, solscan_url,
             rugcheck_url, twitter_url, telegram_url, website_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#)
        .bind(&token.token_name)
        .bind(&token.token_symbol)
        .bind(&token.contract_address)
        .bind(&token.chain)
        .bind(token.launch_time.to_rfc3339())
        .bind(token.current_price.map(|d| d.to_string()))
        .bind(token.market_cap.map(|d| d.to_string()))
        .bind(token.liquidity_usd.map(|d| d.to_string()))
        .bind(token.volume_24h.map(|d| d.to_string()))
        .bind(token.price_change_24h.map(|d| d.to_string()))
        .bind(token.liquidity_locked)
        .bind(token.liquidity_lock_duration_months)
        .bind(token.ownership_renounced)
        .bind(token.contract_verified)
        .bind(token.honeypot_safe)
        .bind(token.buy_tax.to_string())
        .bind(token.sell_tax.to_string())
        .bind(token.safety_score)
        .bind(to_json(&token.safety_reasons)?)
        .bind(token.risk_warnings.as_deref().map(to_json).transpose()?)
        .bind(&token.image_url)
        .bind(&token.dexscreener_url)
        .bind(&token.solscan_url)
        .bind(&token.rugcheck_url)
        .bind(&token.twitter_url)
        .bind(&token.telegram_url)
        .bind(&token.website_url)
        .bind(token.created_at.to_rfc3339())
        .bind(token.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update_market_data(&self, address: &str, update: &MarketUpdate) -> Result<bool, StoreError> {
        let result = sqlx::query(r#"
            UPDATE verified_tokens
            SET current_price = COALESCE(?, current_price),
                market_cap = COALESCE(?, market_cap),
                liquidity_usd = COALESCE(?, liquidity_usd),
                volume_24h = COALESCE(?, volume_24h),
                price_change_24h = COALESCE(?, price_change_24h),
                image_url = COALESCE(NULLIF(image_url, ''), ?),
                updated_at = ?
            WHERE contract_address = ?
        "#)
        .bind(update.current_price.map(|d| d.to_string()))
        .bind(update.market_cap.map(|d| d.to_string()))
        .bind(update.liquidity_usd.map(|d| d.to_string()))
        .bind(update.volume_24h.map(|d| d.to_string()))
        .bind(update.price_change_24h.map(|d| d.to_string()))
        .bind(&update.image_url)
        .bind(Utc::now().to_rfc3339())
        .bind(address)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_failed_token(&self, token: &FailedToken) -> Result<i64, StoreError> {
        let result = sqlx::query(r#"
            INSERT INTO failed_tokens
            (token_name, token_symbol, contract_address, failure_reasons, created_at)
            VALUES (?, ?, ?, ?, ?)
        "#)
        .bind(&token.token_name)
        .bind(&token.token_symbol)
        .bind(&token.contract_address)
        .bind(to_json(&token.failure_reasons)?)
        .bind(token.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn create_scan_log(&self, log: &ScanLog) -> Result<i64, StoreError> {
        let result = sqlx::query(r#"
            INSERT INTO scan_logs
            (scan_type, tokens_scanned, tokens_passed, tokens_failed, error_message, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#)
        .bind(&log.scan_type)
        .bind(i64::from(log.tokens_scanned))
        .bind(i64::from(log.tokens_passed))
        .bind(i64::from(log.tokens_failed))
        .bind(&log.error_message)
        .bind(log.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

fn verified_token_from_row(row: &SqliteRow) -> Result<VerifiedToken, StoreError> {
    Ok(VerifiedToken {
        id: Some(row.try_get("id")?),
        token_name: row.try_get("token_name")?,
        token_symbol: row.try_get("token_symbol")?,
        contract_address: row.try_get("contract_address")?,
        chain: row.try_get("chain")?,
        launch_time: parse_time(row, "launch_time")?,
        current_price: parse_decimal(row, "current_price")?,
        market_cap: parse_decimal(row, "market_cap")?,
        liquidity_usd: parse_decimal(row, "liquidity_usd")?,
        volume_24h: parse_decimal(row, "volume_24h")?,
        price_change_24h: parse_decimal(row, "price_change_24h")?,
        liquidity_locked: row.try_get("liquidity_locked")?,
        liquidity_lock_duration_months: row.try_get("liquidity_lock_duration_months")?,
        ownership_renounced: row.try_get("ownership_renounced")?,
        contract_verified: row.try_get("contract_verified")?,
        honeypot_safe: row.try_get("honeypot_safe")?,
        buy_tax: parse_decimal(row, "buy_tax")?.unwrap_or_default(),
        sell_tax: parse_decimal(row, "sell_tax")?.unwrap_or_default(),
        safety_score: row.try_get("safety_score")?,
        safety_reasons: from_json(&row.try_get::<String, _>("safety_reasons")?)?,
        risk_warnings: row
            .try_get::<Option<String>, _>("risk_warnings")?
            .map(|s| from_json(&s))
            .transpose()?,
        image_url: row.try_get("image_url")?,
        dexscreener_url: row.try_get("dexscreener_url")?,
        solscan_url: row.try_get("solscan_url")?,
        rugcheck_url: row.try_get("rugcheck_url")?,
        twitter_url: row.try_get("twitter_url")?,
        telegram_url: row.try_get("telegram_url")?,
        website_url: row.try_get("website_url")?,
        created_at: parse_time(row, "created_at")?,
        updated_at: parse_time(row, "updated_at")?,
    })
}

fn parse_time(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, StoreError> {
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e| StoreError::Decode(format!("{}: {}", column, e)))
}

fn parse_decimal(row: &SqliteRow, column: &str) -> Result<Option<Decimal>, StoreError> {
    row.try_get::<Option<String>, _>(column)?
        .map(|s| s.parse::<Decimal>())
        .transpose()
        .map_err(|e| StoreError::Decode(format!("{}: {}", column, e)))
}

fn to_json(list: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(list).map_err(|e| StoreError::Query(e.to_string()))
}

fn from_json(raw: &str) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Decode(e.to_string()))
}
