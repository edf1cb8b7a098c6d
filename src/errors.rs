// src/errors.rs
use thiserror::Error;

/// Persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint hit, usually a contract address that is already stored
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// The store cannot be reached at all (pool closed, timed out, I/O)
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("failed to decode row: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_) => StoreError::Decode(err.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// Errors raised while running a scan cycle.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("a scan cycle is already in progress")]
    AlreadyRunning,

    #[error("scan aborted by operator")]
    Aborted,

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("malformed pair for {address}: {reason}")]
    MalformedPair { address: String, reason: String },

    #[error("risk report failed for {address}: {reason}")]
    RiskReport { address: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScanError {
    /// True when the error must stop the whole cycle instead of a single candidate.
    pub fn is_cycle_fatal(&self) -> bool {
        match self {
            ScanError::Store(e) => e.is_fatal(),
            ScanError::Aborted | ScanError::UpstreamUnavailable(_) => true,
            _ => false,
        }
    }
}

/// Errors surfaced by an interactive token lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid contract address: {0}")]
    InvalidAddress(String),

    #[error("no trading pair found for {0}: the token may not have liquidity yet")]
    NoTradingPair(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
