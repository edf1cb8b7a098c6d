// HTTP surface: trigger a scan, look a token up, browse what was verified.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::database::TokenStore;
use crate::errors::{LookupError, ScanError, StoreError};
use crate::models::{LookupResult, ScanLog, ScanTrigger, TokenPage, VerifiedToken};
use crate::AppState;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

fn store_error(e: StoreError) -> ApiError {
    error!("Store error while serving request: {}", e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "database error")
}

fn scan_error(e: ScanError) -> ApiError {
    match e {
        ScanError::AlreadyRunning => api_error(StatusCode::CONFLICT, e.to_string()),
        other => api_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

fn lookup_error(e: LookupError) -> ApiError {
    match e {
        LookupError::InvalidAddress(_) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        LookupError::NoTradingPair(_) => api_error(StatusCode::NOT_FOUND, e.to_string()),
        LookupError::Store(e) => store_error(e),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tokens", get(list_tokens))
        .route("/api/tokens/:contract_address", get(get_token))
        .route("/api/scan-logs", get(scan_logs))
        .route("/api/scan-tokens", post(scan_tokens))
        .route("/api/scan-tokens/abort", post(abort_scan))
        .route("/api/lookup-token", post(lookup_token))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.http.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🌐 HTTP API listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    scan_in_progress: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        scan_in_progress: state.scanner.is_running(),
    })
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

async fn list_tokens(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> ApiResult<TokenPage> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    state
        .db
        .list_verified_tokens(page, limit)
        .await
        .map(Json)
        .map_err(store_error)
}

async fn get_token(
    State(state): State<Arc<AppState>>,
    Path(contract_address): Path<String>,
) -> ApiResult<VerifiedToken> {
    match state.db.get_by_contract(&contract_address).await {
        Ok(Some(token)) => Ok(Json(token)),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, "token not found")),
        Err(e) => Err(store_error(e)),
    }
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<u32>,
}

async fn scan_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<ScanLog>> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    state
        .db
        .recent_scan_logs(limit)
        .await
        .map(Json)
        .map_err(store_error)
}

#[derive(Debug, Serialize)]
struct ScanResponse {
    success: bool,
    scanned: u32,
    passed: u32,
    failed: u32,
}

async fn scan_tokens(State(state): State<Arc<AppState>>) -> ApiResult<ScanResponse> {
    let summary = state
        .scanner
        .run_cycle(ScanTrigger::Manual)
        .await
        .map_err(scan_error)?;

    Ok(Json(ScanResponse {
        success: true,
        scanned: summary.scanned,
        passed: summary.passed,
        failed: summary.failed,
    }))
}

#[derive(Debug, Serialize)]
struct AbortResponse {
    aborted: bool,
}

async fn abort_scan(State(state): State<Arc<AppState>>) -> Json<AbortResponse> {
    Json(AbortResponse {
        aborted: state.scanner.request_abort(),
    })
}

#[derive(Debug, Deserialize)]
struct LookupRequest {
    #[serde(rename = "contractAddress")]
    contract_address: Option<String>,
}

async fn lookup_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LookupRequest>,
) -> ApiResult<LookupResult> {
    let address = request
        .contract_address
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "contractAddress is required"))?;

    state
        .lookup
        .lookup(&address)
        .await
        .map(Json)
        .map_err(lookup_error)
}
