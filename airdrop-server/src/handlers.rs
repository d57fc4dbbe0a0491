//! Axum route handlers for the claim service.
//!
//! - `GET /health` reports the static configuration
//! - `POST /api/claim` verifies a signed claim and disburses tokens
//! - `GET /api/claim/{nonce}` reports what happened to a consumed nonce

use std::sync::Arc;

use airdrop::{ClaimRequest, ClaimService, NonceStatus, NumericField, UnixTimestamp};
use airdrop_evm::TokenMetadata;
use alloy_primitives::{Address, TxHash};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::error::ApiError;

/// Process-wide state shared by all handlers.
#[derive(Debug)]
pub struct AppState {
    service: ClaimService,
    token: TokenMetadata,
    chain_id: u64,
}

impl AppState {
    /// Bundles the claim service with the metadata reported by `/health`.
    #[must_use]
    pub const fn new(service: ClaimService, token: TokenMetadata, chain_id: u64) -> Self {
        Self {
            service,
            token,
            chain_id,
        }
    }
}

/// Shared application state handle.
pub type ClaimState = Arc<AppState>;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `true`.
    pub ok: bool,
    /// Chain id claims are bound to.
    pub chain_id: u64,
    /// Token contract address.
    pub token: Address,
    /// Token symbol.
    pub symbol: String,
    /// Token decimals.
    pub decimals: u8,
    /// Address tokens are sent from.
    pub sender: Address,
}

/// Body of a successful `POST /api/claim`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    /// Always `true`.
    pub ok: bool,
    /// Hash of the transfer transaction.
    pub tx_hash: TxHash,
}

/// Body of `GET /api/claim/{nonce}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceStatusResponse {
    /// The nonce, in decimal.
    pub nonce: String,
    /// When the nonce was reserved.
    pub reserved_at: UnixTimestamp,
    /// Outcome so far.
    #[serde(flatten)]
    pub status: NonceStatus,
}

/// `GET /health`
pub async fn get_health(State(state): State<ClaimState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        chain_id: state.chain_id,
        token: state.token.address,
        symbol: state.token.symbol.clone(),
        decimals: state.token.decimals,
        sender: state.service.sender(),
    })
}

/// `POST /api/claim`
///
/// # Errors
///
/// Returns 400 with the rejection reason, or 500 if the transfer failed.
/// A body sent without a JSON content type is treated as empty.
pub async fn post_claim(
    State(state): State<ClaimState>,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => ClaimRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    match state.service.claim(&request).await {
        Ok(receipt) => Ok(Json(ClaimResponse {
            ok: true,
            tx_hash: receipt.tx_hash,
        })),
        Err(e) => {
            if e.is_client_error() {
                tracing::info!(
                    claimer = %request.claimer,
                    nonce = %request.nonce,
                    reason = e.code(),
                    "claim rejected"
                );
            } else {
                tracing::error!(
                    claimer = %request.claimer,
                    nonce = %request.nonce,
                    reason = e.code(),
                    error = %e,
                    "claim failed"
                );
            }
            Err(e.into())
        }
    }
}

/// `GET /api/claim/{nonce}`
///
/// # Errors
///
/// Returns 400 for a malformed nonce, 404 if it was never reserved.
pub async fn get_claim_status(
    State(state): State<ClaimState>,
    Path(nonce): Path<String>,
) -> Result<Json<NonceStatusResponse>, ApiError> {
    let nonce = NumericField::from(nonce.as_str())
        .to_u256()
        .ok_or(ApiError::BadNonce)?;
    let record = state
        .service
        .nonce_record(&nonce)
        .await?
        .ok_or(ApiError::UnknownNonce)?;
    Ok(Json(NonceStatusResponse {
        nonce: record.nonce.to_string(),
        reserved_at: record.reserved_at,
        status: record.status,
    }))
}

/// Creates an Axum [`Router`] with all claim endpoints.
pub fn claim_router(state: ClaimState) -> Router {
    Router::new()
        .route("/health", axum::routing::get(get_health))
        .route("/api/claim", axum::routing::post(post_claim))
        .route("/api/claim/{nonce}", axum::routing::get(get_claim_status))
        .with_state(state)
}

/// Builds the CORS layer. `*` anywhere in `origins` allows any origin.
///
/// # Errors
///
/// Returns an error if an origin is not a valid header value.
pub fn cors_layer(
    origins: &[String],
) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        let origins = origins
            .iter()
            .map(|origin| HeaderValue::from_str(origin))
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(origins)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any))
}
