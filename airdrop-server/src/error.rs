//! HTTP error mapping.
//!
//! Every error body is `{"error": <message>}`. Client mistakes map to 400
//! with a stable reason text; collaborator failures map to 500.

use airdrop::disburse::GENERIC_FAILURE_MESSAGE;
use airdrop::{ClaimError, NonceLedgerError};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors returned by the route handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Claim processing failed.
    #[error(transparent)]
    Claim(#[from] ClaimError),
    /// The request body is not valid JSON for a claim.
    #[error("Bad request")]
    BadRequest(#[from] JsonRejection),
    /// The path nonce is not a `uint256`.
    #[error("Bad nonce")]
    BadNonce,
    /// No claim has reserved this nonce.
    #[error("Unknown nonce")]
    UnknownNonce,
    /// The nonce ledger failed during a lookup.
    #[error(transparent)]
    Ledger(#[from] NonceLedgerError),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Claim(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Claim(_) | Self::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) | Self::BadNonce => StatusCode::BAD_REQUEST,
            Self::UnknownNonce => StatusCode::NOT_FOUND,
        }
    }

    /// Text placed in the `error` field of the response body.
    ///
    /// Disbursement failures surface the collaborator's message; ledger
    /// failures are reported generically.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Claim(ClaimError::Disbursement(e)) => e.public_message(),
            Self::Claim(ClaimError::Ledger(_)) | Self::Ledger(_) => {
                GENERIC_FAILURE_MESSAGE.to_owned()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message() });
        (self.status(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airdrop::{DisbursementError, RejectReason};

    #[test]
    fn test_rejections_are_bad_request() {
        let err = ApiError::from(ClaimError::from(RejectReason::Expired));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Expired");

        let err = ApiError::from(ClaimError::ReservationConflict);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Nonce used");
    }

    #[test]
    fn test_disbursement_failure_is_server_error() {
        let err = ApiError::from(ClaimError::from(DisbursementError::Transport(
            "nonce too low".into(),
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "nonce too low");

        let err = ApiError::from(ClaimError::from(DisbursementError::ContractCall(
            String::new(),
        )));
        assert_eq!(err.message(), "Server error");
    }

    #[test]
    fn test_ledger_failure_is_generic() {
        let err = ApiError::from(NonceLedgerError::Unavailable("redis down".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Server error");
    }

    #[test]
    fn test_lookup_errors() {
        assert_eq!(ApiError::BadNonce.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::UnknownNonce.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::UnknownNonce.message(), "Unknown nonce");
    }
}
