//! Error types for claim processing.
//!
//! [`RejectReason`] is the client-facing outcome of validation: a stable
//! machine code plus the human text returned in the HTTP body. [`ClaimError`]
//! is the full failure taxonomy of [`ClaimService`](crate::service::ClaimService),
//! including the reservation conflict and collaborator failures.

use serde::{Deserialize, Serialize};

use crate::disburse::DisbursementError;
use crate::ledger::NonceLedgerError;

/// Reasons a claim request is rejected by validation.
///
/// Variants are ordered as the validator checks them; the first failing
/// check determines the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// `token` does not match the configured token contract.
    #[error("Bad token")]
    BadToken,
    /// `claimer` is not a syntactically valid address.
    #[error("Bad claimer")]
    BadClaimer,
    /// `amount` is not exactly the configured amount in base units.
    #[error("Bad amount")]
    BadAmount,
    /// The current time is past `deadline`.
    #[error("Expired")]
    Expired,
    /// The nonce has already been consumed.
    #[error("Nonce used")]
    NonceUsed,
    /// No accepted signing domain recovers the claimer from the signature.
    #[error("Bad signature")]
    BadSignature,
}

impl RejectReason {
    /// Returns the machine-readable reason code (e.g. `"bad_token"`).
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadToken => "bad_token",
            Self::BadClaimer => "bad_claimer",
            Self::BadAmount => "bad_amount",
            Self::Expired => "expired",
            Self::NonceUsed => "nonce_used",
            Self::BadSignature => "bad_signature",
        }
    }
}

/// Errors returned by [`ClaimService::claim`](crate::service::ClaimService::claim).
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    /// Validation rejected the request; the client may retry with corrected input.
    #[error(transparent)]
    Rejected(#[from] RejectReason),
    /// Another request reserved the same nonce first.
    #[error("Nonce used")]
    ReservationConflict,
    /// The transfer failed after the nonce was reserved. The nonce stays consumed.
    #[error(transparent)]
    Disbursement(#[from] DisbursementError),
    /// The nonce ledger backend failed.
    #[error(transparent)]
    Ledger(#[from] NonceLedgerError),
}

impl ClaimError {
    /// Returns `true` for errors caused by client input (HTTP 400).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::ReservationConflict)
    }

    /// Returns the machine-readable code for logging.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Rejected(reason) => reason.code(),
            Self::ReservationConflict => RejectReason::NonceUsed.code(),
            Self::Disbursement(_) => "disbursement_failed",
            Self::Ledger(_) => "ledger_failure",
        }
    }
}
