//! Transfer collaborator boundary.
//!
//! The claim core treats the token transfer as a black box: given a
//! validated claim it either returns a transaction reference or fails. It
//! never retries a transfer; a failure after the nonce was reserved leaves
//! the nonce consumed.

use std::sync::{Arc, LazyLock};

use alloy_primitives::{Address, TxHash, U256};
use regex::Regex;

/// Fallback message used when a collaborator error carries no text.
pub const GENERIC_FAILURE_MESSAGE: &str = "Server error";

/// Endpoint URLs inside transport errors, which may embed API keys.
static ENDPOINT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:https?|wss?)://[^\s"'<>()\[\]{},]+"#)
        .expect("Invalid endpoint URL pattern")
});

/// Placeholder substituted for redacted endpoint URLs.
const REDACTED_URL: &str = "<rpc endpoint>";

/// Errors reported by a [`Disburser`].
#[derive(Debug, thiserror::Error)]
pub enum DisbursementError {
    /// The sender does not hold enough tokens.
    #[error("transfer amount exceeds balance (available {available}, required {required})")]
    InsufficientBalance {
        /// Sender balance in base units.
        available: U256,
        /// Amount that was to be sent.
        required: U256,
    },
    /// RPC transport failure (network, node, timeout).
    #[error("{0}")]
    Transport(String),
    /// The transaction was mined but reverted.
    #[error("Transaction {0} reverted")]
    Reverted(TxHash),
    /// The contract call could not be built or executed.
    #[error("{0}")]
    ContractCall(String),
}

impl DisbursementError {
    /// Returns the message surfaced to the client, falling back to a generic
    /// text when the collaborator provided none.
    ///
    /// Endpoint URLs in transport errors are replaced with a placeholder.
    #[must_use]
    pub fn public_message(&self) -> String {
        let message = match self {
            Self::Transport(text) => ENDPOINT_URL.replace_all(text, REDACTED_URL).into_owned(),
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            GENERIC_FAILURE_MESSAGE.to_owned()
        } else {
            message
        }
    }
}

/// Issues the token transfer for a validated claim.
///
/// Implementations must be safe to call concurrently for different claims;
/// the service holds no lock around this call.
#[async_trait::async_trait]
pub trait Disburser: Send + Sync {
    /// Sends `amount` base units to `to` and returns the transaction hash.
    ///
    /// # Errors
    ///
    /// Returns [`DisbursementError`] if the transfer could not be completed.
    async fn transfer(&self, to: Address, amount: U256) -> Result<TxHash, DisbursementError>;

    /// Address the tokens are sent from.
    fn sender(&self) -> Address;
}

#[async_trait::async_trait]
impl<T: Disburser + ?Sized> Disburser for Arc<T> {
    async fn transfer(&self, to: Address, amount: U256) -> Result<TxHash, DisbursementError> {
        (**self).transfer(to, amount).await
    }

    fn sender(&self) -> Address {
        (**self).sender()
    }
}
