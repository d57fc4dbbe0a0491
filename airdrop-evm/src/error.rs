//! Error types for EVM operations.

use airdrop::DisbursementError;
use alloy_primitives::{TxHash, U256};
use alloy_provider::PendingTransactionError;
use alloy_transport::TransportError;

/// Errors from talking to the chain.
#[derive(Debug, thiserror::Error)]
pub enum EvmError {
    /// RPC transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Waiting for the transaction receipt failed or timed out.
    #[error(transparent)]
    PendingTransaction(#[from] PendingTransactionError),
    /// On-chain transaction was reverted.
    #[error("Transaction {0} reverted")]
    TransactionReverted(TxHash),
    /// Contract call failed.
    #[error("Contract call failed: {0}")]
    ContractCall(String),
    /// The sender's token balance is below the transfer amount.
    #[error("transfer amount exceeds balance (available {available}, required {required})")]
    InsufficientBalance {
        /// Sender balance in base units.
        available: U256,
        /// Amount that was to be sent.
        required: U256,
    },
    /// No usable RPC endpoint was configured.
    #[error("no usable HTTP(S) RPC endpoint configured")]
    NoRpcEndpoint,
}

impl From<EvmError> for DisbursementError {
    fn from(value: EvmError) -> Self {
        match value {
            EvmError::Transport(_) | EvmError::PendingTransaction(_) | EvmError::NoRpcEndpoint => {
                Self::Transport(value.to_string())
            }
            EvmError::TransactionReverted(tx_hash) => Self::Reverted(tx_hash),
            EvmError::ContractCall(message) => Self::ContractCall(message),
            EvmError::InsufficientBalance {
                available,
                required,
            } => Self::InsufficientBalance {
                available,
                required,
            },
        }
    }
}

impl From<alloy_contract::Error> for EvmError {
    fn from(e: alloy_contract::Error) -> Self {
        match e {
            alloy_contract::Error::UnknownFunction(_)
            | alloy_contract::Error::UnknownSelector(_)
            | alloy_contract::Error::NotADeploymentTransaction
            | alloy_contract::Error::ContractNotDeployed
            | alloy_contract::Error::ZeroData(_, _)
            | alloy_contract::Error::AbiError(_) => Self::ContractCall(e.to_string()),
            alloy_contract::Error::TransportError(e) => Self::Transport(e),
            alloy_contract::Error::PendingTransactionError(e) => Self::PendingTransaction(e),
        }
    }
}
