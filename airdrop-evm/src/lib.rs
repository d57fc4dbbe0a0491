#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! ERC-20 disbursement for the airdrop claim service.
//!
//! Implements [`airdrop::Disburser`] by calling `transfer` on an ERC-20
//! contract from a single configured sender over JSON-RPC.
//!
//! # Modules
//!
//! - [`contract`] - Minimal ERC-20 ABI
//! - [`credential`] - Sender key parsing (hex key or mnemonic phrase)
//! - [`disburser`] - [`Erc20Disburser`], the [`airdrop::Disburser`] implementation
//! - [`error`] - EVM error types and their mapping to disbursement errors
//! - [`provider`] - Signing provider with pending-aware nonce management
//! - [`token`] - Token metadata lookup with fallbacks
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

/// Awaits a future, instrumenting it with `span` when telemetry is enabled.
macro_rules! traced {
    ($fut:expr, $span:expr) => {{
        #[cfg(feature = "telemetry")]
        {
            use tracing::Instrument;
            $fut.instrument($span).await
        }
        #[cfg(not(feature = "telemetry"))]
        {
            $fut.await
        }
    }};
}

pub mod contract;
pub mod credential;
pub mod disburser;
pub mod error;
pub mod provider;
pub mod token;

pub use credential::{CredentialError, signer_from_secret};
pub use disburser::Erc20Disburser;
pub use error::EvmError;
pub use provider::{EvmProvider, PendingNonceManager, ProviderConfig};
pub use token::TokenMetadata;
