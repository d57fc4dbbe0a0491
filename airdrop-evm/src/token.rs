//! Token metadata lookup.
//!
//! Symbol and decimals are read once at startup. Neither is part of the
//! ERC-20 core, so a token that omits them (or an RPC hiccup) falls back to
//! [`FALLBACK_SYMBOL`] and [`FALLBACK_DECIMALS`] instead of failing.

use alloy_primitives::Address;
use alloy_provider::Provider;

use crate::contract::IERC20;

/// Symbol reported when the token does not expose one.
pub const FALLBACK_SYMBOL: &str = "TKN";

/// Decimals assumed when the token does not expose them.
pub const FALLBACK_DECIMALS: u8 = 18;

/// Display metadata of the disbursed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    /// Token contract address.
    pub address: Address,
    /// Ticker symbol.
    pub symbol: String,
    /// Base-unit exponent.
    pub decimals: u8,
}

impl TokenMetadata {
    /// Metadata made only of fallback values.
    #[must_use]
    pub fn fallback(address: Address) -> Self {
        Self {
            address,
            symbol: FALLBACK_SYMBOL.to_owned(),
            decimals: FALLBACK_DECIMALS,
        }
    }

    /// Reads `symbol()` and `decimals()` from the token contract, falling
    /// back per field on failure.
    pub async fn fetch<P: Provider>(provider: &P, address: Address) -> Self {
        let contract = IERC20::new(address, provider);

        let symbol_call = contract.symbol();
        let symbol = match traced!(
            symbol_call.call().into_future(),
            tracing::info_span!("fetch_token_symbol", token = %address, otel.kind = "client")
        ) {
            Ok(symbol) => symbol,
            Err(_e) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(token = %address, error = %_e, "symbol() failed, using fallback");
                FALLBACK_SYMBOL.to_owned()
            }
        };

        let decimals_call = contract.decimals();
        let decimals = match traced!(
            decimals_call.call().into_future(),
            tracing::info_span!("fetch_token_decimals", token = %address, otel.kind = "client")
        ) {
            Ok(decimals) => decimals,
            Err(_e) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(token = %address, error = %_e, "decimals() failed, using fallback");
                FALLBACK_DECIMALS
            }
        };

        Self {
            address,
            symbol,
            decimals,
        }
    }
}
