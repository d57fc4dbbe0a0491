//! ERC-20 transfer implementation of [`Disburser`].

use std::sync::Arc;

use airdrop::{DisbursementError, Disburser};
use alloy_primitives::{Address, TxHash, U256};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::contract::IERC20;
use crate::error::EvmError;
use crate::provider::{EvmProvider, MetaTransaction};

/// Sends a fixed ERC-20 token from the provider's sender.
///
/// Before each transfer the sender's balance is checked so an empty faucet
/// fails fast with a clear message instead of a gas-estimation revert.
#[derive(Debug, Clone)]
pub struct Erc20Disburser {
    provider: Arc<EvmProvider>,
    token: Address,
    confirmations: u64,
}

impl Erc20Disburser {
    /// Creates a disburser for `token`.
    ///
    /// `confirmations` is forwarded to [`EvmProvider::send_transaction`]:
    /// `0` returns the hash on broadcast.
    #[must_use]
    pub const fn new(provider: Arc<EvmProvider>, token: Address, confirmations: u64) -> Self {
        Self {
            provider,
            token,
            confirmations,
        }
    }

    /// The token contract being disbursed.
    #[must_use]
    pub const fn token(&self) -> Address {
        self.token
    }

    /// Returns an error if the sender holds less than `required`.
    ///
    /// # Errors
    ///
    /// Returns [`EvmError::InsufficientBalance`] on shortfall, or a transport
    /// error if the balance query fails.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
        sender = %self.provider.sender(),
        required = %required,
        token = %self.token,
    )))]
    pub async fn assert_enough_balance(&self, required: U256) -> Result<(), EvmError> {
        let contract = IERC20::new(self.token, self.provider.inner());
        let balance_of = contract.balanceOf(self.provider.sender());
        let available = traced!(
            balance_of.call().into_future(),
            tracing::info_span!(
                "fetch_token_balance",
                token = %self.token,
                sender = %self.provider.sender(),
                otel.kind = "client"
            )
        )?;
        if available < required {
            Err(EvmError::InsufficientBalance {
                available,
                required,
            })
        } else {
            Ok(())
        }
    }

    async fn send(&self, to: Address, amount: U256) -> Result<TxHash, EvmError> {
        self.assert_enough_balance(amount).await?;

        let contract = IERC20::new(self.token, self.provider.inner());
        let transfer = contract.transfer(to, amount);
        let tx_fut = self.provider.send_transaction(MetaTransaction {
            to: self.token,
            calldata: transfer.calldata().clone(),
            confirmations: self.confirmations,
        });
        let tx_hash = traced!(
            tx_fut,
            tracing::info_span!(
                "call_transfer",
                token = %self.token,
                to = %to,
                amount = %amount,
                otel.kind = "client"
            )
        )?;

        #[cfg(feature = "telemetry")]
        tracing::info!(tx = %tx_hash, to = %to, amount = %amount, "transfer sent");
        Ok(tx_hash)
    }
}

#[async_trait::async_trait]
impl Disburser for Erc20Disburser {
    async fn transfer(&self, to: Address, amount: U256) -> Result<TxHash, DisbursementError> {
        self.send(to, amount).await.map_err(Into::into)
    }

    fn sender(&self) -> Address {
        self.provider.sender()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderConfig;
    use alloy_signer_local::PrivateKeySigner;
    use url::Url;

    fn disburser() -> Erc20Disburser {
        let client =
            EvmProvider::rpc_client(&[Url::parse("http://127.0.0.1:1").unwrap()], None).unwrap();
        let provider = EvmProvider::new(client, PrivateKeySigner::random(), ProviderConfig::default());
        Erc20Disburser::new(Arc::new(provider), Address::repeat_byte(0x42), 0)
    }

    #[tokio::test]
    async fn test_sender_matches_provider() {
        let disburser = disburser();
        assert_eq!(Disburser::sender(&disburser), disburser.provider.sender());
        assert_eq!(disburser.token(), Address::repeat_byte(0x42));
    }

    #[tokio::test]
    async fn test_unreachable_rpc_is_transport_failure() {
        let disburser = disburser();
        let err = disburser
            .transfer(Address::repeat_byte(0x01), U256::from(1u64))
            .await
            .unwrap_err();
        assert!(matches!(err, DisbursementError::Transport(_)));
        assert!(!err.public_message().is_empty());
    }
}
