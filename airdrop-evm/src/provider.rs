//! Signing EVM provider for the disbursement sender.
//!
//! Provides [`EvmProvider`] with:
//! - Full filler stack (gas, blob gas, nonce, chain ID, wallet)
//! - [`PendingNonceManager`] so concurrent transfers get distinct nonces
//! - Automatic nonce reset on transaction failures
//! - Fallback across several RPC endpoints with optional rate limiting
//! - Configurable EIP-1559/legacy gas and receipt timeouts

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use alloy_network::{EthereumWallet, Network, TransactionBuilder};
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_provider::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, NonceManager,
    WalletFiller,
};
use alloy_provider::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::{BlockId, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::TransportResult;
use alloy_transport::layers::{FallbackLayer, ThrottleLayer};
use alloy_transport_http::Http;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use url::Url;

use crate::error::EvmError;

/// Nonce manager that queries pending transactions for the initial nonce.
///
/// Unlike alloy's default `CachedNonceManager`, which uses the `latest`
/// transaction count, this manager queries with `.pending()` on first use so
/// transactions still in the mempool are counted. This prevents "nonce too
/// low" errors after a restart while transfers are in flight.
///
/// - **First call per address**: queries with `.pending()` from RPC
/// - **Subsequent calls**: increments the cached nonce locally
/// - **On failure**: [`reset_nonce`](Self::reset_nonce) forces a re-query
#[derive(Clone, Debug, Default)]
pub struct PendingNonceManager {
    nonces: Arc<DashMap<Address, Arc<Mutex<u64>>>>,
}

const NONCE_UNSET: u64 = u64::MAX;

#[async_trait::async_trait]
impl NonceManager for PendingNonceManager {
    async fn get_next_nonce<P, N>(&self, provider: &P, address: Address) -> TransportResult<u64>
    where
        P: Provider<N>,
        N: Network,
    {
        let slot = {
            let entry = self
                .nonces
                .entry(address)
                .or_insert_with(|| Arc::new(Mutex::new(NONCE_UNSET)));
            Arc::clone(entry.value())
        };

        let mut nonce = slot.lock().await;
        let new_nonce = if *nonce == NONCE_UNSET {
            provider.get_transaction_count(address).pending().await?
        } else {
            *nonce + 1
        };
        *nonce = new_nonce;
        Ok(new_nonce)
    }
}

impl PendingNonceManager {
    /// Resets the cached nonce for an address, forcing a fresh RPC query on
    /// next use.
    ///
    /// Call this when a transaction fails: the transaction may or may not
    /// have reached the mempool.
    pub async fn reset_nonce(&self, address: Address) {
        let slot = self.nonces.get(&address).map(|entry| Arc::clone(entry.value()));
        if let Some(slot) = slot {
            *slot.lock().await = NONCE_UNSET;
        }
    }
}

/// Combined filler type: Gas + `BlobGas` + Nonce([`PendingNonceManager`]) + `ChainId`.
pub type InnerFiller = JoinFill<
    GasFiller,
    JoinFill<BlobGasFiller, JoinFill<NonceFiller<PendingNonceManager>, ChainIdFiller>>,
>;

/// Fully composed Ethereum provider with all fillers and wallet signing.
pub type FullProvider = FillProvider<
    JoinFill<JoinFill<Identity, InnerFiller>, WalletFiller<EthereumWallet>>,
    RootProvider,
>;

/// Parameters for an outgoing transaction.
#[derive(Debug, Clone)]
pub struct MetaTransaction {
    /// Target contract address.
    pub to: Address,
    /// Encoded function call data.
    pub calldata: Bytes,
    /// Block confirmations to wait for. `0` returns as soon as the node
    /// accepts the transaction.
    pub confirmations: u64,
}

/// Configuration for [`EvmProvider`].
#[derive(Debug, Clone, Copy)]
pub struct ProviderConfig {
    /// Whether the chain supports EIP-1559 gas pricing (default: `true`).
    pub eip1559: bool,
    /// Seconds to wait for a transaction receipt (default: 30).
    pub receipt_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            eip1559: true,
            receipt_timeout_secs: 30,
        }
    }
}

/// EVM provider that signs with a single sender key.
///
/// Wraps a fully-composed alloy provider with:
/// - [`GasFiller`] + [`BlobGasFiller`] for automatic gas estimation
/// - [`NonceFiller`] with [`PendingNonceManager`] for concurrent nonce tracking
/// - [`ChainIdFiller`] for automatic chain ID
/// - [`WalletFiller`] for transaction signing
#[derive(Debug)]
pub struct EvmProvider {
    inner: FullProvider,
    sender: Address,
    config: ProviderConfig,
    nonce_manager: PendingNonceManager,
}

impl EvmProvider {
    /// Creates an RPC client over HTTP(S) endpoints, tried in fallback order.
    ///
    /// Non-HTTP(S) URLs are skipped. `rate_limit` caps requests per second
    /// per endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EvmError::NoRpcEndpoint`] if no HTTP(S) endpoint remains.
    pub fn rpc_client(endpoints: &[Url], rate_limit: Option<u32>) -> Result<RpcClient, EvmError> {
        let transports = endpoints
            .iter()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .map(|url| {
                #[cfg(feature = "telemetry")]
                tracing::info!(rpc_url = %url, rate_limit = ?rate_limit, "Using HTTP transport");
                ServiceBuilder::new()
                    .layer(ThrottleLayer::new(rate_limit.unwrap_or(u32::MAX)))
                    .service(Http::new(url.clone()))
            })
            .collect::<Vec<_>>();
        let count = NonZeroUsize::new(transports.len()).ok_or(EvmError::NoRpcEndpoint)?;
        let fallback = ServiceBuilder::new()
            .layer(FallbackLayer::default().with_active_transport_count(count))
            .service(transports);
        Ok(RpcClient::new(fallback, false))
    }

    /// Creates a provider that signs with `signer`.
    #[must_use]
    pub fn new(rpc_client: RpcClient, signer: PrivateKeySigner, config: ProviderConfig) -> Self {
        let sender = signer.address();
        let nonce_manager = PendingNonceManager::default();

        let filler = JoinFill::new(
            GasFiller,
            JoinFill::new(
                BlobGasFiller::default(),
                JoinFill::new(
                    NonceFiller::new(nonce_manager.clone()),
                    ChainIdFiller::default(),
                ),
            ),
        );

        let inner: FullProvider = ProviderBuilder::default()
            .filler(filler)
            .wallet(EthereumWallet::from(signer))
            .connect_client(rpc_client);

        #[cfg(feature = "telemetry")]
        tracing::info!(sender = %sender, eip1559 = config.eip1559, "Using EVM provider");

        Self {
            inner,
            sender,
            config,
            nonce_manager,
        }
    }

    /// Returns the provider for read/call operations.
    #[must_use]
    pub const fn inner(&self) -> &FullProvider {
        &self.inner
    }

    /// Address transactions are signed by.
    #[must_use]
    pub const fn sender(&self) -> Address {
        self.sender
    }

    /// Sends a transaction from the sender, resetting the cached nonce on
    /// failure.
    ///
    /// With `confirmations == 0` this returns once the node accepts the
    /// transaction. Otherwise it waits for the receipt, bounded by the
    /// configured timeout, and fails if the transaction reverted.
    ///
    /// # Errors
    ///
    /// Returns [`EvmError`] if gas estimation, submission or receipt
    /// retrieval fails, or if the transaction reverted.
    pub async fn send_transaction(&self, tx: MetaTransaction) -> Result<TxHash, EvmError> {
        let mut txr = TransactionRequest::default()
            .with_to(tx.to)
            .with_from(self.sender)
            .with_input(tx.calldata);

        // Legacy gas pricing for non-EIP-1559 chains
        if !self.config.eip1559 {
            let gas = self.inner.get_gas_price().await?;
            txr.set_gas_price(gas);
        }

        let gas_limit = self
            .inner
            .estimate_gas(txr.clone())
            .block(BlockId::pending())
            .await?;
        txr.set_gas_limit(gas_limit);

        let pending_tx = match self.inner.send_transaction(txr).await {
            Ok(pending) => pending,
            Err(e) => {
                self.nonce_manager.reset_nonce(self.sender).await;
                return Err(EvmError::Transport(e));
            }
        };
        let tx_hash = *pending_tx.tx_hash();
        if tx.confirmations == 0 {
            return Ok(tx_hash);
        }

        let watcher = pending_tx
            .with_required_confirmations(tx.confirmations)
            .with_timeout(Some(Duration::from_secs(self.config.receipt_timeout_secs)));

        match watcher.get_receipt().await {
            Ok(receipt) if receipt.status() => Ok(receipt.transaction_hash),
            Ok(receipt) => Err(EvmError::TransactionReverted(receipt.transaction_hash)),
            Err(e) => {
                self.nonce_manager.reset_nonce(self.sender).await;
                Err(EvmError::PendingTransaction(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_client_requires_http_endpoint() {
        let endpoints = vec![Url::parse("ws://localhost:8546").unwrap()];
        assert!(matches!(
            EvmProvider::rpc_client(&endpoints, None),
            Err(EvmError::NoRpcEndpoint)
        ));
        assert!(matches!(
            EvmProvider::rpc_client(&[], Some(10)),
            Err(EvmError::NoRpcEndpoint)
        ));
    }

    #[tokio::test]
    async fn test_rpc_client_skips_non_http() {
        let endpoints = vec![
            Url::parse("ws://localhost:8546").unwrap(),
            Url::parse("http://127.0.0.1:8545").unwrap(),
        ];
        assert!(EvmProvider::rpc_client(&endpoints, Some(5)).is_ok());
    }

    #[tokio::test]
    async fn test_reset_unknown_address_is_noop() {
        let manager = PendingNonceManager::default();
        manager.reset_nonce(Address::ZERO).await;
        assert!(manager.nonces.is_empty());
    }

    #[tokio::test]
    async fn test_provider_reports_sender() {
        let signer = PrivateKeySigner::random();
        let expected = signer.address();
        let client =
            EvmProvider::rpc_client(&[Url::parse("http://127.0.0.1:1").unwrap()], None).unwrap();
        let provider = EvmProvider::new(client, signer, ProviderConfig::default());
        assert_eq!(provider.sender(), expected);
    }
}
