//! Airdrop claim HTTP server.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (config.toml in current directory, optional)
//! PRIVATE_KEY=0x... cargo run -p airdrop-server --release
//!
//! # Run with custom config path
//! CONFIG=/path/to/config.toml cargo run -p airdrop-server
//!
//! # Configure logging level
//! RUST_LOG=debug cargo run -p airdrop-server
//! ```
//!
//! See [`airdrop_server::config`] for all settings and environment overrides.

use std::sync::Arc;

use airdrop::amount::to_base_units;
use airdrop::{ClaimService, ClaimValidator, DomainResolver, MemoryNonceLedger};
use airdrop_evm::{Erc20Disburser, EvmProvider, ProviderConfig, TokenMetadata, signer_from_secret};
use alloy_provider::Provider;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use airdrop_server::util::SigDown;
use airdrop_server::{AppState, ServerConfig, claim_router, cors_layer};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // Initialize tracing with RUST_LOG env filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("Airdrop server failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        chain_id = config.chain_id,
        token = %config.token,
        "Loaded configuration"
    );

    // Fail fast on a bad credential, before touching the network.
    let signer = signer_from_secret(&config.private_key)?;

    let rpc_client = EvmProvider::rpc_client(&config.rpc_urls, config.rpc_rate_limit)?;
    let provider = Arc::new(EvmProvider::new(
        rpc_client,
        signer,
        ProviderConfig {
            eip1559: config.eip1559,
            receipt_timeout_secs: config.receipt_timeout_secs,
        },
    ));

    match provider.inner().get_chain_id().await {
        Ok(rpc_chain_id) if rpc_chain_id != config.chain_id => tracing::warn!(
            configured = config.chain_id,
            rpc = rpc_chain_id,
            "RPC endpoint reports a different chain id"
        ),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Could not read chain id from RPC endpoint"),
    }

    let metadata = TokenMetadata::fetch(provider.inner(), config.token).await;
    let amount = to_base_units(&config.amount, metadata.decimals)?;
    tracing::info!(
        sender = %provider.sender(),
        token = %metadata.address,
        symbol = %metadata.symbol,
        decimals = metadata.decimals,
        "Claim amount {} -> {} base units",
        config.amount,
        amount
    );

    let validator = ClaimValidator::new(
        config.token,
        amount,
        DomainResolver::new(config.chain_id, config.domain_names.iter().cloned()),
    );
    let disburser = Erc20Disburser::new(Arc::clone(&provider), config.token, config.confirmations);
    let service = ClaimService::new(
        validator,
        Arc::new(MemoryNonceLedger::new()),
        Arc::new(disburser),
    );
    let state = Arc::new(AppState::new(service, metadata, config.chain_id));

    let app = Router::new()
        .merge(claim_router(state))
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(cors_layer(&config.cors_origins)?)
        .layer(TraceLayer::new_for_http());

    let sig_down = SigDown::try_new()?;
    let shutdown = sig_down.cancellation_token();

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Airdrop server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    sig_down.recv().await;
    tracing::info!("Airdrop server shut down gracefully");
    Ok(())
}
