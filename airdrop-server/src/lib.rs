//! HTTP front end of the airdrop claim service.
//!
//! # Modules
//!
//! - [`config`] - Server configuration with environment variable expansion
//! - [`error`] - HTTP error mapping
//! - [`handlers`] - Axum route handlers and router builder
//! - [`util`] - Graceful shutdown

pub mod config;
pub mod error;
pub mod handlers;
pub mod util;

pub use config::ServerConfig;
pub use handlers::{AppState, ClaimState, claim_router, cors_layer};
