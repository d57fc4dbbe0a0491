#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the airdrop claim service.
//!
//! A claimer presents an EIP-712 signed authorization to receive a fixed
//! quantity of a token. This crate verifies that authorization and makes
//! sure each one triggers at most one transfer. It is chain-agnostic about
//! *how* the transfer happens: the [`disburse::Disburser`] trait is the
//! boundary, implemented for ERC-20 tokens in `airdrop-evm`.
//!
//! # Modules
//!
//! - [`amount`] - Human-readable amount to base-unit conversion
//! - [`claim`] - Wire format of an inbound claim request
//! - [`disburse`] - Transfer collaborator boundary
//! - [`domain`] - Accepted EIP-712 signing domains
//! - [`error`] - Rejection reasons and claim errors
//! - [`ledger`] - Single-use nonce tracking
//! - [`service`] - Claim orchestration (validate, reserve, disburse)
//! - [`signature`] - Typed-data hashing and signer recovery
//! - [`timestamp`] - Unix timestamps for deadlines
//! - [`validator`] - Composite claim validation
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod amount;
pub mod claim;
pub mod disburse;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod service;
pub mod signature;
pub mod timestamp;
pub mod validator;

pub use claim::{ClaimRequest, NumericField};
pub use disburse::{DisbursementError, Disburser};
pub use domain::DomainResolver;
pub use error::{ClaimError, RejectReason};
pub use ledger::{MemoryNonceLedger, NonceLedger, NonceLedgerError, NonceRecord, NonceStatus};
pub use service::{ClaimReceipt, ClaimService};
pub use timestamp::UnixTimestamp;
pub use validator::{ClaimValidator, ValidatedClaim};
