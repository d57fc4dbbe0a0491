//! Single-use nonce tracking.
//!
//! Every claim nonce is consumed at most once. The ledger offers a cheap
//! [`contains`](NonceLedger::contains) pre-check used during validation and
//! an authoritative [`try_reserve`](NonceLedger::try_reserve) that atomically
//! checks absence and inserts. Reservation happens only after the signature
//! has been verified, so a forged request can never burn a legitimate
//! holder's nonce.
//!
//! Once reserved, an entry records what happened to the transfer
//! (`Reserved` → `Confirmed` / `Failed`). Entries are never removed: a failed
//! transfer keeps its nonce consumed.
//!
//! [`MemoryNonceLedger`] is volatile and scoped to the process. A deployment
//! that must survive restarts or run several instances needs a backend with
//! an atomic check-and-set (a unique-key insert or `SET NX`) behind the same
//! trait.

use alloy_primitives::{TxHash, U256};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};

use crate::timestamp::UnixTimestamp;

/// Outcome recorded for a reserved nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NonceStatus {
    /// Reserved; the transfer is in flight.
    Reserved,
    /// The transfer was issued.
    Confirmed {
        /// Transaction hash returned by the disburser.
        #[serde(rename = "txHash")]
        tx_hash: TxHash,
    },
    /// The transfer failed. The nonce stays consumed.
    Failed {
        /// Failure message from the disburser.
        error: String,
    },
}

/// A ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceRecord {
    /// The nonce value.
    pub nonce: U256,
    /// When the nonce was reserved.
    pub reserved_at: UnixTimestamp,
    /// Current status.
    #[serde(flatten)]
    pub status: NonceStatus,
}

/// Errors from a ledger backend.
#[derive(Debug, thiserror::Error)]
pub enum NonceLedgerError {
    /// The backing store could not be reached or returned an error.
    #[error("nonce ledger unavailable: {0}")]
    Unavailable(String),
    /// A status update targeted a nonce that was never reserved.
    #[error("nonce {0} is not reserved")]
    NotReserved(U256),
}

/// Tracks which claim nonces have been consumed.
///
/// Implementations must make [`try_reserve`](Self::try_reserve) linearizable:
/// of any number of concurrent calls with the same nonce, exactly one
/// returns `true`.
#[async_trait::async_trait]
pub trait NonceLedger: Send + Sync {
    /// Returns `true` if `nonce` has already been reserved.
    ///
    /// # Errors
    ///
    /// Returns [`NonceLedgerError`] if the backend fails.
    async fn contains(&self, nonce: &U256) -> Result<bool, NonceLedgerError>;

    /// Atomically reserves `nonce`. Returns `false` if it was already present.
    ///
    /// # Errors
    ///
    /// Returns [`NonceLedgerError`] if the backend fails.
    async fn try_reserve(&self, nonce: U256) -> Result<bool, NonceLedgerError>;

    /// Records that the transfer for `nonce` was issued.
    ///
    /// # Errors
    ///
    /// Returns [`NonceLedgerError::NotReserved`] if `nonce` was never reserved.
    async fn mark_confirmed(&self, nonce: &U256, tx_hash: TxHash) -> Result<(), NonceLedgerError>;

    /// Records that the transfer for `nonce` failed.
    ///
    /// # Errors
    ///
    /// Returns [`NonceLedgerError::NotReserved`] if `nonce` was never reserved.
    async fn mark_failed(&self, nonce: &U256, error: String) -> Result<(), NonceLedgerError>;

    /// Returns the entry for `nonce`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`NonceLedgerError`] if the backend fails.
    async fn record(&self, nonce: &U256) -> Result<Option<NonceRecord>, NonceLedgerError>;
}

/// In-memory, process-scoped [`NonceLedger`].
///
/// Backed by a sharded concurrent map; the entry API gives an atomic
/// check-and-insert per key without a global lock.
#[derive(Debug, Default)]
pub struct MemoryNonceLedger {
    entries: DashMap<U256, NonceRecord>,
}

impl MemoryNonceLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of consumed nonces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no nonce has been consumed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn update(&self, nonce: &U256, status: NonceStatus) -> Result<(), NonceLedgerError> {
        let mut entry = self
            .entries
            .get_mut(nonce)
            .ok_or(NonceLedgerError::NotReserved(*nonce))?;
        entry.status = status;
        Ok(())
    }
}

#[async_trait::async_trait]
impl NonceLedger for MemoryNonceLedger {
    async fn contains(&self, nonce: &U256) -> Result<bool, NonceLedgerError> {
        Ok(self.entries.contains_key(nonce))
    }

    async fn try_reserve(&self, nonce: U256) -> Result<bool, NonceLedgerError> {
        match self.entries.entry(nonce) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(NonceRecord {
                    nonce,
                    reserved_at: UnixTimestamp::now(),
                    status: NonceStatus::Reserved,
                });
                Ok(true)
            }
        }
    }

    async fn mark_confirmed(&self, nonce: &U256, tx_hash: TxHash) -> Result<(), NonceLedgerError> {
        self.update(nonce, NonceStatus::Confirmed { tx_hash })
    }

    async fn mark_failed(&self, nonce: &U256, error: String) -> Result<(), NonceLedgerError> {
        self.update(nonce, NonceStatus::Failed { error })
    }

    async fn record(&self, nonce: &U256) -> Result<Option<NonceRecord>, NonceLedgerError> {
        Ok(self.entries.get(nonce).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reserve_once() {
        let ledger = MemoryNonceLedger::new();
        let nonce = U256::from(42u64);

        assert!(!ledger.contains(&nonce).await.unwrap());
        assert!(ledger.try_reserve(nonce).await.unwrap());
        assert!(ledger.contains(&nonce).await.unwrap());
        assert!(!ledger.try_reserve(nonce).await.unwrap());
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let ledger = MemoryNonceLedger::new();
        let nonce = U256::from(7u64);
        ledger.try_reserve(nonce).await.unwrap();

        let record = ledger.record(&nonce).await.unwrap().unwrap();
        assert_eq!(record.status, NonceStatus::Reserved);

        ledger
            .mark_failed(&nonce, "rpc down".to_owned())
            .await
            .unwrap();
        let record = ledger.record(&nonce).await.unwrap().unwrap();
        assert_eq!(
            record.status,
            NonceStatus::Failed {
                error: "rpc down".to_owned()
            }
        );

        // A failed nonce is still consumed.
        assert!(!ledger.try_reserve(nonce).await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_unknown_nonce_fails() {
        let ledger = MemoryNonceLedger::new();
        let result = ledger.mark_confirmed(&U256::from(1u64), TxHash::ZERO).await;
        assert!(matches!(result, Err(NonceLedgerError::NotReserved(_))));
    }

    #[tokio::test]
    async fn test_record_serialization() {
        let ledger = MemoryNonceLedger::new();
        let nonce = U256::from(9u64);
        ledger.try_reserve(nonce).await.unwrap();
        ledger.mark_confirmed(&nonce, TxHash::ZERO).await.unwrap();

        let record = ledger.record(&nonce).await.unwrap().unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["txHash"], format!("{}", TxHash::ZERO));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reserve_has_single_winner() {
        let ledger = Arc::new(MemoryNonceLedger::new());
        let nonce = U256::from(1234u64);

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move { ledger.try_reserve(nonce).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
