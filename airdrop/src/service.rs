//! Claim orchestration.
//!
//! [`ClaimService`] ties validation, nonce reservation and the transfer
//! together. For a single request the sequence is:
//!
//! 1. validate (no side effects)
//! 2. atomically reserve the nonce; losing the race yields "Nonce used"
//! 3. issue the transfer, outside of any lock
//! 4. record the outcome against the nonce
//!
//! A transfer failure after step 2 leaves the nonce consumed.

use std::sync::Arc;

use alloy_primitives::{Address, TxHash, U256};
use serde::Serialize;

use crate::claim::ClaimRequest;
use crate::disburse::Disburser;
use crate::error::ClaimError;
use crate::ledger::{NonceLedger, NonceLedgerError, NonceRecord};
use crate::timestamp::UnixTimestamp;
use crate::validator::ClaimValidator;

/// Result of a successful claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    /// Hash of the transfer transaction.
    pub tx_hash: TxHash,
    /// Recipient of the transfer.
    pub claimer: Address,
    /// Nonce consumed by the claim.
    pub nonce: U256,
    /// Signing domain the claim was verified under.
    pub domain_name: String,
}

/// Validates claims and disburses tokens, at most once per nonce.
#[derive(Clone)]
pub struct ClaimService {
    validator: ClaimValidator,
    ledger: Arc<dyn NonceLedger>,
    disburser: Arc<dyn Disburser>,
}

impl std::fmt::Debug for ClaimService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimService")
            .field("validator", &self.validator)
            .field("sender", &self.disburser.sender())
            .finish_non_exhaustive()
    }
}

impl ClaimService {
    /// Creates a service from its collaborators.
    #[must_use]
    pub fn new(
        validator: ClaimValidator,
        ledger: Arc<dyn NonceLedger>,
        disburser: Arc<dyn Disburser>,
    ) -> Self {
        Self {
            validator,
            ledger,
            disburser,
        }
    }

    /// The validator used for incoming requests.
    #[must_use]
    pub const fn validator(&self) -> &ClaimValidator {
        &self.validator
    }

    /// Address tokens are sent from.
    #[must_use]
    pub fn sender(&self) -> Address {
        self.disburser.sender()
    }

    /// Processes `request` against the current wall-clock time.
    ///
    /// # Errors
    ///
    /// See [`claim_at`](Self::claim_at).
    pub async fn claim(&self, request: &ClaimRequest) -> Result<ClaimReceipt, ClaimError> {
        self.claim_at(request, UnixTimestamp::now()).await
    }

    /// Processes `request` as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// - [`ClaimError::Rejected`] if validation fails
    /// - [`ClaimError::ReservationConflict`] if a concurrent request consumed
    ///   the nonce between validation and reservation
    /// - [`ClaimError::Disbursement`] if the transfer failed; the nonce stays consumed
    /// - [`ClaimError::Ledger`] if the ledger backend failed
    pub async fn claim_at(
        &self,
        request: &ClaimRequest,
        now: UnixTimestamp,
    ) -> Result<ClaimReceipt, ClaimError> {
        let claim = self
            .validator
            .validate(request, now, self.ledger.as_ref())
            .await?;

        if !self.ledger.try_reserve(claim.nonce).await? {
            #[cfg(feature = "telemetry")]
            tracing::info!(nonce = %claim.nonce, "lost nonce reservation race");
            return Err(ClaimError::ReservationConflict);
        }

        match self.disburser.transfer(claim.claimer, claim.amount).await {
            Ok(tx_hash) => {
                if let Err(error) = self.ledger.mark_confirmed(&claim.nonce, tx_hash).await {
                    // The transfer went out; the client still gets its hash.
                    report_ledger_update_failure(&claim.nonce, &error);
                }
                #[cfg(feature = "telemetry")]
                tracing::info!(
                    claimer = %claim.claimer,
                    nonce = %claim.nonce,
                    domain = %claim.domain_name,
                    tx_hash = %tx_hash,
                    "claim disbursed"
                );
                Ok(ClaimReceipt {
                    tx_hash,
                    claimer: claim.claimer,
                    nonce: claim.nonce,
                    domain_name: claim.domain_name,
                })
            }
            Err(error) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(
                    claimer = %claim.claimer,
                    nonce = %claim.nonce,
                    error = %error,
                    "transfer failed, nonce stays consumed"
                );
                if let Err(ledger_error) = self
                    .ledger
                    .mark_failed(&claim.nonce, error.public_message())
                    .await
                {
                    report_ledger_update_failure(&claim.nonce, &ledger_error);
                }
                Err(error.into())
            }
        }
    }

    /// Looks up the ledger entry for `nonce`.
    ///
    /// # Errors
    ///
    /// Returns [`NonceLedgerError`] if the ledger backend fails.
    pub async fn nonce_record(&self, nonce: &U256) -> Result<Option<NonceRecord>, NonceLedgerError> {
        self.ledger.record(nonce).await
    }
}

#[cfg_attr(not(feature = "telemetry"), allow(unused_variables))]
fn report_ledger_update_failure(nonce: &U256, error: &NonceLedgerError) {
    #[cfg(feature = "telemetry")]
    tracing::error!(nonce = %nonce, error = %error, "failed to record transfer outcome");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disburse::DisbursementError;
    use crate::domain::DomainResolver;
    use crate::error::RejectReason;
    use crate::ledger::{MemoryNonceLedger, NonceStatus};
    use crate::signature::{self, Claim};
    use alloy_primitives::{B256, hex};
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;
    use alloy_sol_types::eip712_domain;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    const TOKEN: &str = "0xad6a4f5af2dadde7801eabea764a7d4cf0ef7cb3";
    const NOW: u64 = 1_800_000_000;

    #[derive(Default)]
    struct RecordingDisburser {
        transfers: Mutex<Vec<(Address, U256)>>,
        fail: AtomicBool,
    }

    #[async_trait::async_trait]
    impl Disburser for RecordingDisburser {
        async fn transfer(&self, to: Address, amount: U256) -> Result<TxHash, DisbursementError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(DisbursementError::Transport("connection refused".into()));
            }
            let mut transfers = self.transfers.lock().unwrap();
            transfers.push((to, amount));
            Ok(B256::with_last_byte(u8::try_from(transfers.len()).unwrap()))
        }

        fn sender(&self) -> Address {
            Address::repeat_byte(0x11)
        }
    }

    struct Fixture {
        service: ClaimService,
        ledger: Arc<MemoryNonceLedger>,
        disburser: Arc<RecordingDisburser>,
    }

    fn amount() -> U256 {
        U256::from(1000u64)
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(MemoryNonceLedger::new());
        let disburser = Arc::new(RecordingDisburser::default());
        let validator = ClaimValidator::new(
            TOKEN.parse().unwrap(),
            amount(),
            DomainResolver::with_default_names(137),
        );
        let service = ClaimService::new(
            validator,
            Arc::<MemoryNonceLedger>::clone(&ledger),
            Arc::<RecordingDisburser>::clone(&disburser),
        );
        Fixture {
            service,
            ledger,
            disburser,
        }
    }

    fn signed_request(signer: &PrivateKeySigner, nonce: u64) -> ClaimRequest {
        let deadline = NOW + 60;
        let message = Claim {
            claimer: signer.address(),
            amount: amount(),
            nonce: U256::from(nonce),
            deadline: U256::from(deadline),
        };
        let domain = eip712_domain! {
            name: "VEN Airdrop",
            version: "1",
            chain_id: 137,
        };
        let signature = signer
            .sign_hash_sync(&signature::signing_hash(&domain, &message))
            .unwrap();
        ClaimRequest {
            token: TOKEN.into(),
            claimer: signer.address().to_string(),
            amount: amount().into(),
            nonce: nonce.into(),
            deadline: deadline.into(),
            signature: format!("0x{}", hex::encode(signature.as_bytes())),
        }
    }

    #[tokio::test]
    async fn test_valid_claim_disburses_once() {
        let fx = fixture();
        let signer = PrivateKeySigner::random();
        let request = signed_request(&signer, 1);

        let receipt = fx
            .service
            .claim_at(&request, UnixTimestamp::from_secs(NOW))
            .await
            .unwrap();
        assert_eq!(receipt.claimer, signer.address());
        assert_eq!(receipt.domain_name, "VEN Airdrop");
        assert_eq!(
            *fx.disburser.transfers.lock().unwrap(),
            vec![(signer.address(), amount())]
        );

        let record = fx.service.nonce_record(&U256::from(1u64)).await.unwrap().unwrap();
        assert_eq!(
            record.status,
            NonceStatus::Confirmed {
                tx_hash: receipt.tx_hash
            }
        );
    }

    #[tokio::test]
    async fn test_replay_is_rejected() {
        let fx = fixture();
        let signer = PrivateKeySigner::random();
        let request = signed_request(&signer, 2);
        let now = UnixTimestamp::from_secs(NOW);

        fx.service.claim_at(&request, now).await.unwrap();
        let err = fx.service.claim_at(&request, now).await.unwrap_err();
        assert!(matches!(err, ClaimError::Rejected(RejectReason::NonceUsed)));
        assert_eq!(fx.disburser.transfers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_claim_does_not_consume_nonce() {
        let fx = fixture();
        let signer = PrivateKeySigner::random();
        let mut request = signed_request(&signer, 3);
        request.claimer = PrivateKeySigner::random().address().to_string();

        let err = fx
            .service
            .claim_at(&request, UnixTimestamp::from_secs(NOW))
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::Rejected(RejectReason::BadSignature)));
        assert!(fx.ledger.is_empty());
        assert!(fx.disburser.transfers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_claim_is_rejected_after_deadline() {
        let fx = fixture();
        let signer = PrivateKeySigner::random();
        let request = signed_request(&signer, 4);

        let err = fx
            .service
            .claim_at(&request, UnixTimestamp::from_secs(NOW + 61))
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::Rejected(RejectReason::Expired)));
    }

    #[tokio::test]
    async fn test_failed_transfer_burns_nonce() {
        let fx = fixture();
        fx.disburser.fail.store(true, Ordering::SeqCst);
        let signer = PrivateKeySigner::random();
        let request = signed_request(&signer, 5);
        let now = UnixTimestamp::from_secs(NOW);

        let err = fx.service.claim_at(&request, now).await.unwrap_err();
        assert!(matches!(err, ClaimError::Disbursement(_)));
        assert!(!err.is_client_error());

        let record = fx.service.nonce_record(&U256::from(5u64)).await.unwrap().unwrap();
        assert_eq!(
            record.status,
            NonceStatus::Failed {
                error: "connection refused".into()
            }
        );

        fx.disburser.fail.store(false, Ordering::SeqCst);
        let err = fx.service.claim_at(&request, now).await.unwrap_err();
        assert!(matches!(err, ClaimError::Rejected(RejectReason::NonceUsed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_nonce_disburses_once() {
        let fx = fixture();
        let service = Arc::new(fx.service);
        let signer = PrivateKeySigner::random();
        let request = Arc::new(signed_request(&signer, 6));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = Arc::clone(&service);
                let request = Arc::clone(&request);
                tokio::spawn(async move {
                    service
                        .claim_at(&request, UnixTimestamp::from_secs(NOW))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => assert_eq!(err.to_string(), "Nonce used"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(fx.disburser.transfers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_nonces_each_disburse() {
        let fx = fixture();
        let signer = PrivateKeySigner::random();
        let now = UnixTimestamp::from_secs(NOW);
        for nonce in 10..13 {
            fx.service
                .claim_at(&signed_request(&signer, nonce), now)
                .await
                .unwrap();
        }
        assert_eq!(fx.ledger.len(), 3);
        assert_eq!(fx.disburser.transfers.lock().unwrap().len(), 3);
    }
}
