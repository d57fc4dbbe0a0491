//! Composite claim validation.
//!
//! Checks run in a fixed order and stop at the first failure, cheapest first,
//! so the reported reason is deterministic:
//!
//! 1. token matches the configured contract (case-insensitive)
//! 2. claimer is a valid address
//! 3. amount equals the configured base-unit amount, exactly
//! 4. the deadline has not passed (inclusive)
//! 5. the nonce is not already consumed (pre-check only)
//! 6. some accepted signing domain recovers the claimer
//!
//! Step 5 does not reserve the nonce. Reservation is the caller's job and
//! happens after step 6, so a request with a bad signature cannot burn a
//! nonce that belongs to someone else.

use std::str::FromStr;

use alloy_primitives::{Address, U256};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::claim::{ClaimRequest, NumericField};
use crate::domain::DomainResolver;
use crate::error::{ClaimError, RejectReason};
use crate::ledger::NonceLedger;
use crate::signature::{self, Claim};
use crate::timestamp::UnixTimestamp;

/// A claim that passed every validation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedClaim {
    /// Recipient and signer.
    pub claimer: Address,
    /// Amount in base units.
    pub amount: U256,
    /// Single-use nonce.
    pub nonce: U256,
    /// Expiry, unix seconds.
    pub deadline: U256,
    /// Name of the signing domain that matched.
    pub domain_name: String,
}

/// Validates claim requests against the configured token, amount and domains.
#[derive(Debug, Clone)]
pub struct ClaimValidator {
    token: Address,
    amount: U256,
    domains: DomainResolver,
}

impl ClaimValidator {
    /// Creates a validator for claims of exactly `amount` base units of `token`.
    #[must_use]
    pub const fn new(token: Address, amount: U256, domains: DomainResolver) -> Self {
        Self {
            token,
            amount,
            domains,
        }
    }

    /// The token contract claims must reference.
    #[must_use]
    pub const fn token(&self) -> Address {
        self.token
    }

    /// The exact amount, in base units, every claim must carry.
    #[must_use]
    pub const fn amount(&self) -> U256 {
        self.amount
    }

    /// The accepted signing domains.
    #[must_use]
    pub const fn domains(&self) -> &DomainResolver {
        &self.domains
    }

    /// Runs all six checks against `request` at time `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimError::Rejected`] with the first failing check's reason,
    /// or [`ClaimError::Ledger`] if the nonce pre-check could not be performed.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
        claimer = %request.claimer,
        nonce = %request.nonce,
    )))]
    pub async fn validate<L>(
        &self,
        request: &ClaimRequest,
        now: UnixTimestamp,
        ledger: &L,
    ) -> Result<ValidatedClaim, ClaimError>
    where
        L: NonceLedger + ?Sized,
    {
        self.check_token(&request.token)?;
        let claimer = parse_claimer(&request.claimer)?;
        let amount = self.check_amount(&request.amount)?;
        let deadline = check_deadline(&request.deadline, now)?;

        let nonce = request.nonce.to_u256();
        if let Some(nonce) = nonce
            && ledger.contains(&nonce).await?
        {
            return Err(RejectReason::NonceUsed.into());
        }
        // A nonce that is not a uint256 cannot be part of a signed Claim.
        let nonce = nonce.ok_or(RejectReason::BadSignature)?;

        let message = Claim {
            claimer,
            amount,
            nonce,
            deadline,
        };
        let domain_name = self.verify_signature(&message, &request.signature)?;

        Ok(ValidatedClaim {
            claimer,
            amount,
            nonce,
            deadline,
            domain_name,
        })
    }

    /// Step 1: the token address matches, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`RejectReason::BadToken`] on mismatch.
    pub fn check_token(&self, token: &str) -> Result<(), RejectReason> {
        if token.eq_ignore_ascii_case(&self.token.to_string()) {
            Ok(())
        } else {
            Err(RejectReason::BadToken)
        }
    }

    /// Step 3: the amount text equals the configured amount's decimal form.
    ///
    /// No tolerance, no rounding, no alternative notations.
    ///
    /// # Errors
    ///
    /// Returns [`RejectReason::BadAmount`] on mismatch.
    pub fn check_amount(&self, amount: &NumericField) -> Result<U256, RejectReason> {
        if amount.as_str() == self.amount.to_string() {
            Ok(self.amount)
        } else {
            Err(RejectReason::BadAmount)
        }
    }

    /// Step 6: tries each accepted domain in order and returns the name of
    /// the first one under which the signature recovers to `message.claimer`.
    ///
    /// Recovery failures for individual domains are not errors; they simply
    /// do not match.
    ///
    /// # Errors
    ///
    /// Returns [`RejectReason::BadSignature`] if the signature is malformed or
    /// no domain matches.
    pub fn verify_signature(&self, message: &Claim, signature: &str) -> Result<String, RejectReason> {
        let signature =
            signature::parse_signature(signature).map_err(|_| RejectReason::BadSignature)?;
        let matched = self.domains.candidates().find_map(|(name, domain)| {
            signature::recover(&domain, message, &signature)
                .ok()
                .filter(|recovered| *recovered == message.claimer)
                .map(|_| name.to_owned())
        });

        #[cfg(feature = "telemetry")]
        match &matched {
            Some(name) => tracing::debug!(domain = %name, "signature matched"),
            None => tracing::debug!("no accepted domain matched signature"),
        }

        matched.ok_or(RejectReason::BadSignature)
    }
}

/// Step 2: parses the claimer address.
///
/// Accepts all-lowercase or all-uppercase hex; mixed case must carry a valid
/// EIP-55 checksum.
///
/// # Errors
///
/// Returns [`RejectReason::BadClaimer`] if the text is not a valid address.
pub fn parse_claimer(text: &str) -> Result<Address, RejectReason> {
    let address = Address::from_str(text).map_err(|_| RejectReason::BadClaimer)?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper && address.to_checksum(None)[2..] != *digits {
        return Err(RejectReason::BadClaimer);
    }
    Ok(address)
}

/// Step 4: the deadline is a `uint256` not earlier than `now`.
///
/// # Errors
///
/// Returns [`RejectReason::Expired`] if the deadline has passed or is not a number.
pub fn check_deadline(deadline: &NumericField, now: UnixTimestamp) -> Result<U256, RejectReason> {
    deadline
        .to_u256()
        .filter(|deadline| now.is_at_or_before(*deadline))
        .ok_or(RejectReason::Expired)
}
