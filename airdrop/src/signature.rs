//! Typed-data hashing and signer recovery.
//!
//! Claims are signed as EIP-712 structured data over the fixed `Claim`
//! schema. Recovery is a pure function of domain, message and signature.
//! Note that a successful recovery only proves that *some* key signed the
//! digest: a mismatched message or domain still recovers an address, so
//! callers must compare the result against the expected signer.

use alloy_primitives::{Address, B256, Signature, hex};
use alloy_sol_types::{Eip712Domain, SolStruct, sol};

sol! {
    /// EIP-712 message signed by the claimer.
    ///
    /// Encodes as
    /// `Claim(address claimer,uint256 amount,uint256 nonce,uint256 deadline)`.
    #[derive(Debug, PartialEq, Eq)]
    struct Claim {
        address claimer;
        uint256 amount;
        uint256 nonce;
        uint256 deadline;
    }
}

/// Errors from parsing a signature or recovering its signer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    /// The signature text is not `0x`-prefixed hex.
    #[error("signature is not 0x-prefixed hex")]
    MalformedHex,
    /// The signature is neither 65 bytes nor 64-byte compact.
    #[error("signature has invalid length {0}")]
    InvalidLength(usize),
    /// The bytes do not form a valid secp256k1 signature (bad `v`, `r` or `s`).
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// Parses a signature from its canonical textual encoding.
///
/// Accepts the 65-byte `r || s || v` form (`v` in `{0, 1, 27, 28}`) and the
/// 64-byte EIP-2098 compact form. `s` is normalized to the lower half of the
/// curve order, flipping the parity accordingly.
///
/// # Errors
///
/// Returns [`RecoveryError`] if the text is not hex, has the wrong length, or
/// carries an invalid recovery id.
pub fn parse_signature(text: &str) -> Result<Signature, RecoveryError> {
    let body = text
        .trim()
        .strip_prefix("0x")
        .ok_or(RecoveryError::MalformedHex)?;
    let bytes = hex::decode(body).map_err(|_| RecoveryError::MalformedHex)?;
    let signature = match bytes.len() {
        65 => Signature::from_raw(&bytes)
            .map_err(|e| RecoveryError::InvalidSignature(e.to_string()))?,
        64 => Signature::from_erc2098(&bytes),
        other => return Err(RecoveryError::InvalidLength(other)),
    };
    Ok(signature.normalized_s())
}

/// Computes the EIP-712 digest of `message` under `domain`.
#[must_use]
pub fn signing_hash(domain: &Eip712Domain, message: &Claim) -> B256 {
    message.eip712_signing_hash(domain)
}

/// Recovers the address that signed `message` under `domain`.
///
/// # Errors
///
/// Returns [`RecoveryError::InvalidSignature`] if no public key can be
/// recovered from the signature and digest.
pub fn recover(
    domain: &Eip712Domain,
    message: &Claim,
    signature: &Signature,
) -> Result<Address, RecoveryError> {
    let hash = signing_hash(domain, message);
    signature
        .recover_address_from_prehash(&hash)
        .map_err(|e| RecoveryError::InvalidSignature(e.to_string()))
}
