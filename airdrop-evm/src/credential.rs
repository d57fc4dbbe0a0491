//! Sender key parsing.
//!
//! The disbursement sender is configured with a single secret, either a raw
//! secp256k1 key (`0x` + 64 hex digits) or a BIP-39 mnemonic phrase. For a
//! phrase the first account on the standard Ethereum path
//! (`m/44'/60'/0'/0/0`) is used.

use alloy_signer_local::coins_bip39::English;
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner};

/// Fewest words accepted as a mnemonic phrase.
pub const MIN_MNEMONIC_WORDS: usize = 12;

/// Errors from parsing the sender secret.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The secret is neither a hex key nor a mnemonic phrase.
    #[error("PRIVATE_KEY is invalid. Expected 0x + 64 hex or a 12/24-word phrase.")]
    Unrecognized,
    /// The secret looks like a hex key but is not a valid secp256k1 scalar.
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    /// The secret looks like a phrase but no key could be derived from it.
    #[error("invalid mnemonic phrase: {0}")]
    InvalidMnemonic(String),
}

fn is_hex_key(secret: &str) -> bool {
    secret
        .strip_prefix("0x")
        .is_some_and(|digits| digits.len() == 64 && digits.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Builds the sender signer from a hex key or mnemonic phrase.
///
/// Surrounding whitespace is ignored. Words in a phrase may be separated by
/// any run of whitespace.
///
/// # Errors
///
/// Returns [`CredentialError`] if the secret matches neither form or the key
/// cannot be derived.
pub fn signer_from_secret(secret: &str) -> Result<PrivateKeySigner, CredentialError> {
    let secret = secret.trim();
    if is_hex_key(secret) {
        return secret
            .parse::<PrivateKeySigner>()
            .map_err(|e| CredentialError::InvalidKey(e.to_string()));
    }

    let words: Vec<&str> = secret.split_whitespace().collect();
    if words.len() < MIN_MNEMONIC_WORDS {
        return Err(CredentialError::Unrecognized);
    }
    MnemonicBuilder::<English>::default()
        .phrase(words.join(" "))
        .build()
        .map_err(|e| CredentialError::InvalidMnemonic(e.to_string()))
}
