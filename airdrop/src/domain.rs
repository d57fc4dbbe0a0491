//! Accepted EIP-712 signing domains.
//!
//! Deployed front-ends name the claim domain inconsistently. Rather than
//! weakening the signature check, the service accepts a closed, ordered list
//! of domain *names* for one fixed chain id and version. The list is an
//! operator-maintained trust boundary; nothing is discovered at runtime.

use alloy_sol_types::{Eip712Domain, eip712_domain};

/// Domain version every accepted front-end signs with.
pub const CLAIM_DOMAIN_VERSION: &str = "1";

/// Domain names used by the known claim front-ends, in match order.
pub const DEFAULT_DOMAIN_NAMES: [&str; 4] = ["NY Airdrop", "VEN Airdrop", "Airdrop", "Claim"];

/// Enumerates the signing domains a claim signature may be scoped to.
///
/// Only the `name` varies between candidates; `chainId` and `version` are
/// fixed, and no candidate carries a `verifyingContract` or `salt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainResolver {
    chain_id: u64,
    names: Vec<String>,
}

impl DomainResolver {
    /// Creates a resolver for `chain_id` with an explicit list of names.
    ///
    /// Duplicates are dropped, keeping the first occurrence.
    #[must_use]
    pub fn new<I, S>(chain_id: u64, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self {
            chain_id,
            names: unique,
        }
    }

    /// Creates a resolver with [`DEFAULT_DOMAIN_NAMES`].
    #[must_use]
    pub fn with_default_names(chain_id: u64) -> Self {
        Self::new(chain_id, DEFAULT_DOMAIN_NAMES)
    }

    /// Chain id every candidate domain is bound to.
    #[must_use]
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Accepted domain names, in match order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the candidate domains in match order.
    pub fn candidates(&self) -> impl Iterator<Item = (&str, Eip712Domain)> + '_ {
        self.names.iter().map(move |name| {
            let domain = eip712_domain! {
                name: name.clone(),
                version: CLAIM_DOMAIN_VERSION,
                chain_id: self.chain_id,
            };
            (name.as_str(), domain)
        })
    }
}
