//! Airdrop server configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! port = 8787
//! token = "0xaD6a4F5AF2dAddE7801EAbEa764A7D4cF0EF7Cb3"
//! chain_id = 137
//! amount = "1000"
//! rpc_urls = ["https://polygon-rpc.com"]
//! private_key = "$PRIVATE_KEY"
//! cors_origins = ["https://claim.example.org"]
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `config.toml`)
//! - `HOST`, `PORT` - Override the bind address and port
//! - `TOKEN`, `CHAIN_ID`, `AMOUNT` - Override the claim parameters
//! - `RPC_URL` - Override the RPC endpoints (comma separated)
//! - `PRIVATE_KEY` - Override the sender credential
//! - `CORS_ORIGINS` - Override the allowed origins (comma separated)

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use airdrop::domain::DEFAULT_DOMAIN_NAMES;
use alloy_primitives::{Address, address};
use serde::Deserialize;
use url::Url;

/// Token disbursed when none is configured.
pub const DEFAULT_TOKEN: Address = address!("0xaD6a4F5AF2dAddE7801EAbEa764A7D4cF0EF7Cb3");

/// Errors from loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// An environment override could not be parsed.
    #[error("invalid value for {name}: {reason}")]
    InvalidOverride {
        /// Environment variable name.
        name: &'static str,
        /// Parse failure.
        reason: String,
    },
    /// No signing domain names are configured, so no claim could ever verify.
    #[error("domain_names must not be empty")]
    NoDomainNames,
}

/// Top-level server configuration.
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Server bind address (default: `0.0.0.0`).
    pub host: IpAddr,
    /// Server port (default: `8787`).
    pub port: u16,
    /// ERC-20 token contract being disbursed.
    pub token: Address,
    /// Chain id bound into every accepted signing domain (default: `137`).
    pub chain_id: u64,
    /// Claim amount in human units, converted with the token's decimals
    /// (default: `"1000"`).
    pub amount: String,
    /// HTTP RPC endpoints, tried in fallback order.
    pub rpc_urls: Vec<Url>,
    /// Optional requests-per-second cap per RPC endpoint.
    pub rpc_rate_limit: Option<u32>,
    /// Sender credential: `0x` + 64 hex digits, or a mnemonic phrase.
    pub private_key: String,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
    /// Accepted EIP-712 domain names, in match order.
    pub domain_names: Vec<String>,
    /// Block confirmations to wait for; `0` returns on broadcast.
    pub confirmations: u64,
    /// Seconds to wait for a receipt when `confirmations > 0`.
    pub receipt_timeout_secs: u64,
    /// Whether the chain uses EIP-1559 gas pricing.
    pub eip1559: bool,
    /// Maximum request body size in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8787,
            token: DEFAULT_TOKEN,
            chain_id: 137,
            amount: "1000".to_owned(),
            rpc_urls: Url::parse("https://polygon-rpc.com").into_iter().collect(),
            rpc_rate_limit: None,
            private_key: String::new(),
            cors_origins: vec!["*".to_owned()],
            domain_names: DEFAULT_DOMAIN_NAMES.map(str::to_owned).into(),
            confirmations: 0,
            receipt_timeout_secs: 30,
            eip1559: true,
            body_limit_bytes: 512 * 1024,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token", &self.token)
            .field("chain_id", &self.chain_id)
            .field("amount", &self.amount)
            .field("rpc_urls", &self.rpc_urls)
            .field("rpc_rate_limit", &self.rpc_rate_limit)
            .field("private_key", &"<redacted>")
            .field("cors_origins", &self.cors_origins)
            .field("domain_names", &self.domain_names)
            .field("confirmations", &self.confirmations)
            .field("receipt_timeout_secs", &self.receipt_timeout_secs)
            .field("eip1559", &self.eip1559)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .finish()
    }
}

impl ServerConfig {
    /// Loads configuration from the path given by the `CONFIG` environment
    /// variable, falling back to `config.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG").unwrap_or_else(|_| "config.toml".to_owned());
        Self::load_from(&path)
    }

    /// Loads configuration from a specific file path. A missing file means
    /// all defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override is malformed.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let content = if Path::new(path).exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?
        } else {
            String::new()
        };
        Self::from_toml_with(&content, |name| std::env::var(name).ok())
    }

    /// Parses `content`, resolving `$VAR` references and overrides through
    /// `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is invalid or an override is malformed.
    pub fn from_toml_with<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_env_vars(content, &lookup);
        let mut config: Self = toml::from_str(&expanded)?;
        config.apply_overrides(&lookup)?;
        if config.domain_names.is_empty() {
            return Err(ConfigError::NoDomainNames);
        }
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.host = parse_override("HOST", &host)?;
        }
        if let Some(port) = lookup("PORT") {
            self.port = parse_override("PORT", &port)?;
        }
        if let Some(token) = lookup("TOKEN") {
            self.token = parse_override("TOKEN", &token)?;
        }
        if let Some(chain_id) = lookup("CHAIN_ID") {
            self.chain_id = parse_override("CHAIN_ID", &chain_id)?;
        }
        if let Some(amount) = lookup("AMOUNT") {
            self.amount = amount.trim().to_owned();
        }
        if let Some(urls) = lookup("RPC_URL") {
            self.rpc_urls = split_list(&urls)
                .map(|url| parse_override("RPC_URL", url))
                .collect::<Result<_, _>>()?;
        }
        if let Some(key) = lookup("PRIVATE_KEY") {
            self.private_key = key;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.cors_origins = split_list(&origins).map(str::to_owned).collect();
        }
        Ok(())
    }

    /// Socket address the listener binds to.
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_override<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidOverride {
            name,
            reason: e.to_string(),
        })
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// Expands `$VAR` and `${VAR}` patterns in a string using `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_env_vars<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        match lookup(&var_name).filter(|_| !var_name.is_empty()) {
            Some(value) => result.push_str(&value),
            None => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&var_name);
                if braced && !var_name.is_empty() {
                    result.push('}');
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_toml_with("", env(&[])).unwrap();
        assert_eq!(config.port, 8787);
        assert_eq!(config.chain_id, 137);
        assert_eq!(config.amount, "1000");
        assert_eq!(config.token, DEFAULT_TOKEN);
        assert_eq!(config.rpc_urls[0].as_str(), "https://polygon-rpc.com/");
        assert_eq!(config.cors_origins, ["*"]);
        assert_eq!(config.domain_names, DEFAULT_DOMAIN_NAMES);
        assert_eq!(config.confirmations, 0);
        assert_eq!(config.body_limit_bytes, 512 * 1024);
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:8787");
    }

    #[test]
    fn test_expands_variables() {
        let toml = r#"
            private_key = "$SENDER_KEY"
            amount = "${CLAIM_AMOUNT}"
            cors_origins = ["$MISSING"]
        "#;
        let config = ServerConfig::from_toml_with(
            toml,
            env(&[("SENDER_KEY", "0xabc"), ("CLAIM_AMOUNT", "2.5")]),
        )
        .unwrap();
        assert_eq!(config.private_key, "0xabc");
        assert_eq!(config.amount, "2.5");
        assert_eq!(config.cors_origins, ["$MISSING"]);
    }

    #[test]
    fn test_env_overrides_file() {
        let toml = r#"
            port = 9000
            chain_id = 1
        "#;
        let config = ServerConfig::from_toml_with(
            toml,
            env(&[
                ("PORT", "8080"),
                ("CHAIN_ID", "80002"),
                ("TOKEN", "0x0000000000000000000000000000000000000001"),
                ("RPC_URL", "https://a.example, https://b.example"),
                ("CORS_ORIGINS", "https://x.example,,https://y.example"),
                ("AMOUNT", " 42 "),
            ]),
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.chain_id, 80002);
        assert_eq!(config.token, Address::with_last_byte(1));
        assert_eq!(config.rpc_urls.len(), 2);
        assert_eq!(config.cors_origins, ["https://x.example", "https://y.example"]);
        assert_eq!(config.amount, "42");
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let err = ServerConfig::from_toml_with("", env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { name: "PORT", .. }));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = ServerConfig::from_toml_with("prot = 1", env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_domain_names_is_rejected() {
        let err = ServerConfig::from_toml_with("domain_names = []", env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::NoDomainNames));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let config = ServerConfig::from_toml_with("", env(&[("PRIVATE_KEY", "secret words")]))
            .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret words"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_expand_leaves_lone_dollar() {
        assert_eq!(expand_env_vars("cost $ 5", &env(&[])), "cost $ 5");
        assert_eq!(expand_env_vars("${}", &env(&[])), "${");
    }
}
