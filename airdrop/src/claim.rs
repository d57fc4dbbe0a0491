//! Wire format of an inbound claim request.
//!
//! Every field is untrusted client input. Deserialization is lenient:
//! missing or `null` fields become empty and any other scalar is kept as
//! its text, so the validator rather than the JSON layer decides which
//! check fails.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Body of `POST /api/claim`.
///
/// ```json
/// {
///   "token": "0xad6a4f5af2dadde7801eabea764a7d4cf0ef7cb3",
///   "claimer": "0x1234...",
///   "amount": "1000000000000000000000",
///   "nonce": "42",
///   "deadline": 1760000000,
///   "signature": "0x..."
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Token contract address, compared case-insensitively.
    #[serde(default, deserialize_with = "lenient_text")]
    pub token: String,
    /// Address that signed the authorization and receives the tokens.
    #[serde(default, deserialize_with = "lenient_text")]
    pub claimer: String,
    /// Amount in base units.
    #[serde(default)]
    pub amount: NumericField,
    /// Single-use authorization identifier (`uint256`).
    #[serde(default)]
    pub nonce: NumericField,
    /// Expiry, unix seconds (`uint256`).
    #[serde(default)]
    pub deadline: NumericField,
    /// 65-byte ECDSA signature, `0x`-prefixed hex.
    #[serde(default, deserialize_with = "lenient_text")]
    pub signature: String,
}

/// A numeric field that may arrive as a JSON string or a JSON number.
///
/// The text is kept as received so that comparisons which must be exact
/// on the decimal representation (the claim amount) are not weakened by a
/// numeric round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NumericField(String);

impl NumericField {
    /// Creates a field from its textual form.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Returns the field exactly as received.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the field as a `uint256`, accepting decimal or `0x` hex.
    ///
    /// Returns `None` for empty, negative, fractional or oversized input.
    #[must_use]
    pub fn to_u256(&self) -> Option<U256> {
        let text = self.0.trim();
        if text.is_empty() {
            return None;
        }
        U256::from_str(text).ok()
    }
}

impl Display for NumericField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<U256> for NumericField {
    fn from(value: U256) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for NumericField {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for NumericField {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Serialize for NumericField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NumericField {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        lenient_text(deserializer).map(Self)
    }
}

/// Reads any JSON value as text: strings verbatim, `null` as empty,
/// everything else as its JSON rendering.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_field_accepts_string_and_number() {
        let from_str: NumericField = serde_json::from_str("\"42\"").unwrap();
        let from_num: NumericField = serde_json::from_str("42").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(from_str.to_u256(), Some(U256::from(42u64)));
    }

    #[test]
    fn test_numeric_field_hex_and_garbage() {
        assert_eq!(NumericField::from("0x2a").to_u256(), Some(U256::from(42u64)));
        assert_eq!(NumericField::from("").to_u256(), None);
        assert_eq!(NumericField::from("-1").to_u256(), None);
        assert_eq!(NumericField::from("1.5").to_u256(), None);
        assert_eq!(NumericField::from("nope").to_u256(), None);
    }

    #[test]
    fn test_numeric_field_preserves_text() {
        let field: NumericField = serde_json::from_str("\"0042\"").unwrap();
        assert_eq!(field.as_str(), "0042");
    }

    #[test]
    fn test_request_missing_fields_default_to_empty() {
        let request: ClaimRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, ClaimRequest::default());

        let request: ClaimRequest =
            serde_json::from_str(r#"{"token":"0xabc","nonce":null,"deadline":17}"#).unwrap();
        assert_eq!(request.token, "0xabc");
        assert_eq!(request.nonce.as_str(), "");
        assert_eq!(request.deadline.as_str(), "17");
    }

    #[test]
    fn test_request_coerces_non_string_scalars() {
        let request: ClaimRequest = serde_json::from_str(
            r#"{"token":null,"claimer":12,"amount":true,"nonce":"5","signature":null}"#,
        )
        .unwrap();
        assert_eq!(request.token, "");
        assert_eq!(request.claimer, "12");
        assert_eq!(request.amount.as_str(), "true");
        assert_eq!(request.amount.to_u256(), None);
        assert_eq!(request.nonce.as_str(), "5");
        assert_eq!(request.signature, "");

        let request: ClaimRequest =
            serde_json::from_str(r#"{"token":["0xabc"],"deadline":{"at":1}}"#).unwrap();
        assert_eq!(request.token, r#"["0xabc"]"#);
        assert_eq!(request.deadline.to_u256(), None);
    }
}
