//! Unix timestamp utilities for claim deadlines.
//!
//! A claim authorization carries a `deadline` in seconds since the Unix
//! epoch. The service compares it against [`UnixTimestamp::now`] with an
//! inclusive boundary: a claim whose deadline equals the current second is
//! still valid.

use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};
use std::time::SystemTime;

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A Unix timestamp representing seconds since the Unix epoch (1970-01-01T00:00:00Z).
///
/// # Serialization
///
/// Serialized as a JSON integer. Deserialization also accepts a stringified
/// integer, since browser clients commonly send `uint256` values as strings.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct UnixTimestamp(u64);

impl Serialize for UnixTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(secs) => Ok(Self(secs)),
            Raw::Str(s) => s.parse::<u64>().map(Self).map_err(|_| {
                serde::de::Error::custom("timestamp must be a non-negative integer")
            }),
        }
    }
}

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl Sub<u64> for UnixTimestamp {
    type Output = Self;

    fn sub(self, rhs: u64) -> Self::Output {
        Self(self.0.saturating_sub(rhs))
    }
}

impl From<UnixTimestamp> for U256 {
    fn from(value: UnixTimestamp) -> Self {
        Self::from(value.0)
    }
}

impl UnixTimestamp {
    /// Creates a new [`UnixTimestamp`] from a raw seconds value.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns the current system time as a [`UnixTimestamp`].
    ///
    /// # Panics
    ///
    /// Panics if the system clock is set to a time before the Unix epoch,
    /// which should never happen on properly configured systems.
    #[must_use]
    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("SystemTime before UNIX epoch?!?")
            .as_secs();
        Self(now)
    }

    /// Returns the timestamp as raw seconds since the Unix epoch.
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// Returns `true` if a deadline expressed as a `uint256` has not passed yet.
    ///
    /// The boundary is inclusive: `deadline == self` is still fresh.
    #[must_use]
    pub fn is_at_or_before(&self, deadline: U256) -> bool {
        U256::from(self.0) <= deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_integer_and_string() {
        let a: UnixTimestamp = serde_json::from_str("1700000000").unwrap();
        let b: UnixTimestamp = serde_json::from_str("\"1700000000\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_secs(), 1_700_000_000);
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        let result: Result<UnixTimestamp, _> = serde_json::from_str("\"-5\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_as_integer() {
        let ts = UnixTimestamp::from_secs(42);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "42");
    }

    #[test]
    fn test_deadline_boundary_is_inclusive() {
        let now = UnixTimestamp::from_secs(1_000);
        assert!(now.is_at_or_before(U256::from(1_000)));
        assert!(now.is_at_or_before(U256::from(1_001)));
        assert!(!now.is_at_or_before(U256::from(999)));
        assert!(now.is_at_or_before(U256::MAX));
    }

    #[test]
    fn test_arithmetic_saturates() {
        assert_eq!(UnixTimestamp::from_secs(3) - 10, UnixTimestamp::from_secs(0));
        assert_eq!(
            UnixTimestamp::from_secs(u64::MAX) + 1,
            UnixTimestamp::from_secs(u64::MAX)
        );
    }
}
