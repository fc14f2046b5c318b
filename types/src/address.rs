//! Wallet address type with `0x` prefix.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::TypesError;

/// An on-chain wallet address, the join key between a registry record and
/// chain state.
///
/// Surrounding whitespace is dropped on construction and deserialization, so
/// `"0xa "` and `"0xa"` are the same address. Case is kept as stored;
/// [`WalletAddress::parse`] also lowercases and validates user input.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// The standard prefix for all wallet addresses.
    pub const PREFIX: &'static str = "0x";

    /// Create a wallet address from a raw string without validation.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.trim().len() == raw.len() {
            Self(raw)
        } else {
            Self(raw.trim().to_string())
        }
    }

    /// Parse and normalize a user-supplied address.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let normalized = raw.trim().to_ascii_lowercase();
        let addr = Self(normalized);
        if addr.is_valid() {
            Ok(addr)
        } else {
            Err(TypesError::InvalidAddress(raw.to_string()))
        }
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty address is treated as absent.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate that this address is well-formed: `0x` followed by hex digits.
    pub fn is_valid(&self) -> bool {
        match self.0.strip_prefix(Self::PREFIX) {
            Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_hexdigit()),
            None => false,
        }
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for WalletAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let addr = WalletAddress::parse("  0xABCdef01 ").unwrap();
        assert_eq!(addr.as_str(), "0xabcdef01");
    }

    #[test]
    fn parse_rejects_missing_prefix() {
        assert!(WalletAddress::parse("abc").is_err());
        assert!(WalletAddress::parse("0x").is_err());
        assert!(WalletAddress::parse("0xzz").is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let addr = WalletAddress::new("0xabc");
        assert_eq!(serde_json::to_string(&addr).unwrap(), "\"0xabc\"");
    }

    #[test]
    fn surrounding_whitespace_is_not_part_of_the_address() {
        assert_eq!(WalletAddress::new("0xa "), WalletAddress::new("0xa"));
        let stored: WalletAddress = serde_json::from_str("\" 0xa \"").unwrap();
        assert_eq!(stored.as_str(), "0xa");
    }

    #[test]
    fn blank_address_is_empty() {
        assert!(WalletAddress::new("   ").is_empty());
        assert!(!WalletAddress::new("0x1").is_empty());
    }
}
