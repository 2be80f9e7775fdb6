//! Account identifier type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 20-byte account identifier, displayed as `0x`-prefixed hex.
///
/// Accounts cover ordinary users, validators, and the two module accounts
/// owned by the governance subsystem itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId([u8; 20]);

impl AccountId {
    /// Byte length of every account identifier.
    pub const LEN: usize = 20;

    /// The all-zero account. Not spendable; used as a sentinel.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Module account holding proposal deposits while they are live.
    ///
    /// Refunds transfer out of this account; veto burns debit it.
    pub const DEPOSIT_ESCROW: Self = {
        let mut bytes = [0u8; 20];
        bytes[19] = 0x01;
        Self(bytes)
    };

    /// Module account funding community-pool spend proposals.
    pub const COMMUNITY_POOL: Self = {
        let mut bytes = [0u8; 20];
        bytes[19] = 0x02;
        Self(bytes)
    };

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse from a `0x`-prefixed or bare hex string.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(raw).map_err(|_| AddressError::InvalidHex(s.to_string()))?;
        let bytes: [u8; 20] = decoded
            .try_into()
            .map_err(|_| AddressError::InvalidLength(raw.len() / 2))?;
        Ok(Self(bytes))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Whether this is one of the governance module accounts.
    pub fn is_module_account(&self) -> bool {
        *self == Self::DEPOSIT_ESCROW || *self == Self::COMMUNITY_POOL
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("invalid hex in account id: {0}")]
    InvalidHex(String),

    #[error("account id must be 20 bytes, got {0}")]
    InvalidLength(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let id = AccountId::new([0xab; 20]);
        let s = id.to_string();
        assert_eq!(s, format!("0x{}", "ab".repeat(20)));
        assert_eq!(AccountId::from_hex(&s).unwrap(), id);
    }

    #[test]
    fn test_from_hex_without_prefix() {
        let id = AccountId::from_hex(&"cd".repeat(20)).unwrap();
        assert_eq!(id.as_bytes(), &[0xcd; 20]);
    }

    #[test]
    fn test_bad_length_rejected() {
        assert!(AccountId::from_hex("0xabcd").is_err());
    }

    #[test]
    fn test_bad_hex_rejected() {
        assert!(AccountId::from_hex(&"zz".repeat(20)).is_err());
    }

    #[test]
    fn test_module_accounts_distinct() {
        assert_ne!(AccountId::DEPOSIT_ESCROW, AccountId::COMMUNITY_POOL);
        assert!(AccountId::DEPOSIT_ESCROW.is_module_account());
        assert!(AccountId::COMMUNITY_POOL.is_module_account());
        assert!(!AccountId::ZERO.is_module_account());
        assert!(AccountId::ZERO.is_zero());
    }
}
