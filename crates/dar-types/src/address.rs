use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// An identity address capable of submitting operations and owning assets.
///
/// Addresses are opaque 20-byte identifiers assigned by the external
/// ledger's account model. The all-zero address is reserved as "no owner"
/// and is never a valid transfer target.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    /// Create an address from raw bytes.
    pub const fn from_raw(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// The zero address. Represents "no owner"; never a valid identity.
    pub const fn zero() -> Self {
        Self([0u8; 20])
    }

    /// Returns `true` if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// The raw 20-byte representation.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Full `0x`-prefixed lowercase hex representation.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Short identifier for logs (first 4 bytes).
    pub fn short_id(&self) -> String {
        format!("0x{}…", hex::encode(&self.0[..4]))
    }

    /// Parse from a hex string (40 hex characters, optional `0x` prefix).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(TypeError::InvalidLength {
                expected: 20,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short_id())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let addr = Address::from_raw([0xAB; 20]);
        let parsed = Address::from_hex(&addr.to_hex()).unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn from_hex_without_prefix() {
        let addr = Address::from_hex(&"cd".repeat(20)).unwrap();
        assert_eq!(addr.as_bytes(), &[0xCD; 20]);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        let err = Address::from_hex("0xabcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 20,
                actual: 2
            }
        );
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        let err = Address::from_hex(&"zz".repeat(20)).unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn zero_is_zero() {
        assert!(Address::zero().is_zero());
        assert!(!Address::from_raw([1; 20]).is_zero());
    }

    #[test]
    fn display_is_prefixed_hex() {
        let addr = Address::from_raw([0x11; 20]);
        let s = format!("{addr}");
        assert!(s.starts_with("0x"));
        assert_eq!(s.len(), 42);
    }

    #[test]
    fn serde_roundtrip() {
        let addr = Address::from_raw([7; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        let parsed: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, parsed);
    }
}
