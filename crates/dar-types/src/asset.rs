use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::digest::ContentDigest;

/// Opaque asset identifier assigned by the ledger at registration.
///
/// Ids are never reused and carry no meaning beyond uniqueness.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u64);

impl AssetId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AssetId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A registered digital asset as known to the client.
///
/// Invariants, enforced by the ledger and preserved by the client cache:
/// - `hash` is always a full-length digest of the asset's content
/// - `owner` is never the zero address while `is_active` is true
/// - `is_active` only ever transitions true → false; no resurrection
/// - `registered_at` is set once, at confirmed registration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    pub description: String,
    pub hash: ContentDigest,
    pub owner: Address,
    /// Unix seconds, stamped by the ledger at confirmed registration.
    pub registered_at: u64,
    pub is_active: bool,
}
