use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use dar_types::AssetId;

use crate::error::GatewayError;

/// Event and attribute names emitted by the asset registry contract.
///
/// Receipt parsing treats these as required schema: a confirmed receipt
/// missing the event (or a field within it) is malformed, not empty.
pub mod events {
    pub const ASSET_REGISTERED: &str = "AssetRegistered";
    pub const ASSET_TRANSFERRED: &str = "AssetTransferred";
    pub const ASSET_HASH_UPDATED: &str = "AssetHashUpdated";
    pub const ASSET_DELETED: &str = "AssetDeleted";

    pub const ATTR_ASSET_ID: &str = "assetId";
    pub const ATTR_REGISTERED_AT: &str = "registeredAt";
    pub const ATTR_NEW_OWNER: &str = "newOwner";
}

/// Ledger-assigned transaction hash identifying one submission.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub const fn from_raw(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation for logs (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.short_hex())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Handle to a submitted, not-yet-settled operation.
///
/// Produced by exactly one network-level submission. The handle carries
/// no outcome; the true result is only known once the ledger confirms or
/// reverts, and until then it is unknown — including after a timeout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingHandle {
    pub tx: TxHash,
}

/// One event emitted by a confirmed operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptEvent {
    pub name: String,
    pub attrs: BTreeMap<String, String>,
}

impl ReceiptEvent {
    /// Fetch a required attribute; absence is a receipt-format error.
    pub fn attr(&self, key: &str) -> Result<&str, GatewayError> {
        self.attrs.get(key).map(String::as_str).ok_or_else(|| {
            GatewayError::ReceiptFormat(format!(
                "event {} is missing attribute {key}",
                self.name
            ))
        })
    }

    /// Fetch a required attribute and parse it as an unsigned integer.
    pub fn attr_u64(&self, key: &str) -> Result<u64, GatewayError> {
        let raw = self.attr(key)?;
        raw.parse().map_err(|_| {
            GatewayError::ReceiptFormat(format!(
                "event {} attribute {key} is not an integer: {raw:?}",
                self.name
            ))
        })
    }
}

/// Structured result of a confirmed operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReceipt {
    pub tx: TxHash,
    pub events: Vec<ReceiptEvent>,
}

impl RawReceipt {
    /// Fetch a required event; absence is a receipt-format error.
    pub fn expect_event(&self, name: &str) -> Result<&ReceiptEvent, GatewayError> {
        self.events.iter().find(|e| e.name == name).ok_or_else(|| {
            GatewayError::ReceiptFormat(format!("receipt is missing event {name}"))
        })
    }

    /// The asset id assigned by a confirmed registration.
    pub fn registered_asset_id(&self) -> Result<AssetId, GatewayError> {
        let event = self.expect_event(events::ASSET_REGISTERED)?;
        Ok(AssetId(event.attr_u64(events::ATTR_ASSET_ID)?))
    }

    /// The registration timestamp stamped by the ledger (unix seconds).
    pub fn registered_at(&self) -> Result<u64, GatewayError> {
        let event = self.expect_event(events::ASSET_REGISTERED)?;
        event.attr_u64(events::ATTR_REGISTERED_AT)
    }
}
