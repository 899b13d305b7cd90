use serde::Serialize;

use dar_gateway::TxHash;
use dar_types::{Address, Asset, AssetId, ContentDigest};

/// Confirmed registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegisterOutcome {
    /// Id assigned by the ledger, taken from the confirmation receipt.
    pub id: AssetId,
    /// The asset as inserted into the local cache.
    pub asset: Asset,
    pub tx: TxHash,
    pub submitted_by: Address,
    /// True when the session's identity no longer matched
    /// `submitted_by` at settlement. The ledger attributes the operation
    /// to `submitted_by` regardless.
    pub identity_drift: bool,
}

/// Confirmed ownership transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub id: AssetId,
    pub new_owner: Address,
    pub tx: TxHash,
    pub identity_drift: bool,
}

/// Result of a hash update request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum UpdateHashOutcome {
    /// The new hash was submitted and confirmed.
    Updated {
        id: AssetId,
        hash: ContentDigest,
        tx: TxHash,
        identity_drift: bool,
    },
    /// The new hash equals the current confirmed hash; nothing was
    /// submitted.
    Unchanged { id: AssetId },
}

/// Result of a delete request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DeleteOutcome {
    /// The asset was deactivated by this call.
    Deleted {
        id: AssetId,
        tx: TxHash,
        identity_drift: bool,
    },
    /// The asset was already inactive; nothing was submitted.
    AlreadyInactive { id: AssetId },
}
