use serde::{Deserialize, Serialize};

use dar_types::{Address, AssetId, ContentDigest};

/// A state-changing ledger call.
///
/// Mutations execute as signed operations from the acting identity and
/// settle asynchronously; the identity is captured at submission time by
/// [`crate::transport::LedgerTransport::submit`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationCall {
    RegisterAsset {
        name: String,
        description: String,
        hash: ContentDigest,
    },
    TransferAsset {
        id: AssetId,
        new_owner: Address,
    },
    UpdateAssetHash {
        id: AssetId,
        new_hash: ContentDigest,
    },
    DeleteAsset {
        id: AssetId,
    },
}

impl MutationCall {
    /// Ledger method name for this call.
    pub fn method(&self) -> &'static str {
        match self {
            Self::RegisterAsset { .. } => "registerAsset",
            Self::TransferAsset { .. } => "transferAsset",
            Self::UpdateAssetHash { .. } => "updateAssetHash",
            Self::DeleteAsset { .. } => "deleteAsset",
        }
    }

    /// The asset targeted by this call, if it targets an existing one.
    /// Registration targets no id; the ledger assigns one at confirmation.
    pub fn target(&self) -> Option<AssetId> {
        match self {
            Self::RegisterAsset { .. } => None,
            Self::TransferAsset { id, .. }
            | Self::UpdateAssetHash { id, .. }
            | Self::DeleteAsset { id } => Some(*id),
        }
    }
}

/// A side-effect-free ledger query. Requires no identity.
///
/// Queries resolve against confirmed ledger state only; they must never
/// be used to infer the outcome of a not-yet-confirmed mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryCall {
    GetAsset(AssetId),
    AssetsByOwner(Address),
    VerifyIntegrity(AssetId, ContentDigest),
}

impl QueryCall {
    /// Ledger method name for this query.
    pub fn method(&self) -> &'static str {
        match self {
            Self::GetAsset(_) => "getAsset",
            Self::AssetsByOwner(_) => "getAssetsByOwner",
            Self::VerifyIntegrity(..) => "verifyAssetIntegrity",
        }
    }
}

/// Typed response union for [`QueryCall`].
///
/// Each query variant has exactly one legal reply shape; a transport
/// returning any other shape is malformed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryReply {
    /// Reply to `GetAsset`. `None` when the id was never assigned.
    Asset(Option<AssetRecord>),
    /// Reply to `AssetsByOwner`, in ledger registration order.
    AssetIds(Vec<AssetId>),
    /// Reply to `VerifyIntegrity`. `None` when the id was never assigned,
    /// otherwise whether the candidate digest matches the stored one.
    Verification(Option<bool>),
}

/// The ledger's record of an asset, as returned by `getAsset`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub name: String,
    pub description: String,
    pub hash: ContentDigest,
    pub owner: Address,
    /// Unix seconds, stamped by the ledger at confirmed registration.
    pub registered_at: u64,
    pub is_active: bool,
}
