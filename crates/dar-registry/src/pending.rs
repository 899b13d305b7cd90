use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dar_gateway::TxHash;
use dar_types::{Address, AssetId};

/// Client-side identifier for one mutation attempt.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperationId({})", self.0)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of mutating operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Register,
    Transfer,
    UpdateHash,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Register => "register",
            Self::Transfer => "transfer",
            Self::UpdateHash => "update-hash",
            Self::Delete => "delete",
        };
        write!(f, "{name}")
    }
}

/// A mutation between submission and settlement.
///
/// Owned exclusively by the registry core. An entry exists from just
/// before submission until confirmation, revert, or explicit
/// reconciliation after a timeout; while present for a target id, it is
/// the per-asset exclusion lock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub op: OperationId,
    pub kind: MutationKind,
    /// Target asset, or `None` for a registration (the ledger assigns
    /// the id at confirmation).
    pub target: Option<AssetId>,
    pub submitted_by: Address,
    /// Transaction hash, filled in once the submission is accepted.
    pub tx: Option<TxHash>,
    /// Submission wall-clock time, unix milliseconds.
    pub submitted_at_ms: u64,
}

impl PendingOperation {
    pub fn new(kind: MutationKind, target: Option<AssetId>, submitted_by: Address) -> Self {
        Self {
            op: OperationId::new(),
            kind,
            target,
            submitted_by,
            tx: None,
            submitted_at_ms: unix_now_ms(),
        }
    }
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
