use thiserror::Error;

use dar_digest::DigestError;
use dar_gateway::{GatewayError, SubmitError};
use dar_session::SessionError;
use dar_types::AssetId;

/// Errors surfaced by registry operations.
///
/// Every failure reaches the caller as one of these variants; nothing is
/// swallowed, and the local cache is only ever updated on confirmed
/// success.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Invalid arguments or state, detected before any ledger
    /// interaction.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// No acting identity could be resolved.
    #[error("identity error: {0}")]
    Identity(#[from] SessionError),

    /// The submission never settled on the ledger. Retrying is the
    /// caller's explicit choice.
    #[error("submission failed: {0}")]
    Submission(#[from] SubmitError),

    /// The ledger confirmed the operation as reverted; the reason is
    /// reported verbatim and the operation is not retried.
    #[error("reverted by ledger: {0}")]
    Revert(String),

    /// The confirmation budget elapsed with the true outcome unknown.
    /// The asset stays locked until `reconcile` observes a definitive
    /// ledger state.
    #[error("confirmation timed out; ledger outcome unknown until reconciled")]
    Timeout,

    /// The content byte source could not be fully consumed.
    #[error("digest error: {0}")]
    Read(#[from] DigestError),

    /// A confirmed receipt was missing expected data.
    #[error("malformed receipt: {0}")]
    ReceiptFormat(String),

    /// The asset id was never assigned by the ledger.
    #[error("asset not found: {0}")]
    NotFound(AssetId),

    /// Another mutation on the same asset is still in flight.
    #[error("a mutation is already in flight for asset {0}")]
    OperationInFlight(AssetId),

    /// Gateway or transport failure outside the categories above.
    #[error("gateway error: {0}")]
    Gateway(String),
}

impl From<GatewayError> for RegistryError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Submit(e) => Self::Submission(e),
            GatewayError::Reverted(reason) => Self::Revert(reason),
            GatewayError::ReceiptFormat(msg) => Self::ReceiptFormat(msg),
            other => Self::Gateway(other.to_string()),
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
