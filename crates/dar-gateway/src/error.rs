use thiserror::Error;

use crate::receipt::TxHash;

/// Failures raised at submission time, before the ledger has seen the
/// operation settle. Retrying any of these is the caller's explicit
/// choice; the gateway never retries on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The acting identity's provider refused to sign the operation.
    #[error("submission rejected by user")]
    UserRejected,

    /// The submission never reached the ledger.
    #[error("network failure during submission: {0}")]
    Network(String),
}

/// Errors produced by the gateway and its transports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// The ledger confirmed the operation as reverted. The reason string
    /// is reported verbatim; a revert is never auto-retried.
    #[error("reverted by ledger: {0}")]
    Reverted(String),

    /// A nominally successful receipt was missing an expected event or
    /// field. Parsing fails closed rather than returning an empty result.
    #[error("malformed receipt: {0}")]
    ReceiptFormat(String),

    /// Transport failure on a query or while awaiting confirmation.
    #[error("network failure: {0}")]
    Network(String),

    /// The transport has no record of this submission handle.
    #[error("unknown transaction: {0}")]
    UnknownTransaction(TxHash),

    /// The transport answered a query with the wrong reply shape.
    #[error("unexpected reply shape for {method}")]
    ReplyShape { method: &'static str },
}
