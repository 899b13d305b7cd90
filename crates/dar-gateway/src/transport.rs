use async_trait::async_trait;

use dar_types::Address;

use crate::call::{MutationCall, QueryCall, QueryReply};
use crate::error::{GatewayError, SubmitError};
use crate::receipt::{PendingHandle, RawReceipt};

/// Transport boundary to a concrete ledger binding.
///
/// Implementations cover one ledger endpoint each; the rest of the stack
/// is transport-agnostic. Contract:
///
/// - `submit` performs exactly one network-level submission and never
///   retries implicitly. Any retry is a new, caller-initiated `submit`.
/// - `confirmation` resolves when the ledger finalizes the submission:
///   `Ok` with the receipt on confirmation, `Err(Reverted)` on revert.
///   It imposes no deadline of its own; timeout budgets are applied by
///   [`crate::gateway::Gateway`]. Confirmations may resolve in any
///   order relative to submission order.
/// - `query` is side-effect-free and requires no identity.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    async fn submit(
        &self,
        call: &MutationCall,
        from: &Address,
    ) -> Result<PendingHandle, SubmitError>;

    async fn confirmation(&self, handle: &PendingHandle) -> Result<RawReceipt, GatewayError>;

    async fn query(&self, call: &QueryCall) -> Result<QueryReply, GatewayError>;
}
