use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use dar_types::Address;

use crate::call::{MutationCall, QueryCall, QueryReply};
use crate::error::GatewayError;
use crate::receipt::{PendingHandle, RawReceipt};
use crate::transport::LedgerTransport;

/// Gateway configuration, injected at construction.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Default budget for awaiting a confirmation.
    pub confirmation_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of awaiting a confirmation within a timeout budget.
///
/// `TimedOut` means the true outcome is unknown — the submission may
/// still confirm or revert later. It must never be treated as a revert;
/// the only safe follow-up is to query canonical state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed(RawReceipt),
    Reverted(String),
    TimedOut,
}

/// Submission and query front-end over a [`LedgerTransport`].
///
/// The gateway adds confirmation timeout budgets and structured logging;
/// it holds no asset state and performs no retries.
pub struct Gateway {
    transport: Arc<dyn LedgerTransport>,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(transport: Arc<dyn LedgerTransport>, config: GatewayConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Submit a mutation as the given identity. Exactly one network-level
    /// submission per call.
    pub async fn submit(
        &self,
        call: &MutationCall,
        from: &Address,
    ) -> Result<PendingHandle, GatewayError> {
        let handle = self.transport.submit(call, from).await?;
        debug!(
            method = call.method(),
            from = %from.short_id(),
            tx = %handle.tx.short_hex(),
            "submitted"
        );
        Ok(handle)
    }

    /// Await the settlement of a submission within the given budget.
    pub async fn await_confirmation(
        &self,
        handle: &PendingHandle,
        budget: Duration,
    ) -> Result<Confirmation, GatewayError> {
        match tokio::time::timeout(budget, self.transport.confirmation(handle)).await {
            Ok(Ok(receipt)) => {
                debug!(tx = %handle.tx.short_hex(), "confirmed");
                Ok(Confirmation::Confirmed(receipt))
            }
            Ok(Err(GatewayError::Reverted(reason))) => {
                debug!(tx = %handle.tx.short_hex(), %reason, "reverted");
                Ok(Confirmation::Reverted(reason))
            }
            Ok(Err(other)) => Err(other),
            Err(_) => {
                warn!(
                    tx = %handle.tx.short_hex(),
                    budget_ms = budget.as_millis() as u64,
                    "confirmation timed out; outcome unknown"
                );
                Ok(Confirmation::TimedOut)
            }
        }
    }

    /// Await settlement within the configured default budget.
    pub async fn await_confirmation_default(
        &self,
        handle: &PendingHandle,
    ) -> Result<Confirmation, GatewayError> {
        self.await_confirmation(handle, self.config.confirmation_timeout)
            .await
    }

    /// Run a side-effect-free query against confirmed ledger state.
    pub async fn query(&self, call: &QueryCall) -> Result<QueryReply, GatewayError> {
        self.transport.query(call).await
    }
}
