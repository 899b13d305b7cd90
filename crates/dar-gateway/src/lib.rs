//! Ledger gateway for the digital asset registry.
//!
//! This crate owns everything between the registry core and the external
//! ledger:
//! - Typed mutation and query calls mirroring the ledger method surface
//! - The `LedgerTransport` boundary for concrete ledger bindings
//! - Submission handles and fail-closed receipt parsing
//! - `Gateway`, which adds confirmation timeouts on top of a transport
//! - `InMemoryLedger`, a transport implementing the full contract
//!   semantics for tests, demos, and embedding
//!
//! The gateway owns no asset state. It tracks in-flight submission
//! handles only; reconciling confirmed outcomes into a local view is the
//! registry core's job.

pub mod call;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod receipt;
pub mod transport;

pub use call::{AssetRecord, MutationCall, QueryCall, QueryReply};
pub use error::{GatewayError, SubmitError};
pub use gateway::{Confirmation, Gateway, GatewayConfig};
pub use memory::{ConfirmationMode, InMemoryLedger};
pub use receipt::{PendingHandle, RawReceipt, ReceiptEvent, TxHash, events};
pub use transport::LedgerTransport;
