//! Asset registry core for the digital asset registry client.
//!
//! This crate orchestrates every operation against the ledger: it
//! validates preconditions, captures the acting identity, enforces
//! per-asset exclusion while a mutation is in flight, submits through
//! the gateway, and reconciles confirmed outcomes into a local cache.
//!
//! The cache holds confirmed state only. No failure, revert, or timeout
//! ever mutates it, and a timed-out mutation keeps its asset locked
//! until [`Registry::reconcile`] observes a definitive ledger outcome.

pub mod error;
pub mod outcome;
pub mod pending;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use outcome::{DeleteOutcome, RegisterOutcome, TransferOutcome, UpdateHashOutcome};
pub use pending::{MutationKind, OperationId, PendingOperation};
pub use registry::{Registry, RegistryConfig};

// Re-export key types
pub use dar_types::{Address, Asset, AssetId, ContentDigest};
