//! Deterministic content digests for the digital asset registry.
//!
//! A single [`DigestEngine`] instance is shared by registration and
//! integrity verification, so both sites always agree on algorithm and
//! encoding. Input is consumed incrementally; sources of any size are
//! accepted without being materialized in memory.

pub mod engine;

pub use engine::{DigestEngine, DigestError};
