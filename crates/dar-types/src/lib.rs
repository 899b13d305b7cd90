//! Foundation types for the digital asset registry client.
//!
//! Every other `dar` crate depends on this one. It provides the identity
//! and content-addressing primitives shared across the gateway, session,
//! and registry layers.
//!
//! # Key Types
//!
//! - [`AssetId`] — Opaque asset identifier assigned by the ledger
//! - [`Address`] — Identity address capable of owning and submitting
//! - [`ContentDigest`] — Fixed-length deterministic content hash
//! - [`Asset`] — A registered asset as known to the client

pub mod address;
pub mod asset;
pub mod digest;
pub mod error;

pub use address::Address;
pub use asset::{Asset, AssetId};
pub use digest::ContentDigest;
pub use error::TypeError;
