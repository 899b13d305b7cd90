//! Identity and session management for the digital asset registry.
//!
//! A [`SessionManager`] resolves the acting identity from an injected
//! [`IdentityProvider`] capability and tracks asynchronous account
//! changes through a watch channel. The session owns identity state
//! exclusively; no other component mutates it.

pub mod error;
pub mod provider;
pub mod session;

pub use error::SessionError;
pub use provider::{AccountEvent, IdentityProvider, StaticProvider};
pub use session::SessionManager;
