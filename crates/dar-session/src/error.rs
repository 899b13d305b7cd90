use thiserror::Error;

/// Errors produced by identity resolution and session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The provider could not be reached or refused the request.
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider resolved successfully but exposes no accounts.
    #[error("identity provider returned no accounts")]
    NoAccounts,

    /// The session has no active identity (never connected, or the
    /// provider disconnected every account).
    #[error("no active identity")]
    NotConnected,
}
