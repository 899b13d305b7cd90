use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use dar_types::Address;

use crate::error::SessionError;
use crate::provider::{AccountEvent, IdentityProvider};

/// Tracks the acting identity and its changes over time.
///
/// `connect` resolves the first identity from the provider; account
/// changes are forwarded into a watch channel, so consumers either poll
/// [`current`](Self::current) or await [`watch`](Self::watch) at their
/// own cadence. The forwarder stops once the session and every watch
/// receiver are dropped.
#[derive(Debug)]
pub struct SessionManager {
    current: watch::Receiver<Option<Address>>,
}

impl SessionManager {
    /// Resolve the first identity and start tracking changes.
    ///
    /// Fails with [`SessionError::NoAccounts`] if the provider exposes
    /// no identity.
    pub async fn connect(provider: Arc<dyn IdentityProvider>) -> Result<Self, SessionError> {
        let accounts = provider.request_accounts().await?;
        let first = *accounts.first().ok_or(SessionError::NoAccounts)?;

        let (tx, rx) = watch::channel(Some(first));
        let events = provider.subscribe();
        tokio::spawn(forward_events(events, tx));

        info!(account = %first.short_id(), "session connected");
        Ok(Self { current: rx })
    }

    /// The acting identity, or `None` if the provider disconnected.
    pub fn current(&self) -> Option<Address> {
        *self.current.borrow()
    }

    /// The acting identity, or an error when disconnected.
    pub fn require_current(&self) -> Result<Address, SessionError> {
        self.current().ok_or(SessionError::NotConnected)
    }

    /// A watch receiver over the acting identity. Receivers observe the
    /// latest value only; intermediate flaps may be skipped.
    pub fn watch(&self) -> watch::Receiver<Option<Address>> {
        self.current.clone()
    }
}

async fn forward_events(
    mut events: broadcast::Receiver<AccountEvent>,
    tx: watch::Sender<Option<Address>>,
) {
    loop {
        match events.recv().await {
            Ok(AccountEvent::AccountsChanged(accounts)) => {
                let next = accounts.first().copied();
                match next {
                    Some(account) => info!(account = %account.short_id(), "account changed"),
                    None => warn!("provider disconnected all accounts"),
                }
                if tx.send(next).is_err() {
                    // Session and all watchers gone.
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "account events lagged; keeping latest");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
