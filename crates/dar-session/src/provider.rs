use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::broadcast;

use dar_types::Address;

use crate::error::SessionError;

/// Asynchronous notification from an identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountEvent {
    /// The provider's account list changed. The first entry is the new
    /// acting identity; an empty list means the provider disconnected.
    AccountsChanged(Vec<Address>),
}

/// Capability interface to an external identity provider.
///
/// Injected at construction; a missing provider is a construction-time
/// error, never a runtime shape check. Account changes may arrive at any
/// time, independent of any pending operation.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the provider's current account list. The first entry is
    /// the acting identity.
    async fn request_accounts(&self) -> Result<Vec<Address>, SessionError>;

    /// Subscribe to asynchronous account changes.
    fn subscribe(&self) -> broadcast::Receiver<AccountEvent>;
}

/// In-process provider backed by a fixed account list, for tests and
/// local demos. `switch_account` and `disconnect` emit the same events a
/// real provider would.
pub struct StaticProvider {
    accounts: RwLock<Vec<Address>>,
    events: broadcast::Sender<AccountEvent>,
}

impl StaticProvider {
    pub fn new(accounts: Vec<Address>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            accounts: RwLock::new(accounts),
            events,
        }
    }

    /// Make `account` the acting identity and notify subscribers.
    pub fn switch_account(&self, account: Address) {
        let mut accounts = self.accounts.write().expect("provider lock poisoned");
        accounts.retain(|a| a != &account);
        accounts.insert(0, account);
        let snapshot = accounts.clone();
        drop(accounts);
        // No receivers is fine; the event is simply unobserved.
        let _ = self.events.send(AccountEvent::AccountsChanged(snapshot));
    }

    /// Drop every account and notify subscribers.
    pub fn disconnect(&self) {
        self.accounts.write().expect("provider lock poisoned").clear();
        let _ = self.events.send(AccountEvent::AccountsChanged(vec![]));
    }
}

#[async_trait]
impl IdentityProvider for StaticProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, SessionError> {
        Ok(self.accounts.read().expect("provider lock poisoned").clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AccountEvent> {
        self.events.subscribe()
    }
}
