use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use dar_digest::DigestEngine;
use dar_gateway::{
    AssetRecord, Confirmation, Gateway, GatewayError, MutationCall, QueryCall, QueryReply,
    RawReceipt,
};
use dar_session::SessionManager;
use dar_types::{Address, Asset, AssetId, ContentDigest};

use crate::error::{RegistryError, RegistryResult};
use crate::outcome::{DeleteOutcome, RegisterOutcome, TransferOutcome, UpdateHashOutcome};
use crate::pending::{MutationKind, OperationId, PendingOperation};

/// Registry configuration, injected at construction.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Budget applied to awaiting each mutation's confirmation.
    pub confirmation_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Default)]
struct PendingTable {
    /// In-flight mutations keyed by target id. An entry here is the
    /// per-asset exclusion lock.
    by_id: HashMap<AssetId, PendingOperation>,
    /// In-flight registrations; they have no id until confirmed.
    registrations: HashMap<OperationId, PendingOperation>,
}

/// A confirmed mutation, before its delta is applied to the cache.
struct Settled {
    receipt: RawReceipt,
    identity_drift: bool,
}

/// Orchestrates asset operations against the ledger.
///
/// The registry exclusively owns the local asset cache and the set of
/// pending operations. Mutations follow one protocol: validate locally,
/// take the per-id lock, capture the acting identity, submit, await
/// confirmation within the configured budget, then apply the confirmed
/// delta. Reverts release the lock with a classified error; timeouts
/// keep it held until [`reconcile`](Self::reconcile) observes canonical
/// state.
pub struct Registry {
    gateway: Gateway,
    session: Arc<SessionManager>,
    engine: DigestEngine,
    cache: RwLock<HashMap<AssetId, Asset>>,
    pending: Mutex<PendingTable>,
    config: RegistryConfig,
}

impl Registry {
    pub fn new(gateway: Gateway, session: Arc<SessionManager>, config: RegistryConfig) -> Self {
        Self {
            gateway,
            session,
            engine: DigestEngine::ASSET,
            cache: RwLock::new(HashMap::new()),
            pending: Mutex::new(PendingTable::default()),
            config,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// The last confirmed view of an asset, if any. Never reflects a
    /// pending mutation.
    pub fn cached(&self, id: AssetId) -> Option<Asset> {
        self.cache_read().get(&id).cloned()
    }

    /// Snapshot of every pending operation, registrations included.
    pub fn pending_operations(&self) -> Vec<PendingOperation> {
        let pending = self.pending_lock();
        pending
            .by_id
            .values()
            .chain(pending.registrations.values())
            .cloned()
            .collect()
    }

    // ---- Mutations ----

    /// Register a new asset under the acting identity.
    ///
    /// On confirmation, the ledger-assigned id is taken from the receipt
    /// and the asset is inserted into the cache.
    pub async fn register(
        &self,
        name: &str,
        description: &str,
        hash: ContentDigest,
    ) -> RegistryResult<RegisterOutcome> {
        if name.trim().is_empty() {
            return Err(RegistryError::Precondition(
                "asset name must not be empty".into(),
            ));
        }
        let identity = self.session.require_current()?;
        let call = MutationCall::RegisterAsset {
            name: name.into(),
            description: description.into(),
            hash,
        };

        let entry = PendingOperation::new(MutationKind::Register, None, identity);
        let op = entry.op;
        self.pending_lock().registrations.insert(op, entry);

        let handle = match self.gateway.submit(&call, &identity).await {
            Ok(handle) => handle,
            Err(e) => {
                self.pending_lock().registrations.remove(&op);
                return Err(e.into());
            }
        };
        if let Some(entry) = self.pending_lock().registrations.get_mut(&op) {
            entry.tx = Some(handle.tx);
        }

        match self
            .gateway
            .await_confirmation(&handle, self.config.confirmation_timeout)
            .await
        {
            Ok(Confirmation::Confirmed(receipt)) => {
                self.pending_lock().registrations.remove(&op);
                let id = receipt.registered_asset_id()?;
                let registered_at = receipt.registered_at()?;
                let asset = Asset {
                    id,
                    name: name.into(),
                    description: description.into(),
                    hash,
                    owner: identity,
                    registered_at,
                    is_active: true,
                };
                self.cache_write().insert(id, asset.clone());
                let identity_drift = self.identity_drift(&identity);
                info!(%id, tx = %receipt.tx.short_hex(), "asset registered");
                Ok(RegisterOutcome {
                    id,
                    asset,
                    tx: receipt.tx,
                    submitted_by: identity,
                    identity_drift,
                })
            }
            Ok(Confirmation::Reverted(reason)) => {
                self.pending_lock().registrations.remove(&op);
                Err(RegistryError::Revert(reason))
            }
            // Outcome unknown: the registration stays pending until the
            // caller reconciles or discards it.
            Ok(Confirmation::TimedOut) => Err(RegistryError::Timeout),
            Err(e) => Err(e.into()),
        }
    }

    /// Digest a byte source, then register it under the acting identity.
    pub async fn register_source<R: Read>(
        &self,
        name: &str,
        description: &str,
        source: &mut R,
    ) -> RegistryResult<RegisterOutcome> {
        let hash = self.engine.digest_reader(source)?;
        self.register(name, description, hash).await
    }

    /// Transfer ownership to `new_owner`.
    pub async fn transfer(
        &self,
        id: AssetId,
        new_owner: Address,
    ) -> RegistryResult<TransferOutcome> {
        if new_owner.is_zero() {
            return Err(RegistryError::Precondition(
                "transfer target must not be the zero address".into(),
            ));
        }
        let identity = self.session.require_current()?;

        // Local pre-check against the confirmed cache saves a doomed
        // submission; the ledger enforces ownership authoritatively.
        if let Some(cached) = self.cached(id) {
            check_active_owned(&cached, &identity)?;
        }

        let settled = self
            .submit_exclusive(
                id,
                MutationKind::Transfer,
                MutationCall::TransferAsset { id, new_owner },
                identity,
            )
            .await?;

        if let Some(asset) = self.cache_write().get_mut(&id) {
            asset.owner = new_owner;
        }
        info!(%id, new_owner = %new_owner.short_id(), "asset transferred");
        Ok(TransferOutcome {
            id,
            new_owner,
            tx: settled.receipt.tx,
            identity_drift: settled.identity_drift,
        })
    }

    /// Update an asset's content hash.
    ///
    /// When `new_hash` equals the current confirmed hash the call is a
    /// local no-op and nothing is submitted, unless `force` is set.
    pub async fn update_hash(
        &self,
        id: AssetId,
        new_hash: ContentDigest,
        force: bool,
    ) -> RegistryResult<UpdateHashOutcome> {
        let identity = self.session.require_current()?;
        let current = self.current_record(id).await?;
        check_active_owned(&current, &identity)?;
        if !force && current.hash == new_hash {
            debug!(%id, "hash unchanged; skipping submission");
            return Ok(UpdateHashOutcome::Unchanged { id });
        }

        let settled = self
            .submit_exclusive(
                id,
                MutationKind::UpdateHash,
                MutationCall::UpdateAssetHash { id, new_hash },
                identity,
            )
            .await?;

        if let Some(asset) = self.cache_write().get_mut(&id) {
            asset.hash = new_hash;
        }
        info!(%id, hash = %new_hash.short_hex(), "asset hash updated");
        Ok(UpdateHashOutcome::Updated {
            id,
            hash: new_hash,
            tx: settled.receipt.tx,
            identity_drift: settled.identity_drift,
        })
    }

    /// Deactivate an asset. Idempotent at the surface: deleting an
    /// already-inactive asset returns [`DeleteOutcome::AlreadyInactive`]
    /// without a submission.
    pub async fn delete(&self, id: AssetId) -> RegistryResult<DeleteOutcome> {
        let identity = self.session.require_current()?;
        let current = self.current_record(id).await?;
        if !current.is_active {
            return Ok(DeleteOutcome::AlreadyInactive { id });
        }
        if current.owner != identity {
            return Err(RegistryError::Revert(
                "caller is not the asset owner".into(),
            ));
        }

        let settled = self
            .submit_exclusive(
                id,
                MutationKind::Delete,
                MutationCall::DeleteAsset { id },
                identity,
            )
            .await?;

        if let Some(asset) = self.cache_write().get_mut(&id) {
            asset.is_active = false;
        }
        info!(%id, "asset deleted");
        Ok(DeleteOutcome::Deleted {
            id,
            tx: settled.receipt.tx,
            identity_drift: settled.identity_drift,
        })
    }

    // ---- Queries ----

    /// Fetch the confirmed record for an asset and fold it into the
    /// cache. Pending mutations are never reflected.
    pub async fn get(&self, id: AssetId) -> RegistryResult<Asset> {
        match self.gateway.query(&QueryCall::GetAsset(id)).await? {
            QueryReply::Asset(Some(record)) => {
                let asset = materialize(id, record);
                self.cache_write().insert(id, asset.clone());
                Ok(asset)
            }
            QueryReply::Asset(None) => {
                self.cache_write().remove(&id);
                Err(RegistryError::NotFound(id))
            }
            _ => Err(shape_error("getAsset")),
        }
    }

    /// Ids currently owned by `account`, in ledger order.
    pub async fn list_owned(&self, account: Address) -> RegistryResult<Vec<AssetId>> {
        match self.gateway.query(&QueryCall::AssetsByOwner(account)).await? {
            QueryReply::AssetIds(ids) => Ok(ids),
            _ => Err(shape_error("getAssetsByOwner")),
        }
    }

    /// Ids currently owned by the acting identity.
    pub async fn list_mine(&self) -> RegistryResult<Vec<AssetId>> {
        let identity = self.session.require_current()?;
        self.list_owned(identity).await
    }

    /// Compare a candidate digest against the ledger's stored hash.
    ///
    /// A nonexistent id is an error, never `false`.
    pub async fn verify_integrity(
        &self,
        id: AssetId,
        candidate: &ContentDigest,
    ) -> RegistryResult<bool> {
        match self
            .gateway
            .query(&QueryCall::VerifyIntegrity(id, *candidate))
            .await?
        {
            QueryReply::Verification(Some(matches)) => Ok(matches),
            QueryReply::Verification(None) => Err(RegistryError::NotFound(id)),
            _ => Err(shape_error("verifyAssetIntegrity")),
        }
    }

    /// Digest a byte source and compare it against the ledger's stored
    /// hash. Uses the same engine as registration.
    pub async fn verify_source<R: Read>(
        &self,
        id: AssetId,
        source: &mut R,
    ) -> RegistryResult<bool> {
        let candidate = self.engine.digest_reader(source)?;
        self.verify_integrity(id, &candidate).await
    }

    // ---- Reconciliation ----

    /// Resolve a timed-out mutation by querying canonical ledger state.
    ///
    /// On a definitive outcome (the record, or its absence) the cache is
    /// updated, the pending entry is dropped, and the per-id lock is
    /// released. Retrying before reconciling risks a duplicate mutation,
    /// so this is the only path out of a timeout.
    pub async fn reconcile(&self, id: AssetId) -> RegistryResult<Asset> {
        match self.gateway.query(&QueryCall::GetAsset(id)).await? {
            QueryReply::Asset(Some(record)) => {
                let asset = materialize(id, record);
                self.cache_write().insert(id, asset.clone());
                if self.pending_lock().by_id.remove(&id).is_some() {
                    info!(%id, "pending mutation reconciled against confirmed state");
                }
                Ok(asset)
            }
            QueryReply::Asset(None) => {
                self.cache_write().remove(&id);
                self.pending_lock().by_id.remove(&id);
                Err(RegistryError::NotFound(id))
            }
            _ => Err(shape_error("getAsset")),
        }
    }

    /// Drop a timed-out registration. A late ledger confirmation is
    /// still discoverable through [`list_owned`](Self::list_owned).
    pub fn discard_registration(&self, op: OperationId) -> bool {
        self.pending_lock().registrations.remove(&op).is_some()
    }

    // ---- Internals ----

    /// Shared mutation protocol for id-targeted calls: take the per-id
    /// lock, submit once, await confirmation within the budget.
    async fn submit_exclusive(
        &self,
        id: AssetId,
        kind: MutationKind,
        call: MutationCall,
        identity: Address,
    ) -> RegistryResult<Settled> {
        {
            let mut pending = self.pending_lock();
            if pending.by_id.contains_key(&id) {
                return Err(RegistryError::OperationInFlight(id));
            }
            pending
                .by_id
                .insert(id, PendingOperation::new(kind, Some(id), identity));
        }

        let handle = match self.gateway.submit(&call, &identity).await {
            Ok(handle) => handle,
            Err(e) => {
                self.pending_lock().by_id.remove(&id);
                return Err(e.into());
            }
        };
        if let Some(entry) = self.pending_lock().by_id.get_mut(&id) {
            entry.tx = Some(handle.tx);
        }

        match self
            .gateway
            .await_confirmation(&handle, self.config.confirmation_timeout)
            .await
        {
            Ok(Confirmation::Confirmed(receipt)) => {
                self.pending_lock().by_id.remove(&id);
                let identity_drift = self.identity_drift(&identity);
                Ok(Settled {
                    receipt,
                    identity_drift,
                })
            }
            Ok(Confirmation::Reverted(reason)) => {
                self.pending_lock().by_id.remove(&id);
                Err(RegistryError::Revert(reason))
            }
            // Outcome unknown: the lock stays held until `reconcile`
            // observes a definitive ledger state.
            Ok(Confirmation::TimedOut) => Err(RegistryError::Timeout),
            Err(e) => Err(e.into()),
        }
    }

    /// The confirmed record for an asset, from cache or the ledger.
    async fn current_record(&self, id: AssetId) -> RegistryResult<Asset> {
        if let Some(asset) = self.cached(id) {
            return Ok(asset);
        }
        self.get(id).await
    }

    fn identity_drift(&self, submitted: &Address) -> bool {
        let drifted = self.session.current() != Some(*submitted);
        if drifted {
            warn!(
                submitted = %submitted.short_id(),
                "acting identity changed while operation was in flight; \
                 outcome is attributed to the submitting identity"
            );
        }
        drifted
    }

    fn pending_lock(&self) -> MutexGuard<'_, PendingTable> {
        self.pending.lock().expect("pending table lock poisoned")
    }

    fn cache_read(&self) -> RwLockReadGuard<'_, HashMap<AssetId, Asset>> {
        self.cache.read().expect("asset cache lock poisoned")
    }

    fn cache_write(&self) -> RwLockWriteGuard<'_, HashMap<AssetId, Asset>> {
        self.cache.write().expect("asset cache lock poisoned")
    }
}

/// Pre-check a cached record the way the ledger will at settlement.
fn check_active_owned(asset: &Asset, identity: &Address) -> RegistryResult<()> {
    if !asset.is_active {
        return Err(RegistryError::Revert("asset is inactive".into()));
    }
    if asset.owner != *identity {
        return Err(RegistryError::Revert(
            "caller is not the asset owner".into(),
        ));
    }
    Ok(())
}

fn materialize(id: AssetId, record: AssetRecord) -> Asset {
    Asset {
        id,
        name: record.name,
        description: record.description,
        hash: record.hash,
        owner: record.owner,
        registered_at: record.registered_at,
        is_active: record.is_active,
    }
}

fn shape_error(method: &'static str) -> RegistryError {
    GatewayError::ReplyShape { method }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use dar_gateway::{
        ConfirmationMode, GatewayConfig, InMemoryLedger, LedgerTransport, PendingHandle,
        RawReceipt, SubmitError, TxHash,
    };
    use dar_session::{IdentityProvider, SessionManager, StaticProvider};

    const SETTLE_BUDGET: Duration = Duration::from_secs(5);

    fn alice() -> Address {
        Address::from_raw([1; 20])
    }

    fn bob() -> Address {
        Address::from_raw([2; 20])
    }

    fn carol() -> Address {
        Address::from_raw([3; 20])
    }

    fn digest(seed: u8) -> ContentDigest {
        ContentDigest::from_hash([seed; 32])
    }

    async fn registry_for(
        ledger: &Arc<InMemoryLedger>,
        accounts: Vec<Address>,
        timeout: Duration,
    ) -> (Arc<Registry>, Arc<StaticProvider>) {
        let provider = Arc::new(StaticProvider::new(accounts));
        let session = Arc::new(
            SessionManager::connect(provider.clone() as Arc<dyn IdentityProvider>)
                .await
                .unwrap(),
        );
        let gateway = Gateway::new(ledger.clone(), GatewayConfig::default());
        let registry = Arc::new(Registry::new(
            gateway,
            session,
            RegistryConfig {
                confirmation_timeout: timeout,
            },
        ));
        (registry, provider)
    }

    /// Register and settle, regardless of the ledger's confirmation mode.
    async fn register_confirmed(
        registry: &Registry,
        ledger: &InMemoryLedger,
        name: &str,
        seed: u8,
    ) -> RegisterOutcome {
        let (outcome, _) = tokio::join!(registry.register(name, "test asset", digest(seed)), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            ledger.confirm_all();
        });
        outcome.unwrap()
    }

    #[tokio::test]
    async fn register_then_get_round_trips() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        let outcome = registry
            .register("deed", "land title", digest(0xAB))
            .await
            .unwrap();
        assert_eq!(outcome.id, AssetId(1));
        assert_eq!(outcome.submitted_by, alice());
        assert!(!outcome.identity_drift);

        let asset = registry.get(outcome.id).await.unwrap();
        assert_eq!(asset.name, "deed");
        assert_eq!(asset.description, "land title");
        assert_eq!(asset.hash, digest(0xAB));
        assert_eq!(asset.owner, alice());
        assert!(asset.is_active);
        assert!(asset.registered_at > 0);
    }

    #[tokio::test]
    async fn register_rejects_empty_name_before_submission() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        let err = registry.register("  ", "x", digest(1)).await.unwrap_err();
        assert!(matches!(err, RegistryError::Precondition(_)));
        assert_eq!(ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn register_requires_an_identity() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (registry, provider) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        let mut watcher = registry.session().watch();
        provider.disconnect();
        watcher.wait_for(Option::is_none).await.unwrap();

        let err = registry.register("deed", "x", digest(1)).await.unwrap_err();
        assert!(matches!(err, RegistryError::Identity(_)));
        assert_eq!(ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn rejected_submission_releases_reservation() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        ledger.fail_next_submit(SubmitError::UserRejected);
        let err = registry.register("deed", "x", digest(1)).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Submission(SubmitError::UserRejected)
        ));
        assert!(registry.pending_operations().is_empty());
    }

    #[tokio::test]
    async fn transfer_by_owner_updates_cache_and_ledger() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        let id = registry
            .register("deed", "x", digest(1))
            .await
            .unwrap()
            .id;
        let outcome = registry.transfer(id, bob()).await.unwrap();
        assert_eq!(outcome.new_owner, bob());

        assert_eq!(registry.cached(id).unwrap().owner, bob());
        assert_eq!(registry.get(id).await.unwrap().owner, bob());
    }

    #[tokio::test]
    async fn transfer_by_non_owner_reverts_on_ledger() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (alice_registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;
        let (bob_registry, _) = registry_for(&ledger, vec![bob()], SETTLE_BUDGET).await;

        let id = alice_registry
            .register("deed", "x", digest(1))
            .await
            .unwrap()
            .id;

        // Bob's cache is cold, so no local pre-check applies; the ledger
        // itself enforces ownership at settlement.
        let err = bob_registry.transfer(id, bob()).await.unwrap_err();
        assert!(matches!(err, RegistryError::Revert(_)));
        assert_eq!(bob_registry.get(id).await.unwrap().owner, alice());
    }

    #[tokio::test]
    async fn stale_identity_fails_owner_precheck_without_submission() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (registry, provider) = registry_for(&ledger, vec![alice(), bob()], SETTLE_BUDGET).await;

        let id = registry
            .register("deed", "x", digest(1))
            .await
            .unwrap()
            .id;
        let submissions = ledger.submission_count();

        let mut watcher = registry.session().watch();
        provider.switch_account(bob());
        watcher.wait_for(|a| *a == Some(bob())).await.unwrap();

        let err = registry.transfer(id, carol()).await.unwrap_err();
        assert!(matches!(err, RegistryError::Revert(_)));
        assert_eq!(ledger.submission_count(), submissions);
    }

    #[tokio::test]
    async fn transfer_to_zero_address_is_a_precondition_error() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        let id = registry
            .register("deed", "x", digest(1))
            .await
            .unwrap()
            .id;
        let submissions = ledger.submission_count();

        let err = registry.transfer(id, Address::zero()).await.unwrap_err();
        assert!(matches!(err, RegistryError::Precondition(_)));
        assert_eq!(ledger.submission_count(), submissions);
    }

    #[tokio::test]
    async fn update_hash_short_circuits_unless_forced() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        let id = registry
            .register("deed", "x", digest(1))
            .await
            .unwrap()
            .id;
        assert_eq!(ledger.submission_count(), 1);

        let unchanged = registry.update_hash(id, digest(1), false).await.unwrap();
        assert_eq!(unchanged, UpdateHashOutcome::Unchanged { id });
        assert_eq!(ledger.submission_count(), 1);

        let forced = registry.update_hash(id, digest(1), true).await.unwrap();
        assert!(matches!(forced, UpdateHashOutcome::Updated { .. }));
        assert_eq!(ledger.submission_count(), 2);

        registry.update_hash(id, digest(9), false).await.unwrap();
        assert_eq!(registry.get(id).await.unwrap().hash, digest(9));
    }

    #[tokio::test]
    async fn update_hash_short_circuit_works_with_a_cold_cache() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (alice_registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;
        let (fresh_registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        let id = alice_registry
            .register("deed", "x", digest(1))
            .await
            .unwrap()
            .id;
        let submissions = ledger.submission_count();

        // The fresh registry has nothing cached; the comparison runs
        // against the fetched confirmed record.
        let unchanged = fresh_registry.update_hash(id, digest(1), false).await.unwrap();
        assert_eq!(unchanged, UpdateHashOutcome::Unchanged { id });
        assert_eq!(ledger.submission_count(), submissions);
    }

    #[tokio::test]
    async fn update_hash_by_non_owner_leaves_hash_unchanged() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (alice_registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;
        let (bob_registry, _) = registry_for(&ledger, vec![bob()], SETTLE_BUDGET).await;

        let id = alice_registry
            .register("deed", "x", digest(1))
            .await
            .unwrap()
            .id;

        let err = bob_registry.update_hash(id, digest(9), false).await.unwrap_err();
        assert!(matches!(err, RegistryError::Revert(_)));
        assert_eq!(bob_registry.get(id).await.unwrap().hash, digest(1));
    }

    #[tokio::test]
    async fn delete_twice_is_idempotent_at_the_surface() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        let id = registry
            .register("deed", "x", digest(1))
            .await
            .unwrap()
            .id;

        let first = registry.delete(id).await.unwrap();
        assert!(matches!(first, DeleteOutcome::Deleted { .. }));
        assert_eq!(ledger.submission_count(), 2);

        let second = registry.delete(id).await.unwrap();
        assert_eq!(second, DeleteOutcome::AlreadyInactive { id });
        assert_eq!(ledger.submission_count(), 2);
    }

    #[tokio::test]
    async fn verify_integrity_distinguishes_all_three_outcomes() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        let id = registry
            .register("deed", "x", digest(1))
            .await
            .unwrap()
            .id;

        assert!(registry.verify_integrity(id, &digest(1)).await.unwrap());
        assert!(!registry.verify_integrity(id, &digest(9)).await.unwrap());

        let err = registry
            .verify_integrity(AssetId(404), &digest(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(AssetId(404))));
    }

    #[tokio::test]
    async fn source_registration_and_verification_share_the_engine() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        let data = b"the asset's actual bytes";
        let outcome = registry
            .register_source("doc", "bytes", &mut Cursor::new(data))
            .await
            .unwrap();

        assert!(registry
            .verify_source(outcome.id, &mut Cursor::new(data))
            .await
            .unwrap());
        assert!(!registry
            .verify_source(outcome.id, &mut Cursor::new(b"tampered bytes"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn full_lifecycle_scenario() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (registry, provider) = registry_for(&ledger, vec![alice(), bob()], SETTLE_BUDGET).await;

        let outcome = registry
            .register("deed", "land title", digest(0xAB))
            .await
            .unwrap();
        assert_eq!(outcome.id, AssetId(1));

        let asset = registry.get(AssetId(1)).await.unwrap();
        assert_eq!(asset.name, "deed");
        assert_eq!(asset.hash, digest(0xAB));
        assert_eq!(asset.owner, alice());
        assert!(asset.is_active);

        registry.transfer(AssetId(1), bob()).await.unwrap();
        assert_eq!(registry.get(AssetId(1)).await.unwrap().owner, bob());

        // Alice no longer owns the asset; her delete is refused and
        // nothing changes.
        let err = registry.delete(AssetId(1)).await.unwrap_err();
        assert!(matches!(err, RegistryError::Revert(_)));
        assert!(registry.get(AssetId(1)).await.unwrap().is_active);

        let mut watcher = registry.session().watch();
        provider.switch_account(bob());
        watcher.wait_for(|a| *a == Some(bob())).await.unwrap();

        let deleted = registry.delete(AssetId(1)).await.unwrap();
        assert!(matches!(deleted, DeleteOutcome::Deleted { .. }));
        assert!(!registry.get(AssetId(1)).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn concurrent_mutation_on_the_same_id_is_rejected() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Manual));
        let (registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        let id = register_confirmed(&registry, &ledger, "deed", 1).await.id;

        let in_flight = Arc::clone(&registry);
        let task = tokio::spawn(async move { in_flight.transfer(id, bob()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = registry.transfer(id, carol()).await.unwrap_err();
        assert!(matches!(err, RegistryError::OperationInFlight(i) if i == id));

        ledger.confirm_all();
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.new_owner, bob());
    }

    #[tokio::test]
    async fn reads_are_permitted_while_a_mutation_is_pending() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Manual));
        let (registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        let id = register_confirmed(&registry, &ledger, "deed", 1).await.id;

        let in_flight = Arc::clone(&registry);
        let task = tokio::spawn(async move { in_flight.transfer(id, bob()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Reads resolve against the last confirmed state.
        assert_eq!(registry.get(id).await.unwrap().owner, alice());
        assert!(registry.verify_integrity(id, &digest(1)).await.unwrap());
        assert_eq!(registry.list_owned(alice()).await.unwrap(), vec![id]);

        ledger.confirm_all();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn out_of_order_settlement_resolves_independently() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Manual));
        let (registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;

        let first = register_confirmed(&registry, &ledger, "one", 1).await.id;
        let second = register_confirmed(&registry, &ledger, "two", 2).await.id;

        let r1 = Arc::clone(&registry);
        let t1 = tokio::spawn(async move { r1.transfer(first, bob()).await });
        let r2 = Arc::clone(&registry);
        let t2 = tokio::spawn(async move { r2.update_hash(second, digest(9), false).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Settle the later submission first.
        let held = ledger.pending_txs();
        assert_eq!(held.len(), 2);
        ledger.confirm(&PendingHandle { tx: held[1] });
        t2.await.unwrap().unwrap();
        assert_eq!(ledger.pending_count(), 1);

        ledger.confirm(&PendingHandle { tx: held[0] });
        t1.await.unwrap().unwrap();

        assert_eq!(registry.get(first).await.unwrap().owner, bob());
        assert_eq!(registry.get(second).await.unwrap().hash, digest(9));
    }

    #[tokio::test]
    async fn timeout_holds_the_lock_until_reconciled() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Manual));
        let (registry, _) = registry_for(&ledger, vec![alice()], Duration::from_millis(40)).await;

        let id = register_confirmed(&registry, &ledger, "deed", 1).await.id;

        let err = registry.update_hash(id, digest(9), false).await.unwrap_err();
        assert!(matches!(err, RegistryError::Timeout));

        // The lock is still held and the cache still shows confirmed
        // state only.
        let err = registry.transfer(id, bob()).await.unwrap_err();
        assert!(matches!(err, RegistryError::OperationInFlight(_)));
        assert_eq!(registry.cached(id).unwrap().hash, digest(1));

        // The ledger settles late; reconciliation observes the outcome,
        // folds it into the cache, and releases the lock.
        ledger.confirm_all();
        let asset = registry.reconcile(id).await.unwrap();
        assert_eq!(asset.hash, digest(9));
        assert_eq!(registry.cached(id).unwrap().hash, digest(9));
        assert!(registry.pending_operations().is_empty());

        // Mutations on the id are possible again.
        let (deleted, _) = tokio::join!(registry.delete(id), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            ledger.confirm_all();
        });
        assert!(matches!(deleted.unwrap(), DeleteOutcome::Deleted { .. }));
    }

    #[tokio::test]
    async fn timed_out_registration_can_be_discarded() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Manual));
        let (registry, _) = registry_for(&ledger, vec![alice()], Duration::from_millis(40)).await;

        let err = registry.register("deed", "x", digest(1)).await.unwrap_err();
        assert!(matches!(err, RegistryError::Timeout));

        let pending = registry.pending_operations();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, MutationKind::Register);
        assert_eq!(pending[0].target, None);

        // The ledger settles the registration anyway; it is discoverable
        // through an ownership listing.
        ledger.confirm_all();
        assert_eq!(registry.list_owned(alice()).await.unwrap(), vec![AssetId(1)]);

        assert!(registry.discard_registration(pending[0].op));
        assert!(registry.pending_operations().is_empty());
    }

    #[tokio::test]
    async fn identity_drift_is_flagged_on_settlement() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Manual));
        let (registry, provider) = registry_for(&ledger, vec![alice(), bob()], SETTLE_BUDGET).await;

        let id = register_confirmed(&registry, &ledger, "deed", 1).await.id;

        let in_flight = Arc::clone(&registry);
        let task = tokio::spawn(async move { in_flight.transfer(id, bob()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The account changes while the transfer is awaiting settlement.
        let mut watcher = registry.session().watch();
        provider.switch_account(bob());
        watcher.wait_for(|a| *a == Some(bob())).await.unwrap();

        ledger.confirm_all();
        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.identity_drift);
        assert_eq!(registry.get(id).await.unwrap().owner, bob());
    }

    #[tokio::test]
    async fn reverted_mutation_leaves_cache_untouched() {
        let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Immediate));
        let (alice_registry, _) = registry_for(&ledger, vec![alice()], SETTLE_BUDGET).await;
        let (bob_registry, _) = registry_for(&ledger, vec![bob()], SETTLE_BUDGET).await;

        let id = alice_registry
            .register("deed", "x", digest(1))
            .await
            .unwrap()
            .id;

        // Warm Bob's cache with the confirmed record, then fail a
        // ledger-side mutation.
        bob_registry.get(id).await.unwrap();
        let err = bob_registry.update_hash(id, digest(9), false).await.unwrap_err();
        assert!(matches!(err, RegistryError::Revert(_)));
        assert_eq!(bob_registry.cached(id).unwrap().hash, digest(1));
        assert!(bob_registry.pending_operations().is_empty());
    }

    /// Transport whose receipts omit the registration event entirely.
    struct TruncatedReceiptTransport;

    #[async_trait::async_trait]
    impl LedgerTransport for TruncatedReceiptTransport {
        async fn submit(
            &self,
            _call: &MutationCall,
            _from: &Address,
        ) -> Result<PendingHandle, SubmitError> {
            Ok(PendingHandle {
                tx: TxHash::from_raw([7; 32]),
            })
        }

        async fn confirmation(
            &self,
            handle: &PendingHandle,
        ) -> Result<RawReceipt, GatewayError> {
            Ok(RawReceipt {
                tx: handle.tx,
                events: vec![],
            })
        }

        async fn query(&self, _call: &QueryCall) -> Result<QueryReply, GatewayError> {
            Ok(QueryReply::Asset(None))
        }
    }

    #[tokio::test]
    async fn truncated_receipt_fails_closed() {
        let provider = Arc::new(StaticProvider::new(vec![alice()]));
        let session = Arc::new(
            SessionManager::connect(provider as Arc<dyn IdentityProvider>)
                .await
                .unwrap(),
        );
        let gateway = Gateway::new(Arc::new(TruncatedReceiptTransport), GatewayConfig::default());
        let registry = Registry::new(gateway, session, RegistryConfig::default());

        let err = registry.register("deed", "x", digest(1)).await.unwrap_err();
        assert!(matches!(err, RegistryError::ReceiptFormat(_)));
        assert!(registry.cached(AssetId(1)).is_none());
    }
}
