use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use dar_types::{Address, AssetId};

use crate::call::{AssetRecord, MutationCall, QueryCall, QueryReply};
use crate::error::{GatewayError, SubmitError};
use crate::receipt::{PendingHandle, RawReceipt, ReceiptEvent, TxHash, events};
use crate::transport::LedgerTransport;

/// When a submission settles.
///
/// `Manual` holds every submission until the test releases it via
/// [`InMemoryLedger::confirm`] / [`InMemoryLedger::confirm_all`], which
/// allows settling out of submission order and exercising timeouts.
#[derive(Clone, Copy, Debug)]
pub enum ConfirmationMode {
    Immediate,
    Delayed(Duration),
    Manual,
}

type SettleResult = Result<RawReceipt, String>;

struct Submission {
    call: MutationCall,
    from: Address,
    slot: watch::Sender<Option<SettleResult>>,
    settled: bool,
}

#[derive(Default)]
struct LedgerState {
    assets: BTreeMap<AssetId, AssetRecord>,
    /// Per-owner id lists in registration order; transferred assets are
    /// appended to the receiving owner's list.
    owners: HashMap<Address, Vec<AssetId>>,
    next_id: u64,
    submissions: HashMap<TxHash, Submission>,
    submitted_order: Vec<TxHash>,
    fail_next: Option<SubmitError>,
    tx_counter: u64,
    total_submissions: u64,
}

/// In-memory ledger implementing the asset registry contract semantics
/// for tests, local demos, and embedding.
///
/// State mutates only at settlement time, so queries observe exactly the
/// confirmed ledger state regardless of what is in flight.
pub struct InMemoryLedger {
    mode: ConfirmationMode,
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new(mode: ConfirmationMode) -> Self {
        Self {
            mode,
            state: Arc::new(Mutex::new(LedgerState {
                next_id: 1,
                ..LedgerState::default()
            })),
        }
    }

    /// Fail the next `submit` call with the given error, once.
    pub fn fail_next_submit(&self, err: SubmitError) {
        self.lock().fail_next = Some(err);
    }

    /// Settle one held submission. Returns `false` if the handle is
    /// unknown or already settled.
    pub fn confirm(&self, handle: &PendingHandle) -> bool {
        settle(&self.state, handle.tx)
    }

    /// Settle every held submission, in submission order. Returns how
    /// many were settled.
    pub fn confirm_all(&self) -> usize {
        let pending: Vec<TxHash> = {
            let state = self.lock();
            state
                .submitted_order
                .iter()
                .filter(|tx| !state.submissions[*tx].settled)
                .copied()
                .collect()
        };
        pending.into_iter().filter(|tx| settle(&self.state, *tx)).count()
    }

    /// Submissions accepted but not yet settled.
    pub fn pending_count(&self) -> usize {
        let state = self.lock();
        state.submissions.values().filter(|s| !s.settled).count()
    }

    /// Transaction hashes of unsettled submissions, in submission order.
    pub fn pending_txs(&self) -> Vec<TxHash> {
        let state = self.lock();
        state
            .submitted_order
            .iter()
            .filter(|tx| !state.submissions[*tx].settled)
            .copied()
            .collect()
    }

    /// Total submissions accepted over the ledger's lifetime.
    pub fn submission_count(&self) -> u64 {
        self.lock().total_submissions
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().expect("ledger state lock poisoned")
    }
}

#[async_trait]
impl LedgerTransport for InMemoryLedger {
    async fn submit(
        &self,
        call: &MutationCall,
        from: &Address,
    ) -> Result<PendingHandle, SubmitError> {
        let tx = {
            let mut state = self.lock();
            if let Some(err) = state.fail_next.take() {
                return Err(err);
            }

            state.tx_counter += 1;
            let tx = tx_hash(state.tx_counter, call.method(), from);
            let (slot, _) = watch::channel(None);
            state.submissions.insert(
                tx,
                Submission {
                    call: call.clone(),
                    from: *from,
                    slot,
                    settled: false,
                },
            );
            state.submitted_order.push(tx);
            state.total_submissions += 1;
            tx
        };

        match self.mode {
            ConfirmationMode::Immediate => {
                settle(&self.state, tx);
            }
            ConfirmationMode::Delayed(delay) => {
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    settle(&state, tx);
                });
            }
            ConfirmationMode::Manual => {}
        }

        Ok(PendingHandle { tx })
    }

    async fn confirmation(&self, handle: &PendingHandle) -> Result<RawReceipt, GatewayError> {
        let mut rx = {
            let state = self.lock();
            let submission = state
                .submissions
                .get(&handle.tx)
                .ok_or(GatewayError::UnknownTransaction(handle.tx))?;
            submission.slot.subscribe()
        };

        let settled = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| GatewayError::Network("ledger shut down".into()))?
            .clone();

        match settled {
            Some(Ok(receipt)) => Ok(receipt),
            Some(Err(reason)) => Err(GatewayError::Reverted(reason)),
            None => unreachable!("wait_for resolved on None"),
        }
    }

    async fn query(&self, call: &QueryCall) -> Result<QueryReply, GatewayError> {
        let state = self.lock();
        Ok(match call {
            QueryCall::GetAsset(id) => QueryReply::Asset(state.assets.get(id).cloned()),
            QueryCall::AssetsByOwner(owner) => {
                QueryReply::AssetIds(state.owners.get(owner).cloned().unwrap_or_default())
            }
            QueryCall::VerifyIntegrity(id, candidate) => QueryReply::Verification(
                state.assets.get(id).map(|record| record.hash == *candidate),
            ),
        })
    }
}

/// Apply a held submission to ledger state and publish its result.
fn settle(state: &Mutex<LedgerState>, tx: TxHash) -> bool {
    let mut state = state.lock().expect("ledger state lock poisoned");
    let Some(submission) = state.submissions.get(&tx) else {
        return false;
    };
    if submission.settled {
        return false;
    }

    let call = submission.call.clone();
    let from = submission.from;
    let result = match apply(&mut state, &call, &from) {
        Ok(evts) => Ok(RawReceipt { tx, events: evts }),
        Err(reason) => Err(reason),
    };

    debug!(
        method = call.method(),
        tx = %tx.short_hex(),
        reverted = result.is_err(),
        "settled"
    );

    let submission = state
        .submissions
        .get_mut(&tx)
        .expect("submission vanished during settle");
    submission.settled = true;
    submission.slot.send_replace(Some(result));
    true
}

/// Contract semantics, evaluated authoritatively at settlement time.
fn apply(
    state: &mut LedgerState,
    call: &MutationCall,
    from: &Address,
) -> Result<Vec<ReceiptEvent>, String> {
    match call {
        MutationCall::RegisterAsset {
            name,
            description,
            hash,
        } => {
            if name.trim().is_empty() {
                return Err("asset name must not be empty".into());
            }
            let id = AssetId(state.next_id);
            state.next_id += 1;
            let registered_at = unix_now();
            state.assets.insert(
                id,
                AssetRecord {
                    name: name.clone(),
                    description: description.clone(),
                    hash: *hash,
                    owner: *from,
                    registered_at,
                    is_active: true,
                },
            );
            state.owners.entry(*from).or_default().push(id);
            Ok(vec![event(
                events::ASSET_REGISTERED,
                &[
                    (events::ATTR_ASSET_ID, id.to_string()),
                    (events::ATTR_REGISTERED_AT, registered_at.to_string()),
                ],
            )])
        }
        MutationCall::TransferAsset { id, new_owner } => {
            if new_owner.is_zero() {
                return Err("transfer to the zero address".into());
            }
            let record = active_owned(state, *id, from)?;
            let previous = record.owner;
            record.owner = *new_owner;
            if previous != *new_owner {
                if let Some(ids) = state.owners.get_mut(&previous) {
                    ids.retain(|i| i != id);
                }
                state.owners.entry(*new_owner).or_default().push(*id);
            }
            Ok(vec![event(
                events::ASSET_TRANSFERRED,
                &[
                    (events::ATTR_ASSET_ID, id.to_string()),
                    (events::ATTR_NEW_OWNER, new_owner.to_hex()),
                ],
            )])
        }
        MutationCall::UpdateAssetHash { id, new_hash } => {
            let record = active_owned(state, *id, from)?;
            record.hash = *new_hash;
            Ok(vec![event(
                events::ASSET_HASH_UPDATED,
                &[(events::ATTR_ASSET_ID, id.to_string())],
            )])
        }
        MutationCall::DeleteAsset { id } => {
            let record = active_owned(state, *id, from)?;
            record.is_active = false;
            Ok(vec![event(
                events::ASSET_DELETED,
                &[(events::ATTR_ASSET_ID, id.to_string())],
            )])
        }
    }
}

/// Resolve an asset that must exist, be active, and be owned by `from`.
fn active_owned<'a>(
    state: &'a mut LedgerState,
    id: AssetId,
    from: &Address,
) -> Result<&'a mut AssetRecord, String> {
    let record = state
        .assets
        .get_mut(&id)
        .ok_or_else(|| format!("unknown asset {id}"))?;
    if !record.is_active {
        return Err("asset is inactive".into());
    }
    if record.owner != *from {
        return Err("caller is not the asset owner".into());
    }
    Ok(record)
}

fn event(name: &str, attrs: &[(&str, String)]) -> ReceiptEvent {
    ReceiptEvent {
        name: name.into(),
        attrs: attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    }
}

fn tx_hash(counter: u64, method: &str, from: &Address) -> TxHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"dar-tx-v1:");
    hasher.update(&counter.to_le_bytes());
    hasher.update(method.as_bytes());
    hasher.update(from.as_bytes());
    TxHash::from_raw(*hasher.finalize().as_bytes())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
