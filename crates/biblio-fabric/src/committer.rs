use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use biblio_crypto::Identity;
use biblio_protocol::{endorsement_message, CommitStatus, Envelope, ProtocolError, ProtocolResult};
use biblio_store::{InMemoryRecordStore, StoreError};
use biblio_types::{KvRead, TxId, ValidationCode, Version};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::FabricConfig;
use crate::error::{FabricError, FabricResult};

/// Outcome of one committed block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockEvent {
    pub number: u64,
    pub statuses: Vec<CommitStatus>,
}

impl BlockEvent {
    pub fn valid_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.is_successful()).count()
    }
}

/// Committed state of one channel plus the validation that guards it.
///
/// Blocks are validated transaction by transaction. Each valid
/// transaction's writes are applied before the next transaction in the
/// block is checked, so a later transaction that read a key an earlier one
/// wrote fails with `MVCC_READ_CONFLICT`. A transaction whose checks hit a
/// store error is marked `INVALID_OTHER_REASON`; the block still commits.
pub struct ChannelLedger {
    channel: String,
    chaincode: String,
    state: Arc<InMemoryRecordStore>,
    endorsers: Vec<Identity>,
    required_endorsements: usize,
    statuses: RwLock<HashMap<TxId, CommitStatus>>,
    height: Mutex<u64>,
    events: Mutex<Option<broadcast::Sender<BlockEvent>>>,
}

impl ChannelLedger {
    pub(crate) fn new(
        config: &FabricConfig,
        state: Arc<InMemoryRecordStore>,
        endorsers: Vec<Identity>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.channel_capacity);
        Self {
            channel: config.channel.clone(),
            chaincode: config.chaincode.clone(),
            state,
            endorsers,
            required_endorsements: config.required_endorsements,
            statuses: RwLock::new(HashMap::new()),
            height: Mutex::new(0),
            events: Mutex::new(Some(events)),
        }
    }

    /// Committed world state and history.
    pub fn state(&self) -> &Arc<InMemoryRecordStore> {
        &self.state
    }

    /// Number of the last committed block, 0 before the first.
    pub fn height(&self) -> u64 {
        *self.height.lock().expect("height lock poisoned")
    }

    /// Final status of a transaction, if it has been committed.
    pub fn status(&self, tx_id: TxId) -> Option<CommitStatus> {
        self.statuses
            .read()
            .expect("status lock poisoned")
            .get(&tx_id)
            .copied()
    }

    pub fn subscribe(&self) -> FabricResult<broadcast::Receiver<BlockEvent>> {
        self.events
            .lock()
            .map_err(|_| FabricError::Store(StoreError::LockPoisoned))?
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or(FabricError::Shutdown)
    }

    /// Validate and apply one block, then announce it.
    pub fn commit_block(&self, envelopes: &[Envelope]) -> FabricResult<BlockEvent> {
        let mut height = self
            .height
            .lock()
            .map_err(|_| FabricError::Store(StoreError::LockPoisoned))?;
        let number = *height + 1;
        let mut in_block = HashSet::new();
        let mut statuses = Vec::with_capacity(envelopes.len());

        for (tx_num, envelope) in envelopes.iter().enumerate() {
            let tx_id = envelope.tx_id();
            let version = Version::new(number, tx_num as u32);
            let code = self
                .validate_and_apply(envelope, &in_block, version)
                .unwrap_or_else(|err| {
                    warn!(block = number, %tx_id, %err, "transaction could not be validated");
                    ValidationCode::InvalidOtherReason
                });
            in_block.insert(tx_id);
            debug!(block = number, %tx_id, %code, "transaction validated");
            statuses.push(CommitStatus {
                tx_id,
                code,
                block_number: number,
            });
        }
        *height = number;

        {
            let mut known = self
                .statuses
                .write()
                .map_err(|_| FabricError::Store(StoreError::LockPoisoned))?;
            for status in &statuses {
                known.entry(status.tx_id).or_insert(*status);
            }
        }

        let event = BlockEvent { number, statuses };
        info!(
            block = number,
            txs = envelopes.len(),
            valid = event.valid_count(),
            "block committed"
        );
        if let Some(sender) = self
            .events
            .lock()
            .map_err(|_| FabricError::Store(StoreError::LockPoisoned))?
            .as_ref()
        {
            let _ = sender.send(event.clone());
        }
        Ok(event)
    }

    /// A store write is all or nothing, so an error here leaves no partial
    /// state behind.
    fn validate_and_apply(
        &self,
        envelope: &Envelope,
        in_block: &HashSet<TxId>,
        version: Version,
    ) -> FabricResult<ValidationCode> {
        let code = self.validate(envelope, in_block)?;
        if code.is_valid() {
            let tx = &envelope.message;
            self.state.apply(
                envelope.tx_id(),
                version,
                tx.proposal.header.timestamp,
                &tx.rwset.writes,
            )?;
        }
        Ok(code)
    }

    fn validate(&self, envelope: &Envelope, in_block: &HashSet<TxId>) -> FabricResult<ValidationCode> {
        let tx = &envelope.message;
        let header = &tx.proposal.header;
        let tx_id = envelope.tx_id();

        if in_block.contains(&tx_id) || self.status(tx_id).is_some() {
            return Ok(ValidationCode::DuplicateTxId);
        }
        if header.channel != self.channel
            || header.chaincode != self.chaincode
            || tx.rwset.writes.iter().any(|w| !w.is_delete && w.value.is_none())
        {
            return Ok(ValidationCode::BadPayload);
        }
        if envelope.verify_by(&header.creator).is_err() {
            return Ok(ValidationCode::BadCreatorSignature);
        }
        if tx.proposal.expected_tx_id() != tx_id {
            return Ok(ValidationCode::BadProposalTxId);
        }
        if self.endorsing_orgs(envelope)? < self.required_endorsements {
            return Ok(ValidationCode::EndorsementPolicyFailure);
        }

        for read in &tx.rwset.reads {
            let current = self.state.get_versioned(&read.key)?.map(|v| v.version);
            if current != read.version {
                debug!(%tx_id, key = %read.key, "stale read");
                return Ok(ValidationCode::MvccReadConflict);
            }
        }
        for query in &tx.rwset.range_queries {
            let current: Vec<KvRead> = self
                .state
                .range_versioned(&query.start_key, &query.end_key)?
                .into_iter()
                .map(|(key, v)| KvRead {
                    key,
                    version: Some(v.version),
                })
                .collect();
            if current != query.reads {
                debug!(%tx_id, start = %query.start_key, end = %query.end_key, "range changed");
                return Ok(ValidationCode::PhantomReadConflict);
            }
        }
        Ok(ValidationCode::Valid)
    }

    /// Distinct organizations that produced a valid endorsement from a
    /// known peer.
    fn endorsing_orgs(&self, envelope: &Envelope) -> FabricResult<usize> {
        let tx = &envelope.message;
        let message = endorsement_message(&tx.result, &tx.rwset)?;
        let mut orgs = HashSet::new();
        for endorsement in &tx.endorsements {
            if !self.endorsers.contains(&endorsement.endorser) {
                continue;
            }
            let Ok(key) = endorsement.endorser.verifying_key() else {
                continue;
            };
            if key.verify(&message, &endorsement.signature).is_ok() {
                orgs.insert(endorsement.endorser.msp_id());
            }
        }
        Ok(orgs.len())
    }

    /// Wait until `tx_id` is committed. Subscribes before checking the
    /// status table, so a commit racing with this call is never missed.
    pub async fn wait_for(&self, tx_id: TxId) -> ProtocolResult<CommitStatus> {
        let mut events = match self.subscribe() {
            Ok(events) => events,
            Err(_) => return self.status(tx_id).ok_or(ProtocolError::Closed),
        };
        if let Some(status) = self.status(tx_id) {
            return Ok(status);
        }
        loop {
            match events.recv().await {
                Ok(block) => {
                    if let Some(status) = block.statuses.iter().find(|s| s.tx_id == tx_id) {
                        return Ok(*status);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(%tx_id, skipped, "commit listener lagged");
                    if let Some(status) = self.status(tx_id) {
                        return Ok(status);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return self.status(tx_id).ok_or(ProtocolError::Closed);
                }
            }
        }
    }

    /// Stop announcing blocks. Pending waiters see the stream close.
    pub(crate) fn close(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.take();
        }
    }
}

impl std::fmt::Debug for ChannelLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelLedger")
            .field("channel", &self.channel)
            .field("height", &self.height())
            .finish()
    }
}
