use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use biblio_ledger::{ContractRegistry, PublicationContract};
use biblio_protocol::{
    CommitStatus, Envelope, ErrorDetail, GatewayConnection, PreparedTransaction, ProtocolError,
    ProtocolResult, SignedCommitStatusRequest, SignedProposal,
};
use biblio_store::InMemoryRecordStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::committer::ChannelLedger;
use crate::config::FabricConfig;
use crate::error::{FabricError, FabricResult};
use crate::orderer;
use crate::peer::Peer;

/// A single-channel ledger network running inside the current process.
///
/// One endorsing peer per organization simulates proposals against the
/// shared committed state. Submitted envelopes go through an orderer task
/// that cuts blocks and hands them to the committer, which validates them
/// and broadcasts the outcome to commit-status waiters.
pub struct InProcessNetwork {
    config: FabricConfig,
    peers: Vec<Peer>,
    ledger: Arc<ChannelLedger>,
    running: AtomicBool,
    queue: Mutex<Option<mpsc::Sender<Envelope>>>,
    orderer: Mutex<Option<JoinHandle<()>>>,
}

impl InProcessNetwork {
    /// Start the network on the current tokio runtime.
    pub fn start(config: FabricConfig, contract: PublicationContract) -> FabricResult<Arc<Self>> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            FabricError::InvalidConfig("network must be started inside a tokio runtime".into())
        })?;

        let state = Arc::new(InMemoryRecordStore::new());
        let registry =
            Arc::new(ContractRegistry::publication(contract).named(config.chaincode.clone()));
        let peers: Vec<Peer> = config
            .organizations
            .iter()
            .map(|org| {
                Peer::new(
                    org,
                    &config.channel,
                    config.organizations.clone(),
                    Arc::clone(&registry),
                    Arc::clone(&state),
                )
            })
            .collect();
        let endorsers = peers.iter().map(|p| p.identity().clone()).collect();
        let ledger = Arc::new(ChannelLedger::new(&config, state, endorsers));

        let (queue, rx) = mpsc::channel(config.channel_capacity);
        let orderer = runtime.spawn(orderer::run(
            rx,
            Arc::clone(&ledger),
            config.batch_size,
            config.batch_timeout(),
        ));

        info!(
            channel = %config.channel,
            chaincode = %config.chaincode,
            peers = peers.len(),
            policy = config.required_endorsements,
            "network started"
        );
        Ok(Arc::new(Self {
            config,
            peers,
            ledger,
            running: AtomicBool::new(true),
            queue: Mutex::new(Some(queue)),
            orderer: Mutex::new(Some(orderer)),
        }))
    }

    pub fn config(&self) -> &FabricConfig {
        &self.config
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn ledger(&self) -> &Arc<ChannelLedger> {
        &self.ledger
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> ProtocolResult<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(FabricError::Shutdown.into())
        }
    }

    /// The caller's own organization's peer, or the first peer.
    fn peer_for(&self, msp_id: &str) -> ProtocolResult<&Peer> {
        self.peers
            .iter()
            .find(|p| p.msp_id() == msp_id)
            .or_else(|| self.peers.first())
            .ok_or_else(|| ProtocolError::Unavailable("no peers".into()))
    }

    fn queue(&self) -> ProtocolResult<mpsc::Sender<Envelope>> {
        self.queue
            .lock()
            .map_err(|_| ProtocolError::Unavailable("orderer queue lock poisoned".into()))?
            .clone()
            .ok_or_else(|| FabricError::Shutdown.into())
    }
}

#[async_trait]
impl GatewayConnection for InProcessNetwork {
    async fn evaluate(&self, proposal: &SignedProposal) -> ProtocolResult<Vec<u8>> {
        self.ensure_running()?;
        let peer = self.peer_for(proposal.creator().msp_id())?;
        let response = peer.process(proposal);
        if response.is_success() {
            Ok(response.payload)
        } else {
            Err(ProtocolError::Rejected {
                message: format!("evaluate call to endorser returned error: {}", response.message),
                details: vec![peer.detail(&response)],
            })
        }
    }

    async fn endorse(&self, proposal: &SignedProposal) -> ProtocolResult<PreparedTransaction> {
        self.ensure_running()?;
        let responses: Vec<_> = self.peers.iter().map(|p| (p, p.process(proposal))).collect();

        let details: Vec<ErrorDetail> = responses
            .iter()
            .filter(|(_, r)| !r.is_success())
            .map(|(p, r)| p.detail(r))
            .collect();
        if !details.is_empty() {
            debug!(tx_id = %proposal.message.tx_id(), failed = details.len(), "endorsement failed");
            return Err(ProtocolError::Rejected {
                message: "failed to endorse transaction, see attached details for more info".into(),
                details,
            });
        }

        let Some((_, first)) = responses.first() else {
            return Err(ProtocolError::Unavailable("no peers".into()));
        };
        if responses
            .iter()
            .any(|(_, r)| r.payload != first.payload || r.rwset != first.rwset)
        {
            return Err(ProtocolError::rejected("proposal responses do not match"));
        }
        let result = first.payload.clone();
        let rwset = first.rwset.clone();

        Ok(PreparedTransaction {
            proposal: proposal.message.clone(),
            result,
            rwset,
            endorsements: responses
                .into_iter()
                .filter_map(|(_, r)| r.endorsement)
                .collect(),
        })
    }

    async fn submit(&self, envelope: &Envelope) -> ProtocolResult<()> {
        self.ensure_running()?;
        envelope
            .verify_by(envelope.creator())
            .map_err(|_| ProtocolError::rejected("envelope signature is invalid"))?;
        let queue = self.queue()?;
        queue
            .send(envelope.clone())
            .await
            .map_err(|_| ProtocolError::Unavailable("orderer has stopped".into()))?;
        debug!(tx_id = %envelope.tx_id(), "accepted for ordering");
        Ok(())
    }

    async fn commit_status(
        &self,
        request: &SignedCommitStatusRequest,
    ) -> ProtocolResult<CommitStatus> {
        self.ensure_running()?;
        request.verify_by(&request.message.identity)?;
        if request.message.channel != self.config.channel {
            return Err(ProtocolError::rejected(format!(
                "channel '{}' not found",
                request.message.channel
            )));
        }
        self.ledger.wait_for(request.message.tx_id).await
    }

    async fn shutdown(&self, grace: Duration) -> ProtocolResult<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        info!(?grace, "network shutting down");

        // Dropping the last sender lets the orderer flush and exit.
        drop(self.queue.lock().ok().and_then(|mut q| q.take()));
        let orderer = self.orderer.lock().ok().and_then(|mut o| o.take());
        if let Some(mut orderer) = orderer {
            match tokio::time::timeout(grace, &mut orderer).await {
                Ok(Ok(())) => debug!("orderer drained"),
                Ok(Err(e)) => warn!(error = %e, "orderer task failed"),
                Err(_) => {
                    warn!(?grace, "orderer did not drain in time, abandoning");
                    orderer.abort();
                }
            }
        }
        self.ledger.close();
        info!(height = self.ledger.height(), "network stopped");
        Ok(())
    }
}

impl std::fmt::Debug for InProcessNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessNetwork")
            .field("channel", &self.config.channel)
            .field("peers", &self.peers)
            .field("running", &self.is_running())
            .finish()
    }
}
