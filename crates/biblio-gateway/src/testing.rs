//! Scripted connection double for driving the gateway through each
//! failure stage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use biblio_crypto::{Identity, SigningKey};
use biblio_protocol::{
    CommitStatus, Envelope, GatewayConnection, PreparedTransaction, ProtocolError,
    ProtocolResult, SignedCommitStatusRequest, SignedProposal,
};
use biblio_types::{ReadWriteSet, ValidationCode};

use crate::config::Timeouts;
use crate::gateway::Gateway;

#[derive(Clone, Debug)]
pub(crate) enum Step<T> {
    Reply(T),
    Fail(ProtocolError),
    Hang,
}

impl<T: Clone> Step<T> {
    async fn play(&self) -> ProtocolResult<T> {
        match self {
            Step::Reply(value) => Ok(value.clone()),
            Step::Fail(err) => Err(err.clone()),
            Step::Hang => std::future::pending().await,
        }
    }
}

/// Every stage answers with its scripted step; calls are counted.
pub(crate) struct ScriptedConnection {
    pub evaluate: Step<Vec<u8>>,
    /// The payload endorsed into the prepared transaction.
    pub endorse: Step<Vec<u8>>,
    pub submit: Step<()>,
    pub commit: Step<ValidationCode>,
    pub calls: Calls,
    pub last_proposal: Mutex<Option<SignedProposal>>,
}

#[derive(Default)]
pub(crate) struct Calls {
    pub evaluate: AtomicUsize,
    pub endorse: AtomicUsize,
    pub submit: AtomicUsize,
    pub commit: AtomicUsize,
    pub shutdown: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedConnection {
    fn default() -> Self {
        Self {
            evaluate: Step::Reply(b"[]".to_vec()),
            endorse: Step::Reply(b"{}".to_vec()),
            submit: Step::Reply(()),
            commit: Step::Reply(ValidationCode::Valid),
            calls: Calls::default(),
            last_proposal: Mutex::new(None),
        }
    }
}

#[async_trait]
impl GatewayConnection for ScriptedConnection {
    async fn evaluate(&self, proposal: &SignedProposal) -> ProtocolResult<Vec<u8>> {
        self.calls.evaluate.fetch_add(1, Ordering::SeqCst);
        *self.last_proposal.lock().expect("lock") = Some(proposal.clone());
        self.evaluate.play().await
    }

    async fn endorse(&self, proposal: &SignedProposal) -> ProtocolResult<PreparedTransaction> {
        self.calls.endorse.fetch_add(1, Ordering::SeqCst);
        *self.last_proposal.lock().expect("lock") = Some(proposal.clone());
        let result = self.endorse.play().await?;
        Ok(PreparedTransaction {
            proposal: proposal.message.clone(),
            result,
            rwset: ReadWriteSet::default(),
            endorsements: Vec::new(),
        })
    }

    async fn submit(&self, envelope: &Envelope) -> ProtocolResult<()> {
        self.calls.submit.fetch_add(1, Ordering::SeqCst);
        envelope.verify_by(envelope.creator())?;
        self.submit.play().await
    }

    async fn commit_status(
        &self,
        request: &SignedCommitStatusRequest,
    ) -> ProtocolResult<CommitStatus> {
        self.calls.commit.fetch_add(1, Ordering::SeqCst);
        request.verify_by(&request.message.identity)?;
        let code = self.commit.play().await?;
        Ok(CommitStatus {
            tx_id: request.message.tx_id,
            code,
            block_number: 1,
        })
    }

    async fn shutdown(&self, _grace: Duration) -> ProtocolResult<()> {
        self.calls.shutdown.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) fn short_timeouts() -> Timeouts {
    Timeouts {
        evaluate_ms: 50,
        endorse_ms: 50,
        submit_ms: 50,
        commit_status_ms: 50,
    }
}

/// Gateway for `Org1MSP` over `connection`.
pub(crate) fn gateway(connection: Arc<dyn GatewayConnection>) -> Gateway {
    let key = SigningKey::generate();
    let identity = Identity::from_verifying_key("Org1MSP", &key.verifying_key());
    Gateway::builder()
        .identity(identity)
        .signer(key)
        .timeouts(short_timeouts())
        .connection(connection)
        .connect()
        .expect("gateway connects")
}
