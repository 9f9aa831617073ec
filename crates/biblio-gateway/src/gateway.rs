use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use biblio_crypto::{derive_tx_id, new_nonce, HashAlgorithm, Identity, SigningKey};
use biblio_protocol::{
    CommitStatus, CommitStatusRequest, Envelope, ErrorDetail, GatewayConnection,
    Proposal as ProposalMessage, ProposalHeader, ProtocolError, Signed, SignedProposal,
};
use biblio_types::TxId;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{GatewayConfig, Timeouts};
use crate::error::{GatewayError, GatewayResult};

/// A client identity bound to a connection.
///
/// Cheap to clone; every clone shares the same connection.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<Inner>,
}

struct Inner {
    identity: Identity,
    signer: SigningKey,
    hash: HashAlgorithm,
    timeouts: Timeouts,
    connection: Arc<dyn GatewayConnection>,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::default()
    }

    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.inner.hash
    }

    pub fn timeouts(&self) -> Timeouts {
        self.inner.timeouts
    }

    pub fn network(&self, name: impl Into<String>) -> Network {
        Network {
            gateway: self.clone(),
            name: name.into(),
        }
    }

    /// Shut the underlying connection down, waiting at most `grace` for
    /// in-flight work.
    pub async fn close(&self, grace: Duration) -> GatewayResult<()> {
        debug!(grace_ms = grace.as_millis() as u64, "closing gateway connection");
        self.inner
            .connection
            .shutdown(grace)
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))
    }

    fn sign<T: Serialize>(&self, message: T) -> GatewayResult<Signed<T>> {
        Signed::sign(message, &self.inner.signer)
            .map_err(|e| GatewayError::Serialization(e.to_string()))
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("identity", &self.inner.identity)
            .field("hash", &self.inner.hash)
            .field("timeouts", &self.inner.timeouts)
            .finish()
    }
}

#[derive(Default)]
pub struct GatewayBuilder {
    identity: Option<Identity>,
    signer: Option<SigningKey>,
    hash: HashAlgorithm,
    timeouts: Timeouts,
    connection: Option<Arc<dyn GatewayConnection>>,
}

impl GatewayBuilder {
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn signer(mut self, signer: SigningKey) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn hash(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash = algorithm;
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Take the hash algorithm and timeouts from `config`.
    pub fn config(self, config: &GatewayConfig) -> Self {
        self.hash(config.hash_algorithm).timeouts(config.timeouts)
    }

    pub fn connection(mut self, connection: Arc<dyn GatewayConnection>) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Finish the gateway. The signer must hold the private half of the
    /// identity's key.
    pub fn connect(self) -> GatewayResult<Gateway> {
        let identity = self
            .identity
            .ok_or_else(|| GatewayError::InvalidConfig("identity is required".into()))?;
        let signer = self
            .signer
            .ok_or_else(|| GatewayError::InvalidConfig("signer is required".into()))?;
        let connection = self
            .connection
            .ok_or_else(|| GatewayError::InvalidConfig("connection is required".into()))?;

        let public = identity.verifying_key().ok().map(|k| k.as_bytes());
        if public != Some(signer.verifying_key().as_bytes()) {
            return Err(GatewayError::InvalidConfig(format!(
                "signer does not match identity of {}",
                identity.msp_id()
            )));
        }

        Ok(Gateway {
            inner: Arc::new(Inner {
                identity,
                signer,
                hash: self.hash,
                timeouts: self.timeouts,
                connection,
            }),
        })
    }
}

/// A channel reached through a gateway.
#[derive(Clone, Debug)]
pub struct Network {
    gateway: Gateway,
    name: String,
}

impl Network {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contract(&self, chaincode: impl Into<String>) -> Contract {
        Contract {
            gateway: self.gateway.clone(),
            channel: self.name.clone(),
            chaincode: chaincode.into(),
        }
    }
}

/// A deployed contract on one channel.
#[derive(Clone, Debug)]
pub struct Contract {
    gateway: Gateway,
    channel: String,
    chaincode: String,
}

impl Contract {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn chaincode(&self) -> &str {
        &self.chaincode
    }

    pub fn new_proposal(&self, function: impl Into<String>) -> ProposalBuilder {
        ProposalBuilder {
            contract: self.clone(),
            function: function.into(),
            args: Vec::new(),
        }
    }

    /// Run a read-only call on one peer. Nothing is ordered or committed.
    pub async fn evaluate_transaction(&self, function: &str, args: &[&str]) -> GatewayResult<Vec<u8>> {
        self.new_proposal(function)
            .add_arguments(args)
            .build()?
            .evaluate()
            .await
    }

    /// Endorse, submit and wait for commit. Returns the endorsed result
    /// only once the transaction committed as valid.
    pub async fn submit_transaction(&self, function: &str, args: &[&str]) -> GatewayResult<Vec<u8>> {
        self.submit_async(function, args)
            .await?
            .committed_result()
            .await
    }

    /// Endorse and submit without waiting for commit.
    pub async fn submit_async(
        &self,
        function: &str,
        args: &[&str],
    ) -> GatewayResult<SubmittedTransaction> {
        self.new_proposal(function)
            .add_arguments(args)
            .build()?
            .endorse()
            .await?
            .submit()
            .await
    }
}

#[derive(Debug)]
pub struct ProposalBuilder {
    contract: Contract,
    function: String,
    args: Vec<String>,
}

impl ProposalBuilder {
    pub fn add_argument(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn add_arguments(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|a| a.to_string()));
        self
    }

    /// Allocate a transaction id and sign the proposal.
    pub fn build(self) -> GatewayResult<Proposal> {
        let gateway = &self.contract.gateway;
        let identity = gateway.identity().clone();
        let hash = gateway.hash_algorithm();
        let nonce = new_nonce();
        let tx_id = derive_tx_id(hash, &nonce, &identity);

        let message = ProposalMessage {
            header: ProposalHeader {
                tx_id,
                channel: self.contract.channel.clone(),
                chaincode: self.contract.chaincode.clone(),
                creator: identity,
                nonce,
                hash_algorithm: hash,
                timestamp: Utc::now(),
            },
            function: self.function,
            args: self.args,
        };
        let signed = gateway.sign(message)?;
        debug!(%tx_id, function = %signed.message.function, "proposal built");
        Ok(Proposal {
            contract: self.contract,
            signed,
        })
    }
}

/// A signed proposal with its transaction id fixed.
#[derive(Debug)]
pub struct Proposal {
    contract: Contract,
    signed: SignedProposal,
}

impl Proposal {
    pub fn tx_id(&self) -> TxId {
        self.signed.message.tx_id()
    }

    pub fn function(&self) -> &str {
        &self.signed.message.function
    }

    pub fn args(&self) -> &[String] {
        &self.signed.message.args
    }

    pub async fn evaluate(&self) -> GatewayResult<Vec<u8>> {
        let tx_id = self.tx_id();
        let gateway = &self.contract.gateway.inner;
        let limit = gateway.timeouts.evaluate();
        match timeout(limit, gateway.connection.evaluate(&self.signed)).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(err)) => {
                let (message, details) = split(err);
                Err(GatewayError::EvaluationFailed {
                    tx_id,
                    message,
                    details,
                })
            }
            Err(_) => Err(GatewayError::EvaluationFailed {
                tx_id,
                message: timed_out(limit),
                details: Vec::new(),
            }),
        }
    }

    /// Collect endorsements and sign the resulting transaction.
    pub async fn endorse(self) -> GatewayResult<Transaction> {
        let tx_id = self.tx_id();
        let gateway = &self.contract.gateway.inner;
        let limit = gateway.timeouts.endorse();
        let prepared = match timeout(limit, gateway.connection.endorse(&self.signed)).await {
            Ok(Ok(prepared)) => prepared,
            Ok(Err(err)) => {
                let (message, details) = split(err);
                return Err(GatewayError::EndorsementFailed {
                    tx_id,
                    message,
                    details,
                });
            }
            Err(_) => {
                return Err(GatewayError::EndorsementFailed {
                    tx_id,
                    message: timed_out(limit),
                    details: Vec::new(),
                })
            }
        };
        if prepared.tx_id() != tx_id {
            return Err(GatewayError::EndorsementFailed {
                tx_id,
                message: format!("endorsed transaction id {} does not match", prepared.tx_id()),
                details: Vec::new(),
            });
        }

        debug!(%tx_id, endorsements = prepared.endorsements.len(), "endorsed");
        let envelope = self.contract.gateway.sign(prepared)?;
        Ok(Transaction {
            contract: self.contract,
            envelope,
        })
    }
}

/// An endorsed, client-signed transaction not yet sent for ordering.
#[derive(Debug)]
pub struct Transaction {
    contract: Contract,
    envelope: Envelope,
}

impl Transaction {
    pub fn tx_id(&self) -> TxId {
        self.envelope.tx_id()
    }

    /// The endorsed result. Not durable until the transaction commits.
    pub fn result(&self) -> &[u8] {
        &self.envelope.message.result
    }

    pub async fn submit(self) -> GatewayResult<SubmittedTransaction> {
        let tx_id = self.tx_id();
        let gateway = &self.contract.gateway.inner;
        let limit = gateway.timeouts.submit();
        match timeout(limit, gateway.connection.submit(&self.envelope)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                return Err(GatewayError::SubmissionFailed {
                    tx_id,
                    message: err.to_string(),
                })
            }
            Err(_) => {
                return Err(GatewayError::SubmissionFailed {
                    tx_id,
                    message: timed_out(limit),
                })
            }
        }
        debug!(%tx_id, "submitted for ordering");
        Ok(SubmittedTransaction {
            contract: self.contract,
            tx_id,
            result: self.envelope.message.result,
            status: OnceCell::new(),
        })
    }
}

/// Handle to a transaction accepted for ordering.
///
/// [`result`](Self::result) is available at once but only trustworthy
/// after [`status`](Self::status) reports a valid commit;
/// [`committed_result`](Self::committed_result) enforces that.
#[derive(Debug)]
pub struct SubmittedTransaction {
    contract: Contract,
    tx_id: TxId,
    result: Vec<u8>,
    status: OnceCell<CommitStatus>,
}

impl SubmittedTransaction {
    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    pub fn result(&self) -> &[u8] {
        &self.result
    }

    /// Wait for the final outcome. A definitive answer is cached; a failed
    /// or timed-out wait can be retried.
    pub async fn status(&self) -> GatewayResult<CommitStatus> {
        self.status
            .get_or_try_init(|| self.fetch_status())
            .await
            .copied()
    }

    /// The result, or [`GatewayError::CommitRejected`] when the
    /// transaction was invalidated.
    pub async fn committed_result(&self) -> GatewayResult<Vec<u8>> {
        let status = self.status().await?;
        if !status.is_successful() {
            return Err(GatewayError::CommitRejected {
                tx_id: self.tx_id,
                code: status.code,
            });
        }
        Ok(self.result.clone())
    }

    async fn fetch_status(&self) -> GatewayResult<CommitStatus> {
        let tx_id = self.tx_id;
        let gateway = &self.contract.gateway;
        let request = gateway.sign(CommitStatusRequest {
            tx_id,
            channel: self.contract.channel.clone(),
            identity: gateway.identity().clone(),
        })?;
        let limit = gateway.inner.timeouts.commit_status();
        let status = match timeout(limit, gateway.inner.connection.commit_status(&request)).await {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                return Err(GatewayError::CommitStatusUnknown {
                    tx_id,
                    message: err.to_string(),
                })
            }
            Err(_) => {
                return Err(GatewayError::CommitStatusUnknown {
                    tx_id,
                    message: timed_out(limit),
                })
            }
        };

        if status.is_successful() {
            info!(%tx_id, block = status.block_number, "transaction committed");
        } else {
            warn!(
                %tx_id,
                block = status.block_number,
                code = status.code.name(),
                "transaction invalidated"
            );
        }
        Ok(status)
    }
}

fn split(err: ProtocolError) -> (String, Vec<ErrorDetail>) {
    match err {
        ProtocolError::Rejected { message, details } => (message, details),
        other => (other.to_string(), Vec::new()),
    }
}

fn timed_out(limit: Duration) -> String {
    format!("timed out after {}ms", limit.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{gateway, Calls, ScriptedConnection, Step};
    use biblio_types::{DomainError, ValidationCode};

    fn setup(conn: ScriptedConnection) -> (Contract, Arc<ScriptedConnection>) {
        let conn = Arc::new(conn);
        let contract = gateway(conn.clone()).network("mychannel").contract("basic");
        (contract, conn)
    }

    fn domain_detail(err: DomainError) -> ErrorDetail {
        ErrorDetail {
            endpoint: "peer0.org1.example.com".into(),
            msp_id: "Org1MSP".into(),
            message: format!("chaincode response 500, {err}"),
            payload: err.to_payload().unwrap(),
        }
    }

    #[test]
    fn builder_requires_matching_signer() {
        let key = SigningKey::generate();
        let other = SigningKey::generate();
        let identity = Identity::from_verifying_key("Org1MSP", &other.verifying_key());
        let err = Gateway::builder()
            .identity(identity)
            .signer(key)
            .connection(Arc::new(ScriptedConnection::default()))
            .connect()
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidConfig(m) if m.contains("does not match")));

        let err = Gateway::builder().connect().unwrap_err();
        assert_eq!(err, GatewayError::InvalidConfig("identity is required".into()));
    }

    #[test]
    fn builder_takes_config_values() {
        let key = SigningKey::generate();
        let identity = Identity::from_verifying_key("Org1MSP", &key.verifying_key());
        let config = GatewayConfig {
            hash_algorithm: HashAlgorithm::Blake3,
            ..GatewayConfig::default()
        };
        let gw = Gateway::builder()
            .identity(identity)
            .signer(key)
            .config(&config)
            .connection(Arc::new(ScriptedConnection::default()))
            .connect()
            .unwrap();
        assert_eq!(gw.hash_algorithm(), HashAlgorithm::Blake3);
        assert_eq!(gw.timeouts(), config.timeouts);
    }

    #[test]
    fn proposal_carries_addressing_and_derived_tx_id() {
        let (contract, _) = setup(ScriptedConnection::default());
        let proposal = contract
            .new_proposal("createPublication")
            .add_argument("p1")
            .add_argument("Title")
            .build()
            .unwrap();
        assert_eq!(proposal.function(), "createPublication");
        assert_eq!(proposal.args(), ["p1", "Title"]);
        let header = &proposal.signed.message.header;
        assert_eq!(header.channel, "mychannel");
        assert_eq!(header.chaincode, "basic");
        assert_eq!(proposal.signed.message.expected_tx_id(), proposal.tx_id());
        proposal.signed.verify_by(&header.creator).unwrap();

        let again = contract.new_proposal("createPublication").build().unwrap();
        assert_ne!(again.tx_id(), proposal.tx_id());
    }

    #[tokio::test]
    async fn evaluate_returns_payload_without_ordering() {
        let (contract, conn) = setup(ScriptedConnection {
            evaluate: Step::Reply(b"true".to_vec()),
            ..Default::default()
        });
        let payload = contract
            .evaluate_transaction("existsById", &["publication1"])
            .await
            .unwrap();
        assert_eq!(payload, b"true");
        assert_eq!(Calls::get(&conn.calls.evaluate), 1);
        assert_eq!(Calls::get(&conn.calls.submit), 0);
        let seen = conn.last_proposal.lock().unwrap().clone().unwrap();
        assert_eq!(seen.message.args, vec!["publication1".to_string()]);
    }

    #[tokio::test]
    async fn evaluate_failure_keeps_details() {
        let (contract, _) = setup(ScriptedConnection {
            evaluate: Step::Fail(ProtocolError::Rejected {
                message: "evaluate call to endorser returned error".into(),
                details: vec![domain_detail(DomainError::NotFound("ghost".into()))],
            }),
            ..Default::default()
        });
        let err = contract
            .evaluate_transaction("getHistory", &["ghost"])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::EvaluationFailed { .. }));
        assert!(err.tx_id().is_some());
        assert_eq!(err.domain_error(), Some(DomainError::NotFound("ghost".into())));
    }

    #[tokio::test]
    async fn evaluate_times_out() {
        let (contract, _) = setup(ScriptedConnection {
            evaluate: Step::Hang,
            ..Default::default()
        });
        let err = contract.evaluate_transaction("getAll", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::EvaluationFailed { ref message, .. } if message.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn submit_waits_for_valid_commit() {
        let (contract, conn) = setup(ScriptedConnection {
            endorse: Step::Reply(br#"{"id":"p1","title":"T"}"#.to_vec()),
            ..Default::default()
        });
        let result = contract
            .submit_transaction("createPublication", &["p1", "T"])
            .await
            .unwrap();
        assert_eq!(result, br#"{"id":"p1","title":"T"}"#);
        assert_eq!(Calls::get(&conn.calls.endorse), 1);
        assert_eq!(Calls::get(&conn.calls.submit), 1);
        assert_eq!(Calls::get(&conn.calls.commit), 1);
    }

    #[tokio::test]
    async fn endorsement_failure_never_submits() {
        let domain = DomainError::AlreadyExists("p1".into());
        let (contract, conn) = setup(ScriptedConnection {
            endorse: Step::Fail(ProtocolError::Rejected {
                message: "failed to endorse transaction".into(),
                details: vec![domain_detail(domain.clone())],
            }),
            ..Default::default()
        });
        let err = contract
            .submit_transaction("createPublication", &["p1", "T"])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::EndorsementFailed { .. }));
        assert_eq!(err.domain_error(), Some(domain));
        assert_eq!(err.details().len(), 1);
        assert_eq!(Calls::get(&conn.calls.submit), 0);
        assert_eq!(Calls::get(&conn.calls.commit), 0);
    }

    #[tokio::test]
    async fn submission_failure_is_classified() {
        let (contract, conn) = setup(ScriptedConnection {
            submit: Step::Fail(ProtocolError::Unavailable("orderer has stopped".into())),
            ..Default::default()
        });
        let err = contract
            .submit_transaction("deletePublication", &["p1"])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::SubmissionFailed { ref message, .. } if message.contains("orderer has stopped")
        ));
        assert_eq!(Calls::get(&conn.calls.commit), 0);
    }

    #[tokio::test]
    async fn invalidated_commit_reports_code() {
        let (contract, _) = setup(ScriptedConnection {
            commit: Step::Reply(ValidationCode::MvccReadConflict),
            ..Default::default()
        });
        let err = contract
            .submit_transaction("updatePublication", &["p1", "T"])
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ValidationCode::MvccReadConflict));
        assert!(err.is_conflict());
        assert!(err.to_string().contains("status code 11"));
    }

    #[tokio::test]
    async fn unknown_commit_status_is_indeterminate() {
        let (contract, _) = setup(ScriptedConnection {
            commit: Step::Fail(ProtocolError::Closed),
            ..Default::default()
        });
        let err = contract
            .submit_transaction("createPublication", &["p1", "T"])
            .await
            .unwrap_err();
        assert!(err.is_indeterminate());

        let (contract, _) = setup(ScriptedConnection {
            commit: Step::Hang,
            ..Default::default()
        });
        let err = contract
            .submit_transaction("createPublication", &["p1", "T"])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::CommitStatusUnknown { ref message, .. } if message.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn async_result_is_available_before_status() {
        let (contract, conn) = setup(ScriptedConnection {
            endorse: Step::Reply(b"payload".to_vec()),
            commit: Step::Reply(ValidationCode::EndorsementPolicyFailure),
            ..Default::default()
        });
        let submitted = contract
            .submit_async("updatePublication", &["p1", "T"])
            .await
            .unwrap();
        assert_eq!(submitted.result(), b"payload");
        assert_eq!(Calls::get(&conn.calls.commit), 0);

        let status = submitted.status().await.unwrap();
        assert!(!status.is_successful());
        assert_eq!(status.tx_id, submitted.tx_id());
        // Cached after the first definitive answer.
        submitted.status().await.unwrap();
        assert_eq!(Calls::get(&conn.calls.commit), 1);

        let err = submitted.committed_result().await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::CommitRejected {
                tx_id: submitted.tx_id(),
                code: ValidationCode::EndorsementPolicyFailure,
            }
        );
    }

    #[tokio::test]
    async fn step_by_step_flow() {
        let (contract, _) = setup(ScriptedConnection {
            endorse: Step::Reply(b"ok".to_vec()),
            ..Default::default()
        });
        let proposal = contract.new_proposal("initLedger").build().unwrap();
        let tx_id = proposal.tx_id();
        let transaction = proposal.endorse().await.unwrap();
        assert_eq!(transaction.tx_id(), tx_id);
        assert_eq!(transaction.result(), b"ok");
        let submitted = transaction.submit().await.unwrap();
        assert!(submitted.status().await.unwrap().is_successful());
        assert_eq!(submitted.committed_result().await.unwrap(), b"ok");
    }

    #[tokio::test]
    async fn close_delegates_to_connection() {
        let conn = Arc::new(ScriptedConnection::default());
        let gw = gateway(conn.clone());
        gw.close(Duration::from_secs(5)).await.unwrap();
        assert_eq!(Calls::get(&conn.calls.shutdown), 1);
    }
}
