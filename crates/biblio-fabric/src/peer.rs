use std::sync::Arc;

use biblio_crypto::{Identity, SigningKey};
use biblio_ledger::{ContractError, ContractRegistry};
use biblio_protocol::{
    endorsement_message, Endorsement, ErrorDetail, ProposalResponse, SignedProposal, STATUS_ERROR,
    STATUS_OK,
};
use biblio_store::InMemoryRecordStore;
use biblio_types::{ReadWriteSet, TxId, TxIntent};
use tracing::debug;

use crate::simulation::SimulationStore;

/// An endorsing peer: simulates proposals against committed state and signs
/// the result.
pub struct Peer {
    endpoint: String,
    identity: Identity,
    key: SigningKey,
    channel: String,
    known_msps: Vec<String>,
    registry: Arc<ContractRegistry>,
    state: Arc<InMemoryRecordStore>,
}

impl Peer {
    pub(crate) fn new(
        msp_id: &str,
        channel: &str,
        known_msps: Vec<String>,
        registry: Arc<ContractRegistry>,
        state: Arc<InMemoryRecordStore>,
    ) -> Self {
        let key = SigningKey::generate();
        Self {
            endpoint: endpoint_for(msp_id),
            identity: Identity::from_verifying_key(msp_id, &key.verifying_key()),
            key,
            channel: channel.to_string(),
            known_msps,
            registry,
            state,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn msp_id(&self) -> &str {
        self.identity.msp_id()
    }

    /// Check and simulate a proposal. Never fails outright: every problem is
    /// reported as an error response.
    pub fn process(&self, signed: &SignedProposal) -> ProposalResponse {
        let proposal = &signed.message;
        let tx_id = proposal.tx_id();
        if let Err(message) = self.check(signed) {
            debug!(endpoint = %self.endpoint, %tx_id, %message, "proposal refused");
            return error_response(tx_id, message, Vec::new());
        }

        let sim = SimulationStore::new(&self.state);
        let result = self
            .registry
            .invoke(&sim, &proposal.function, &proposal.args);
        let rwset = sim.into_rwset();

        match (result, rwset) {
            (Ok(_), Ok(rwset)) if !rwset.is_read_only() && self.is_evaluate(&proposal.function) => {
                error_response(
                    tx_id,
                    format!("read-only transaction {} attempted to write", proposal.function),
                    Vec::new(),
                )
            }
            (Ok(payload), Ok(rwset)) => self.endorse(tx_id, payload, rwset),
            (Err(err), _) => {
                let payload = domain_payload(&err);
                error_response(tx_id, format!("chaincode response 500, {err}"), payload)
            }
            (_, Err(err)) => error_response(tx_id, err.to_string(), Vec::new()),
        }
    }

    /// Turn an error response into the detail the gateway reports.
    pub fn detail(&self, response: &ProposalResponse) -> ErrorDetail {
        ErrorDetail {
            endpoint: self.endpoint.clone(),
            msp_id: self.msp_id().to_string(),
            message: response.message.clone(),
            payload: response.payload.clone(),
        }
    }

    fn check(&self, signed: &SignedProposal) -> Result<(), String> {
        let header = &signed.message.header;
        if header.channel != self.channel {
            return Err(format!("channel '{}' not found", header.channel));
        }
        if header.chaincode != self.registry.contract_name() {
            return Err(format!("chaincode '{}' not installed", header.chaincode));
        }
        if !self.known_msps.iter().any(|m| m == header.creator.msp_id()) {
            return Err(format!(
                "access denied: unknown MSP '{}'",
                header.creator.msp_id()
            ));
        }
        signed
            .verify_by(&header.creator)
            .map_err(|_| "access denied: creator signature invalid".to_string())?;
        if signed.message.expected_tx_id() != header.tx_id {
            return Err(format!("invalid txID: {}", header.tx_id));
        }
        Ok(())
    }

    fn is_evaluate(&self, function: &str) -> bool {
        matches!(self.registry.intent_of(function), Ok(TxIntent::Evaluate))
    }

    fn endorse(&self, tx_id: TxId, payload: Vec<u8>, rwset: ReadWriteSet) -> ProposalResponse {
        match endorsement_message(&payload, &rwset) {
            Ok(message) => ProposalResponse {
                tx_id,
                status: STATUS_OK,
                message: String::new(),
                endorsement: Some(Endorsement {
                    endorser: self.identity.clone(),
                    signature: self.key.sign(&message),
                }),
                payload,
                rwset,
            },
            Err(err) => error_response(tx_id, err.to_string(), Vec::new()),
        }
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("endpoint", &self.endpoint)
            .field("msp_id", &self.msp_id())
            .finish()
    }
}

/// `Org1MSP` → `peer0.org1.example.com`.
fn endpoint_for(msp_id: &str) -> String {
    let org = msp_id.strip_suffix("MSP").unwrap_or(msp_id).to_lowercase();
    format!("peer0.{org}.example.com")
}

fn domain_payload(err: &ContractError) -> Vec<u8> {
    err.domain()
        .and_then(|d| d.to_payload().ok())
        .unwrap_or_default()
}

fn error_response(tx_id: TxId, message: String, payload: Vec<u8>) -> ProposalResponse {
    ProposalResponse {
        tx_id,
        status: STATUS_ERROR,
        message,
        payload,
        rwset: ReadWriteSet::default(),
        endorsement: None,
    }
}
