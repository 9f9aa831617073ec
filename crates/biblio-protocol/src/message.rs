use biblio_crypto::{HashAlgorithm, Identity, Signature, SigningKey, VerifyingKey};
use biblio_types::{DomainError, ReadWriteSet, TxId, ValidationCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};

pub const PROTOCOL_VERSION: u32 = 1;

/// Status of a proposal response from a single peer.
pub const STATUS_OK: u16 = 200;
pub const STATUS_ERROR: u16 = 500;

/// Canonical bytes of a protocol message, as signed and hashed.
pub fn canonical_bytes<T: Serialize>(value: &T) -> ProtocolResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Addressing and attribution common to every proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalHeader {
    pub tx_id: TxId,
    pub channel: String,
    pub chaincode: String,
    pub creator: Identity,
    pub nonce: Vec<u8>,
    pub hash_algorithm: HashAlgorithm,
    pub timestamp: DateTime<Utc>,
}

/// A transaction invocation: contract function plus positional arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub header: ProposalHeader,
    pub function: String,
    pub args: Vec<String>,
}

impl Proposal {
    pub fn tx_id(&self) -> TxId {
        self.header.tx_id
    }

    /// Recompute the transaction id from nonce and creator.
    pub fn expected_tx_id(&self) -> TxId {
        biblio_crypto::derive_tx_id(
            self.header.hash_algorithm,
            &self.header.nonce,
            &self.header.creator,
        )
    }
}

/// A peer's signature over `payload || rwset`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    pub endorser: Identity,
    pub signature: Signature,
}

/// Bytes an endorser signs for a simulation result.
pub fn endorsement_message(payload: &[u8], rwset: &ReadWriteSet) -> ProtocolResult<Vec<u8>> {
    let mut message = payload.to_vec();
    message.extend_from_slice(&canonical_bytes(rwset)?);
    Ok(message)
}

/// One peer's answer to a proposal.
///
/// On success `payload` is the function's return value. On failure it is
/// the serialized [`DomainError`] when the contract raised one, and empty
/// otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResponse {
    pub tx_id: TxId,
    pub status: u16,
    pub message: String,
    pub payload: Vec<u8>,
    pub rwset: ReadWriteSet,
    pub endorsement: Option<Endorsement>,
}

impl ProposalResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Why a particular endpoint refused a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub endpoint: String,
    pub msp_id: String,
    pub message: String,
    pub payload: Vec<u8>,
}

impl ErrorDetail {
    pub fn domain_error(&self) -> Option<DomainError> {
        DomainError::from_payload(&self.payload)
    }
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.endpoint, self.msp_id, self.message)
    }
}

/// An endorsed transaction, ready for the client to sign and submit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedTransaction {
    pub proposal: Proposal,
    pub result: Vec<u8>,
    pub rwset: ReadWriteSet,
    pub endorsements: Vec<Endorsement>,
}

impl PreparedTransaction {
    pub fn tx_id(&self) -> TxId {
        self.proposal.tx_id()
    }
}

/// Request for the final outcome of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatusRequest {
    pub tx_id: TxId,
    pub channel: String,
    pub identity: Identity,
}

/// Final outcome of a committed transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub tx_id: TxId,
    pub code: ValidationCode,
    pub block_number: u64,
}

impl CommitStatus {
    pub fn is_successful(&self) -> bool {
        self.code.is_valid()
    }
}

/// A message together with its signer's signature over the canonical bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signed<T> {
    pub message: T,
    pub signature: Signature,
}

impl<T: Serialize> Signed<T> {
    pub fn sign(message: T, key: &SigningKey) -> ProtocolResult<Self> {
        let signature = key.sign(&canonical_bytes(&message)?);
        Ok(Self { message, signature })
    }

    pub fn verify(&self, key: &VerifyingKey) -> ProtocolResult<()> {
        key.verify(&canonical_bytes(&self.message)?, &self.signature)
            .map_err(|_| ProtocolError::BadSignature)
    }

    /// Verify against the public key carried in `identity`.
    pub fn verify_by(&self, identity: &Identity) -> ProtocolResult<()> {
        let key = identity
            .verifying_key()
            .map_err(|_| ProtocolError::BadSignature)?;
        self.verify(&key)
    }
}

pub type SignedProposal = Signed<Proposal>;
pub type Envelope = Signed<PreparedTransaction>;
pub type SignedCommitStatusRequest = Signed<CommitStatusRequest>;

impl SignedProposal {
    pub fn creator(&self) -> &Identity {
        &self.message.header.creator
    }
}

impl Envelope {
    pub fn tx_id(&self) -> TxId {
        self.message.tx_id()
    }

    pub fn creator(&self) -> &Identity {
        &self.message.proposal.header.creator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_crypto::new_nonce;

    fn proposal(key: &SigningKey) -> Proposal {
        let creator = Identity::from_verifying_key("Org1MSP", &key.verifying_key());
        let nonce = new_nonce();
        let tx_id = biblio_crypto::derive_tx_id(HashAlgorithm::Sha256, &nonce, &creator);
        Proposal {
            header: ProposalHeader {
                tx_id,
                channel: "mychannel".into(),
                chaincode: "basic".into(),
                creator,
                nonce,
                hash_algorithm: HashAlgorithm::Sha256,
                timestamp: Utc::now(),
            },
            function: "existsById".into(),
            args: vec!["publication1".into()],
        }
    }

    #[test]
    fn signed_proposal_verifies_against_creator() {
        let key = SigningKey::generate();
        let signed = Signed::sign(proposal(&key), &key).unwrap();
        signed.verify_by(signed.creator()).unwrap();
        assert_eq!(signed.message.expected_tx_id(), signed.message.tx_id());
    }

    #[test]
    fn tampering_breaks_signature() {
        let key = SigningKey::generate();
        let mut signed = Signed::sign(proposal(&key), &key).unwrap();
        signed.message.args[0] = "publication2".into();
        assert_eq!(
            signed.verify_by(&signed.message.header.creator.clone()),
            Err(ProtocolError::BadSignature)
        );
    }

    #[test]
    fn foreign_key_is_rejected() {
        let key = SigningKey::generate();
        let signed = Signed::sign(proposal(&key), &key).unwrap();
        let other = SigningKey::generate().verifying_key();
        assert!(signed.verify(&other).is_err());
    }

    #[test]
    fn forged_tx_id_is_detectable() {
        let key = SigningKey::generate();
        let mut p = proposal(&key);
        p.header.tx_id = TxId::from_digest([0; 32]);
        assert_ne!(p.expected_tx_id(), p.tx_id());
    }

    #[test]
    fn endorsement_message_covers_payload_and_rwset() {
        let rwset = ReadWriteSet::default();
        let mut other = ReadWriteSet::default();
        other.writes.push(biblio_types::KvWrite::delete("k"));
        let a = endorsement_message(b"p", &rwset).unwrap();
        assert!(a.starts_with(b"p"));
        assert_ne!(a, endorsement_message(b"q", &rwset).unwrap());
        assert_ne!(a, endorsement_message(b"p", &other).unwrap());
    }

    #[test]
    fn error_detail_recovers_domain_error() {
        let err = DomainError::AlreadyExists("p3".into());
        let detail = ErrorDetail {
            endpoint: "peer0.org1".into(),
            msp_id: "Org1MSP".into(),
            message: err.to_string(),
            payload: err.to_payload().unwrap(),
        };
        assert_eq!(detail.domain_error(), Some(err));
        assert_eq!(
            detail.to_string(),
            "peer0.org1 (Org1MSP): Publication p3 already exists"
        );
    }

    #[test]
    fn commit_status_success_follows_code() {
        let ok = CommitStatus {
            tx_id: TxId::from_digest([1; 32]),
            code: ValidationCode::Valid,
            block_number: 3,
        };
        let conflict = CommitStatus {
            code: ValidationCode::MvccReadConflict,
            ..ok
        };
        assert!(ok.is_successful());
        assert!(!conflict.is_successful());
    }
}
