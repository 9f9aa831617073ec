use std::fmt;

use biblio_types::TxId;
use serde::{Deserialize, Serialize};

use crate::hasher::HashAlgorithm;
use crate::signer::{SignatureError, VerifyingKey};

/// Length in bytes of a proposal nonce.
pub const NONCE_LEN: usize = 24;

/// A client or peer identity: the owning organization plus credentials.
///
/// Credentials are the raw Ed25519 public key bytes; they stand in for the
/// certificate an organization's CA would issue.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    msp_id: String,
    #[serde(with = "hex_bytes")]
    credentials: Vec<u8>,
}

impl Identity {
    pub fn new(msp_id: impl Into<String>, credentials: Vec<u8>) -> Self {
        Self {
            msp_id: msp_id.into(),
            credentials,
        }
    }

    /// Identity whose credentials are the given public key.
    pub fn from_verifying_key(msp_id: impl Into<String>, key: &VerifyingKey) -> Self {
        Self::new(msp_id, key.as_bytes().to_vec())
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn credentials(&self) -> &[u8] {
        &self.credentials
    }

    /// Public key embedded in the credentials.
    pub fn verifying_key(&self) -> Result<VerifyingKey, SignatureError> {
        VerifyingKey::from_slice(&self.credentials)
    }

    /// Serialized creator bytes, as mixed into the transaction id.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.msp_id.len() + 1 + self.credentials.len());
        out.extend_from_slice(self.msp_id.as_bytes());
        out.push(0);
        out.extend_from_slice(&self.credentials);
        out
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = &self.credentials[..self.credentials.len().min(4)];
        write!(f, "Identity({}, {}...)", self.msp_id, hex::encode(prefix))
    }
}

/// Fresh random nonce for a proposal.
pub fn new_nonce() -> Vec<u8> {
    let mut nonce = vec![0u8; NONCE_LEN];
    rand::Rng::fill(&mut rand::thread_rng(), nonce.as_mut_slice());
    nonce
}

/// Transaction id = `hash(nonce || creator)`.
pub fn derive_tx_id(algorithm: HashAlgorithm, nonce: &[u8], creator: &Identity) -> TxId {
    TxId::from_digest(algorithm.digest_parts(&[nonce, &creator.to_bytes()]))
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
