use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Transaction identifier.
///
/// A transaction id is a 32-byte digest of the proposal nonce and the
/// serialized creator identity. It is rendered and serialized as lowercase
/// hex, matching how the ledger reports it in history and commit status.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TxId([u8; 32]);

impl TxId {
    /// Create a `TxId` from a pre-computed digest.
    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    /// A random id, for local writes that never went through a proposal.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, for log lines.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", self.short_hex())
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<TxId> for String {
    fn from(id: TxId) -> Self {
        id.to_hex()
    }
}

impl TryFrom<String> for TxId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

/// Height at which a key was last written: block number, then position of
/// the transaction within that block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    pub block_num: u64,
    pub tx_num: u32,
}

impl Version {
    pub const fn new(block_num: u64, tx_num: u32) -> Self {
        Self { block_num, tx_num }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block_num, self.tx_num)
    }
}

/// Whether a contract operation reads state only or mutates it.
///
/// Evaluate operations run against a single peer and skip ordering.
/// Submit operations go through endorsement, ordering, and commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxIntent {
    Evaluate,
    Submit,
}

/// Final validation outcome assigned to a transaction at commit time.
///
/// Numeric values follow the platform's transaction validation codes so
/// that status codes surfaced to callers are recognizable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum ValidationCode {
    Valid = 0,
    BadPayload = 2,
    BadCreatorSignature = 4,
    BadProposalTxId = 8,
    DuplicateTxId = 9,
    EndorsementPolicyFailure = 10,
    MvccReadConflict = 11,
    PhantomReadConflict = 12,
    InvalidOtherReason = 255,
}

impl ValidationCode {
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::BadPayload => "BAD_PAYLOAD",
            Self::BadCreatorSignature => "BAD_CREATOR_SIGNATURE",
            Self::BadProposalTxId => "BAD_PROPOSAL_TXID",
            Self::DuplicateTxId => "DUPLICATE_TXID",
            Self::EndorsementPolicyFailure => "ENDORSEMENT_POLICY_FAILURE",
            Self::MvccReadConflict => "MVCC_READ_CONFLICT",
            Self::PhantomReadConflict => "PHANTOM_READ_CONFLICT",
            Self::InvalidOtherReason => "INVALID_OTHER_REASON",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

impl From<ValidationCode> for u8 {
    fn from(code: ValidationCode) -> Self {
        code.code()
    }
}

impl TryFrom<u8> for ValidationCode {
    type Error = TypeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Valid,
            2 => Self::BadPayload,
            4 => Self::BadCreatorSignature,
            8 => Self::BadProposalTxId,
            9 => Self::DuplicateTxId,
            10 => Self::EndorsementPolicyFailure,
            11 => Self::MvccReadConflict,
            12 => Self::PhantomReadConflict,
            255 => Self::InvalidOtherReason,
            other => return Err(TypeError::UnknownValidationCode(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_id_hex_roundtrip() {
        let id = TxId::from_digest([0xab; 32]);
        let parsed = TxId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn tx_id_serializes_as_hex_string() {
        let id = TxId::from_digest([1; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let back: TxId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn tx_id_rejects_short_hex() {
        let err = TxId::from_hex("abcd").unwrap_err();
        assert_eq!(err, TypeError::InvalidLength { expected: 32, actual: 2 });
    }

    #[test]
    fn random_ids_are_unique() {
        assert_ne!(TxId::random(), TxId::random());
    }

    #[test]
    fn version_ordering() {
        assert!(Version::new(1, 5) < Version::new(2, 0));
        assert!(Version::new(2, 0) < Version::new(2, 1));
    }

    #[test]
    fn validation_code_numbers() {
        assert_eq!(ValidationCode::Valid.code(), 0);
        assert_eq!(ValidationCode::MvccReadConflict.code(), 11);
        assert_eq!(ValidationCode::try_from(10).unwrap(), ValidationCode::EndorsementPolicyFailure);
        assert!(ValidationCode::try_from(77).is_err());
        assert!(ValidationCode::Valid.is_valid());
        assert!(!ValidationCode::DuplicateTxId.is_valid());
    }

    #[test]
    fn validation_code_display() {
        assert_eq!(ValidationCode::MvccReadConflict.to_string(), "MVCC_READ_CONFLICT (11)");
    }
}
