use biblio_protocol::ErrorDetail;
use biblio_types::{DomainError, TxId, ValidationCode};
use thiserror::Error;

/// Failures of a gateway call, classified by the pipeline stage that
/// produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// A read-only call was refused or failed on the peer.
    #[error("evaluation of transaction {tx_id} failed: {message}")]
    EvaluationFailed {
        tx_id: TxId,
        message: String,
        details: Vec<ErrorDetail>,
    },

    /// A required peer refused or failed to endorse. Never reached ordering.
    #[error("endorsement of transaction {tx_id} failed: {message}")]
    EndorsementFailed {
        tx_id: TxId,
        message: String,
        details: Vec<ErrorDetail>,
    },

    /// The endorsed transaction did not reach ordering.
    #[error("submission of transaction {tx_id} failed: {message}")]
    SubmissionFailed { tx_id: TxId, message: String },

    /// The outcome could not be determined. The transaction may or may not
    /// have committed.
    #[error("commit status of transaction {tx_id} is unknown: {message}")]
    CommitStatusUnknown { tx_id: TxId, message: String },

    /// Sequenced, then invalidated at commit.
    #[error("transaction {tx_id} failed to commit with status code {} ({})", .code.code(), .code.name())]
    CommitRejected { tx_id: TxId, code: ValidationCode },

    #[error("invalid gateway configuration: {0}")]
    InvalidConfig(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl GatewayError {
    /// Transaction id, when one had been allocated.
    pub fn tx_id(&self) -> Option<TxId> {
        match self {
            Self::EvaluationFailed { tx_id, .. }
            | Self::EndorsementFailed { tx_id, .. }
            | Self::SubmissionFailed { tx_id, .. }
            | Self::CommitStatusUnknown { tx_id, .. }
            | Self::CommitRejected { tx_id, .. } => Some(*tx_id),
            Self::InvalidConfig(_) | Self::Connection(_) | Self::Serialization(_) => None,
        }
    }

    /// Validation code of a rejected commit.
    pub fn code(&self) -> Option<ValidationCode> {
        match self {
            Self::CommitRejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Per-peer details of an evaluation or endorsement failure.
    pub fn details(&self) -> &[ErrorDetail] {
        match self {
            Self::EvaluationFailed { details, .. } | Self::EndorsementFailed { details, .. } => {
                details
            }
            _ => &[],
        }
    }

    /// The contract's domain error, if a peer reported one.
    pub fn domain_error(&self) -> Option<DomainError> {
        self.details().iter().find_map(ErrorDetail::domain_error)
    }

    /// `true` when the caller must reconcile by re-reading the ledger
    /// rather than treating the call as failed or succeeded.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::CommitStatusUnknown { .. })
    }

    /// `true` for commit-time read conflicts, which a caller may choose to
    /// retry with a fresh proposal.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self.code(),
            Some(ValidationCode::MvccReadConflict | ValidationCode::PhantomReadConflict)
        )
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
