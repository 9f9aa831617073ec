use thiserror::Error;

use crate::message::ErrorDetail;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("{message}")]
    Rejected {
        message: String,
        details: Vec<ErrorDetail>,
    },

    #[error("signature verification failed")]
    BadSignature,

    #[error("commit event stream closed before the outcome was known")]
    Closed,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProtocolError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Per-endpoint details, empty unless the request was rejected.
    pub fn details(&self) -> &[ErrorDetail] {
        match self {
            Self::Rejected { details, .. } => details,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
