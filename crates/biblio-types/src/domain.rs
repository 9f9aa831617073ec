use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Existence-invariant violations raised by the publication service.
///
/// These travel back to clients as the payload of a failed proposal
/// response, encoded as `{"code":"ALREADY_EXISTS","id":"..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "code", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainError {
    /// A create targeted a key that holds a live record.
    #[error("Publication {0} already exists")]
    AlreadyExists(String),

    /// An update or delete targeted a key with no live record.
    #[error("Publication {0} does not exist")]
    NotFound(String),
}

impl DomainError {
    /// The publication id the violation refers to.
    pub fn id(&self) -> &str {
        match self {
            Self::AlreadyExists(id) | Self::NotFound(id) => id,
        }
    }

    /// Stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::NotFound(_) => "NOT_FOUND",
        }
    }

    pub fn to_payload(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Recover a domain error from an error payload. Returns `None` when the
    /// payload is not a domain error encoding.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        serde_json::from_slice(payload).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_shape() {
        let payload = DomainError::AlreadyExists("p1".into()).to_payload().unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            r#"{"code":"ALREADY_EXISTS","id":"p1"}"#
        );
    }

    #[test]
    fn payload_roundtrip() {
        let err = DomainError::NotFound("p9".into());
        let decoded = DomainError::from_payload(&err.to_payload().unwrap()).unwrap();
        assert_eq!(decoded, err);
        assert_eq!(decoded.code(), "NOT_FOUND");
        assert_eq!(decoded.id(), "p9");
    }

    #[test]
    fn unrelated_payload_is_not_domain_error() {
        assert!(DomainError::from_payload(b"boom").is_none());
        assert!(DomainError::from_payload(b"").is_none());
    }

    #[test]
    fn messages_match_service_wording() {
        assert_eq!(
            DomainError::AlreadyExists("x".into()).to_string(),
            "Publication x already exists"
        );
        assert_eq!(
            DomainError::NotFound("x".into()).to_string(),
            "Publication x does not exist"
        );
    }
}
