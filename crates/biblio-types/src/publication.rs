use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A publication record held in world state.
///
/// Identity is the `id` field, which doubles as the world-state key.
/// Equality is structural: two publications are equal when both `id` and
/// `title` match.
///
/// Field declaration order is the canonical JSON order. Encoding the same
/// record twice always yields byte-identical output, which keeps state
/// hashes reproducible across replicas.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Publication {
    id: String,
    title: String,
}

impl Publication {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Canonical JSON encoding used for persistence and return payloads.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Decode a publication from its JSON encoding.
    pub fn from_json(data: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(data).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

impl fmt::Debug for Publication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Publication({:?}, {:?})", self.id, self.title)
    }
}

impl fmt::Display for Publication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonical_json_field_order() {
        let p = Publication::new("publication1", "BiblioChain Thesis");
        let json = p.to_canonical_json().unwrap();
        assert_eq!(
            String::from_utf8(json).unwrap(),
            r#"{"id":"publication1","title":"BiblioChain Thesis"}"#
        );
    }

    #[test]
    fn equality_is_structural() {
        let a = Publication::new("1", "x");
        let b = Publication::new("1", "x");
        let c = Publication::new("1", "y");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = Publication::from_json(b"not json").unwrap_err();
        assert!(matches!(err, TypeError::Serialization(_)));
    }

    #[test]
    fn decode_accepts_reordered_fields() {
        let p = Publication::from_json(br#"{"title":"t","id":"i"}"#).unwrap();
        assert_eq!(p, Publication::new("i", "t"));
    }

    proptest! {
        #[test]
        fn encoding_is_deterministic(id in ".*", title in ".*") {
            let p = Publication::new(id, title);
            let first = p.to_canonical_json().unwrap();
            let second = p.clone().to_canonical_json().unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(Publication::from_json(&first).unwrap(), p);
        }
    }
}
