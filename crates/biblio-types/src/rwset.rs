use serde::{Deserialize, Serialize};

use crate::tx::Version;

/// A key read during simulation, with the committed version observed.
/// `version` is `None` when the key was absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvRead {
    pub key: String,
    pub version: Option<Version>,
}

/// A key written during simulation. Deletes carry no value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvWrite {
    pub key: String,
    pub is_delete: bool,
    pub value: Option<Vec<u8>>,
}

impl KvWrite {
    pub fn put(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            is_delete: false,
            value: Some(value),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_delete: true,
            value: None,
        }
    }
}

/// A range scan performed during simulation and the keys it returned.
///
/// At commit time the range is re-executed; any difference in the returned
/// keys or their versions is a phantom read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeQueryInfo {
    pub start_key: String,
    pub end_key: String,
    pub reads: Vec<KvRead>,
}

/// Everything a simulated transaction read and intends to write.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadWriteSet {
    pub reads: Vec<KvRead>,
    pub range_queries: Vec<RangeQueryInfo>,
    pub writes: Vec<KvWrite>,
}

impl ReadWriteSet {
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}
