use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tx::TxId;

/// One committed mutation of a key, as recorded by the history index.
///
/// Entries are immutable once produced. A deletion is recorded as an entry
/// with `is_deleted == true` and no value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub tx_id: TxId,
    pub value: Option<Vec<u8>>,
    pub timestamp: DateTime<Utc>,
    pub is_deleted: bool,
}

impl HistoryEntry {
    pub fn write(tx_id: TxId, value: Vec<u8>, timestamp: DateTime<Utc>) -> Self {
        Self {
            tx_id,
            value: Some(value),
            timestamp,
            is_deleted: false,
        }
    }

    pub fn deletion(tx_id: TxId, timestamp: DateTime<Utc>) -> Self {
        Self {
            tx_id,
            value: None,
            timestamp,
            is_deleted: true,
        }
    }

    /// Render this entry the way `getHistory` returns it to clients.
    pub fn to_record(&self) -> HistoryRecord {
        HistoryRecord {
            tx_id: self.tx_id,
            value: self
                .value
                .as_deref()
                .map(|v| String::from_utf8_lossy(v).into_owned())
                .unwrap_or_default(),
            timestamp: self.timestamp,
            is_deleted: self.is_deleted,
        }
    }
}

/// Client-facing history item: `{txId, value, timestamp, isDeleted}`.
///
/// `value` is the stored bytes decoded as UTF-8 (empty for deletions) and
/// `timestamp` is RFC 3339.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub tx_id: TxId,
    pub value: String,
    pub timestamp: DateTime<Utc>,
    pub is_deleted: bool,
}
