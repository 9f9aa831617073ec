use biblio_types::HistoryEntry;

use crate::cursor::Cursor;
use crate::error::StoreResult;

/// A key and its current value, as yielded by a range scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// Range scan results in lexical key order.
pub type RangeScan<'a> = Cursor<'a, StoreResult<KeyValue>>;

/// History entries for one key, newest first.
pub type HistoryScan<'a> = Cursor<'a, StoreResult<HistoryEntry>>;

/// Keyed, versioned record store with append-only history.
///
/// All implementations must satisfy these invariants:
/// - `get` on a key never written, or deleted, returns `Ok(None)`.
/// - `put` is an upsert and appends one history entry.
/// - `delete` removes the current value and appends one history entry
///   with `is_deleted == true`.
/// - `range_scan` yields keys in lexical order; an empty `start` means
///   "from the first key", an empty `end` means "through the last key";
///   otherwise `start` is inclusive and `end` exclusive.
/// - `history_for_key` yields every entry ever recorded for the key in the
///   store's native order (newest first), without re-sorting.
pub trait RecordStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()>;

    fn delete(&self, key: &str) -> StoreResult<()>;

    fn range_scan(&self, start: &str, end: &str) -> StoreResult<RangeScan<'_>>;

    fn history_for_key(&self, key: &str) -> StoreResult<HistoryScan<'_>>;
}
