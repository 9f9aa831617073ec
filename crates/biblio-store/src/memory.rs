use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use biblio_types::{HistoryEntry, KvWrite, TxId, Version};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cursor::Cursor;
use crate::error::{StoreError, StoreResult};
use crate::traits::{HistoryScan, KeyValue, RangeScan, RecordStore};

/// A current value together with the version that wrote it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: Version,
}

/// In-memory world state plus history index.
///
/// World state is a `BTreeMap` so range scans come out in lexical key
/// order. History is kept per key in commit order and served newest-first.
/// Everything sits behind one `RwLock`, so a committed write set is applied
/// atomically with respect to readers.
///
/// Used through [`RecordStore`] the store runs in autocommit mode: every
/// `put`/`delete` is its own single-write transaction with a fresh random
/// transaction id at the next block height.
pub struct InMemoryRecordStore {
    inner: RwLock<StoreState>,
    open_cursors: Arc<AtomicUsize>,
}

#[derive(Default)]
struct StoreState {
    values: BTreeMap<String, VersionedValue>,
    history: HashMap<String, Vec<HistoryEntry>>,
    height: u64,
}

impl InMemoryRecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreState::default()),
            open_cursors: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").values.len()
    }

    /// Returns `true` if no key holds a value.
    pub fn is_empty(&self) -> bool {
        self.inner.read().expect("lock poisoned").values.is_empty()
    }

    /// Highest block number applied so far.
    pub fn height(&self) -> u64 {
        self.inner.read().expect("lock poisoned").height
    }

    /// Number of range/history cursors not yet released.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Read a key's value and the version that wrote it.
    pub fn get_versioned(&self, key: &str) -> StoreResult<Option<VersionedValue>> {
        let state = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state.values.get(key).cloned())
    }

    /// Keys, values and versions currently in the range, read under one
    /// lock acquisition.
    pub fn range_versioned(
        &self,
        start: &str,
        end: &str,
    ) -> StoreResult<Vec<(String, VersionedValue)>> {
        let bounds = range_bounds(start, end)?;
        let state = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state
            .values
            .range::<str, _>(bounds)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    /// Apply a committed write set atomically.
    ///
    /// Every write is stamped with `version`, and one history entry per
    /// write is appended under `tx_id` and `timestamp`. The set is checked
    /// before anything is mutated, so a malformed set changes nothing.
    pub fn apply(
        &self,
        tx_id: TxId,
        version: Version,
        timestamp: DateTime<Utc>,
        writes: &[KvWrite],
    ) -> StoreResult<()> {
        if let Some(bad) = writes.iter().find(|w| !w.is_delete && w.value.is_none()) {
            return Err(StoreError::MissingValue(bad.key.clone()));
        }
        let mut state = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        Self::apply_locked(&mut state, tx_id, version, timestamp, writes);
        Ok(())
    }

    fn apply_locked(
        state: &mut StoreState,
        tx_id: TxId,
        version: Version,
        timestamp: DateTime<Utc>,
        writes: &[KvWrite],
    ) {
        for write in writes {
            let entry = match (&write.value, write.is_delete) {
                (Some(value), false) => {
                    state.values.insert(
                        write.key.clone(),
                        VersionedValue {
                            value: value.clone(),
                            version,
                        },
                    );
                    HistoryEntry::write(tx_id, value.clone(), timestamp)
                }
                _ => {
                    state.values.remove(&write.key);
                    HistoryEntry::deletion(tx_id, timestamp)
                }
            };
            state
                .history
                .entry(write.key.clone())
                .or_default()
                .push(entry);
        }
        state.height = state.height.max(version.block_num);
    }

    fn autocommit(&self, write: KvWrite) -> StoreResult<()> {
        let mut state = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let version = Version::new(state.height + 1, 0);
        Self::apply_locked(&mut state, TxId::random(), version, Utc::now(), &[write]);
        Ok(())
    }

    fn open_cursor<T: Send + 'static>(&self, items: Vec<T>, kind: &'static str) -> Cursor<'_, T> {
        let counter = Arc::clone(&self.open_cursors);
        counter.fetch_add(1, Ordering::SeqCst);
        Cursor::new(items.into_iter(), move |yielded| {
            counter.fetch_sub(1, Ordering::SeqCst);
            debug!(kind, yielded, "cursor released");
        })
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.get_versioned(key)?.map(|v| v.value))
    }

    fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.autocommit(KvWrite::put(key, value))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.autocommit(KvWrite::delete(key))
    }

    fn range_scan(&self, start: &str, end: &str) -> StoreResult<RangeScan<'_>> {
        let bounds = range_bounds(start, end)?;
        let snapshot: Vec<StoreResult<KeyValue>> = {
            let state = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
            state
                .values
                .range::<str, _>(bounds)
                .map(|(k, v)| {
                    Ok(KeyValue {
                        key: k.clone(),
                        value: v.value.clone(),
                    })
                })
                .collect()
        };
        Ok(self.open_cursor(snapshot, "range"))
    }

    fn history_for_key(&self, key: &str) -> StoreResult<HistoryScan<'_>> {
        let snapshot: Vec<StoreResult<HistoryEntry>> = {
            let state = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
            state
                .history
                .get(key)
                .map(|entries| entries.iter().rev().cloned().map(Ok).collect())
                .unwrap_or_default()
        };
        Ok(self.open_cursor(snapshot, "history"))
    }
}

impl std::fmt::Debug for InMemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRecordStore")
            .field("key_count", &self.len())
            .field("height", &self.height())
            .finish()
    }
}

/// Translate `(start, end)` scan arguments into map bounds. Empty strings
/// are unbounded.
fn range_bounds<'k>(start: &'k str, end: &'k str) -> StoreResult<(Bound<&'k str>, Bound<&'k str>)> {
    if !start.is_empty() && !end.is_empty() && start > end {
        return Err(StoreError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    let lower = if start.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Included(start)
    };
    let upper = if end.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Excluded(end)
    };
    Ok((lower, upper))
}
