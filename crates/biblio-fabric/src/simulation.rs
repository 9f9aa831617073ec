use std::sync::Mutex;

use biblio_store::{
    Cursor, HistoryScan, InMemoryRecordStore, KeyValue, RangeScan, RecordStore, StoreError,
    StoreResult,
};
use biblio_types::{KvRead, KvWrite, RangeQueryInfo, ReadWriteSet};

/// Record store view used while a peer simulates a proposal.
///
/// Reads go to committed state and are recorded with the version they saw.
/// Writes are buffered in the read/write set and never reach committed
/// state. A read after a write in the same simulation still sees the
/// committed value, not the buffered one.
pub struct SimulationStore<'a> {
    committed: &'a InMemoryRecordStore,
    rwset: Mutex<ReadWriteSet>,
}

impl<'a> SimulationStore<'a> {
    pub fn new(committed: &'a InMemoryRecordStore) -> Self {
        Self {
            committed,
            rwset: Mutex::new(ReadWriteSet::default()),
        }
    }

    /// Finish the simulation and hand back what it read and wrote.
    pub fn into_rwset(self) -> StoreResult<ReadWriteSet> {
        self.rwset.into_inner().map_err(|_| StoreError::LockPoisoned)
    }

    fn record<F: FnOnce(&mut ReadWriteSet)>(&self, f: F) -> StoreResult<()> {
        let mut rwset = self.rwset.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut rwset);
        Ok(())
    }

    fn buffer_write(&self, write: KvWrite) -> StoreResult<()> {
        self.record(|rwset| {
            rwset.writes.retain(|w| w.key != write.key);
            rwset.writes.push(write);
        })
    }
}

impl RecordStore for SimulationStore<'_> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let current = self.committed.get_versioned(key)?;
        let version = current.as_ref().map(|v| v.version);
        self.record(|rwset| {
            if !rwset.reads.iter().any(|r| r.key == key) {
                rwset.reads.push(KvRead {
                    key: key.to_string(),
                    version,
                });
            }
        })?;
        Ok(current.map(|v| v.value))
    }

    fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.buffer_write(KvWrite::put(key, value))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.buffer_write(KvWrite::delete(key))
    }

    fn range_scan(&self, start: &str, end: &str) -> StoreResult<RangeScan<'_>> {
        let rows = self.committed.range_versioned(start, end)?;
        let reads = rows
            .iter()
            .map(|(key, v)| KvRead {
                key: key.clone(),
                version: Some(v.version),
            })
            .collect();
        self.record(|rwset| {
            rwset.range_queries.push(RangeQueryInfo {
                start_key: start.to_string(),
                end_key: end.to_string(),
                reads,
            })
        })?;
        let items: Vec<StoreResult<KeyValue>> = rows
            .into_iter()
            .map(|(key, v)| Ok(KeyValue { key, value: v.value }))
            .collect();
        Ok(Cursor::detached(items.into_iter()))
    }

    fn history_for_key(&self, key: &str) -> StoreResult<HistoryScan<'_>> {
        self.committed.history_for_key(key)
    }
}
