use biblio_store::RecordStore;
use biblio_types::{DomainError, HistoryRecord, Publication};
use tracing::{debug, info, warn};

use crate::error::ContractResult;

/// Name the contract is installed under on a channel.
pub const CONTRACT_NAME: &str = "basic";

/// Existence-gated publication CRUD over a [`RecordStore`].
///
/// The contract holds no ledger state of its own. Each operation is one
/// transaction against the store it is handed; the existence check and the
/// write it gates run inside the same invocation. Two concurrent proposals
/// for the same id can both pass the check during simulation, and only
/// commit-time conflict detection orders them, so the check here is an
/// application-level guard and not a replacement for MVCC validation.
#[derive(Clone, Debug)]
pub struct PublicationContract {
    seeds: Vec<Publication>,
}

impl PublicationContract {
    /// Contract seeded with the two default publications.
    pub fn new() -> Self {
        Self::with_seeds([
            Publication::new("publication1", "BiblioChain Thesis"),
            Publication::new("publication2", "Bitcoin Whitepaper"),
        ])
    }

    /// Contract whose `init_ledger` writes the given records instead.
    pub fn with_seeds(seeds: impl IntoIterator<Item = Publication>) -> Self {
        Self {
            seeds: seeds.into_iter().collect(),
        }
    }

    pub fn seeds(&self) -> &[Publication] {
        &self.seeds
    }

    /// Write the seed records unconditionally. Repeated calls overwrite.
    pub fn init_ledger(&self, store: &dyn RecordStore) -> ContractResult<()> {
        for publication in &self.seeds {
            put(store, publication)?;
        }
        info!(count = self.seeds.len(), "ledger initialized");
        Ok(())
    }

    /// Every publication in key order. A value that does not decode is an
    /// error, not a skipped row.
    pub fn get_all(&self, store: &dyn RecordStore) -> ContractResult<Vec<Publication>> {
        let mut publications = Vec::new();
        for kv in store.range_scan("", "")? {
            let kv = kv?;
            let publication = Publication::from_json(&kv.value)?;
            debug!(%publication, "scanned");
            publications.push(publication);
        }
        Ok(publications)
    }

    /// `true` iff the key holds a non-empty value. Absence is not an error.
    pub fn exists_by_id(&self, store: &dyn RecordStore, id: &str) -> ContractResult<bool> {
        Ok(store.get(id)?.is_some_and(|v| !v.is_empty()))
    }

    pub fn create_publication(
        &self,
        store: &dyn RecordStore,
        id: &str,
        title: &str,
    ) -> ContractResult<Publication> {
        if self.exists_by_id(store, id)? {
            return Err(reject(DomainError::AlreadyExists(id.to_string())));
        }
        let publication = Publication::new(id, title);
        put(store, &publication)?;
        Ok(publication)
    }

    pub fn update_publication(
        &self,
        store: &dyn RecordStore,
        id: &str,
        title: &str,
    ) -> ContractResult<Publication> {
        if !self.exists_by_id(store, id)? {
            return Err(reject(DomainError::NotFound(id.to_string())));
        }
        let publication = Publication::new(id, title);
        put(store, &publication)?;
        Ok(publication)
    }

    pub fn delete_publication(&self, store: &dyn RecordStore, id: &str) -> ContractResult<()> {
        if !self.exists_by_id(store, id)? {
            return Err(reject(DomainError::NotFound(id.to_string())));
        }
        store.delete(id)?;
        Ok(())
    }

    /// Every recorded mutation of `id`, in the order the store yields them
    /// (newest first).
    pub fn get_history(
        &self,
        store: &dyn RecordStore,
        id: &str,
    ) -> ContractResult<Vec<HistoryRecord>> {
        let mut history = Vec::new();
        for entry in store.history_for_key(id)? {
            let record = entry?.to_record();
            debug!(
                id,
                tx_id = %record.tx_id,
                is_deleted = record.is_deleted,
                "history entry"
            );
            history.push(record);
        }
        Ok(history)
    }
}

impl Default for PublicationContract {
    fn default() -> Self {
        Self::new()
    }
}

fn put(store: &dyn RecordStore, publication: &Publication) -> ContractResult<()> {
    store.put(publication.id(), publication.to_canonical_json()?)?;
    Ok(())
}

fn reject(err: DomainError) -> crate::error::ContractError {
    warn!(code = err.code(), id = err.id(), "{err}");
    err.into()
}
