//! Versioned record storage for the BiblioChain ledger.
//!
//! The ledger service never owns state: every record lives in a
//! [`RecordStore`], which exposes point reads, upserts, deletes, ordered
//! range scans, and the append-only history of each key.
//!
//! # Scans
//!
//! Range and history scans return a [`Cursor`]: a lazy, finite,
//! single-pass sequence. A cursor releases its underlying resource exactly
//! once, either when it is exhausted or when it is dropped early.
//!
//! # Storage Backends
//!
//! - [`InMemoryRecordStore`] -- `BTreeMap` world state plus history index,
//!   used as the committed ledger state and directly in tests
//!
//! # Design Rules
//!
//! 1. Keys are UTF-8 strings; values are opaque bytes.
//! 2. Range scans follow lexical key order, start inclusive, end exclusive.
//! 3. History is append-only and returned newest-first, never re-sorted.
//! 4. A delete removes the current value and still appends a history entry.
//! 5. All lock and decoding failures are propagated, never ignored.

pub mod cursor;
pub mod error;
pub mod memory;
pub mod traits;

pub use cursor::Cursor;
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryRecordStore, VersionedValue};
pub use traits::{HistoryScan, KeyValue, RangeScan, RecordStore};
