//! Foundation types for the BiblioChain ledger.
//!
//! This crate provides the record, history, and transaction types shared by
//! the ledger service, the in-process network, and the gateway client.
//!
//! # Key Types
//!
//! - [`Publication`]: the keyed record held in world state
//! - [`HistoryEntry`]: one committed mutation of a key, as kept by the store
//! - [`HistoryRecord`]: the client-facing rendering of a history entry
//! - [`TxId`]: hex transaction identifier derived from nonce and creator
//! - [`Version`]: block/transaction height at which a key was last written
//! - [`ReadWriteSet`]: reads and writes captured while simulating a proposal
//! - [`ValidationCode`]: final commit outcome of a transaction
//! - [`DomainError`]: existence-invariant violations raised by the service

pub mod domain;
pub mod error;
pub mod function;
pub mod history;
pub mod publication;
pub mod rwset;
pub mod tx;

pub use domain::DomainError;
pub use error::TypeError;
pub use history::{HistoryEntry, HistoryRecord};
pub use publication::Publication;
pub use rwset::{KvRead, KvWrite, RangeQueryInfo, ReadWriteSet};
pub use tx::{TxId, TxIntent, ValidationCode, Version};
