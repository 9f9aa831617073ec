//! Publication ledger service for BiblioChain.
//!
//! This crate provides:
//! - [`PublicationContract`]: existence-gated create/update/delete, listing,
//!   existence checks, and per-key history over a [`biblio_store::RecordStore`]
//! - [`ContractRegistry`]: the explicit name → (handler, intent, arity)
//!   table that peers dispatch proposals through
//! - [`ContractError`]: domain, store, and dispatch failures

pub mod contract;
pub mod error;
pub mod registry;

pub use contract::{PublicationContract, CONTRACT_NAME};
pub use error::{ContractError, ContractResult};
pub use registry::{ContractRegistry, Handler, TransactionDef};
