//! Gateway client for the BiblioChain ledger.
//!
//! A [`Gateway`] binds a client identity and signer to a
//! [`GatewayConnection`](biblio_protocol::GatewayConnection). From it a
//! [`Contract`] offers three paths:
//!
//! - `evaluate_transaction`: read-only, one peer, nothing ordered
//! - `submit_transaction`: endorse, order, and wait for a valid commit
//! - `submit_async`: endorse and order, returning a
//!   [`SubmittedTransaction`] whose `status()` must be checked before its
//!   `result()` is trusted
//!
//! Every failure is a [`GatewayError`] naming the stage that failed and,
//! once allocated, the transaction id. [`PublicationClient`] layers typed
//! publication calls on top.

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;

#[cfg(test)]
mod testing;

pub use client::PublicationClient;
pub use config::{GatewayConfig, Timeouts};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{
    Contract, Gateway, GatewayBuilder, Network, Proposal, ProposalBuilder, SubmittedTransaction,
    Transaction,
};
