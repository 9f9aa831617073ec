//! In-process ledger network for BiblioChain.
//!
//! Stands in for the distributed ledger platform the gateway talks to:
//!
//! - [`Peer`]: verifies and simulates proposals against committed state,
//!   capturing a read/write set, and endorses the result
//! - orderer: batches submitted envelopes into blocks
//! - [`ChannelLedger`]: validates each block (endorsement policy, duplicate
//!   ids, MVCC and phantom reads), applies valid writes, and announces the
//!   outcome to commit-status waiters
//! - [`InProcessNetwork`]: wires these together behind
//!   [`biblio_protocol::GatewayConnection`]

pub mod committer;
pub mod config;
pub mod error;
pub mod network;
mod orderer;
pub mod peer;
pub mod simulation;

#[cfg(test)]
mod testing;

pub use committer::{BlockEvent, ChannelLedger};
pub use config::FabricConfig;
pub use error::{FabricError, FabricResult};
pub use network::InProcessNetwork;
pub use peer::Peer;
pub use simulation::SimulationStore;
