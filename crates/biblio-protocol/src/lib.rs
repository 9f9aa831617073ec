//! Gateway protocol for the BiblioChain ledger.
//!
//! Defines the logical messages exchanged between a gateway client and the
//! ledger network, and the [`GatewayConnection`] trait that carries them.
//! The transport underneath is not specified here.
//!
//! # Flow
//!
//! 1. The client signs a [`Proposal`] ([`SignedProposal`]).
//! 2. Read-only proposals are evaluated by one peer.
//! 3. Submit proposals are endorsed into a [`PreparedTransaction`], which
//!    the client signs into an [`Envelope`] and submits for ordering.
//! 4. The client waits for the [`CommitStatus`].

pub mod connection;
pub mod error;
pub mod message;

pub use connection::GatewayConnection;
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    canonical_bytes, endorsement_message, CommitStatus, CommitStatusRequest, Endorsement,
    Envelope, ErrorDetail, PreparedTransaction, Proposal, ProposalHeader, ProposalResponse,
    Signed, SignedCommitStatusRequest, SignedProposal, PROTOCOL_VERSION, STATUS_ERROR, STATUS_OK,
};
