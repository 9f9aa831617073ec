//! Cryptographic primitives for the BiblioChain ledger.
//!
//! Provides the hash algorithm tag used for transaction ids and signing
//! digests, Ed25519 signing/verification, and the client identity that
//! proposals are attributed to.
//!
//! All crypto operations wrap established libraries.

pub mod hasher;
pub mod identity;
pub mod signer;

pub use hasher::HashAlgorithm;
pub use identity::{derive_tx_id, new_nonce, Identity, NONCE_LEN};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
