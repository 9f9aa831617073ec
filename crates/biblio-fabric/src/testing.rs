//! Helpers shared by this crate's tests.

use biblio_crypto::{derive_tx_id, new_nonce, HashAlgorithm, Identity, SigningKey};
use biblio_protocol::{Proposal, ProposalHeader, Signed, SignedProposal};
use chrono::Utc;

pub(crate) fn test_client(msp_id: &str) -> (SigningKey, Identity) {
    let key = SigningKey::generate();
    let identity = Identity::from_verifying_key(msp_id, &key.verifying_key());
    (key, identity)
}

pub(crate) fn signed_proposal(
    key: &SigningKey,
    creator: &Identity,
    function: &str,
    args: &[&str],
) -> SignedProposal {
    let nonce = new_nonce();
    let proposal = Proposal {
        header: ProposalHeader {
            tx_id: derive_tx_id(HashAlgorithm::Sha256, &nonce, creator),
            channel: "mychannel".into(),
            chaincode: "basic".into(),
            creator: creator.clone(),
            nonce,
            hash_algorithm: HashAlgorithm::Sha256,
            timestamp: Utc::now(),
        },
        function: function.into(),
        args: args.iter().map(|s| s.to_string()).collect(),
    };
    Signed::sign(proposal, key).expect("proposal serializes")
}
