use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProtocolResult;
use crate::message::{
    CommitStatus, Envelope, PreparedTransaction, SignedCommitStatusRequest, SignedProposal,
};

/// Client-facing surface of a ledger network.
///
/// One connection is opened at startup, shared by every gateway that
/// needs it, and closed once with [`shutdown`](Self::shutdown).
#[async_trait]
pub trait GatewayConnection: Send + Sync {
    /// Run a read-only proposal on one peer and return its payload.
    async fn evaluate(&self, proposal: &SignedProposal) -> ProtocolResult<Vec<u8>>;

    /// Collect the endorsements the channel requires.
    async fn endorse(&self, proposal: &SignedProposal) -> ProtocolResult<PreparedTransaction>;

    /// Hand a signed transaction to ordering. Returns once it is accepted
    /// for ordering, not once it commits.
    async fn submit(&self, envelope: &Envelope) -> ProtocolResult<()>;

    /// Wait for the transaction's final validation outcome.
    async fn commit_status(
        &self,
        request: &SignedCommitStatusRequest,
    ) -> ProtocolResult<CommitStatus>;

    /// Stop accepting work and wait at most `grace` for in-flight work.
    async fn shutdown(&self, _grace: Duration) -> ProtocolResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use std::sync::Arc;

    struct Offline;

    #[async_trait]
    impl GatewayConnection for Offline {
        async fn evaluate(&self, _: &SignedProposal) -> ProtocolResult<Vec<u8>> {
            Err(ProtocolError::Unavailable("offline".into()))
        }

        async fn endorse(&self, _: &SignedProposal) -> ProtocolResult<PreparedTransaction> {
            Err(ProtocolError::Unavailable("offline".into()))
        }

        async fn submit(&self, _: &Envelope) -> ProtocolResult<()> {
            Err(ProtocolError::Unavailable("offline".into()))
        }

        async fn commit_status(&self, _: &SignedCommitStatusRequest) -> ProtocolResult<CommitStatus> {
            Err(ProtocolError::Closed)
        }
    }

    #[tokio::test]
    async fn default_shutdown_is_a_no_op() {
        let conn: Arc<dyn GatewayConnection> = Arc::new(Offline);
        conn.shutdown(Duration::from_millis(1)).await.unwrap();
    }
}
