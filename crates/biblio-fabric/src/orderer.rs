use std::sync::Arc;
use std::time::Duration;

use biblio_protocol::Envelope;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::committer::ChannelLedger;

/// Cut blocks from the submission queue and commit them.
///
/// A block is cut when it holds `batch_size` transactions or when
/// `batch_timeout` has passed since its first transaction arrived. When
/// the queue closes, whatever is pending is committed before returning.
pub(crate) async fn run(
    mut queue: mpsc::Receiver<Envelope>,
    ledger: Arc<ChannelLedger>,
    batch_size: usize,
    batch_timeout: Duration,
) {
    info!(batch_size, ?batch_timeout, "orderer started");
    loop {
        let Some(first) = queue.recv().await else {
            break;
        };
        let mut batch = vec![first];
        let deadline = Instant::now() + batch_timeout;
        let mut closed = false;

        while batch.len() < batch_size {
            match tokio::time::timeout_at(deadline, queue.recv()).await {
                Ok(Some(envelope)) => batch.push(envelope),
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        debug!(txs = batch.len(), "cutting block");
        if let Err(e) = ledger.commit_block(&batch) {
            error!(error = %e, txs = batch.len(), "block commit failed");
        }
        if closed {
            break;
        }
    }
    info!("orderer stopped");
}
