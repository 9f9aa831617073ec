use biblio_types::{function, HistoryRecord, Publication};
use tracing::warn;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{Contract, SubmittedTransaction};

/// Typed calls to the publication contract.
#[derive(Clone, Debug)]
pub struct PublicationClient {
    contract: Contract,
}

impl PublicationClient {
    pub fn new(contract: Contract) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub async fn init_ledger(&self) -> GatewayResult<()> {
        self.contract
            .submit_transaction(function::INIT_LEDGER, &[])
            .await?;
        Ok(())
    }

    pub async fn get_all(&self) -> GatewayResult<Vec<Publication>> {
        let payload = self
            .contract
            .evaluate_transaction(function::GET_ALL, &[])
            .await?;
        Ok(serde_json::from_slice(&payload)?)
    }

    pub async fn exists_by_id(&self, id: &str) -> GatewayResult<bool> {
        let payload = self
            .contract
            .evaluate_transaction(function::EXISTS_BY_ID, &[id])
            .await?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// Existence probe for display purposes only. Any failure is logged and
    /// read as `false`; never gate a mutation on this.
    pub async fn exists_best_effort(&self, id: &str) -> bool {
        match self.exists_by_id(id).await {
            Ok(exists) => exists,
            Err(err) => {
                warn!(id, error = %err, "existence check failed, assuming absent");
                false
            }
        }
    }

    pub async fn create_publication(&self, id: &str, title: &str) -> GatewayResult<Publication> {
        let payload = self
            .contract
            .submit_transaction(function::CREATE_PUBLICATION, &[id, title])
            .await?;
        decode(&payload)
    }

    pub async fn update_publication(&self, id: &str, title: &str) -> GatewayResult<Publication> {
        let payload = self
            .contract
            .submit_transaction(function::UPDATE_PUBLICATION, &[id, title])
            .await?;
        decode(&payload)
    }

    pub async fn delete_publication(&self, id: &str) -> GatewayResult<()> {
        self.contract
            .submit_transaction(function::DELETE_PUBLICATION, &[id])
            .await?;
        Ok(())
    }

    /// Every committed change to `id`, newest first.
    pub async fn get_history(&self, id: &str) -> GatewayResult<Vec<HistoryRecord>> {
        let payload = self
            .contract
            .evaluate_transaction(function::GET_HISTORY, &[id])
            .await?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// Submit a title change without waiting for it to commit.
    pub async fn change_title_async(
        &self,
        id: &str,
        title: &str,
    ) -> GatewayResult<SubmittedTransaction> {
        self.contract
            .submit_async(function::UPDATE_PUBLICATION, &[id, title])
            .await
    }
}

/// Decode a record returned by a committed create or update.
pub fn decode(payload: &[u8]) -> GatewayResult<Publication> {
    Publication::from_json(payload).map_err(|e| GatewayError::Serialization(e.to_string()))
}
