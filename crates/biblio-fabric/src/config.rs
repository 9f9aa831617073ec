use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FabricError, FabricResult};

/// Configuration for an [`InProcessNetwork`](crate::InProcessNetwork).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    pub channel: String,
    pub chaincode: String,
    /// One endorsing peer is started per organization.
    pub organizations: Vec<String>,
    /// Distinct organizations whose endorsement a transaction needs.
    pub required_endorsements: usize,
    /// Maximum transactions per block.
    pub batch_size: usize,
    /// How long the orderer waits to fill a block once it holds one
    /// transaction.
    pub batch_timeout_ms: u64,
    /// Capacity of the submission queue and the commit event channel.
    pub channel_capacity: usize,
}

impl FabricConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn validate(&self) -> FabricResult<()> {
        if self.organizations.is_empty() {
            return Err(FabricError::InvalidConfig("no organizations".into()));
        }
        if self.required_endorsements == 0 || self.required_endorsements > self.organizations.len() {
            return Err(FabricError::InvalidConfig(format!(
                "required_endorsements must be between 1 and {}, got {}",
                self.organizations.len(),
                self.required_endorsements
            )));
        }
        if self.batch_size == 0 || self.channel_capacity == 0 {
            return Err(FabricError::InvalidConfig(
                "batch_size and channel_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            channel: "mychannel".into(),
            chaincode: "basic".into(),
            organizations: vec!["Org1MSP".into(), "Org2MSP".into()],
            required_endorsements: 2,
            batch_size: 10,
            batch_timeout_ms: 20,
            channel_capacity: 1024,
        }
    }
}
