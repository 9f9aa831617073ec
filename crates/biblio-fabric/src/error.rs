use biblio_protocol::ProtocolError;
use biblio_store::StoreError;

/// Errors produced by the in-process network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FabricError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid network configuration: {0}")]
    InvalidConfig(String),

    /// The network has been shut down and accepts no further work.
    #[error("network is shut down")]
    Shutdown,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<ProtocolError> for FabricError {
    fn from(e: ProtocolError) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<FabricError> for ProtocolError {
    fn from(e: FabricError) -> Self {
        ProtocolError::Unavailable(e.to_string())
    }
}

pub type FabricResult<T> = Result<T, FabricError>;
