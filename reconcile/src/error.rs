use thiserror::Error;

/// Run-level failures. Anything per-record is isolated inside its stage
/// and never reaches this type.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] regsync_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}
