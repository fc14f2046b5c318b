use thiserror::Error;

/// A response did not have the shape the engine relies on.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("malformed {kind}: {reason}")]
pub struct MalformedUpstreamData {
    pub kind: &'static str,
    pub reason: String,
}

impl MalformedUpstreamData {
    pub fn new(kind: &'static str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, Error)]
pub enum ChainError {
    /// Transient upstream throttling (HTTP 429 or equivalent).
    #[error("rate limited by chain provider")]
    RateLimited,

    #[error("{context} still rate limited after {attempts} attempts")]
    RetryExhausted { attempts: u32, context: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error(transparent)]
    Malformed(#[from] MalformedUpstreamData),
}

impl ChainError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ChainError::RateLimited)
    }
}
