//! Sink trait and the log-only implementation.

use async_trait::async_trait;

use crate::SinkError;

/// A named byte blob sent alongside the summary text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Receiver of run summaries.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, summary: &str, attachments: &[Attachment]) -> Result<(), SinkError>;
}

/// Writes the summary to the log. Never fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn deliver(&self, summary: &str, attachments: &[Attachment]) -> Result<(), SinkError> {
        let names: Vec<&str> = attachments.iter().map(|a| a.name.as_str()).collect();
        tracing::info!(attachments = ?names, "run summary\n{summary}");
        Ok(())
    }
}
