//! Nullable sink: record deliveries without sending them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use regsync_sink::{Attachment, NotificationSink, SinkError};

/// One recorded delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub summary: String,
    pub attachments: Vec<Attachment>,
}

/// A sink that records deliveries instead of sending them.
pub struct NullSink {
    delivered: Mutex<Vec<Delivery>>,
    reject_attachments: AtomicBool,
    reject_all: AtomicBool,
}

impl NullSink {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            reject_attachments: AtomicBool::new(false),
            reject_all: AtomicBool::new(false),
        }
    }

    /// Fail every delivery that carries attachments.
    pub fn reject_attachments(&self) {
        self.reject_attachments.store(true, Ordering::SeqCst);
    }

    /// Fail every delivery.
    pub fn reject_all(&self) {
        self.reject_all.store(true, Ordering::SeqCst);
    }

    /// Successful deliveries, in order (for assertions).
    pub fn delivered(&self) -> Vec<Delivery> {
        self.delivered.lock().unwrap().clone()
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for NullSink {
    async fn deliver(&self, summary: &str, attachments: &[Attachment]) -> Result<(), SinkError> {
        if self.reject_all.load(Ordering::SeqCst) {
            return Err(SinkError::Delivery("null sink rejects everything".into()));
        }
        if !attachments.is_empty() && self.reject_attachments.load(Ordering::SeqCst) {
            return Err(SinkError::Delivery("null sink rejects attachments".into()));
        }
        self.delivered.lock().unwrap().push(Delivery {
            summary: summary.to_string(),
            attachments: attachments.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_rejects() {
        let sink = NullSink::new();
        sink.deliver("a", &[]).await.unwrap();
        sink.reject_attachments();
        assert!(sink
            .deliver("b", &[Attachment::new("x.json", Vec::new())])
            .await
            .is_err());
        sink.deliver("c", &[]).await.unwrap();
        let summaries: Vec<String> = sink.delivered().into_iter().map(|d| d.summary).collect();
        assert_eq!(summaries, vec!["a", "c"]);
    }
}
