//! Directory-backed sink read by the presentation layer.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::{Attachment, NotificationSink, SinkError};

/// File name of the summary text inside the outbox.
pub const SUMMARY_FILE: &str = "summary.txt";

/// Writes `summary.txt` and every attachment into one directory,
/// replacing whatever the previous run left there.
#[derive(Clone, Debug)]
pub struct OutboxSink {
    dir: PathBuf,
}

impl OutboxSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn attachment_path(&self, name: &str) -> Result<PathBuf, SinkError> {
        let relative = Path::new(name);
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.dir.join(relative)),
            _ => Err(SinkError::Delivery(format!(
                "attachment name {name:?} is not a plain file name"
            ))),
        }
    }
}

#[async_trait]
impl NotificationSink for OutboxSink {
    async fn deliver(&self, summary: &str, attachments: &[Attachment]) -> Result<(), SinkError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(SUMMARY_FILE), summary).await?;
        for attachment in attachments {
            let path = self.attachment_path(&attachment.name)?;
            tokio::fs::write(&path, &attachment.bytes).await?;
        }
        tracing::info!(
            dir = %self.dir.display(),
            attachments = attachments.len(),
            "summary written to outbox"
        );
        Ok(())
    }
}
