//! Delivery of run summaries to whoever reads them.
//!
//! The engine hands the rendered summary and its report attachments to a
//! [`NotificationSink`]. Delivery is fire-and-forget from the engine's point
//! of view: failures are logged, never propagated as run failures.

pub mod error;
pub mod notification;
pub mod outbox;

pub use error::SinkError;
pub use notification::{Attachment, NotificationSink, TracingSink};
pub use outbox::OutboxSink;
