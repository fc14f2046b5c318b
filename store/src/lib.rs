//! Abstract record store interface.
//!
//! Every storage backend (LMDB, in-memory for testing) implements
//! [`RecordStore`]. The engine depends only on the trait.

pub mod backup;
pub mod error;
pub mod filter;
pub mod record;
pub mod write;

pub use backup::{BackupId, BackupInfo};
pub use error::StoreError;
pub use filter::RecordFilter;
pub use record::RecordStore;
pub use write::{BulkWriteSummary, FieldSet, WriteOp};
