//! Record store trait.

use async_trait::async_trait;
use regsync_types::{RecordField, UserRecord};

use crate::{BackupId, BackupInfo, BulkWriteSummary, RecordFilter, StoreError, WriteOp};

/// Durable collection of user records.
///
/// Implementations must apply each [`WriteOp`] atomically per record and
/// apply a whole `bulk_write` call in one round-trip. No concurrent external
/// writers are assumed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Return every record matching `filter`, holding `id` plus the
    /// projected fields.
    async fn find_all(
        &self,
        filter: RecordFilter,
        projection: &[RecordField],
    ) -> Result<Vec<UserRecord>, StoreError>;

    /// Apply a batch of match-one updates and deletes. Operations whose id
    /// matches nothing are counted as unmatched, not failed.
    async fn bulk_write(&self, ops: Vec<WriteOp>) -> Result<BulkWriteSummary, StoreError>;

    /// Copy the full collection to a new backup.
    async fn snapshot_collection(&self) -> Result<BackupId, StoreError>;

    /// List stored backups, oldest first.
    async fn list_backups(&self) -> Result<Vec<BackupInfo>, StoreError>;

    /// Replace the live collection with the contents of a backup.
    /// Returns the number of records restored.
    async fn restore_snapshot(&self, id: &BackupId) -> Result<u64, StoreError>;
}
