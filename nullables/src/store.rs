//! Nullable store: thread-safe in-memory record collection for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use regsync_store::{
    BackupId, BackupInfo, BulkWriteSummary, RecordFilter, RecordStore, StoreError, WriteOp,
};
use regsync_types::{RecordField, RecordId, UserRecord};

/// An in-memory record store for testing.
///
/// Records keep insertion order. Every `bulk_write` call is logged so tests
/// can assert on exactly what the engine wrote.
pub struct NullStore {
    records: Mutex<Vec<UserRecord>>,
    backups: Mutex<Vec<(BackupInfo, Vec<UserRecord>)>>,
    write_log: Mutex<Vec<Vec<WriteOp>>>,
    unavailable: Mutex<Option<String>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            backups: Mutex::new(Vec::new()),
            write_log: Mutex::new(Vec::new()),
            unavailable: Mutex::new(None),
        }
    }

    pub fn with_records(records: Vec<UserRecord>) -> Self {
        let store = Self::new();
        *store.records.lock().unwrap() = records;
        store
    }

    /// Insert or replace a record.
    pub fn insert(&self, record: UserRecord) {
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, reason: impl Into<String>) {
        *self.unavailable.lock().unwrap() = Some(reason.into());
    }

    /// Current records, in insertion order (for assertions).
    pub fn records(&self) -> Vec<UserRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn get(&self, id: &str) -> Option<UserRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id.as_str() == id)
            .cloned()
    }

    /// Number of `bulk_write` round-trips made.
    pub fn bulk_write_calls(&self) -> usize {
        self.write_log.lock().unwrap().len()
    }

    /// Every operation written, flattened across calls.
    pub fn written_ops(&self) -> Vec<WriteOp> {
        self.write_log.lock().unwrap().iter().flatten().cloned().collect()
    }

    pub fn clear_write_log(&self) {
        self.write_log.lock().unwrap().clear();
    }

    pub fn backup_count(&self) -> usize {
        self.backups.lock().unwrap().len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        match self.unavailable.lock().unwrap().as_ref() {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn position(records: &[UserRecord], id: &RecordId) -> Option<usize> {
        records.iter().position(|r| &r.id == id)
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for NullStore {
    async fn find_all(
        &self,
        filter: RecordFilter,
        projection: &[RecordField],
    ) -> Result<Vec<UserRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .map(|r| r.project(projection))
            .collect())
    }

    async fn bulk_write(&self, ops: Vec<WriteOp>) -> Result<BulkWriteSummary, StoreError> {
        self.check_available()?;
        let mut summary = BulkWriteSummary::default();
        let mut records = self.records.lock().unwrap();
        for op in &ops {
            match (op, Self::position(&records, op.id())) {
                (WriteOp::Update { set, .. }, Some(idx)) => {
                    summary.matched += 1;
                    if set.apply(&mut records[idx]) {
                        summary.modified += 1;
                    }
                }
                (WriteOp::Delete { .. }, Some(idx)) => {
                    records.remove(idx);
                    summary.deleted += 1;
                }
                (_, None) => summary.unmatched += 1,
            }
        }
        self.write_log.lock().unwrap().push(ops);
        Ok(summary)
    }

    async fn snapshot_collection(&self) -> Result<BackupId, StoreError> {
        self.check_available()?;
        let records = self.records();
        let mut backups = self.backups.lock().unwrap();
        let id = BackupId::at(0, backups.len() as u64);
        let info = BackupInfo {
            id: id.clone(),
            created_at: 0,
            records: records.len() as u64,
        };
        backups.push((info, records));
        Ok(id)
    }

    async fn list_backups(&self) -> Result<Vec<BackupInfo>, StoreError> {
        self.check_available()?;
        Ok(self
            .backups
            .lock()
            .unwrap()
            .iter()
            .map(|(info, _)| info.clone())
            .collect())
    }

    async fn restore_snapshot(&self, id: &BackupId) -> Result<u64, StoreError> {
        self.check_available()?;
        let backups = self.backups.lock().unwrap();
        let (_, snapshot) = backups
            .iter()
            .find(|(info, _)| &info.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        *self.records.lock().unwrap() = snapshot.clone();
        Ok(snapshot.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regsync_store::FieldSet;
    use regsync_types::RefNumber;

    #[tokio::test]
    async fn bulk_write_is_logged_per_call() {
        let store = NullStore::with_records(vec![UserRecord::new("a"), UserRecord::new("b")]);
        let summary = store
            .bulk_write(vec![
                WriteOp::Update {
                    id: RecordId::new("a"),
                    set: FieldSet {
                        ref_number: Some(RefNumber::new(20000)),
                        ..Default::default()
                    },
                },
                WriteOp::Delete {
                    id: RecordId::new("b"),
                },
            ])
            .await
            .unwrap();
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.deleted, 1);
        assert_eq!(store.bulk_write_calls(), 1);
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = NullStore::new();
        store.set_unavailable("connection refused");
        let err = store
            .find_all(RecordFilter::All, &RecordField::ALL)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn restore_brings_back_deleted_records() {
        let store = NullStore::with_records(vec![UserRecord::new("a")]);
        let backup = store.snapshot_collection().await.unwrap();
        store
            .bulk_write(vec![WriteOp::Delete {
                id: RecordId::new("a"),
            }])
            .await
            .unwrap();
        assert_eq!(store.restore_snapshot(&backup).await.unwrap(), 1);
        assert!(store.get("a").is_some());
    }
}
