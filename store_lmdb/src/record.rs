//! LMDB implementation of RecordStore.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use regsync_store::{
    BackupId, BackupInfo, BulkWriteSummary, RecordFilter, RecordStore, StoreError, WriteOp,
};
use regsync_types::{RecordField, UserRecord};

use crate::environment::{decode_record, Document, LmdbEnvironment, DEFAULT_MAP_SIZE};
use crate::{LmdbError, WriteBatch};

/// User record collection backed by an LMDB environment.
#[derive(Clone)]
pub struct LmdbRecordStore {
    env: Arc<LmdbEnvironment>,
}

impl LmdbRecordStore {
    pub fn new(env: Arc<LmdbEnvironment>) -> Self {
        Self { env }
    }

    /// Open (or create) a store under `data_dir` with the default map size.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let env = LmdbEnvironment::open(data_dir, DEFAULT_MAP_SIZE)?;
        Ok(Self::new(Arc::new(env)))
    }

    /// Insert or replace whole documents, keyed by their `id`. Used to
    /// import an exported collection; the engine itself only goes through
    /// `bulk_write`. Nothing is written if any document lacks an id.
    pub fn insert_documents(&self, documents: &[Document]) -> Result<u64, StoreError> {
        let mut batch = WriteBatch::new(&self.env)?;
        for document in documents {
            batch.put_document(document)?;
        }
        batch.commit()?;
        Ok(documents.len() as u64)
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.env.records_db.len(&rtxn).map_err(LmdbError::from)?)
    }

    fn scan(
        &self,
        filter: RecordFilter,
        projection: &[RecordField],
    ) -> Result<Vec<UserRecord>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for entry in self.env.records_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, bytes) = entry.map_err(LmdbError::from)?;
            let record = decode_record(bytes).map_err(|e| {
                StoreError::Corruption(format!("record {key} is not a valid document: {e}"))
            })?;
            if filter.matches(&record) {
                out.push(record.project(projection));
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl RecordStore for LmdbRecordStore {
    async fn find_all(
        &self,
        filter: RecordFilter,
        projection: &[RecordField],
    ) -> Result<Vec<UserRecord>, StoreError> {
        self.scan(filter, projection)
    }

    async fn bulk_write(&self, ops: Vec<WriteOp>) -> Result<BulkWriteSummary, StoreError> {
        let mut batch = WriteBatch::new(&self.env)?;
        for op in &ops {
            batch.apply(op)?;
        }
        let summary = batch.commit()?;
        tracing::debug!(
            ops = ops.len(),
            matched = summary.matched,
            modified = summary.modified,
            deleted = summary.deleted,
            "bulk write committed"
        );
        Ok(summary)
    }

    async fn snapshot_collection(&self) -> Result<BackupId, StoreError> {
        let info = self.env.create_backup()?;
        tracing::info!(backup = %info.id, records = info.records, "collection backed up");
        Ok(info.id)
    }

    async fn list_backups(&self) -> Result<Vec<BackupInfo>, StoreError> {
        self.env.backups()
    }

    async fn restore_snapshot(&self, id: &BackupId) -> Result<u64, StoreError> {
        let restored = self.env.restore_backup(id)?;
        tracing::warn!(backup = %id, records = restored, "collection restored from backup");
        Ok(restored)
    }
}
