//! Write batching: applies a whole bulk write inside a single LMDB write
//! transaction, so one `bulk_write` call costs one commit.
//!
//! Updates patch the stored JSON document key by key. Keys outside the
//! update's field set are written back with the values they were found with.
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).

use heed::RwTxn;

use regsync_store::{BulkWriteSummary, StoreError, WriteOp};
use regsync_types::RecordId;

use crate::environment::{decode_document, encode_document, Document, LmdbEnvironment};
use crate::LmdbError;

pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
    summary: BulkWriteSummary,
}

impl<'a> WriteBatch<'a> {
    /// Begin a new write batch.
    pub fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().write_txn().map_err(LmdbError::from)?;
        Ok(Self {
            txn,
            env,
            summary: BulkWriteSummary::default(),
        })
    }

    /// Apply one match-one operation.
    pub fn apply(&mut self, op: &WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::Update { id, set } => {
                let Some(mut document) = self.get(id)? else {
                    self.summary.unmatched += 1;
                    return Ok(());
                };
                self.summary.matched += 1;
                if set.apply_to_document(&mut document) {
                    self.put(id.as_str(), &document)?;
                    self.summary.modified += 1;
                }
            }
            WriteOp::Delete { id } => {
                let removed = self
                    .env
                    .records_db
                    .delete(&mut self.txn, id.as_str())
                    .map_err(LmdbError::from)?;
                if removed {
                    self.summary.deleted += 1;
                } else {
                    self.summary.unmatched += 1;
                }
            }
        }
        Ok(())
    }

    /// Insert or replace a whole document, keyed by its `id` field.
    pub fn put_document(&mut self, document: &Document) -> Result<RecordId, StoreError> {
        let id = document
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::Serialization("document has no string id".into()))?;
        let id = RecordId::new(id);
        self.put(id.as_str(), document)?;
        Ok(id)
    }

    fn put(&mut self, key: &str, document: &Document) -> Result<(), StoreError> {
        let bytes = encode_document(document)?;
        self.env
            .records_db
            .put(&mut self.txn, key, &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn get(&self, id: &RecordId) -> Result<Option<Document>, StoreError> {
        let bytes = self
            .env
            .records_db
            .get(&self.txn, id.as_str())
            .map_err(LmdbError::from)?;
        bytes
            .map(|b| {
                decode_document(b).map_err(|e| {
                    StoreError::Corruption(format!("record {id} is not a JSON object: {e}"))
                })
            })
            .transpose()
    }

    /// Commit all operations atomically.
    pub fn commit(self) -> Result<BulkWriteSummary, StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(self.summary)
    }
}
