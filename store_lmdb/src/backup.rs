//! Full-collection backups stored alongside the live collection.
//!
//! A backup copies every record document under a `"{backup_id}/"` key prefix
//! in a single write transaction and registers a [`BackupInfo`] in the index.

use std::time::{SystemTime, UNIX_EPOCH};

use regsync_store::{BackupId, BackupInfo, StoreError};

use crate::environment::LmdbEnvironment;
use crate::LmdbError;

fn backup_key(id: &BackupId, record_key: &str) -> String {
    format!("{}/{}", id.as_str(), record_key)
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl LmdbEnvironment {
    /// Copy the live collection into a new backup.
    pub fn create_backup(&self) -> Result<BackupInfo, StoreError> {
        let mut wtxn = self.env().write_txn().map_err(LmdbError::from)?;

        let seq = self
            .backup_index_db
            .len(&wtxn)
            .map_err(LmdbError::from)?;
        let info_id = BackupId::at(now_secs(), seq);

        let mut documents = Vec::new();
        for entry in self.records_db.iter(&wtxn).map_err(LmdbError::from)? {
            let (key, bytes) = entry.map_err(LmdbError::from)?;
            documents.push((key.to_string(), bytes.to_vec()));
        }

        for (key, bytes) in &documents {
            self.backups_db
                .put(&mut wtxn, &backup_key(&info_id, key), bytes)
                .map_err(LmdbError::from)?;
        }

        let info = BackupInfo {
            id: info_id,
            created_at: now_secs(),
            records: documents.len() as u64,
        };
        let info_bytes = serde_json::to_vec(&info).map_err(LmdbError::from)?;
        self.backup_index_db
            .put(&mut wtxn, info.id.as_str(), &info_bytes)
            .map_err(LmdbError::from)?;

        wtxn.commit().map_err(LmdbError::from)?;
        Ok(info)
    }

    /// All registered backups, oldest first.
    pub fn backups(&self) -> Result<Vec<BackupInfo>, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for entry in self.backup_index_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (_, bytes) = entry.map_err(LmdbError::from)?;
            let info: BackupInfo = serde_json::from_slice(bytes).map_err(LmdbError::from)?;
            out.push(info);
        }
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    /// Replace the live collection with a backup's documents.
    pub fn restore_backup(&self, id: &BackupId) -> Result<u64, StoreError> {
        let mut wtxn = self.env().write_txn().map_err(LmdbError::from)?;

        if self
            .backup_index_db
            .get(&wtxn, id.as_str())
            .map_err(LmdbError::from)?
            .is_none()
        {
            return Err(LmdbError::NotFound(id.to_string()).into());
        }

        let prefix = format!("{}/", id.as_str());
        let mut documents = Vec::new();
        for entry in self.backups_db.iter(&wtxn).map_err(LmdbError::from)? {
            let (key, bytes) = entry.map_err(LmdbError::from)?;
            if let Some(record_key) = key.strip_prefix(&prefix) {
                documents.push((record_key.to_string(), bytes.to_vec()));
            }
        }

        self.records_db.clear(&mut wtxn).map_err(LmdbError::from)?;
        for (key, bytes) in &documents {
            self.records_db
                .put(&mut wtxn, key, bytes)
                .map_err(LmdbError::from)?;
        }

        wtxn.commit().map_err(LmdbError::from)?;
        Ok(documents.len() as u64)
    }
}
