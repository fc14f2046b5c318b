//! LMDB environment setup.

use std::path::{Path, PathBuf};

use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use serde_json::{Map, Value};

use regsync_types::UserRecord;

use crate::LmdbError;

/// Default map size: 1 GiB is far above any realistic registry size.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

const MAX_DBS: u32 = 8;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Env,
    path: PathBuf,
    /// Live collection: record id -> JSON document.
    pub(crate) records_db: Database<Str, Bytes>,
    /// Backup contents: `"{backup_id}/{record_id}"` -> JSON document.
    pub(crate) backups_db: Database<Str, Bytes>,
    /// Backup index: backup id -> JSON [`regsync_store::BackupInfo`].
    pub(crate) backup_index_db: Database<Str, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)
            .map_err(|e| LmdbError::Open(format!("{}: {e}", path.display())))?;

        // SAFETY: the environment is opened once per process for this path
        // and never mapped by another handle concurrently.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)
        }
        .map_err(|e| LmdbError::Open(format!("{}: {e}", path.display())))?;

        let mut wtxn = env.write_txn()?;
        let records_db = env.create_database(&mut wtxn, Some("users"))?;
        let backups_db = env.create_database(&mut wtxn, Some("users_backups"))?;
        let backup_index_db = env.create_database(&mut wtxn, Some("users_backup_index"))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), "opened LMDB environment");

        Ok(Self {
            env,
            path: path.to_path_buf(),
            records_db,
            backups_db,
            backup_index_db,
        })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A stored document as raw JSON, including keys [`UserRecord`] does not model.
pub type Document = Map<String, Value>;

pub(crate) fn encode_document(document: &Document) -> Result<Vec<u8>, LmdbError> {
    Ok(serde_json::to_vec(document)?)
}

pub(crate) fn decode_document(bytes: &[u8]) -> Result<Document, LmdbError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub(crate) fn decode_record(bytes: &[u8]) -> Result<UserRecord, LmdbError> {
    Ok(serde_json::from_slice(bytes)?)
}
