//! LMDB storage backend for the user record collection.
//!
//! Implements [`regsync_store::RecordStore`] using the `heed` LMDB bindings.
//! Records are stored as JSON documents keyed by record id, so fields added
//! by later schema versions survive round-trips through older readers.

pub mod backup;
pub mod environment;
pub mod error;
pub mod record;
pub mod write_batch;

pub use environment::{Document, LmdbEnvironment};
pub use error::LmdbError;
pub use record::LmdbRecordStore;
pub use write_batch::WriteBatch;
