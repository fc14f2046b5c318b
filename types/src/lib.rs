//! Fundamental types for the registry reconciliation engine.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! wallet addresses, object and record identifiers, reference numbers, the
//! stored user record, and the random-draw seam used by the allocator.

pub mod address;
pub mod error;
pub mod id;
pub mod random;
pub mod record;

pub use address::WalletAddress;
pub use error::TypesError;
pub use id::{ObjectId, RecordId, RefNumber};
pub use random::RefDraw;
pub use record::{RecordField, StoredNft, UserRecord};
