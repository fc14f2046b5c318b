//! Chain query provider trait.

use async_trait::async_trait;
use serde_json::Value;

use regsync_types::{ObjectId, WalletAddress};

use crate::ChainError;

/// One entry of an owned-objects page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedObject {
    pub object_id: ObjectId,
    /// Full type descriptor, when the provider returned one.
    pub object_type: Option<String>,
}

/// A cursor-paginated page of objects owned by an address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnedObjectsPage {
    pub objects: Vec<OwnedObject>,
    pub next_cursor: Option<String>,
    pub has_next_page: bool,
}

impl OwnedObjectsPage {
    /// Whether another page should be requested after this one.
    pub fn continues(&self) -> bool {
        self.has_next_page && self.next_cursor.is_some() && !self.objects.is_empty()
    }
}

/// Which parts of an object `get_object` should return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectOptions {
    pub show_type: bool,
    pub show_content: bool,
    pub show_owner: bool,
}

impl ObjectOptions {
    /// Type and Move content: enough for NFT and wallet-container parsing.
    pub const CONTENT: Self = Self {
        show_type: true,
        show_content: true,
        show_owner: false,
    };
}

/// Read-only chain query capability.
///
/// Implementations must report upstream throttling as
/// [`ChainError::RateLimited`] so the retry wrapper can recognise it.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// One page of objects owned by `owner`, starting after `cursor`.
    async fn list_owned_objects(
        &self,
        owner: &WalletAddress,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<OwnedObjectsPage, ChainError>;

    /// The object's `data` node (`objectId`, `type`, `content`, ...).
    async fn get_object(&self, id: &ObjectId, options: ObjectOptions) -> Result<Value, ChainError>;
}
