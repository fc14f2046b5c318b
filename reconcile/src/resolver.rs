//! NFT resolution with a per-run cache.
//!
//! A wallet's owned objects are paged through until the first object whose
//! type equals the configured descriptor; that object is then fetched in
//! full. Both "found" and "none found" are cached per wallet address. Two
//! lookups of the same address share one in-flight query. Failed lookups are
//! not cached, so a later caller retries them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use regsync_chain::{ChainError, GuardedChain, NftObject, ObjectOptions};
use regsync_types::{ObjectId, WalletAddress};

/// Outcome of a successful lookup.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Found(NftObject),
    /// The address owns no qualifying NFT.
    NotFound,
}

type CacheSlot = Arc<OnceCell<Resolution>>;

pub struct NftResolver {
    chain: Arc<GuardedChain>,
    nft_type: String,
    page_limit: usize,
    cache: Mutex<HashMap<WalletAddress, CacheSlot>>,
}

impl NftResolver {
    pub fn new(chain: Arc<GuardedChain>, nft_type: impl Into<String>, page_limit: usize) -> Self {
        Self {
            chain,
            nft_type: nft_type.into(),
            page_limit: page_limit.max(1),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn nft_type(&self) -> &str {
        &self.nft_type
    }

    /// Number of addresses with a settled result.
    pub fn cached(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub async fn resolve(&self, wallet: &WalletAddress) -> Result<Resolution, ChainError> {
        let slot = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(wallet.clone())
            .or_default()
            .clone();
        slot.get_or_try_init(|| self.lookup(wallet))
            .await
            .cloned()
    }

    async fn lookup(&self, wallet: &WalletAddress) -> Result<Resolution, ChainError> {
        let Some(nft_id) = self.first_match(wallet).await? else {
            tracing::debug!(wallet = %wallet, "no qualifying NFT owned");
            return Ok(Resolution::NotFound);
        };
        let data = self.chain.get_object(&nft_id, ObjectOptions::CONTENT).await?;
        let nft = NftObject::parse(data)?;
        tracing::debug!(wallet = %wallet, nft = %nft.object_id, "qualifying NFT resolved");
        Ok(Resolution::Found(nft))
    }

    /// First owned object of the configured type, in provider order.
    async fn first_match(&self, wallet: &WalletAddress) -> Result<Option<ObjectId>, ChainError> {
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .chain
                .list_owned_objects(wallet, cursor.as_deref(), self.page_limit)
                .await?;

            let hit = page
                .objects
                .iter()
                .find(|o| o.object_type.as_deref() == Some(self.nft_type.as_str()));
            if let Some(hit) = hit {
                return Ok(Some(hit.object_id.clone()));
            }
            if !page.continues() {
                return Ok(None);
            }
            if page.next_cursor == cursor {
                tracing::warn!(wallet = %wallet, cursor = ?cursor, "provider repeated a cursor, stopping pagination");
                return Ok(None);
            }
            cursor = page.next_cursor;
        }
    }
}
