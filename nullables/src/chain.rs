//! Nullable chain: scripted owned objects and object contents.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use regsync_chain::{ChainError, ChainProvider, ObjectOptions, OwnedObject, OwnedObjectsPage};
use regsync_types::{ObjectId, WalletAddress};

/// Build an NFT `data` node in the shape `getObject` returns.
pub fn nft_node(
    nft_id: &str,
    nft_type: &str,
    wallet_object_id: &str,
    name: &str,
    staked_assets: Option<Value>,
) -> Value {
    let mut fields = json!({ "name": name, "wallet": wallet_object_id });
    if let Some(staked) = staked_assets {
        fields["staked_assets"] = staked;
    }
    json!({
        "objectId": nft_id,
        "type": nft_type,
        "content": { "dataType": "moveObject", "type": nft_type, "fields": fields }
    })
}

/// Build a wallet-container `data` node holding `balance`.
pub fn wallet_node(wallet_object_id: &str, balance: u64) -> Value {
    json!({
        "objectId": wallet_object_id,
        "type": "0x2::coin::Coin",
        "content": { "dataType": "moveObject", "fields": { "balance": balance.to_string() } }
    })
}

/// A test chain provider backed by in-memory maps.
///
/// Owned objects are paginated with the requested `limit`; the cursor is
/// the offset of the next page.
pub struct NullChain {
    owned: Mutex<HashMap<String, Vec<OwnedObject>>>,
    objects: Mutex<HashMap<ObjectId, Value>>,
    throttled_owners: Mutex<HashSet<String>>,
    throttled_objects: Mutex<HashSet<ObjectId>>,
    list_calls: Mutex<HashMap<String, usize>>,
    get_calls: AtomicUsize,
}

impl NullChain {
    pub fn new() -> Self {
        Self {
            owned: Mutex::new(HashMap::new()),
            objects: Mutex::new(HashMap::new()),
            throttled_owners: Mutex::new(HashSet::new()),
            throttled_objects: Mutex::new(HashSet::new()),
            list_calls: Mutex::new(HashMap::new()),
            get_calls: AtomicUsize::new(0),
        }
    }

    /// Add an object to `owner`'s owned set (listed in insertion order).
    pub fn own(&self, owner: &str, object_id: &str, object_type: &str) {
        self.owned
            .lock()
            .unwrap()
            .entry(owner.to_string())
            .or_default()
            .push(OwnedObject {
                object_id: ObjectId::new(object_id),
                object_type: Some(object_type.to_string()),
            });
    }

    /// Set the `data` node returned by `get_object` for an id.
    pub fn put_object(&self, data: Value) {
        let id = data
            .get("objectId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.objects.lock().unwrap().insert(ObjectId::new(id), data);
    }

    /// Register a qualifying NFT owned by `owner`, plus its wallet container.
    pub fn add_holder(
        &self,
        owner: &str,
        nft_type: &str,
        nft_id: &str,
        wallet_object_id: &str,
        balance: u64,
    ) {
        self.own(owner, nft_id, nft_type);
        self.put_object(nft_node(nft_id, nft_type, wallet_object_id, nft_id, None));
        self.put_object(wallet_node(wallet_object_id, balance));
    }

    /// Remove everything `owner` holds.
    pub fn disown_all(&self, owner: &str) {
        self.owned.lock().unwrap().remove(owner);
    }

    /// Every listing for `owner` signals rate limiting.
    pub fn throttle_owner(&self, owner: &str) {
        self.throttled_owners.lock().unwrap().insert(owner.to_string());
    }

    /// Every fetch of `object_id` signals rate limiting.
    pub fn throttle_object(&self, object_id: &str) {
        self.throttled_objects
            .lock()
            .unwrap()
            .insert(ObjectId::new(object_id));
    }

    /// `list_owned_objects` calls made for `owner`.
    pub fn list_calls_for(&self, owner: &str) -> usize {
        self.list_calls
            .lock()
            .unwrap()
            .get(owner)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_list_calls(&self) -> usize {
        self.list_calls.lock().unwrap().values().sum()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

impl Default for NullChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainProvider for NullChain {
    async fn list_owned_objects(
        &self,
        owner: &WalletAddress,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<OwnedObjectsPage, ChainError> {
        *self
            .list_calls
            .lock()
            .unwrap()
            .entry(owner.to_string())
            .or_default() += 1;

        if self.throttled_owners.lock().unwrap().contains(owner.as_str()) {
            return Err(ChainError::RateLimited);
        }

        let owned = self.owned.lock().unwrap();
        let all = owned.get(owner.as_str()).map(Vec::as_slice).unwrap_or(&[]);
        let start = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| ChainError::Rpc {
                    code: -32602,
                    message: format!("invalid cursor {c}"),
                })?,
            None => 0,
        };
        let end = (start + limit.max(1)).min(all.len());
        let objects = all.get(start..end).unwrap_or(&[]).to_vec();
        let has_next_page = end < all.len();
        Ok(OwnedObjectsPage {
            objects,
            next_cursor: has_next_page.then(|| end.to_string()),
            has_next_page,
        })
    }

    async fn get_object(&self, id: &ObjectId, _options: ObjectOptions) -> Result<Value, ChainError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.throttled_objects.lock().unwrap().contains(id) {
            return Err(ChainError::RateLimited);
        }
        self.objects
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ChainError::ObjectNotFound(id.to_string()))
    }
}
