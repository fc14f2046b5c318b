//! Bulk write operations.

use regsync_types::{ObjectId, RecordId, RefNumber, StoredNft, UserRecord};
use serde_json::{Map, Value};

/// Derived fields to set on one record. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldSet {
    pub ref_number: Option<RefNumber>,
    pub wallet_object_id: Option<ObjectId>,
    pub nft_id: Option<ObjectId>,
    pub nft_name: Option<String>,
    pub nft_data: Option<Value>,
}

impl FieldSet {
    pub fn is_empty(&self) -> bool {
        self.ref_number.is_none()
            && self.wallet_object_id.is_none()
            && self.nft_id.is_none()
            && self.nft_name.is_none()
            && self.nft_data.is_none()
    }

    /// Number of fields this set writes.
    pub fn len(&self) -> usize {
        usize::from(self.ref_number.is_some())
            + usize::from(self.wallet_object_id.is_some())
            + usize::from(self.nft_id.is_some())
            + usize::from(self.nft_name.is_some())
            + usize::from(self.nft_data.is_some())
    }

    /// Apply to a record. Returns whether any stored value changed.
    pub fn apply(&self, record: &mut UserRecord) -> bool {
        let before = record.clone();
        if let Some(n) = self.ref_number {
            record.ref_number = Some(n);
        }
        if let Some(id) = &self.wallet_object_id {
            record.wallet_object_id = Some(id.clone());
        }
        if let Some(id) = &self.nft_id {
            record.nft = Some(StoredNft::Id(id.clone()));
        }
        if let Some(name) = &self.nft_name {
            record.nft_name = Some(name.clone());
        }
        if let Some(data) = &self.nft_data {
            record.nft_data = Some(data.clone());
        }
        *record != before
    }

    /// The stored document keys this set writes, with their values.
    pub fn document_fields(&self) -> Vec<(&'static str, Value)> {
        let mut fields = Vec::with_capacity(self.len());
        if let Some(n) = self.ref_number {
            fields.push(("refNumber", Value::from(n.get())));
        }
        if let Some(id) = &self.wallet_object_id {
            fields.push(("walletObjectId", Value::from(id.as_str())));
        }
        if let Some(id) = &self.nft_id {
            fields.push(("nftId", Value::from(id.as_str())));
        }
        if let Some(name) = &self.nft_name {
            fields.push(("nftName", Value::from(name.as_str())));
        }
        if let Some(data) = &self.nft_data {
            fields.push(("nftData", data.clone()));
        }
        fields
    }

    /// Set this set's keys on a raw stored document, leaving every other key
    /// as it was. Returns whether any stored value changed.
    pub fn apply_to_document(&self, document: &mut Map<String, Value>) -> bool {
        let mut changed = false;
        for (key, value) in self.document_fields() {
            if document.get(key) != Some(&value) {
                document.insert(key.to_string(), value);
                changed = true;
            }
        }
        changed
    }
}

/// One operation in a bulk write, matched by record id.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    Update { id: RecordId, set: FieldSet },
    Delete { id: RecordId },
}

impl WriteOp {
    pub fn id(&self) -> &RecordId {
        match self {
            WriteOp::Update { id, .. } | WriteOp::Delete { id } => id,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, WriteOp::Delete { .. })
    }
}

/// Outcome counts of a bulk write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkWriteSummary {
    /// Update operations whose id matched a record.
    pub matched: u64,
    /// Matched updates that changed at least one stored value.
    pub modified: u64,
    pub deleted: u64,
    /// Operations whose id matched nothing.
    pub unmatched: u64,
}

impl BulkWriteSummary {
    pub fn merge(&mut self, other: BulkWriteSummary) {
        self.matched += other.matched;
        self.modified += other.modified;
        self.deleted += other.deleted;
        self.unmatched += other.unmatched;
    }
}
