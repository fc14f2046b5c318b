//! Per-record reconciliation decisions and the update batch.
//!
//! Every lookup is launched at once and awaited jointly; the chain's
//! concurrency limit does the throttling. The batch is built only after all
//! decisions are known.

use futures_util::future::join_all;
use tracing::Instrument;

use regsync_chain::NftObject;
use regsync_store::{FieldSet, RecordFilter, WriteOp};
use regsync_types::UserRecord;

use crate::resolver::{NftResolver, Resolution};
use crate::tracing_spans::record_span;

/// What to do with one record.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// The wallet holds no qualifying NFT any more.
    Delete,
    Update(FieldSet),
    /// Stored state already matches the chain.
    Skip,
}

/// Counts gathered while planning updates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateTally {
    /// Records whose wallet-container id changed.
    pub wallet_updates: u64,
    /// Records whose NFT id changed or whose snapshot was missing.
    pub nft_updates: u64,
    pub deleted: u64,
    pub unchanged: u64,
    /// Lookups that failed (retry exhausted, transport, malformed content).
    pub lookup_failures: u64,
    pub without_wallet: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdatePlan {
    pub ops: Vec<WriteOp>,
    pub tally: UpdateTally,
}

/// Minimal field delta for a record whose wallet resolved to `nft`.
pub fn decide(record: &UserRecord, nft: &NftObject) -> Decision {
    let wallet_changed = record.wallet_object_id.as_ref() != Some(&nft.wallet_object_id);
    // A legacy embedded shape has no canonical id and always counts as changed.
    let nft_changed = record.nft_id() != Some(&nft.object_id);
    let data_missing = record.nft_data.is_none();

    let mut set = FieldSet::default();
    if wallet_changed {
        set.wallet_object_id = Some(nft.wallet_object_id.clone());
        set.nft_name = Some(nft.name.clone());
    }
    if nft_changed {
        set.nft_id = Some(nft.object_id.clone());
        set.nft_name = Some(nft.name.clone());
    }
    if wallet_changed || nft_changed || data_missing {
        set.nft_data = Some(nft.snapshot.clone());
    }

    if set.is_empty() {
        Decision::Skip
    } else {
        Decision::Update(set)
    }
}

/// Resolve every record with a wallet address and collect the writes.
pub async fn plan_updates(records: &[UserRecord], resolver: &NftResolver) -> UpdatePlan {
    let mut plan = UpdatePlan::default();

    let candidates: Vec<_> = RecordFilter::HasWallet
        .select(records)
        .filter_map(|r| r.wallet().map(|w| (r, w)))
        .collect();
    plan.tally.without_wallet = (records.len() - candidates.len()) as u64;

    let lookups = candidates.iter().map(|(record, wallet)| {
        resolver
            .resolve(wallet)
            .instrument(record_span(&record.id, wallet))
    });
    let results = join_all(lookups).await;

    for ((record, wallet), result) in candidates.into_iter().zip(results) {
        let decision = match result {
            Ok(Resolution::Found(nft)) => decide(record, &nft),
            Ok(Resolution::NotFound) => Decision::Delete,
            Err(e) => {
                tracing::warn!(
                    record = %record.id,
                    wallet = %wallet,
                    stage = "update",
                    error = %e,
                    "lookup failed, record left untouched this run"
                );
                plan.tally.lookup_failures += 1;
                continue;
            }
        };

        match decision {
            Decision::Delete => {
                tracing::info!(record = %record.id, wallet = %wallet, "no qualifying NFT, removing record");
                plan.tally.deleted += 1;
                plan.ops.push(WriteOp::Delete {
                    id: record.id.clone(),
                });
            }
            Decision::Update(set) => {
                if set.wallet_object_id.is_some() {
                    plan.tally.wallet_updates += 1;
                }
                if set.nft_id.is_some() || record.nft_data.is_none() {
                    plan.tally.nft_updates += 1;
                }
                plan.ops.push(WriteOp::Update {
                    id: record.id.clone(),
                    set,
                });
            }
            Decision::Skip => plan.tally.unchanged += 1,
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use regsync_types::{ObjectId, StoredNft};
    use serde_json::json;

    fn nft(id: &str, wallet: &str) -> NftObject {
        NftObject {
            object_id: ObjectId::new(id),
            name: format!("Hero {id}"),
            wallet_object_id: ObjectId::new(wallet),
            snapshot: json!({ "objectId": id }),
        }
    }

    fn reconciled(nft: &NftObject) -> UserRecord {
        let mut rec = UserRecord::new("u1");
        rec.wallet_object_id = Some(nft.wallet_object_id.clone());
        rec.nft = Some(StoredNft::Id(nft.object_id.clone()));
        rec.nft_name = Some(nft.name.clone());
        rec.nft_data = Some(nft.snapshot.clone());
        rec
    }

    #[test]
    fn consistent_record_is_skipped() {
        let nft = nft("0xn", "0xw");
        assert_eq!(decide(&reconciled(&nft), &nft), Decision::Skip);
    }

    #[test]
    fn new_wallet_container_updates_wallet_and_name() {
        let nft = nft("0xn", "0xw2");
        let mut rec = reconciled(&nft);
        rec.wallet_object_id = Some(ObjectId::new("0xw1"));
        let Decision::Update(set) = decide(&rec, &nft) else {
            panic!("expected update");
        };
        assert_eq!(set.wallet_object_id, Some(ObjectId::new("0xw2")));
        assert_eq!(set.nft_name.as_deref(), Some("Hero 0xn"));
        assert!(set.nft_id.is_none());
        assert!(set.nft_data.is_some());
    }

    #[test]
    fn changed_nft_refreshes_snapshot() {
        let new = nft("0xn2", "0xw");
        let rec = reconciled(&nft("0xn1", "0xw"));
        let Decision::Update(set) = decide(&rec, &new) else {
            panic!("expected update");
        };
        assert_eq!(set.nft_id, Some(ObjectId::new("0xn2")));
        assert_eq!(set.nft_data, Some(json!({ "objectId": "0xn2" })));
        assert!(set.wallet_object_id.is_none());
    }

    #[test]
    fn legacy_nft_shape_is_rewritten() {
        let nft = nft("0xn", "0xw");
        let mut rec = reconciled(&nft);
        rec.nft = Some(StoredNft::Legacy(json!({ "objectId": "0xn" })));
        let Decision::Update(set) = decide(&rec, &nft) else {
            panic!("expected update");
        };
        assert_eq!(set.nft_id, Some(ObjectId::new("0xn")));
    }

    #[test]
    fn missing_snapshot_alone_refreshes_data() {
        let nft = nft("0xn", "0xw");
        let mut rec = reconciled(&nft);
        rec.nft_data = None;
        let Decision::Update(set) = decide(&rec, &nft) else {
            panic!("expected update");
        };
        assert_eq!(set.len(), 1);
        assert!(set.nft_data.is_some());
    }

    #[test]
    fn applying_the_decision_makes_it_idempotent() {
        let nft = nft("0xn", "0xw");
        let mut rec = UserRecord::new("u1");
        let Decision::Update(set) = decide(&rec, &nft) else {
            panic!("expected update");
        };
        set.apply(&mut rec);
        assert_eq!(decide(&rec, &nft), Decision::Skip);
    }
}
