//! Detection of identities shared by more than one record.
//!
//! Duplicates are reported, never corrected.

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;

use regsync_types::{RefNumber, UserRecord, WalletAddress};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateReport {
    pub wallet_addresses: Vec<WalletAddress>,
    pub telegram_ids: Vec<String>,
    pub ref_numbers: Vec<RefNumber>,
}

/// Values seen more than once, each listed once, in first-seen order.
fn repeated<T: Eq + Hash + Clone>(values: impl Iterator<Item = T>) -> Vec<T> {
    let mut counts: HashMap<T, usize> = HashMap::new();
    let mut order = Vec::new();
    for value in values {
        let count = counts.entry(value.clone()).or_insert(0);
        *count += 1;
        if *count == 2 {
            order.push(value);
        }
    }
    order
}

impl DuplicateReport {
    pub fn scan(records: &[UserRecord]) -> Self {
        Self {
            wallet_addresses: repeated(records.iter().filter_map(|r| r.wallet().cloned())),
            telegram_ids: repeated(records.iter().filter_map(|r| r.telegram().map(str::to_string))),
            ref_numbers: repeated(records.iter().filter_map(|r| r.ref_number)),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.wallet_addresses.is_empty()
            && self.telegram_ids.is_empty()
            && self.ref_numbers.is_empty()
    }
}
