//! Cross-record statistics: balances, staked assets, population.
//!
//! Both computations isolate failures per record. A record whose balance
//! cannot be fetched, or whose stake structure is malformed, is left out of
//! the totals and counted; the rest still aggregate.

use std::cmp::Ordering;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::Instrument;

use regsync_chain::{GuardedChain, ObjectOptions, StakeSnapshot, WalletContainer, STAKE_CATEGORIES};
use regsync_store::RecordFilter;
use regsync_types::{ObjectId, RefNumber, UserRecord, WalletAddress};
use regsync_utils::{format_magnitude, format_percent};

use crate::tracing_spans::balance_span;

/// Stake category names, by position in the counts array.
pub const CATEGORY_NAMES: [&str; STAKE_CATEGORIES] =
    ["common", "uncommon", "rare", "epic", "legendary", "mythic"];

// ── Balances ───────────────────────────────────────────────────────────

/// One line of the balance report.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<WalletAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_number: Option<RefNumber>,
    pub wallet_object_id: ObjectId,
    /// Raw balance divided by the configured divisor.
    pub balance: f64,
    pub balance_formatted: String,
    /// Share of the total, two decimals.
    pub percent: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BalanceReport {
    /// Input order.
    pub entries: Vec<BalanceEntry>,
    pub total: f64,
    pub fetch_failures: u64,
}

impl BalanceReport {
    /// Build from `(record, raw balance)` pairs in input order.
    pub fn from_raw(balances: &[(&UserRecord, u128)], divisor: u64, fetch_failures: u64) -> Self {
        let divisor = divisor.max(1) as f64;
        let scaled: Vec<f64> = balances.iter().map(|(_, raw)| *raw as f64 / divisor).collect();
        let total: f64 = scaled.iter().sum();

        let entries = balances
            .iter()
            .zip(&scaled)
            .filter_map(|((record, _), &balance)| {
                Some(BalanceEntry {
                    wallet_address: record.wallet_address.clone(),
                    ref_number: record.ref_number,
                    wallet_object_id: record.wallet_object_id.clone()?,
                    balance,
                    balance_formatted: format_magnitude(balance),
                    percent: format_percent(balance, total),
                })
            })
            .collect();

        Self {
            entries,
            total,
            fetch_failures,
        }
    }

    /// Entries by numeric balance, largest first. Ties keep input order.
    pub fn sorted_desc(&self) -> Vec<BalanceEntry> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.balance.partial_cmp(&a.balance).unwrap_or(Ordering::Equal));
        sorted
    }

    pub fn total_formatted(&self) -> String {
        format_magnitude(self.total)
    }
}

/// Fetch every linked wallet container and build the balance report.
pub async fn aggregate_balances(
    records: &[UserRecord],
    chain: &GuardedChain,
    divisor: u64,
) -> BalanceReport {
    let linked: Vec<(&UserRecord, &ObjectId)> = RecordFilter::HasWalletObject
        .select(records)
        .filter_map(|r| r.wallet_object_id.as_ref().map(|w| (r, w)))
        .collect();

    let fetches = linked.iter().map(|(record, wallet_object)| {
        async move {
            let data = chain.get_object(wallet_object, ObjectOptions::CONTENT).await?;
            Ok::<_, regsync_chain::ChainError>(WalletContainer::parse(&data)?.raw_balance)
        }
        .instrument(balance_span(&record.id))
    });
    let results = join_all(fetches).await;

    let mut balances = Vec::with_capacity(linked.len());
    let mut failures = 0u64;
    for ((record, wallet_object), result) in linked.into_iter().zip(results) {
        match result {
            Ok(raw) => balances.push((record, raw)),
            Err(e) => {
                failures += 1;
                tracing::warn!(
                    record = %record.id,
                    wallet_object = %wallet_object,
                    stage = "aggregate",
                    error = %e,
                    "balance fetch failed, record left out of totals"
                );
            }
        }
    }

    BalanceReport::from_raw(&balances, divisor, failures)
}

// ── Stakes ─────────────────────────────────────────────────────────────

/// A staker whose category index is non-zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonQualifyingStaker {
    pub wallet_address: Option<WalletAddress>,
    pub ref_number: Option<RefNumber>,
    pub category_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StakeTotals {
    pub per_category: [u64; STAKE_CATEGORIES],
    pub total: u64,
    /// Records that contributed to the totals.
    pub stakers: u64,
    /// Records whose stake structure could not be parsed or summed.
    pub malformed: u64,
    pub non_qualifying: Vec<NonQualifyingStaker>,
}

impl StakeTotals {
    /// `(category name, count)` pairs in category order.
    pub fn categories(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        CATEGORY_NAMES.iter().copied().zip(self.per_category.iter().copied())
    }

    /// Category counts and grand total with `stake` added, or `None` if
    /// any of them would overflow.
    fn with(&self, stake: &StakeSnapshot) -> Option<([u64; STAKE_CATEGORIES], u64)> {
        let mut per_category = self.per_category;
        for (slot, count) in per_category.iter_mut().zip(stake.counts) {
            *slot = slot.checked_add(count)?;
        }
        let total = self.total.checked_add(stake.total())?;
        Some((per_category, total))
    }
}

/// Accumulate the staked-asset histogram from cached NFT snapshots.
pub fn aggregate_stakes(records: &[UserRecord]) -> StakeTotals {
    let mut totals = StakeTotals::default();
    for record in records {
        let Some(nft_data) = record.nft_data.as_ref() else {
            continue;
        };
        let stake = match StakeSnapshot::from_nft_data(nft_data) {
            Ok(Some(stake)) => stake,
            Ok(None) => continue,
            Err(e) => {
                totals.malformed += 1;
                tracing::warn!(record = %record.id, stage = "aggregate", error = %e, "stake structure skipped");
                continue;
            }
        };

        let Some((per_category, total)) = totals.with(&stake) else {
            totals.malformed += 1;
            tracing::warn!(record = %record.id, stage = "aggregate", "stake counts overflow the totals, skipped");
            continue;
        };
        totals.per_category = per_category;
        totals.total = total;
        totals.stakers += 1;
        if stake.category_index != 0 {
            totals.non_qualifying.push(NonQualifyingStaker {
                wallet_address: record.wallet_address.clone(),
                ref_number: record.ref_number,
                category_index: stake.category_index,
            });
        }
    }
    totals
}

/// Sum of every record's externally supplied population. A value that
/// would overflow the sum is left out.
pub fn total_population(records: &[UserRecord]) -> u64 {
    let mut total = 0u64;
    for record in records {
        let Some(population) = record.population else {
            continue;
        };
        match total.checked_add(population) {
            Some(sum) => total = sum,
            None => tracing::warn!(
                record = %record.id,
                population,
                stage = "aggregate",
                "population overflows the total, skipped"
            ),
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn linked(id: &str, wallet_object: &str) -> UserRecord {
        let mut r = UserRecord::new(id);
        r.wallet_object_id = Some(ObjectId::new(wallet_object));
        r
    }

    fn staker(id: &str, staked: Value) -> UserRecord {
        let mut r = UserRecord::new(id);
        r.nft_data = Some(json!({
            "objectId": format!("0xnft{id}"),
            "content": { "fields": { "wallet": "0xw", "staked_assets": staked } }
        }));
        r
    }

    #[test]
    fn sorts_by_magnitude_not_by_text() {
        let (a, b, c) = (linked("a", "0x1"), linked("b", "0x2"), linked("c", "0x3"));
        let report = BalanceReport::from_raw(&[(&a, 950), (&b, 1200), (&c, 999_000)], 1, 0);

        let input: Vec<&str> = report.entries.iter().map(|e| e.balance_formatted.as_str()).collect();
        assert_eq!(input, vec!["950.00", "1.20k", "999.00k"]);

        let sorted: Vec<String> = report
            .sorted_desc()
            .into_iter()
            .map(|e| e.balance_formatted)
            .collect();
        assert_eq!(sorted, vec!["999.00k", "1.20k", "950.00"]);
    }

    #[test]
    fn divisor_and_percent_shares() {
        let (a, b) = (linked("a", "0x1"), linked("b", "0x2"));
        let report = BalanceReport::from_raw(&[(&a, 3_000), (&b, 1_000)], 1_000, 0);
        assert_eq!(report.total, 4.0);
        assert_eq!(report.entries[0].balance, 3.0);
        assert_eq!(report.entries[0].percent, "75.00");
        assert_eq!(report.entries[1].percent, "25.00");
    }

    #[test]
    fn zero_total_gives_zero_percent() {
        let a = linked("a", "0x1");
        let report = BalanceReport::from_raw(&[(&a, 0)], 1_000, 0);
        assert_eq!(report.entries[0].percent, "0.00");
        assert_eq!(report.total_formatted(), "0.00");
    }

    #[test]
    fn ties_keep_input_order() {
        let (a, b) = (linked("a", "0x1"), linked("b", "0x2"));
        let report = BalanceReport::from_raw(&[(&a, 5), (&b, 5)], 1, 0);
        let sorted = report.sorted_desc();
        assert_eq!(sorted[0].wallet_object_id, ObjectId::new("0x1"));
    }

    #[test]
    fn stake_histogram_skips_malformed_records() {
        let records = vec![
            staker("1", json!([0, [1, 2, 0, 0, 0, 1]])),
            staker("2", json!([0, [1, 2, 3], 4])),
            staker("3", json!([0, ["x", 0, 0, 0, 0, 0]])),
            staker("4", json!([2, ["3", 0, 0, 0, 0, 0]])),
            UserRecord::new("5"),
        ];
        let totals = aggregate_stakes(&records);
        assert_eq!(totals.per_category, [4, 2, 0, 0, 0, 1]);
        assert_eq!(totals.total, 7);
        assert_eq!(totals.stakers, 2);
        assert_eq!(totals.malformed, 2);
        assert_eq!(totals.non_qualifying.len(), 1);
        assert_eq!(totals.non_qualifying[0].category_index, 2);

        let names: Vec<&str> = totals.categories().map(|(name, _)| name).collect();
        assert_eq!(names, CATEGORY_NAMES.to_vec());
    }

    #[test]
    fn oversized_stake_counts_do_not_abort_the_histogram() {
        let records = vec![
            staker("1", json!([0, [1, 0, 0, 0, 0, 0]])),
            staker("2", json!([0, ["18446744073709551615", "1", 0, 0, 0, 0]])),
            staker("3", json!([0, ["18446744073709551615", 0, 0, 0, 0, 0]])),
            staker("4", json!([0, [0, 2, 0, 0, 0, 0]])),
        ];
        let totals = aggregate_stakes(&records);
        // "2" cannot be summed; "3" fits alone but overflows on top of "1".
        assert_eq!(totals.per_category, [1, 2, 0, 0, 0, 0]);
        assert_eq!(totals.total, 3);
        assert_eq!(totals.stakers, 2);
        assert_eq!(totals.malformed, 2);
    }

    #[test]
    fn population_overflow_skips_the_offending_record() {
        let mut a = UserRecord::new("a");
        a.population = Some(u64::MAX);
        let mut b = UserRecord::new("b");
        b.population = Some(5);
        assert_eq!(total_population(&[a, b]), u64::MAX);
    }

    #[test]
    fn population_ignores_missing_values() {
        let mut a = UserRecord::new("a");
        a.population = Some(1_200);
        let mut b = UserRecord::new("b");
        b.population = Some(300);
        assert_eq!(total_population(&[a, b, UserRecord::new("c")]), 1_500);
    }
}
