//! Typed views over untyped object responses.
//!
//! Every "is this field present and the right shape" check for chain data
//! lives here. Callers receive a typed value or [`MalformedUpstreamData`].

use serde_json::{Map, Value};

use regsync_types::ObjectId;

use crate::MalformedUpstreamData;

/// Move field holding the staked-asset structure on the NFT.
pub const STAKED_ASSETS_FIELD: &str = "staked_assets";

/// Number of staked-asset categories, indexed by position.
pub const STAKE_CATEGORIES: usize = 6;

/// The `content.fields` map of an object `data` node.
fn move_fields<'a>(
    data: &'a Value,
    kind: &'static str,
) -> Result<&'a Map<String, Value>, MalformedUpstreamData> {
    data.get("content")
        .and_then(|c| c.get("fields"))
        .and_then(Value::as_object)
        .ok_or_else(|| MalformedUpstreamData::new(kind, "missing content.fields"))
}

fn object_id_of(data: &Value, kind: &'static str) -> Result<ObjectId, MalformedUpstreamData> {
    data.get("objectId")
        .and_then(Value::as_str)
        .map(ObjectId::new)
        .ok_or_else(|| MalformedUpstreamData::new(kind, "missing objectId"))
}

/// Accepts `"0x.."`, `{ "id": "0x.." }` and `{ "id": { "id": "0x.." } }`.
fn id_reference(value: &Value) -> Option<ObjectId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(ObjectId::new(s.as_str())),
        Value::Object(map) => map.get("id").and_then(id_reference),
        _ => None,
    }
}

/// Non-negative integer given as a JSON number or a decimal string.
fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// A qualifying NFT as returned by `getObject`.
#[derive(Clone, Debug, PartialEq)]
pub struct NftObject {
    pub object_id: ObjectId,
    /// Display name; empty when the object carries none.
    pub name: String,
    /// The wallet-container object referenced from the NFT's fields.
    pub wallet_object_id: ObjectId,
    /// The full `data` node, cached on the record as `nftData`.
    pub snapshot: Value,
}

impl NftObject {
    pub fn parse(data: Value) -> Result<Self, MalformedUpstreamData> {
        const KIND: &str = "nft object";
        let object_id = object_id_of(&data, KIND)?;
        let fields = move_fields(&data, KIND)?;

        let wallet_object_id = fields
            .get("wallet")
            .and_then(id_reference)
            .ok_or_else(|| MalformedUpstreamData::new(KIND, "missing wallet reference"))?;

        let name = match fields.get("name") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(MalformedUpstreamData::new(
                    KIND,
                    format!("name is not a string: {other}"),
                ))
            }
        };

        Ok(Self {
            object_id,
            name,
            wallet_object_id,
            snapshot: data,
        })
    }
}

/// The fungible balance container referenced by an NFT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletContainer {
    pub object_id: ObjectId,
    /// Raw on-chain balance; zero when the field is absent.
    pub raw_balance: u128,
}

impl WalletContainer {
    pub fn parse(data: &Value) -> Result<Self, MalformedUpstreamData> {
        const KIND: &str = "wallet container";
        let object_id = object_id_of(data, KIND)?;
        let fields = move_fields(data, KIND)?;

        let raw_balance = match fields.get("balance") {
            None | Some(Value::Null) => 0,
            Some(Value::Number(n)) => n.as_u64().map(u128::from).ok_or_else(|| {
                MalformedUpstreamData::new(KIND, format!("balance is not a non-negative integer: {n}"))
            })?,
            Some(Value::String(s)) => s.trim().parse::<u128>().map_err(|_| {
                MalformedUpstreamData::new(KIND, format!("balance is not a decimal string: {s:?}"))
            })?,
            Some(other) => {
                return Err(MalformedUpstreamData::new(
                    KIND,
                    format!("unexpected balance shape: {other}"),
                ))
            }
        };

        Ok(Self {
            object_id,
            raw_balance,
        })
    }
}

/// Staked-asset structure cached in an NFT snapshot:
/// `[category_index, [c0, c1, c2, c3, c4, c5]]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeSnapshot {
    pub category_index: u64,
    pub counts: [u64; STAKE_CATEGORIES],
}

impl StakeSnapshot {
    /// Extract the stake structure from a cached NFT snapshot.
    ///
    /// `Ok(None)` means the NFT carries no stake structure at all.
    pub fn from_nft_data(nft_data: &Value) -> Result<Option<Self>, MalformedUpstreamData> {
        const KIND: &str = "stake structure";
        let fields = move_fields(nft_data, KIND)?;
        match fields.get(STAKED_ASSETS_FIELD) {
            None | Some(Value::Null) => Ok(None),
            Some(raw) => Self::parse(raw).map(Some),
        }
    }

    pub fn parse(raw: &Value) -> Result<Self, MalformedUpstreamData> {
        const KIND: &str = "stake structure";
        let pair = raw
            .as_array()
            .ok_or_else(|| MalformedUpstreamData::new(KIND, "not an array"))?;
        if pair.len() != 2 {
            return Err(MalformedUpstreamData::new(
                KIND,
                format!("expected 2 elements, found {}", pair.len()),
            ));
        }

        let category_index = parse_count(&pair[0])
            .ok_or_else(|| MalformedUpstreamData::new(KIND, "category index is not a count"))?;

        let entries = pair[1]
            .as_array()
            .ok_or_else(|| MalformedUpstreamData::new(KIND, "counts are not an array"))?;
        if entries.len() != STAKE_CATEGORIES {
            return Err(MalformedUpstreamData::new(
                KIND,
                format!(
                    "expected {STAKE_CATEGORIES} category counts, found {}",
                    entries.len()
                ),
            ));
        }

        let mut counts = [0u64; STAKE_CATEGORIES];
        for (slot, entry) in counts.iter_mut().zip(entries) {
            *slot = parse_count(entry).ok_or_else(|| {
                MalformedUpstreamData::new(KIND, format!("unparseable count: {entry}"))
            })?;
        }
        if counts.iter().try_fold(0u64, |acc, &c| acc.checked_add(c)).is_none() {
            return Err(MalformedUpstreamData::new(KIND, "category counts overflow their sum"));
        }

        Ok(Self {
            category_index,
            counts,
        })
    }

    /// Sum of all category counts. Parsing rejects counts whose sum
    /// would not fit.
    pub fn total(&self) -> u64 {
        self.counts.iter().fold(0, |acc, &c| acc.saturating_add(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nft_data(fields: Value) -> Value {
        json!({
            "objectId": "0xnft",
            "type": "0xpkg::hero::Hero",
            "content": { "dataType": "moveObject", "fields": fields }
        })
    }

    #[test]
    fn parses_nft_with_string_wallet() {
        let nft = NftObject::parse(nft_data(json!({ "name": "Hero #1", "wallet": "0xw" }))).unwrap();
        assert_eq!(nft.object_id, ObjectId::new("0xnft"));
        assert_eq!(nft.name, "Hero #1");
        assert_eq!(nft.wallet_object_id, ObjectId::new("0xw"));
        assert_eq!(nft.snapshot["content"]["fields"]["name"], "Hero #1");
    }

    #[test]
    fn parses_nested_wallet_reference() {
        let nft = NftObject::parse(nft_data(json!({ "wallet": { "id": { "id": "0xw" } } }))).unwrap();
        assert_eq!(nft.wallet_object_id, ObjectId::new("0xw"));
        assert_eq!(nft.name, "");
    }

    #[test]
    fn nft_without_wallet_is_malformed() {
        let err = NftObject::parse(nft_data(json!({ "name": "x" }))).unwrap_err();
        assert_eq!(err.kind, "nft object");
    }

    #[test]
    fn nft_without_content_is_malformed() {
        assert!(NftObject::parse(json!({ "objectId": "0xnft" })).is_err());
    }

    #[test]
    fn wallet_balance_shapes() {
        let container = |balance: Value| {
            json!({ "objectId": "0xw", "content": { "fields": { "balance": balance } } })
        };
        assert_eq!(
            WalletContainer::parse(&container(json!("1200"))).unwrap().raw_balance,
            1200
        );
        assert_eq!(
            WalletContainer::parse(&container(json!(950))).unwrap().raw_balance,
            950
        );
        assert!(WalletContainer::parse(&container(json!({ "value": 1 }))).is_err());
        assert!(WalletContainer::parse(&container(json!("-5"))).is_err());

        let absent = json!({ "objectId": "0xw", "content": { "fields": {} } });
        assert_eq!(WalletContainer::parse(&absent).unwrap().raw_balance, 0);
    }

    #[test]
    fn stake_structure_accepts_numbers_and_strings() {
        let data = nft_data(json!({
            "wallet": "0xw",
            "staked_assets": [0, ["1", 2, "0", 0, "3", 0]]
        }));
        let stake = StakeSnapshot::from_nft_data(&data).unwrap().unwrap();
        assert_eq!(stake.category_index, 0);
        assert_eq!(stake.counts, [1, 2, 0, 0, 3, 0]);
        assert_eq!(stake.total(), 6);
    }

    #[test]
    fn stake_structure_absent_is_not_malformed() {
        let data = nft_data(json!({ "wallet": "0xw" }));
        assert_eq!(StakeSnapshot::from_nft_data(&data).unwrap(), None);
    }

    #[test]
    fn stake_structure_wrong_arity_is_malformed() {
        let raw = json!([0, [1, 2, 3, 4, 5, 6], 9]);
        assert!(StakeSnapshot::parse(&raw).is_err());
    }

    #[test]
    fn stake_structure_non_numeric_is_malformed() {
        let raw = json!([0, [1, "many", 3, 4, 5, 6]]);
        assert!(StakeSnapshot::parse(&raw).is_err());
        let raw = json!([0, [1, 2, 3]]);
        assert!(StakeSnapshot::parse(&raw).is_err());
        let raw = json!([0, [-1, 0, 0, 0, 0, 0]]);
        assert!(StakeSnapshot::parse(&raw).is_err());
    }

    #[test]
    fn stake_counts_whose_sum_overflows_are_malformed() {
        let raw = json!([0, ["18446744073709551615", "1", 0, 0, 0, 0]]);
        let err = StakeSnapshot::parse(&raw).unwrap_err();
        assert_eq!(err.kind, "stake structure");

        let raw = json!([0, ["18446744073709551615", 0, 0, 0, 0, 0]]);
        assert_eq!(StakeSnapshot::parse(&raw).unwrap().total(), u64::MAX);
    }
}
