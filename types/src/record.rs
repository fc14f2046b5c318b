//! The stored user record and its schema-drift boundary types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{ObjectId, RecordId, RefNumber, WalletAddress};

/// Shape of the `nftId` field as it is found in the store.
///
/// Older runs embedded the whole NFT object where a scalar id now lives.
/// Anything that is not a plain string is kept as [`StoredNft::Legacy`] and
/// never trusted as an id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredNft {
    Id(ObjectId),
    Legacy(Value),
}

impl StoredNft {
    /// The canonical scalar id, or `None` for the legacy embedded shape.
    pub fn canonical_id(&self) -> Option<&ObjectId> {
        match self {
            StoredNft::Id(id) => Some(id),
            StoredNft::Legacy(_) => None,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, StoredNft::Legacy(_))
    }
}

/// Fields that can be requested from the store in a projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordField {
    WalletAddress,
    RefNumber,
    WalletObjectId,
    NftId,
    NftName,
    NftData,
    Population,
    TwitterId,
    TelegramId,
}

impl RecordField {
    pub const ALL: [RecordField; 9] = [
        RecordField::WalletAddress,
        RecordField::RefNumber,
        RecordField::WalletObjectId,
        RecordField::NftId,
        RecordField::NftName,
        RecordField::NftData,
        RecordField::Population,
        RecordField::TwitterId,
        RecordField::TelegramId,
    ];
}

/// One registered participant.
///
/// `id` is assigned by the store. `population`, `twitter_id` and
/// `telegram_id` are supplied externally and never written by the engine.
/// Everything from `wallet_object_id` to `nft_data` is derived from chain state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<WalletAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_number: Option<RefNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_object_id: Option<ObjectId>,
    #[serde(rename = "nftId", default, skip_serializing_if = "Option::is_none")]
    pub nft: Option<StoredNft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nft_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nft_data: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub population: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub twitter_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub telegram_id: Option<String>,
}

impl UserRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(id),
            ..Default::default()
        }
    }

    /// The wallet address, if present and non-blank.
    pub fn wallet(&self) -> Option<&WalletAddress> {
        self.wallet_address.as_ref().filter(|a| !a.is_empty())
    }

    /// The telegram id, if present and non-blank.
    pub fn telegram(&self) -> Option<&str> {
        self.telegram_id
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// The stored NFT id in canonical form.
    pub fn nft_id(&self) -> Option<&ObjectId> {
        self.nft.as_ref().and_then(StoredNft::canonical_id)
    }

    /// Copy of this record holding only `id` and the requested fields.
    pub fn project(&self, fields: &[RecordField]) -> UserRecord {
        let mut out = UserRecord {
            id: self.id.clone(),
            ..Default::default()
        };
        for field in fields {
            match field {
                RecordField::WalletAddress => out.wallet_address = self.wallet_address.clone(),
                RecordField::RefNumber => out.ref_number = self.ref_number,
                RecordField::WalletObjectId => {
                    out.wallet_object_id = self.wallet_object_id.clone()
                }
                RecordField::NftId => out.nft = self.nft.clone(),
                RecordField::NftName => out.nft_name = self.nft_name.clone(),
                RecordField::NftData => out.nft_data = self.nft_data.clone(),
                RecordField::Population => out.population = self.population,
                RecordField::TwitterId => out.twitter_id = self.twitter_id.clone(),
                RecordField::TelegramId => out.telegram_id = self.telegram_id.clone(),
            }
        }
        out
    }
}

// ── Lenient deserializers for externally supplied fields ───────────────

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
