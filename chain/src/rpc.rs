//! JSON-RPC client for a Sui-style full node.
//!
//! `listOwnedObjects` maps to `suix_getOwnedObjects` and `getObject` to
//! `sui_getObject`. HTTP 429, or a JSON-RPC error whose message mentions
//! rate limiting, is reported as [`ChainError::RateLimited`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use regsync_types::{ObjectId, WalletAddress};

use crate::{
    ChainError, ChainProvider, MalformedUpstreamData, ObjectOptions, OwnedObject,
    OwnedObjectsPage,
};

/// Default timeout for one JSON-RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Public mainnet full node.
pub const DEFAULT_RPC_URL: &str = "https://fullnode.mainnet.sui.io:443";

/// Client for a full node's JSON-RPC endpoint.
pub struct RpcChainClient {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnedObjectsResult {
    #[serde(default)]
    data: Vec<ObjectResponse>,
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct ObjectResponse {
    data: Option<Value>,
    error: Option<Value>,
}

fn is_rate_limit_message(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    msg.contains("429") || msg.contains("rate limit") || msg.contains("too many requests")
}

fn map_send_error(e: reqwest::Error) -> ChainError {
    if e.status() == Some(StatusCode::TOO_MANY_REQUESTS) {
        ChainError::RateLimited
    } else if e.is_timeout() {
        ChainError::Transport(format!("request timed out: {e}"))
    } else if e.is_connect() {
        ChainError::Transport(format!("connection failed: {e}"))
    } else {
        ChainError::Transport(e.to_string())
    }
}

impl RpcChainClient {
    /// Create a client with default timeout settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ChainError::RateLimited);
        }
        if !status.is_success() {
            return Err(ChainError::Transport(format!("HTTP status {status}")));
        }

        let envelope: RpcEnvelope<T> = response.json().await.map_err(|e| {
            MalformedUpstreamData::new("rpc response", format!("{method}: {e}"))
        })?;

        if let Some(err) = envelope.error {
            if is_rate_limit_message(&err.message) {
                return Err(ChainError::RateLimited);
            }
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| MalformedUpstreamData::new("rpc response", format!("{method}: missing result")).into())
    }
}

fn owned_object_from(data: &Value) -> Option<OwnedObject> {
    let object_id = data.get("objectId")?.as_str()?;
    Some(OwnedObject {
        object_id: ObjectId::new(object_id),
        object_type: data.get("type").and_then(Value::as_str).map(str::to_string),
    })
}

#[async_trait]
impl ChainProvider for RpcChainClient {
    async fn list_owned_objects(
        &self,
        owner: &WalletAddress,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<OwnedObjectsPage, ChainError> {
        let params = json!([
            owner.as_str(),
            { "options": { "showType": true } },
            cursor,
            limit,
        ]);
        let result: OwnedObjectsResult = self.call("suix_getOwnedObjects", params).await?;

        let objects = result
            .data
            .iter()
            .filter_map(|entry| entry.data.as_ref())
            .filter_map(owned_object_from)
            .collect();

        Ok(OwnedObjectsPage {
            objects,
            next_cursor: result.next_cursor,
            has_next_page: result.has_next_page,
        })
    }

    async fn get_object(&self, id: &ObjectId, options: ObjectOptions) -> Result<Value, ChainError> {
        let params = json!([
            id.as_str(),
            {
                "showType": options.show_type,
                "showContent": options.show_content,
                "showOwner": options.show_owner,
            },
        ]);
        let result: ObjectResponse = self.call("sui_getObject", params).await?;
        match (result.data, result.error) {
            (Some(data), _) => Ok(data),
            (None, Some(err)) => {
                tracing::debug!(object = %id, error = %err, "object lookup returned error");
                Err(ChainError::ObjectNotFound(id.to_string()))
            }
            (None, None) => Err(MalformedUpstreamData::new(
                "object response",
                format!("{id}: neither data nor error"),
            )
            .into()),
        }
    }
}
