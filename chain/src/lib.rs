//! Read-only chain access for the reconciliation engine.
//!
//! - [`ChainProvider`] is the raw query capability (`listOwnedObjects`,
//!   `getObject`); [`RpcChainClient`] implements it over JSON-RPC.
//! - [`schema`] is the single validation point that turns untyped responses
//!   into typed values or [`MalformedUpstreamData`].
//! - [`GuardedChain`] wraps a provider with the run-wide concurrency limit and
//!   rate-limit backoff. The engine only ever calls the chain through it.

pub mod error;
pub mod guarded;
pub mod provider;
pub mod retry;
pub mod rpc;
pub mod schema;

pub use error::{ChainError, MalformedUpstreamData};
pub use guarded::{GuardedChain, QueryStats};
pub use provider::{ChainProvider, ObjectOptions, OwnedObject, OwnedObjectsPage};
pub use retry::{with_backoff, RetryPolicy};
pub use rpc::RpcChainClient;
pub use schema::{NftObject, StakeSnapshot, WalletContainer, STAKE_CATEGORIES};
