//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the engine (record store, chain provider,
//! notification sink, random draw) is abstracted behind a trait. This crate
//! provides implementations that:
//! - Return deterministic values
//! - Can be scripted and inspected programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod chain;
pub mod random;
pub mod sink;
pub mod store;

pub use chain::{nft_node, wallet_node, NullChain};
pub use random::NullRandom;
pub use sink::NullSink;
pub use store::NullStore;
