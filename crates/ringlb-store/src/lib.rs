//! Key/value storage owned by each virtual node.
//!
//! This crate defines the [`KeyPolicy`] capability trait that tells a store
//! how to hash and compare its keys, along with the concrete store:
//!
//! - [`ChainedStore`] — fixed-size hash table with separate chaining that
//!   owns copies of every key and value it holds.

mod chained_store;
mod error;
mod traits;

pub use chained_store::{ChainedStore, DEFAULT_BUCKETS, Drain, PutOutcome};
pub use error::StoreError;
pub use traits::{IntKeys, KeyPolicy, StringKeys};
