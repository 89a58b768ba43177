//! Consistent hashing ring that owns key/value placement.
//!
//! This crate implements the load balancer: a sorted sequence of virtual
//! nodes, each owning one [`ChainedStore`](ringlb_store::ChainedStore).
//! Physical servers join and leave as a fixed number of replicas, and every
//! topology change streams the affected pairs back through the ring so each
//! key always lives on its current owner.
//!
//! Ring positions come from `mix_u32(replica_id)` for virtual nodes and
//! `djb2(key)` for data keys. A key belongs to the first virtual node whose
//! position is at or after its own, wrapping to the smallest position.

mod error;
mod ring;

pub use error::PlacementError;
pub use ring::{Rebalance, Ring, Slot, VirtualNode};
