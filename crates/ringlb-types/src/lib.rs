//! Shared types for ringlb.
//!
//! This crate defines the identifiers used across the workspace
//! ([`ServerId`], [`ReplicaId`]), the hash functions that drive placement
//! ([`hash::djb2`], [`hash::mix_u32`]) and the ring configuration
//! ([`RingConfig`]).

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod hash;

// ---------------------------------------------------------------------------
// ID types
// ---------------------------------------------------------------------------

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Return the raw integer value.
            pub fn get(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a physical server, as supplied by the caller.
    ServerId
);

define_id!(
    /// Identifier of one virtual node: `server + k * replica_stride`.
    ReplicaId
);

impl ServerId {
    /// The id of this server's `k`-th replica.
    ///
    /// Replica 0 carries the server's own id.
    pub fn replica(self, k: u32, stride: u32) -> ReplicaId {
        ReplicaId(self.0.wrapping_add(k.wrapping_mul(stride)))
    }
}

impl ReplicaId {
    /// Collapse a replica id back onto the physical server that owns it.
    pub fn server(self, stride: u32) -> ServerId {
        ServerId(self.0 % stride)
    }

    /// Position of this replica on the ring.
    pub fn ring_hash(self) -> u32 {
        hash::mix_u32(self.0)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Shape of the ring and of every virtual node's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Virtual nodes placed on the ring per physical server.
    pub replicas_per_server: u32,
    /// Offset between a server's replica ids. Server ids must stay below it.
    pub replica_stride: u32,
    /// Fixed bucket count of each virtual node's store.
    pub bucket_count: u32,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            replicas_per_server: 3,
            replica_stride: 100_000,
            bucket_count: 128,
        }
    }
}

impl RingConfig {
    /// Check that the configuration describes a usable ring.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.replicas_per_server == 0 {
            return Err("replicas_per_server must be at least 1");
        }
        if self.replica_stride == 0 {
            return Err("replica_stride must be at least 1");
        }
        if self.bucket_count == 0 {
            return Err("bucket_count must be at least 1");
        }
        if self
            .replicas_per_server
            .checked_mul(self.replica_stride)
            .is_none()
        {
            return Err("replicas_per_server * replica_stride overflows u32");
        }
        Ok(())
    }

    /// Whether `server` fits below the replica stride.
    pub fn accepts(&self, server: ServerId) -> bool {
        server.get() < self.replica_stride
    }

    /// All replica ids of `server`, in insertion order.
    pub fn replicas(&self, server: ServerId) -> impl Iterator<Item = ReplicaId> + use<> {
        let stride = self.replica_stride;
        (0..self.replicas_per_server).map(move |k| server.replica(k, stride))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
