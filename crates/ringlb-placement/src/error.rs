//! Error types for ring operations.

use ringlb_store::StoreError;
use ringlb_types::{ReplicaId, ServerId};

/// Errors returned by [`Ring`](crate::Ring) operations.
///
/// Every check runs before the ring is touched, so a failed call leaves the
/// ring exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// Data traffic was issued before any server joined.
    #[error("ring has no servers")]
    EmptyRing,

    /// The server id collides with the replica id namespace.
    #[error("server id {id} must be below the replica stride {stride}")]
    InvalidServerId {
        /// The rejected id.
        id: ServerId,
        /// Offset between a server's replica ids.
        stride: u32,
    },

    /// The server (or one of its replicas) is already on the ring.
    #[error("server {0} is already on the ring")]
    DuplicateServer(ServerId),

    /// The server is not (fully) on the ring.
    #[error("server {0} is not on the ring")]
    UnknownServer(ServerId),

    /// The virtual node is already on the ring.
    #[error("replica {0} is already on the ring")]
    DuplicateReplica(ReplicaId),

    /// No virtual node carries this id.
    #[error("replica {0} is not on the ring")]
    UnknownReplica(ReplicaId),

    /// The ring configuration is unusable.
    #[error("invalid ring config: {0}")]
    Config(String),

    /// A virtual node's store could not be created.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
