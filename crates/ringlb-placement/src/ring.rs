//! Consistent hashing ring implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::AddAssign;

use ringlb_store::ChainedStore;
use ringlb_types::{RingConfig, ReplicaId, ServerId, hash};
use tracing::{debug, trace, warn};

use crate::error::PlacementError;

/// One placement point on the ring.
///
/// A virtual node exclusively owns its store; dropping the node drops every
/// pair it holds.
#[derive(Debug)]
pub struct VirtualNode {
    hash: u32,
    id: ReplicaId,
    store: ChainedStore,
}

impl VirtualNode {
    fn new(id: ReplicaId, bucket_count: u32) -> Result<Self, PlacementError> {
        Ok(Self {
            hash: id.ring_hash(),
            id,
            store: ChainedStore::with_buckets(bucket_count)?,
        })
    }

    /// Position on the ring.
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Replica id of this node.
    pub fn id(&self) -> ReplicaId {
        self.id
    }

    /// Read-only view of the pairs this node holds.
    pub fn store(&self) -> &ChainedStore {
        &self.store
    }

    fn sort_key(&self) -> (u32, ReplicaId) {
        (self.hash, self.id)
    }
}

/// Result of a ring search.
///
/// `PastEnd` means no virtual node sits at or after the searched position;
/// callers reduce it cyclically with [`Slot::wrap`], which sends the traffic
/// to the first (smallest-hash) node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// An existing index.
    At(usize),
    /// One past the last index.
    PastEnd,
}

impl Slot {
    fn from_index(index: usize, len: usize) -> Self {
        if index < len {
            Slot::At(index)
        } else {
            Slot::PastEnd
        }
    }

    /// Reduce the slot onto a ring of `len` nodes.
    pub fn wrap(self, len: usize) -> usize {
        match self {
            Slot::At(i) if i < len => i,
            _ => 0,
        }
    }

    fn raw(self, len: usize) -> usize {
        match self {
            Slot::At(i) => i,
            Slot::PastEnd => len,
        }
    }
}

/// Pairs streamed through the ring by a topology change.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Rebalance {
    /// Pairs taken out of a source store.
    pub drained: usize,
    /// Drained pairs that ended up on a different virtual node.
    pub moved: usize,
}

impl AddAssign for Rebalance {
    fn add_assign(&mut self, rhs: Self) {
        self.drained += rhs.drained;
        self.moved += rhs.moved;
    }
}

/// Consistent hashing load balancer.
///
/// Virtual nodes are kept in a vector sorted by `(hash, id)` with no
/// duplicates. Lookups binary-search that vector; inserts and removals
/// shift it. Every physical server contributes
/// [`RingConfig::replicas_per_server`] virtual nodes.
#[derive(Debug)]
pub struct Ring {
    vnodes: Vec<VirtualNode>,
    config: RingConfig,
}

impl Default for Ring {
    fn default() -> Self {
        Self::new()
    }
}

impl Ring {
    /// Create an empty ring with the default configuration.
    pub fn new() -> Self {
        Self {
            vnodes: Vec::new(),
            config: RingConfig::default(),
        }
    }

    /// Create an empty ring with a custom configuration.
    pub fn with_config(config: RingConfig) -> Result<Self, PlacementError> {
        config
            .validate()
            .map_err(|reason| PlacementError::Config(reason.to_string()))?;
        Ok(Self {
            vnodes: Vec::new(),
            config,
        })
    }

    /// The configuration this ring was built with.
    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Searches
    // -----------------------------------------------------------------------

    /// Slot at which a replica would be inserted.
    ///
    /// Skips every node ordered at or before `(hash(id), id)`, so among nodes
    /// sharing a hash the new one lands after all smaller-or-equal ids.
    pub fn replica_slot(&self, id: ReplicaId) -> Slot {
        let target = (id.ring_hash(), id);
        let idx = self.vnodes.partition_point(|v| v.sort_key() <= target);
        Slot::from_index(idx, self.vnodes.len())
    }

    /// Slot of the node that owns `key`: the first node whose hash is at or
    /// after the key's hash.
    pub fn key_slot(&self, key: &[u8]) -> Slot {
        let target = hash::djb2(key);
        let idx = self.vnodes.partition_point(|v| v.hash < target);
        Slot::from_index(idx, self.vnodes.len())
    }

    fn index_of(&self, id: ReplicaId) -> Option<usize> {
        let len = self.vnodes.len();
        if len == 0 {
            return None;
        }
        // The search lands just past the match; step back, wrapping.
        let idx = match self.replica_slot(id).raw(len) {
            0 => len - 1,
            i => i - 1,
        };
        (self.vnodes[idx].id == id).then_some(idx)
    }

    fn owner_index(&self, key: &[u8]) -> Result<usize, PlacementError> {
        if self.vnodes.is_empty() {
            return Err(PlacementError::EmptyRing);
        }
        Ok(self.key_slot(key).wrap(self.vnodes.len()))
    }

    // -----------------------------------------------------------------------
    // Replica API
    // -----------------------------------------------------------------------

    /// Insert one virtual node and pull its share of keys from its successor.
    pub fn add_replica(&mut self, id: ReplicaId) -> Result<Rebalance, PlacementError> {
        if self.index_of(id).is_some() {
            return Err(PlacementError::DuplicateReplica(id));
        }
        let node = VirtualNode::new(id, self.config.bucket_count)?;

        if self.vnodes.is_empty() {
            self.vnodes.push(node);
            debug!(%id, "added first replica to ring");
            return Ok(Rebalance::default());
        }

        let pos = self.replica_slot(id).raw(self.vnodes.len());
        self.vnodes.insert(pos, node);

        let source = Slot::from_index(pos + 1, self.vnodes.len()).wrap(self.vnodes.len());
        let rebalance = self.rebalance_from(source);
        debug!(
            %id,
            pos,
            source = %self.vnodes[source].id,
            drained = rebalance.drained,
            moved = rebalance.moved,
            "added replica to ring"
        );
        Ok(rebalance)
    }

    /// Drain one node's store and re-place every pair under the current ring.
    fn rebalance_from(&mut self, source: usize) -> Rebalance {
        let mut rebalance = Rebalance::default();
        // The store is emptied up front; pairs that still belong to the
        // source are put straight back.
        let pairs = self.vnodes[source].store.drain();
        for (key, value) in pairs {
            let target = self.key_slot(&key).wrap(self.vnodes.len());
            rebalance.drained += 1;
            if target != source {
                rebalance.moved += 1;
                trace!(from = %self.vnodes[source].id, to = %self.vnodes[target].id, "moved pair");
            }
            self.vnodes[target].store.put_owned(key, value);
        }
        rebalance
    }

    /// Remove one virtual node and hand its pairs to the remaining nodes.
    ///
    /// Removing the last node discards whatever it held.
    pub fn remove_replica(&mut self, id: ReplicaId) -> Result<Rebalance, PlacementError> {
        let idx = self
            .index_of(id)
            .ok_or(PlacementError::UnknownReplica(id))?;
        let mut node = self.vnodes.remove(idx);

        let mut rebalance = Rebalance::default();
        if self.vnodes.is_empty() {
            if !node.store.is_empty() {
                warn!(%id, dropped = node.store.len(), "removed last replica, discarding its pairs");
            }
        } else {
            for (key, value) in node.store.drain() {
                let target = self.key_slot(&key).wrap(self.vnodes.len());
                self.vnodes[target].store.put_owned(key, value);
                rebalance.drained += 1;
                rebalance.moved += 1;
            }
        }
        node.store.destroy();

        debug!(%id, moved = rebalance.moved, "removed replica from ring");
        Ok(rebalance)
    }

    // -----------------------------------------------------------------------
    // Server API
    // -----------------------------------------------------------------------

    fn check_server_id(&self, server: ServerId) -> Result<(), PlacementError> {
        if self.config.accepts(server) {
            Ok(())
        } else {
            Err(PlacementError::InvalidServerId {
                id: server,
                stride: self.config.replica_stride,
            })
        }
    }

    /// Add a physical server as its replicas.
    pub fn add_server(&mut self, server: ServerId) -> Result<Rebalance, PlacementError> {
        self.check_server_id(server)?;
        if self
            .config
            .replicas(server)
            .any(|id| self.index_of(id).is_some())
        {
            return Err(PlacementError::DuplicateServer(server));
        }

        let mut total = Rebalance::default();
        for id in self.config.replicas(server) {
            total += self.add_replica(id)?;
        }
        debug!(%server, vnodes = self.vnodes.len(), moved = total.moved, "added server");
        Ok(total)
    }

    /// Remove a physical server and all of its replicas.
    pub fn remove_server(&mut self, server: ServerId) -> Result<Rebalance, PlacementError> {
        self.check_server_id(server)?;
        if !self.contains_server(server) {
            return Err(PlacementError::UnknownServer(server));
        }

        let mut total = Rebalance::default();
        for id in self.config.replicas(server) {
            total += self.remove_replica(id)?;
        }
        debug!(%server, vnodes = self.vnodes.len(), moved = total.moved, "removed server");
        Ok(total)
    }

    // -----------------------------------------------------------------------
    // Data API
    // -----------------------------------------------------------------------

    /// Store a pair on its owning node and report the owning server.
    pub fn store(&mut self, key: &[u8], value: &[u8]) -> Result<ServerId, PlacementError> {
        let idx = self.owner_index(key)?;
        let node = &mut self.vnodes[idx];
        let outcome = node.store.put(key, value);
        trace!(replica = %node.id, ?outcome, "stored pair");
        Ok(node.id.server(self.config.replica_stride))
    }

    /// Look up a key and report the server that owns it.
    ///
    /// An absent key is not an error: the value is `None` and the server is
    /// the one that would hold it.
    pub fn retrieve(&self, key: &[u8]) -> Result<(Option<&[u8]>, ServerId), PlacementError> {
        let idx = self.owner_index(key)?;
        let node = &self.vnodes[idx];
        Ok((
            node.store.get(key),
            node.id.server(self.config.replica_stride),
        ))
    }

    /// The server that owns `key`, without touching any store.
    pub fn owner_of(&self, key: &[u8]) -> Result<ServerId, PlacementError> {
        let idx = self.owner_index(key)?;
        Ok(self.vnodes[idx].id.server(self.config.replica_stride))
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Number of virtual nodes.
    pub fn len(&self) -> usize {
        self.vnodes.len()
    }

    /// Whether the ring has no virtual nodes.
    pub fn is_empty(&self) -> bool {
        self.vnodes.is_empty()
    }

    /// Virtual nodes in ring order.
    pub fn vnodes(&self) -> impl Iterator<Item = &VirtualNode> {
        self.vnodes.iter()
    }

    /// Whether every replica of `server` is on the ring.
    pub fn contains_server(&self, server: ServerId) -> bool {
        self.config
            .replicas(server)
            .all(|id| self.index_of(id).is_some())
    }

    /// Number of distinct physical servers with at least one replica.
    pub fn server_count(&self) -> usize {
        self.servers().len()
    }

    fn servers(&self) -> BTreeSet<ServerId> {
        let stride = self.config.replica_stride;
        self.vnodes.iter().map(|v| v.id.server(stride)).collect()
    }

    /// Total pairs held across all virtual nodes.
    pub fn key_count(&self) -> usize {
        self.vnodes.iter().map(|v| v.store.len()).sum()
    }

    /// Pairs held per physical server, including servers holding none.
    pub fn load_by_server(&self) -> BTreeMap<ServerId, usize> {
        let stride = self.config.replica_stride;
        let mut load = BTreeMap::new();
        for vnode in &self.vnodes {
            *load.entry(vnode.id.server(stride)).or_insert(0) += vnode.store.len();
        }
        load
    }

    /// Check the ring's structural invariants: strictly ascending
    /// `(hash, id)` and every hash matching its replica id.
    pub fn is_consistent(&self) -> bool {
        self.vnodes
            .windows(2)
            .all(|w| w[0].sort_key() < w[1].sort_key())
            && self.vnodes.iter().all(|v| v.hash == v.id.ring_hash())
    }

    /// Tear the ring down, releasing every virtual node and its store.
    pub fn destroy(self) {
        debug!(vnodes = self.vnodes.len(), keys = self.key_count(), "destroying ring");
        for node in self.vnodes {
            node.store.destroy();
        }
    }
}
