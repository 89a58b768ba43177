//! Shared test harness for ringlb integration tests.
//!
//! [`TestCluster`] pairs a ring with a model of every pair written through
//! it, so scenarios can check placement and data integrity after each
//! topology change.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ringlb_placement::{Rebalance, Ring};
use ringlb_store::{ChainedStore, PutOutcome};
use ringlb_types::{ServerId, hash};

/// Keys whose DJB2 hashes spread over the whole ring.
///
/// Short keys sharing a prefix (`key-1`, `key-2`, ...) hash into a narrow
/// band and would all land on one virtual node.
pub fn spread_key(i: u32) -> Vec<u8> {
    format!("user:{:08x}", hash::mix_u32(i)).into_bytes()
}

fn random_word(rng: &mut StdRng) -> Vec<u8> {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let len = rng.random_range(4..24);
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())])
        .collect()
}

/// Deterministic random alphanumeric pairs with unique keys.
pub fn random_pairs(seed: u64, count: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let mut key = random_word(&mut rng);
            key.extend_from_slice(format!("-{i}").as_bytes());
            let value = random_word(&mut rng);
            (key, value)
        })
        .collect()
}

/// A ring together with the pairs that should be readable from it.
pub struct TestCluster {
    ring: Ring,
    expected: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl TestCluster {
    /// Build a ring with the given physical servers.
    pub fn new(servers: &[u32]) -> Self {
        let mut ring = Ring::new();
        for &s in servers {
            ring.add_server(ServerId::from(s)).expect("add server");
        }
        Self {
            ring,
            expected: BTreeMap::new(),
        }
    }

    /// The ring under test.
    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    /// Store a pair and remember it.
    pub fn store(&mut self, key: &[u8], value: &[u8]) -> ServerId {
        let server = self.ring.store(key, value).expect("store");
        self.expected.insert(key.to_vec(), value.to_vec());
        server
    }

    /// Store `count` spread keys whose value is the key index.
    pub fn fill(&mut self, count: u32) {
        for i in 0..count {
            self.store(&spread_key(i), &i.to_le_bytes());
        }
    }

    /// Add a server, checking that no pair is lost or duplicated.
    pub fn add_server(&mut self, id: u32) -> Rebalance {
        let before = self.ring.key_count();
        let rebalance = self
            .ring
            .add_server(ServerId::from(id))
            .expect("add server");
        assert_eq!(
            self.ring.key_count(),
            before,
            "add_server({id}) changed pair count"
        );
        assert!(self.ring.is_consistent());
        rebalance
    }

    /// Remove a server, checking that no pair is lost or duplicated.
    ///
    /// Removing the last server drops its pairs, so the model is cleared too.
    pub fn remove_server(&mut self, id: u32) -> Rebalance {
        let before = self.ring.key_count();
        let rebalance = self
            .ring
            .remove_server(ServerId::from(id))
            .expect("remove server");
        if self.ring.is_empty() {
            self.expected.clear();
        } else {
            assert_eq!(
                self.ring.key_count(),
                before,
                "remove_server({id}) changed pair count"
            );
        }
        assert!(self.ring.is_consistent());
        rebalance
    }

    /// Current owner of every remembered key.
    pub fn owners(&self) -> BTreeMap<Vec<u8>, ServerId> {
        self.expected
            .keys()
            .map(|k| (k.clone(), self.ring.owner_of(k).expect("owner")))
            .collect()
    }

    /// Copy every pair held by the ring into one store.
    ///
    /// Panics if two virtual nodes hold the same key.
    pub fn snapshot(&self) -> ChainedStore {
        let mut merged = ChainedStore::new();
        for vnode in self.ring.vnodes() {
            for (key, value) in vnode.store().iter() {
                assert_eq!(
                    merged.put(key, value),
                    PutOutcome::Inserted,
                    "key {} held by more than one node",
                    String::from_utf8_lossy(key)
                );
            }
        }
        merged
    }

    /// Every remembered pair reads back with its value.
    pub fn assert_all_readable(&self) {
        assert_eq!(self.ring.key_count(), self.expected.len());
        for (key, value) in &self.expected {
            let (got, server) = self.ring.retrieve(key).expect("retrieve");
            assert_eq!(
                got,
                Some(value.as_slice()),
                "key {} unreadable",
                String::from_utf8_lossy(key)
            );
            assert_eq!(server, self.ring.owner_of(key).expect("owner"));
        }
    }

    /// Each pair sits in the store of the virtual node that owns its key.
    pub fn assert_keys_on_owners(&self) {
        let vnodes: Vec<_> = self.ring.vnodes().collect();
        for vnode in &vnodes {
            for (key, _) in vnode.store().iter() {
                let slot = self.ring.key_slot(key).wrap(vnodes.len());
                assert_eq!(
                    vnodes[slot].id(),
                    vnode.id(),
                    "key {} stranded on the wrong node",
                    String::from_utf8_lossy(key)
                );
            }
        }
    }
}
