//! Integration test: store / retrieve round trips.

use ringlb_integration_tests::{TestCluster, random_pairs, spread_key};
use ringlb_placement::{PlacementError, Ring};
use ringlb_types::ServerId;

/// Empty ring, one server, one pair.
#[test]
fn test_single_server_ana_banana() {
    let mut ring = Ring::new();
    ring.add_server(ServerId::from(6352)).unwrap();

    assert_eq!(ring.store(b"ana", b"banana").unwrap(), ServerId::from(6352));
    let (value, server) = ring.retrieve(b"ana").unwrap();
    assert_eq!(value, Some(&b"banana"[..]));
    assert_eq!(server, ServerId::from(6352));
}

/// Store then retrieve returns the value and the same server, no matter how
/// many other keys were written in between.
#[test]
fn test_round_trip_with_interleaved_writes() {
    let mut c = TestCluster::new(&[1, 2, 3, 4]);
    let stored_on = c.store(b"anchor", b"value-0");

    for (key, value) in random_pairs(7, 2_000) {
        c.store(&key, &value);
    }

    let (value, server) = c.ring().retrieve(b"anchor").unwrap();
    assert_eq!(value, Some(&b"value-0"[..]));
    assert_eq!(server, stored_on);
    c.assert_all_readable();
}

/// A missing key is a normal result and still names a server.
#[test]
fn test_retrieve_missing_key() {
    let mut c = TestCluster::new(&[10, 20]);
    c.fill(50);

    let (value, server) = c.ring().retrieve(b"missing").unwrap();
    assert_eq!(value, None);
    assert!(server == ServerId::from(10) || server == ServerId::from(20));
}

/// Repeated lookups on an unchanged ring always route the same way.
#[test]
fn test_retrieve_is_deterministic() {
    let mut c = TestCluster::new(&[3, 5, 8, 13]);
    c.fill(200);
    let first = c.owners();
    for _ in 0..3 {
        assert_eq!(c.owners(), first);
    }
}

/// Overwriting a key keeps one copy with the newest value.
#[test]
fn test_overwrite_keeps_single_copy() {
    let mut c = TestCluster::new(&[1, 2]);
    let key = spread_key(9);
    let a = c.store(&key, b"first");
    let b = c.store(&key, b"second");
    assert_eq!(a, b);
    assert_eq!(c.ring().key_count(), 1);
    assert_eq!(c.ring().retrieve(&key).unwrap().0, Some(&b"second"[..]));
}

/// The node stores together hold exactly the written pairs, once each.
#[test]
fn test_node_stores_partition_written_pairs() {
    let mut c = TestCluster::new(&[2, 4, 6]);
    let pairs = random_pairs(11, 500);
    for (key, value) in &pairs {
        c.store(key, value);
    }
    c.add_server(8);
    c.remove_server(4);

    let merged = c.snapshot();
    assert_eq!(merged.len(), pairs.len());
    for (key, value) in &pairs {
        assert_eq!(merged.get(key), Some(value.as_slice()));
    }
}

/// Traffic before any server joins is rejected instead of misbehaving.
#[test]
fn test_traffic_on_empty_ring_is_rejected() {
    let mut ring = Ring::new();
    assert_eq!(ring.store(b"k", b"v"), Err(PlacementError::EmptyRing));
    assert_eq!(ring.retrieve(b"k"), Err(PlacementError::EmptyRing));
}

/// Binary keys and values are stored as raw bytes.
#[test]
fn test_binary_pairs() {
    let mut c = TestCluster::new(&[1, 2, 3]);
    c.store(&[0xff, 0x00, 0x7f], &[0, 0, 0]);
    c.store(&[], b"empty key");
    c.assert_all_readable();
}
