use std::time::Duration;

use deadline::deadline;

mod common;
#[allow(unused_imports)]
use crate::common::{
    create_detached_node, create_node, enable_tracing, introduce, test_config, Network,
};

#[tokio::test]
async fn replenish_fills_outbound_capacity() {
    const N: usize = 10;
    const CAPACITY: usize = 4;

    let network = Network::default();
    let node = create_node(&network, test_config().with_outbound_capacity(CAPACITY));

    for port in 0..N as u16 {
        let peer = create_node(&network, test_config());
        introduce(&node, peer.local_id(), port);
    }

    let attempts = node.replenish().await;

    assert!(attempts <= CAPACITY);
    assert_eq!(node.host().pair_attempts().len(), attempts);
    assert_eq!(node.streams().outbound_size(), attempts);
    assert!(node
        .streams()
        .outbound_peers()
        .iter()
        .all(|peer| node.routing_table().contains(peer)));

    // A second pass tops up whatever the first couldn't fill, never going over capacity.
    node.replenish().await;
    assert!(node.streams().outbound_size() <= CAPACITY);
}

#[tokio::test]
async fn replenish_single_bucket() {
    let network = Network::default();
    let node = create_node(&network, test_config().with_outbound_capacity(2));

    let peer = create_node(&network, test_config());
    introduce(&node, peer.local_id(), 1);

    // One bucket, so the whole capacity is its share, but it only has one peer to offer.
    assert_eq!(node.replenish().await, 1);
    assert_eq!(node.streams().outbound_peers(), vec![peer.local_id()]);

    // Nothing left to pick.
    assert_eq!(node.replenish().await, 0);
}

#[tokio::test]
async fn replenish_skips_peers_without_addrs() {
    let network = Network::default();
    let node = create_node(&network, test_config().with_outbound_capacity(4));

    for _ in 0..10 {
        let peer = create_node(&network, test_config());
        assert!(node.routing_table().insert(peer.local_id()));
    }

    assert_eq!(node.replenish().await, 0);
    assert!(node.host().pair_attempts().is_empty());
    assert_eq!(node.streams().outbound_size(), 0);
}

#[tokio::test]
async fn replenish_failure_keeps_peer() {
    let network = Network::default();
    let node = create_node(&network, test_config().with_outbound_capacity(1));
    let peer = create_detached_node(&network, test_config());

    introduce(&node, peer.local_id(), 1);

    assert_eq!(node.replenish().await, 1);
    assert_eq!(node.streams().outbound_size(), 0);

    // Unlike a failed probe, a failed pairing doesn't evict the peer.
    assert!(node.routing_table().contains(&peer.local_id()));
    assert!(node.peers().has_addrs(&peer.local_id()));

    // It stays eligible on the next pass.
    assert_eq!(node.replenish().await, 1);
    assert_eq!(
        node.host().pair_attempts(),
        vec![peer.local_id(), peer.local_id()]
    );
}

#[tokio::test]
async fn replenish_pairing_rejected() {
    let network = Network::default();
    let node = create_node(&network, test_config().with_outbound_capacity(1));
    let peer = create_node(&network, test_config());

    introduce(&node, peer.local_id(), 1);
    node.host().fail_pairing_with(peer.local_id());

    assert_eq!(node.replenish().await, 1);
    assert_eq!(node.streams().outbound_size(), 0);
    assert!(node.routing_table().contains(&peer.local_id()));
}

#[tokio::test(flavor = "multi_thread")]
async fn discovery_task_reaches_capacity() {
    // enable_tracing();

    const CAPACITY: usize = 3;

    let network = Network::default();
    let config = test_config()
        .with_outbound_capacity(CAPACITY)
        .with_max_bucket_size(u8::MAX);
    let node = create_node(&network, config);

    // With this many peers the farthest buckets have more than enough candidates to cover their
    // shares.
    for port in 0..64 {
        let peer = create_node(&network, test_config());
        introduce(&node, peer.local_id(), port);
    }

    let handle = node.discover_streams();

    let streams = node.streams().clone();
    deadline!(Duration::from_secs(3), move || streams.outbound_size()
        == CAPACITY);

    handle.shutdown().await;

    // Once stopped, freeing up capacity doesn't trigger any more pairing.
    let attempts = node.host().pair_attempts().len();
    let peer = node.streams().outbound_peers()[0];
    assert!(node.streams().remove_outbound(&peer));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(node.host().pair_attempts().len(), attempts);
}

#[tokio::test(flavor = "multi_thread")]
async fn discovery_shutdown_lets_pass_finish() {
    const CAPACITY: usize = 4;

    let network = Network::default();
    let config = test_config()
        .with_outbound_capacity(CAPACITY)
        .with_max_bucket_size(u8::MAX);
    let node = create_node(&network, config);
    node.host().delay_pairing(Duration::from_millis(100));

    for port in 0..64 {
        let peer = create_node(&network, test_config());
        introduce(&node, peer.local_id(), port);
    }

    let handle = node.discover_streams();

    // Wait for the pass to be underway, its pairings take 400ms in total.
    let host = node.host().clone();
    deadline!(Duration::from_secs(1), move || !host.pair_attempts().is_empty());
    assert!(node.streams().outbound_size() < CAPACITY);

    handle.shutdown().await;

    // The pass ran every one of its pairings before the task stopped.
    assert_eq!(node.host().pair_attempts().len(), CAPACITY);
    assert_eq!(node.streams().outbound_size(), CAPACITY);
}

#[tokio::test]
async fn discovery_task_idle_when_full() {
    let network = Network::default();
    let node = create_node(&network, test_config().with_outbound_capacity(1));

    let peer = create_node(&network, test_config());
    introduce(&node, peer.local_id(), 1);

    // Streams established out of band fill, then overflow, the capacity.
    let other = create_node(&network, test_config());
    node.streams().add_outbound(other.local_id());
    node.streams().add_outbound(peer.local_id());

    let handle = node.discover_streams();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!handle.is_finished());
    handle.shutdown().await;

    // Nothing was paired and nothing was evicted.
    assert!(node.host().pair_attempts().is_empty());
    assert_eq!(node.streams().outbound_size(), 2);
}

#[tokio::test]
async fn discovery_task_stops_when_handle_dropped() {
    let network = Network::default();
    let node = create_node(&network, test_config().with_outbound_capacity(1));

    drop(node.discover_streams());

    let peer = create_node(&network, test_config());
    introduce(&node, peer.local_id(), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(node.host().pair_attempts().is_empty());
}
