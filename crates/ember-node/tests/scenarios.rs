//! Multi-node dissemination scenarios, driven over real loopback TCP rather
//! than in-process method calls: `spec.md` §5's overlay join and broadcast
//! paths are exercised end to end, the way `ember-net`'s own connection
//! tests drive a real `TcpListener` rather than mocking the socket.

use ember_crypto::SignKeyPair;
use ember_node::{Core, CoreConfig};
use ember_post::compose::Composer;
use ember_post::PostEngineConfig;
use ember_types::wire::WireMessage;
use std::path::PathBuf;
use std::time::Duration;

fn node_config(listen_addr: &str, bootstrap_peers: Vec<String>) -> CoreConfig {
    CoreConfig {
        listen_addr: listen_addr.to_string(),
        bootstrap_peers,
        data_dir: PathBuf::from(":memory:"),
        ..CoreConfig::default()
    }
}

/// Gives a freshly spawned `Core::run()` time to bind its listener, dial its
/// bootstrap peer, and complete the `JOIN` handshake.
const SETTLE: Duration = Duration::from_millis(200);

#[tokio::test]
async fn a_post_broadcast_from_one_node_reaches_another_over_the_overlay() {
    let a = Core::bootstrap(node_config("127.0.0.1:18901", Vec::new())).await.expect("bootstrap a");
    let b = Core::bootstrap(node_config("127.0.0.1:18902", vec!["127.0.0.1:18901".to_string()])).await.expect("bootstrap b");

    let a_peers = a.peers.clone();
    let b_arena = b.arena.clone();

    tokio::spawn(async move {
        let _ = a.run().await;
    });
    tokio::spawn(async move {
        let _ = b.run().await;
    });

    tokio::time::sleep(SETTLE).await;

    let keypair = SignKeyPair::generate();
    let composer = Composer::new(keypair, "alice".to_string(), [3u8; 20], None, ember_node::toxicity::default_toxicity_predicate(), None);
    let post = composer
        .compose("hello from node a".to_string(), None, None, None, 0, &PostEngineConfig::default())
        .await
        .expect("compose");
    let post_id = post.id;

    a_peers.broadcast(WireMessage::NewPost { post }).await;
    tokio::time::sleep(SETTLE).await;

    assert!(b_arena.lock().await.contains(&post_id), "post broadcast over the overlay should land in the receiving node's arena");
}

#[tokio::test]
async fn a_sole_carrier_withdrawing_collapses_the_post_on_a_receiving_node() {
    let a = Core::bootstrap(node_config("127.0.0.1:18903", Vec::new())).await.expect("bootstrap a");
    let b = Core::bootstrap(node_config("127.0.0.1:18904", vec!["127.0.0.1:18903".to_string()])).await.expect("bootstrap b");

    let a_peers = a.peers.clone();
    let b_arena = b.arena.clone();

    tokio::spawn(async move {
        let _ = a.run().await;
    });
    tokio::spawn(async move {
        let _ = b.run().await;
    });

    tokio::time::sleep(SETTLE).await;

    let keypair = SignKeyPair::generate();
    let composer = Composer::new(keypair, "carol".to_string(), [7u8; 20], None, ember_node::toxicity::default_toxicity_predicate(), None);
    let post = composer
        .compose("ephemeral thought".to_string(), None, None, None, 0, &PostEngineConfig::default())
        .await
        .expect("compose");
    let post_id = post.id;

    a_peers.broadcast(WireMessage::NewPost { post }).await;
    tokio::time::sleep(SETTLE).await;
    assert!(b_arena.lock().await.contains(&post_id), "post must have landed before the carrier withdrawal can collapse it");

    a_peers
        .broadcast(WireMessage::CarrierUpdate {
            post_id,
            peer: "carol".to_string(),
            carrying: false,
        })
        .await;
    tokio::time::sleep(SETTLE).await;

    assert!(
        !b_arena.lock().await.contains(&post_id),
        "a non-reply post whose sole carrier withdrew should be dropped on receipt"
    );
}
