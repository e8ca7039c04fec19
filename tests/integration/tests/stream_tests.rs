//! Connection lifecycle tests
//!
//! Each test plays the server side of the gateway protocol over a scripted
//! in-memory transport: handshakes, session snapshots, deliberate closes,
//! and withheld heartbeat acks.
//!
//! Run with: cargo test -p integration-tests --test stream_tests

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{eventually, fixtures, ScriptedConnector};
use parley_cache::StateCache;
use parley_common::ClientConfig;
use parley_core::{Intents, Snowflake};
use parley_gateway::{
    CloseCode, ConnectionState, Dispatcher, EventStream, EventStreamHandle, GatewayError,
};
use serde_json::json;
use tokio::task::JoinHandle;

struct Harness {
    cache: Arc<StateCache>,
    handle: EventStreamHandle,
    task: JoinHandle<Result<(), GatewayError>>,
}

fn spawn_stream(connector: &Arc<ScriptedConnector>) -> Harness {
    let cache = Arc::new(StateCache::new());
    let dispatcher = Arc::new(Dispatcher::new());
    let config = ClientConfig::new("token", Intents::non_privileged());
    let (stream, handle) = EventStream::new(
        config,
        "wss://gateway.test",
        Arc::clone(connector) as Arc<_>,
        Arc::clone(&cache),
        dispatcher,
    );
    let task = tokio::spawn(stream.connect());
    Harness {
        cache,
        handle,
        task,
    }
}

// ============================================================================
// Happy path: snapshot, incremental update, delete
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_snapshot_update_delete_cycle() {
    let connector = ScriptedConnector::new();
    let mut server = connector.add_connection();
    let h = spawn_stream(&connector);

    server.hello(45_000);
    let identify = server.expect_op(2).await;
    assert_eq!(identify["d"]["token"], "token");

    server.dispatch(1, "READY", fixtures::ready("s1", &[10]));
    assert!(h.handle.wait_ready(Duration::from_secs(5)).await);
    assert_eq!(h.handle.state(), ConnectionState::Connected);
    assert!(h.handle.is_ready());
    assert_eq!(h.cache.current_user().unwrap().username, "quokka");

    server.dispatch(2, "GUILD_CREATE", fixtures::guild_create(10));
    let cache = Arc::clone(&h.cache);
    eventually(move || cache.guild(Snowflake::new(10)).map(|g| !g.unavailable) == Some(true))
        .await;

    let channel = h.cache.channel(Snowflake::new(5)).unwrap();
    assert_eq!(channel.name.as_deref(), Some("general"));
    assert_eq!(channel.topic.as_deref(), Some("talk"));

    // partial update: rename only, topic must survive
    server.dispatch(3, "CHANNEL_UPDATE", fixtures::channel_rename(5, "lounge"));
    let cache = Arc::clone(&h.cache);
    eventually(move || {
        cache
            .channel(Snowflake::new(5))
            .is_some_and(|c| c.name.as_deref() == Some("lounge"))
    })
    .await;
    let channel = h.cache.channel(Snowflake::new(5)).unwrap();
    assert_eq!(channel.topic.as_deref(), Some("talk"));

    server.dispatch(4, "CHANNEL_DELETE", fixtures::channel_delete(5, 10));
    let cache = Arc::clone(&h.cache);
    eventually(move || cache.channel(Snowflake::new(5)).is_none()).await;
    assert_eq!(h.cache.guild_channels(Snowflake::new(10)).len(), 1);

    h.handle.close();
    h.task.await.unwrap().unwrap();
    assert_eq!(h.handle.state(), ConnectionState::Closed);
    assert!(!h.handle.is_ready());
}

#[tokio::test(start_paused = true)]
async fn test_close_during_silent_handshake_returns_promptly() {
    let connector = ScriptedConnector::new();
    // the server accepts the connection but never sends hello
    let _server = connector.add_connection();
    let h = spawn_stream(&connector);

    tokio::time::sleep(Duration::from_millis(10)).await;
    let before = tokio::time::Instant::now();
    h.handle.close();
    h.task.await.unwrap().unwrap();

    // shutdown must not sit out the hello timeout
    assert!(tokio::time::Instant::now() - before < Duration::from_secs(1));
    assert_eq!(h.handle.state(), ConnectionState::Closed);
}

// ============================================================================
// Resume vs fresh identify
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_resumable_close_resumes_with_session_and_seq() {
    let connector = ScriptedConnector::new();
    let mut first = connector.add_connection();
    let mut second = connector.add_connection();
    let h = spawn_stream(&connector);

    first.hello(45_000);
    first.expect_op(2).await;
    first.dispatch(1, "READY", fixtures::ready("s1", &[10]));
    assert!(h.handle.wait_ready(Duration::from_secs(5)).await);
    first.dispatch(2, "GUILD_CREATE", fixtures::guild_create(10));
    let cache = Arc::clone(&h.cache);
    eventually(move || cache.guild(Snowflake::new(10)).is_some()).await;

    first.close(4000, "gremlins");

    second.hello(45_000);
    let resume = second.expect_op(4).await;
    assert_eq!(resume["d"]["session_id"], "s1");
    assert_eq!(resume["d"]["seq"], 2);

    second.dispatch(3, "RESUMED", json!(null));
    assert!(h.handle.wait_ready(Duration::from_secs(5)).await);

    // a resume keeps the cache intact
    assert!(h.cache.guild(Snowflake::new(10)).is_some());
    assert_eq!(connector.connect_count(), 2);

    h.handle.close();
    h.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_session_loss_reidentifies_and_rebuilds_cache() {
    let connector = ScriptedConnector::new();
    let mut first = connector.add_connection();
    let mut second = connector.add_connection();
    let h = spawn_stream(&connector);

    first.hello(45_000);
    first.expect_op(2).await;
    first.dispatch(1, "READY", fixtures::ready("s1", &[10]));
    assert!(h.handle.wait_ready(Duration::from_secs(5)).await);
    first.dispatch(2, "GUILD_CREATE", fixtures::guild_create(10));
    let cache = Arc::clone(&h.cache);
    eventually(move || cache.guild(Snowflake::new(10)).is_some()).await;

    // 4009 allows reconnect but kills the session
    first.close(4009, "session timeout");

    second.hello(45_000);
    let identify = second.expect_op(2).await;
    assert_eq!(identify["d"]["token"], "token");

    second.dispatch(1, "READY", fixtures::ready("s2", &[20]));
    assert!(h.handle.wait_ready(Duration::from_secs(5)).await);

    // the fresh snapshot replaced the old world
    let cache = Arc::clone(&h.cache);
    eventually(move || cache.guild(Snowflake::new(10)).is_none()).await;
    assert!(h.cache.guild(Snowflake::new(20)).is_some());
    assert!(h.cache.channel(Snowflake::new(5)).is_none());

    h.handle.close();
    h.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_invalid_session_not_resumable_forces_identify() {
    let connector = ScriptedConnector::new();
    let mut first = connector.add_connection();
    let mut second = connector.add_connection();
    let h = spawn_stream(&connector);

    first.hello(45_000);
    first.expect_op(2).await;
    first.dispatch(1, "READY", fixtures::ready("s1", &[10]));
    assert!(h.handle.wait_ready(Duration::from_secs(5)).await);

    first.send_json(&json!({ "op": 9, "d": false }));

    second.hello(45_000);
    // not a resume: the server said the session is gone
    second.expect_op(2).await;

    h.handle.close();
    h.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_server_requested_reconnect_resumes() {
    let connector = ScriptedConnector::new();
    let mut first = connector.add_connection();
    let mut second = connector.add_connection();
    let h = spawn_stream(&connector);

    first.hello(45_000);
    first.expect_op(2).await;
    first.dispatch(1, "READY", fixtures::ready("s1", &[]));
    assert!(h.handle.wait_ready(Duration::from_secs(5)).await);

    first.send_json(&json!({ "op": 5 }));

    second.hello(45_000);
    let resume = second.expect_op(4).await;
    assert_eq!(resume["d"]["session_id"], "s1");

    h.handle.close();
    h.task.await.unwrap().unwrap();
}

// ============================================================================
// Fatal closes
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_authentication_failure_is_fatal() {
    let connector = ScriptedConnector::new();
    let mut server = connector.add_connection();
    let h = spawn_stream(&connector);

    server.hello(45_000);
    server.expect_op(2).await;
    server.close(4004, "authentication failed");

    let err = h.task.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        GatewayError::FatalClose(CloseCode::AuthenticationFailed)
    ));
    assert_eq!(h.handle.state(), ConnectionState::Closed);
    assert_eq!(connector.connect_count(), 1);
}

// ============================================================================
// Heartbeat liveness
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_acked_heartbeats_keep_the_connection() {
    let connector = ScriptedConnector::new();
    let mut server = connector.add_connection();
    let h = spawn_stream(&connector);

    server.hello(1_000);
    server.expect_op(2).await;
    server.dispatch(1, "READY", fixtures::ready("s1", &[]));
    assert!(h.handle.wait_ready(Duration::from_secs(5)).await);

    for _ in 0..3 {
        let beat = server.expect_op(1).await;
        assert_eq!(beat["d"], 1, "heartbeat should carry the last seq");
        server.heartbeat_ack();
    }
    assert_eq!(connector.connect_count(), 1);
    assert_eq!(h.handle.state(), ConnectionState::Connected);

    h.handle.close();
    h.task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_withheld_acks_force_reconnect() {
    let connector = ScriptedConnector::new();
    let mut first = connector.add_connection();
    let mut second = connector.add_connection();
    let h = spawn_stream(&connector);

    first.hello(1_000);
    first.expect_op(2).await;
    first.dispatch(1, "READY", fixtures::ready("s1", &[]));
    assert!(h.handle.wait_ready(Duration::from_secs(5)).await);

    // never ack; the client must declare the connection a zombie and resume
    second.hello(1_000);
    let resume = second.expect_op(4).await;
    assert_eq!(resume["d"]["session_id"], "s1");
    assert_eq!(connector.connect_count(), 2);

    h.handle.close();
    h.task.await.unwrap().unwrap();
}

// ============================================================================
// Abrupt drops
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_abrupt_drop_reconnects_and_resumes() {
    let connector = ScriptedConnector::new();
    let first = connector.add_connection();
    let mut second = connector.add_connection();
    let h = spawn_stream(&connector);

    first.hello(45_000);
    first.dispatch(1, "READY", fixtures::ready("s1", &[]));
    assert!(h.handle.wait_ready(Duration::from_secs(5)).await);

    // sever the connection without any close frame
    drop(first);

    second.hello(45_000);
    let resume = second.expect_op(4).await;
    assert_eq!(resume["d"]["session_id"], "s1");

    h.handle.close();
    h.task.await.unwrap().unwrap();
}
