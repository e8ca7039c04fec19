//! Client façade tests
//!
//! Drive a full `Client` against the scripted gateway: startup gating on the
//! first snapshot, cached reads, wait_for, and idempotent shutdown.
//!
//! Run with: cargo test -p integration-tests --test client_tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use integration_tests::{eventually, fixtures, ScriptedConnector, ServerEnd};
use parley_client::{Client, ClientConfig, ConnectionState, EventKind, Intents, Snowflake};
use serde_json::json;

fn client_with(connector: &Arc<ScriptedConnector>) -> Client {
    let config = ClientConfig::new("token", Intents::non_privileged());
    Client::builder(config)
        .gateway_url("wss://gateway.test")
        .connector(Arc::clone(connector) as Arc<_>)
        .ready_timeout(Duration::from_secs(30))
        .build()
        .unwrap()
}

/// Play the opening of a session on the server side
async fn open_session(mut server: ServerEnd) -> ServerEnd {
    server.hello(45_000);
    server.expect_op(2).await;
    server.dispatch(1, "READY", fixtures::ready("s1", &[10]));
    server.dispatch(2, "GUILD_CREATE", fixtures::guild_create(10));
    server
}

#[tokio::test(start_paused = true)]
async fn test_start_gates_on_snapshot_then_serves_reads() {
    let connector = ScriptedConnector::new();
    let server = connector.add_connection();
    let client = client_with(&connector);

    let driver = tokio::spawn(open_session(server));
    client.start().await.unwrap();
    assert_eq!(client.state().await, ConnectionState::Connected);

    assert_eq!(client.current_user().unwrap().username, "quokka");
    {
        let client = &client;
        eventually(move || client.guild(Snowflake::new(10)).is_some()).await;
    }

    let channels = client.guild_channels(Snowflake::new(10));
    assert_eq!(channels.len(), 2);
    // sorted by position
    assert_eq!(channels[0].name.as_deref(), Some("general"));
    assert_eq!(
        client.role(Snowflake::new(10), Snowflake::new(20)).unwrap().name,
        "mods"
    );

    let server = driver.await.unwrap();
    client.stop().await.unwrap();
    assert_eq!(client.state().await, ConnectionState::Disconnected);
    drop(server);
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_is_rejected() {
    let connector = ScriptedConnector::new();
    let server = connector.add_connection();
    let client = client_with(&connector);

    let driver = tokio::spawn(open_session(server));
    client.start().await.unwrap();
    assert!(client.start().await.is_err());

    let server = driver.await.unwrap();
    client.stop().await.unwrap();
    // stop twice is fine
    client.stop().await.unwrap();
    drop(server);
}

#[tokio::test(start_paused = true)]
async fn test_start_times_out_without_snapshot() {
    let connector = ScriptedConnector::new();
    let server = connector.add_connection();
    let client = {
        let config = ClientConfig::new("token", Intents::non_privileged());
        Client::builder(config)
            .gateway_url("wss://gateway.test")
            .connector(Arc::clone(&connector) as Arc<_>)
            .ready_timeout(Duration::from_secs(2))
            .build()
            .unwrap()
    };

    // hello, but never a READY
    server.hello(45_000);
    assert!(client.start().await.is_err());
    drop(server);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_resolves_from_dispatched_event() {
    let connector = ScriptedConnector::new();
    let server = connector.add_connection();
    let client = Arc::new(client_with(&connector));

    let driver = tokio::spawn(open_session(server));
    client.start().await.unwrap();
    let server = driver.await.unwrap();

    let waiter = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            client
                .wait_for(
                    |e| e.kind() == EventKind::MessageCreate,
                    Duration::from_secs(10),
                )
                .await
        })
    };
    tokio::task::yield_now().await;

    server.dispatch(
        3,
        "MESSAGE_CREATE",
        json!({
            "id": "100",
            "channel_id": "5",
            "guild_id": "10",
            "author": { "id": "2", "username": "visitor", "discriminator": "0002" },
            "content": "hello there",
            "timestamp": "2026-01-01T00:00:00Z"
        }),
    );

    let event = waiter.await.unwrap().expect("waiter should resolve");
    assert_eq!(event.name(), "MESSAGE_CREATE");

    client.stop().await.unwrap();
    drop(server);
}

#[tokio::test(start_paused = true)]
async fn test_error_hook_sees_failing_handlers() {
    let connector = ScriptedConnector::new();
    let server = connector.add_connection();
    let client = client_with(&connector);

    let failures = Arc::new(AtomicUsize::new(0));
    {
        let failures = Arc::clone(&failures);
        client.set_error_hook(move |_, _| {
            failures.fetch_add(1, Ordering::SeqCst);
        });
    }
    client.on(EventKind::MessageCreate, |event| async move {
        Err(anyhow::anyhow!("no such channel for {}", event.name()))
    });

    let driver = tokio::spawn(open_session(server));
    client.start().await.unwrap();
    let server = driver.await.unwrap();

    server.dispatch(
        3,
        "MESSAGE_CREATE",
        json!({
            "id": "100",
            "channel_id": "5",
            "author": { "id": "2", "username": "visitor", "discriminator": "0002" },
            "content": "hello there",
            "timestamp": "2026-01-01T00:00:00Z"
        }),
    );

    let seen = Arc::clone(&failures);
    eventually(move || seen.load(Ordering::SeqCst) == 1).await;

    client.stop().await.unwrap();
    drop(server);
}
