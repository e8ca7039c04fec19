//! Test helpers: a scripted stand-in for the gateway server
//!
//! Each prepared connection is a pair of in-memory channels. The client side
//! satisfies the `Transport` trait; the test drives the [`ServerEnd`],
//! sending protocol frames and asserting on what the client sends back.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use parley_gateway::{Connector, Frame, GatewayError, Transport};
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// Poll `condition` until it holds; panics after ~5 virtual seconds
///
/// Stream-side effects (cache applies, dispatches) happen on the spawned
/// stream task, so assertions on them need a settling loop.
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never became true");
}

/// Produces pre-arranged in-memory connections in order
#[derive(Default)]
pub struct ScriptedConnector {
    pending: Mutex<VecDeque<ScriptedTransport>>,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Prepare one connection; the client consumes them in FIFO order
    pub fn add_connection(&self) -> ServerEnd {
        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        self.pending
            .lock()
            .unwrap()
            .push_back(ScriptedTransport { incoming, outgoing });
        ServerEnd {
            to_client,
            from_client,
        }
    }

    /// How many times the client has connected so far
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Transport>, GatewayError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.pending
            .lock()
            .unwrap()
            .pop_front()
            .map(|t| Box::new(t) as Box<dyn Transport>)
            .ok_or_else(|| GatewayError::Connect("no scripted connection left".into()))
    }
}

struct ScriptedTransport {
    incoming: mpsc::UnboundedReceiver<Frame>,
    outgoing: mpsc::UnboundedSender<Frame>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn recv(&mut self) -> Option<Result<Frame, GatewayError>> {
        self.incoming.recv().await.map(Ok)
    }

    async fn send(&mut self, frame: Frame) -> Result<(), GatewayError> {
        self.outgoing
            .send(frame)
            .map_err(|_| GatewayError::Transport("scripted peer gone".into()))
    }

    async fn close(&mut self) -> Result<(), GatewayError> {
        self.incoming.close();
        Ok(())
    }
}

/// The server side of one scripted connection
///
/// Dropping it mid-test severs the connection abruptly, which the client
/// sees as the transport ending without a close frame.
pub struct ServerEnd {
    to_client: mpsc::UnboundedSender<Frame>,
    from_client: mpsc::UnboundedReceiver<Frame>,
}

impl ServerEnd {
    pub fn send_json(&self, value: &Value) {
        let _ = self.to_client.send(Frame::Text(value.to_string()));
    }

    /// Open the handshake with op 10
    pub fn hello(&self, heartbeat_interval_ms: u64) {
        self.send_json(&json!({
            "op": 10,
            "d": { "heartbeat_interval": heartbeat_interval_ms }
        }));
    }

    /// Deliver one dispatch frame (op 0)
    pub fn dispatch(&self, seq: u64, event: &str, data: Value) {
        self.send_json(&json!({ "op": 0, "t": event, "s": seq, "d": data }));
    }

    /// Acknowledge a heartbeat (op 11)
    pub fn heartbeat_ack(&self) {
        self.send_json(&json!({ "op": 11 }));
    }

    /// Close the connection with a protocol code
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.to_client.send(Frame::Close {
            code: Some(code),
            reason: reason.to_string(),
        });
    }

    /// Next client frame with the given op, skipping heartbeats
    ///
    /// Heartbeats are timing-driven and would make scripts brittle; every
    /// other unexpected op is a test failure.
    pub async fn expect_op(&mut self, op: u8) -> Value {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(30), self.from_client.recv())
                .await
                .expect("timed out waiting for client frame")
                .expect("client hung up while a frame was expected");
            let text = match frame {
                Frame::Text(text) => text,
                Frame::Close { code, .. } => {
                    panic!("client closed (code {code:?}) while op {op} was expected")
                }
            };
            let value: Value = serde_json::from_str(&text).expect("client sent invalid json");
            let got = value["op"].as_u64().expect("client frame without op");
            if got == 1 && op != 1 {
                continue;
            }
            assert_eq!(got, u64::from(op), "unexpected client op: {value}");
            return value;
        }
    }
}
