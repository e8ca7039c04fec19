//! WebSocket transport abstraction
//!
//! The event stream talks to a [`Transport`] trait object rather than a
//! socket type, so connection handling can be driven by a scripted transport
//! in tests. [`Connector`] produces one transport per connection attempt.

mod ws;

use async_trait::async_trait;

use crate::error::GatewayError;

pub use ws::WsConnector;

/// One inbound or outbound websocket frame, reduced to what the protocol uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close { code: Option<u16>, reason: String },
}

/// A live, bidirectional connection
#[async_trait]
pub trait Transport: Send {
    /// Next inbound frame; `None` once the peer is gone
    async fn recv(&mut self) -> Option<Result<Frame, GatewayError>>;

    /// Send one frame
    async fn send(&mut self, frame: Frame) -> Result<(), GatewayError>;

    /// Close the connection; safe to call more than once
    async fn close(&mut self) -> Result<(), GatewayError>;
}

/// Produces a fresh [`Transport`] for every connection attempt
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, GatewayError>;
}
