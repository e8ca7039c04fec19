//! Persistent event stream for the chat platform
//!
//! Owns the WebSocket connection lifecycle: the hello/identify handshake,
//! heartbeat liveness, resume-or-reidentify decisions after a drop, and
//! dispatching decoded events to registered handlers and the state cache.

pub mod dispatch;
pub mod error;
pub mod events;
pub mod protocol;
pub mod stream;
pub mod transport;

pub use dispatch::{Dispatcher, EventKind};
pub use error::GatewayError;
pub use events::Event;
pub use protocol::{CloseCode, GatewayMessage, OpCode};
pub use stream::{ConnectionState, EventStream, EventStreamHandle, Session};
pub use transport::{Connector, Frame, Transport, WsConnector};
