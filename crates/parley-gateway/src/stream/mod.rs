//! Connection lifecycle
//!
//! One [`EventStream`] owns the whole connect/handshake/read/reconnect cycle
//! for a shard. Everything here is driven from a single task; the only
//! concurrent piece is the caller-facing handle.

mod backoff;
mod event_stream;
mod heartbeat;
mod session;

pub use backoff::Backoff;
pub use event_stream::{EventStream, EventStreamHandle};
pub use session::{ConnectionState, Session};
