//! Event dispatch
//!
//! Handlers are fire-and-forget: each dispatched event spawns one task per
//! registered handler, so a slow or panicking handler can never stall the
//! read loop or its sibling handlers.

mod dispatcher;

pub use dispatcher::{Dispatcher, HandlerResult};

pub use crate::events::EventKind;
