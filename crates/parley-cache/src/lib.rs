//! # parley-cache
//!
//! Local mirror of remote state. The event stream applies a linear sequence
//! of deltas; any number of tasks may read concurrently. All state lives in
//! memory and is rebuilt from a fresh snapshot on every new session.

mod event;
mod store;

pub use event::CacheEvent;
pub use store::StateCache;
