//! Integration test utilities for the chat client
//!
//! Provides a scripted in-memory transport so connection lifecycle tests can
//! play the server side of the gateway protocol without a network.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
