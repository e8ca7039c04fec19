//! REST surface of the chat platform
//!
//! Every call goes through the [`RateLimiter`] before it reaches the wire, so
//! callers never have to think about quota headers or 429 responses.

pub mod client;
pub mod error;
pub mod rate_limit;
pub mod routes;

pub use client::{EditChannel, GatewayBotInfo, RestClient, SessionStartLimit};
pub use error::HttpError;
pub use rate_limit::RateLimiter;
pub use routes::Route;
