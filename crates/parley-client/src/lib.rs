//! High-level client façade
//!
//! Wires the event stream, state cache, dispatcher and REST client together
//! behind one type. Reads are answered from the local cache; mutations go
//! out over REST and their effects come back later through the stream.

mod client;
mod error;

pub use client::{Client, ClientBuilder};
pub use error::ClientError;

pub use parley_common::{BackoffConfig, ClientConfig, GatewayConfig, HttpConfig};
pub use parley_core::{
    Channel, ChannelType, Emoji, Guild, GuildMember, Intents, Message, OnlineStatus, Presence,
    Role, Snowflake, User,
};
pub use parley_gateway::{ConnectionState, Event, EventKind};
pub use parley_http::EditChannel;
