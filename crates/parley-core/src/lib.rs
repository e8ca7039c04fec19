//! # parley-core
//!
//! Domain layer containing entity models, value objects, and partial-update
//! payloads shared by the cache, gateway, and HTTP layers. This crate has no
//! dependency on the transport or runtime.

pub mod entities;
pub mod serde_util;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Channel, ChannelPatch, ChannelType, Emoji, Guild, GuildMember, GuildPatch, MemberPatch,
    Message, OnlineStatus, Presence, Role, RolePatch, User, UserPatch,
};
pub use value_objects::{Intents, Snowflake, SnowflakeParseError};
