//! Client payload definitions
//!
//! Defines the payload structures for client-to-server handshake messages
//! and the Ready snapshot the server answers with.

use parley_core::{Intents, Snowflake, User};
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

/// Payload for op 2 (Identify)
///
/// Sent by the client to authenticate a fresh session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Authentication token
    pub token: String,

    /// Event subscription bits
    pub intents: Intents,

    /// Client properties
    pub properties: IdentifyProperties,

    /// `[shard_id, shard_total]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<ShardInfo>,

    /// Member-list size above which guilds arrive without offline members
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_threshold: Option<u32>,
}

/// Client connection properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: env!("CARGO_PKG_NAME").to_string(),
            device: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// Shard assignment as the two-element array the wire expects
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShardInfo(pub u64, pub u64);

/// Payload for op 4 (Resume)
///
/// Sent by the client to pick up a dropped session where it left off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePayload {
    /// Authentication token
    pub token: String,

    /// Session to resume
    pub session_id: String,

    /// Last sequence number the client saw
    pub seq: u64,
}

/// A guild the Ready snapshot references but does not carry yet
///
/// Full guild data follows as a GuildCreate dispatch per entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

/// Payload of the Ready dispatch, the initial session snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyPayload {
    /// Protocol version
    pub v: u8,

    /// The authenticated user
    pub user: User,

    /// Guilds the user belongs to, delivered in full later
    pub guilds: Vec<UnavailableGuild>,

    /// Session id to present when resuming
    pub session_id: String,

    /// Url to reconnect to for resumes
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}
