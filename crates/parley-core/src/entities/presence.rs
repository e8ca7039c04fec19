//! Presence - a user's online status within a guild

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Online status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    Online,
    Idle,
    Dnd,
    #[default]
    Offline,
}

/// A user's presence as last reported by the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub user_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub status: OnlineStatus,
}

impl Presence {
    /// Whether the user is reachable in any form
    #[inline]
    pub fn is_online(&self) -> bool {
        self.status != OnlineStatus::Offline
    }
}
