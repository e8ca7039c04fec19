//! Message entity
//!
//! Messages are dispatched to handlers but never cached; the cache mirrors
//! only long-lived entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::user::User;
use crate::value_objects::Snowflake;

/// A chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub author: User,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Check if the author is a bot account
    #[inline]
    pub fn is_from_bot(&self) -> bool {
        self.author.bot
    }
}
