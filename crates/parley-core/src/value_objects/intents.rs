//! Gateway intents - event subscription bit set sent with Identify

use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags::bitflags! {
    /// Event groups the client asks the platform to deliver over the stream.
    ///
    /// Sent as a single integer in the Identify payload. Events outside the
    /// requested groups are never dispatched by the server.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u64 {
        /// Guild create/update/delete, channels, and roles
        const GUILDS = 1 << 0;
        /// Member add/update/remove
        const GUILD_MEMBERS = 1 << 1;
        /// Emoji updates
        const GUILD_EMOJIS = 1 << 3;
        /// Presence updates
        const GUILD_PRESENCES = 1 << 8;
        /// Messages in guild channels
        const GUILD_MESSAGES = 1 << 9;
        /// Typing notifications in guild channels
        const GUILD_TYPING = 1 << 11;
        /// Direct messages
        const DIRECT_MESSAGES = 1 << 12;
        /// Message content fields
        const MESSAGE_CONTENT = 1 << 15;
    }
}

impl Intents {
    /// Intents a typical stateful client needs to keep its cache consistent
    #[must_use]
    pub fn non_privileged() -> Self {
        Self::GUILDS | Self::GUILD_EMOJIS | Self::GUILD_MESSAGES | Self::DIRECT_MESSAGES
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::non_privileged()
    }
}

impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u64::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}
