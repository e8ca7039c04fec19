//! Channel entity - a text channel, DM, or category

use serde::{Deserialize, Serialize};

use crate::serde_util::nullable;
use crate::value_objects::Snowflake;

/// Channel type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ChannelType {
    /// Guild text channel
    #[default]
    GuildText = 0,
    /// Direct message between users
    Dm = 1,
    /// Voice channel (transport itself is out of scope for this library)
    GuildVoice = 2,
    /// Guild category for organizing channels
    GuildCategory = 4,
}

impl From<u8> for ChannelType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Dm,
            2 => Self::GuildVoice,
            4 => Self::GuildCategory,
            // Default for 0 and unknown values
            _ => Self::GuildText,
        }
    }
}

impl From<ChannelType> for u8 {
    fn from(ct: ChannelType) -> Self {
        ct as u8
    }
}

impl Serialize for ChannelType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for ChannelType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self::from(u8::deserialize(deserializer)?))
    }
}

/// Channel entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub channel_type: ChannelType,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
}

impl Channel {
    /// Check if this is a direct message channel
    #[inline]
    pub fn is_dm(&self) -> bool {
        self.channel_type == ChannelType::Dm
    }

    /// Merge an update payload into this channel
    pub fn apply_patch(&mut self, patch: &ChannelPatch) {
        if let Some(name) = &patch.name {
            self.name = Some(name.clone());
        }
        if let Some(topic) = &patch.topic {
            self.topic = topic.clone();
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(parent_id) = &patch.parent_id {
            self.parent_id = *parent_id;
        }
    }
}

/// Partial channel update (CHANNEL_UPDATE payload)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPatch {
    pub id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub topic: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub parent_id: Option<Option<Snowflake>>,
}
