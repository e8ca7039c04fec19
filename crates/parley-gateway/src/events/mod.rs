//! Typed dispatch events
//!
//! Raw dispatch frames carry an event name and an untyped JSON payload;
//! [`Event::parse`] turns them into typed variants. Unrecognized names pass
//! through as [`Event::Unknown`] so new server-side events never break the
//! read loop.

use parley_cache::CacheEvent;
use parley_core::{
    Channel, ChannelPatch, Emoji, Guild, GuildMember, GuildPatch, MemberPatch, Message, Presence,
    Role, RolePatch, Snowflake, UserPatch,
};
use serde::Deserialize;
use serde_json::Value;

use crate::protocol::ReadyPayload;

/// Full guild payload of a GUILD_CREATE dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct GuildCreatePayload {
    #[serde(flatten)]
    pub guild: Guild,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub members: Vec<GuildMember>,
    #[serde(default)]
    pub presences: Vec<Presence>,
    #[serde(default)]
    pub emojis: Vec<Emoji>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberAddPayload {
    pub guild_id: Snowflake,
    #[serde(flatten)]
    pub member: GuildMember,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberRemovePayload {
    pub guild_id: Snowflake,
    pub user: parley_core::User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleCreatePayload {
    pub guild_id: Snowflake,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleUpdatePayload {
    pub guild_id: Snowflake,
    pub role: RolePatch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleDeletePayload {
    pub guild_id: Snowflake,
    pub role_id: Snowflake,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmojisUpdatePayload {
    pub guild_id: Snowflake,
    pub emojis: Vec<Emoji>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildDeletePayload {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

/// One decoded dispatch event
#[derive(Debug, Clone)]
pub enum Event {
    Ready(ReadyPayload),
    Resumed,
    GuildCreate(Box<GuildCreatePayload>),
    GuildUpdate(GuildPatch),
    GuildDelete(GuildDeletePayload),
    ChannelCreate(Channel),
    ChannelUpdate(ChannelPatch),
    ChannelDelete(Channel),
    GuildMemberAdd(MemberAddPayload),
    GuildMemberUpdate(MemberPatch),
    GuildMemberRemove(MemberRemovePayload),
    GuildRoleCreate(RoleCreatePayload),
    GuildRoleUpdate(RoleUpdatePayload),
    GuildRoleDelete(RoleDeletePayload),
    GuildEmojisUpdate(EmojisUpdatePayload),
    PresenceUpdate(Presence),
    MessageCreate(Message),
    UserUpdate(UserPatch),
    /// Stream was reconnected (fresh or resumed session)
    GatewayConnected,
    /// Stream dropped and is about to retry
    GatewayDisconnected,
    /// Dispatch name this client version does not know
    Unknown { name: String, data: Value },
}

/// Discriminant used for handler registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    Resumed,
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    GuildMemberAdd,
    GuildMemberUpdate,
    GuildMemberRemove,
    GuildRoleCreate,
    GuildRoleUpdate,
    GuildRoleDelete,
    GuildEmojisUpdate,
    PresenceUpdate,
    MessageCreate,
    UserUpdate,
    GatewayConnected,
    GatewayDisconnected,
    Unknown,
}

impl Event {
    /// Decode a dispatch frame by its event name
    pub fn parse(name: &str, data: Value) -> Result<Self, serde_json::Error> {
        let event = match name {
            "READY" => Self::Ready(serde_json::from_value(data)?),
            "RESUMED" => Self::Resumed,
            "GUILD_CREATE" => Self::GuildCreate(Box::new(serde_json::from_value(data)?)),
            "GUILD_UPDATE" => Self::GuildUpdate(serde_json::from_value(data)?),
            "GUILD_DELETE" => Self::GuildDelete(serde_json::from_value(data)?),
            "CHANNEL_CREATE" => Self::ChannelCreate(serde_json::from_value(data)?),
            "CHANNEL_UPDATE" => Self::ChannelUpdate(serde_json::from_value(data)?),
            "CHANNEL_DELETE" => Self::ChannelDelete(serde_json::from_value(data)?),
            "GUILD_MEMBER_ADD" => Self::GuildMemberAdd(serde_json::from_value(data)?),
            "GUILD_MEMBER_UPDATE" => Self::GuildMemberUpdate(serde_json::from_value(data)?),
            "GUILD_MEMBER_REMOVE" => Self::GuildMemberRemove(serde_json::from_value(data)?),
            "GUILD_ROLE_CREATE" => Self::GuildRoleCreate(serde_json::from_value(data)?),
            "GUILD_ROLE_UPDATE" => Self::GuildRoleUpdate(serde_json::from_value(data)?),
            "GUILD_ROLE_DELETE" => Self::GuildRoleDelete(serde_json::from_value(data)?),
            "GUILD_EMOJIS_UPDATE" => Self::GuildEmojisUpdate(serde_json::from_value(data)?),
            "PRESENCE_UPDATE" => Self::PresenceUpdate(serde_json::from_value(data)?),
            "MESSAGE_CREATE" => Self::MessageCreate(serde_json::from_value(data)?),
            "USER_UPDATE" => Self::UserUpdate(serde_json::from_value(data)?),
            _ => Self::Unknown {
                name: name.to_string(),
                data,
            },
        };
        Ok(event)
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready(_) => EventKind::Ready,
            Self::Resumed => EventKind::Resumed,
            Self::GuildCreate(_) => EventKind::GuildCreate,
            Self::GuildUpdate(_) => EventKind::GuildUpdate,
            Self::GuildDelete(_) => EventKind::GuildDelete,
            Self::ChannelCreate(_) => EventKind::ChannelCreate,
            Self::ChannelUpdate(_) => EventKind::ChannelUpdate,
            Self::ChannelDelete(_) => EventKind::ChannelDelete,
            Self::GuildMemberAdd(_) => EventKind::GuildMemberAdd,
            Self::GuildMemberUpdate(_) => EventKind::GuildMemberUpdate,
            Self::GuildMemberRemove(_) => EventKind::GuildMemberRemove,
            Self::GuildRoleCreate(_) => EventKind::GuildRoleCreate,
            Self::GuildRoleUpdate(_) => EventKind::GuildRoleUpdate,
            Self::GuildRoleDelete(_) => EventKind::GuildRoleDelete,
            Self::GuildEmojisUpdate(_) => EventKind::GuildEmojisUpdate,
            Self::PresenceUpdate(_) => EventKind::PresenceUpdate,
            Self::MessageCreate(_) => EventKind::MessageCreate,
            Self::UserUpdate(_) => EventKind::UserUpdate,
            Self::GatewayConnected => EventKind::GatewayConnected,
            Self::GatewayDisconnected => EventKind::GatewayDisconnected,
            Self::Unknown { .. } => EventKind::Unknown,
        }
    }

    /// Project the event into the delta the state cache applies
    ///
    /// Returns `None` for events that carry no cacheable state. Ready guild
    /// references become unavailable stubs; the full guilds follow as
    /// GUILD_CREATE dispatches that overwrite them.
    #[must_use]
    pub fn to_cache_event(&self) -> Option<CacheEvent> {
        let event = match self {
            Self::Ready(ready) => CacheEvent::Ready {
                user: ready.user.clone(),
                guilds: ready.guilds.iter().map(|g| unavailable_stub(g.id)).collect(),
            },
            Self::GuildCreate(payload) => CacheEvent::GuildCreate {
                guild: payload.guild.clone(),
                channels: payload.channels.clone(),
                roles: payload.roles.clone(),
                members: payload.members.clone(),
                presences: payload.presences.clone(),
                emojis: payload.emojis.clone(),
            },
            Self::GuildUpdate(patch) => CacheEvent::GuildUpdate(patch.clone()),
            Self::GuildDelete(payload) => CacheEvent::GuildDelete { id: payload.id },
            Self::ChannelCreate(channel) => CacheEvent::ChannelCreate(channel.clone()),
            Self::ChannelUpdate(patch) => CacheEvent::ChannelUpdate(patch.clone()),
            Self::ChannelDelete(channel) => CacheEvent::ChannelDelete { id: channel.id },
            Self::GuildMemberAdd(payload) => CacheEvent::MemberAdd {
                guild_id: payload.guild_id,
                member: payload.member.clone(),
            },
            Self::GuildMemberUpdate(patch) => CacheEvent::MemberUpdate(patch.clone()),
            Self::GuildMemberRemove(payload) => CacheEvent::MemberRemove {
                guild_id: payload.guild_id,
                user_id: payload.user.id,
            },
            Self::GuildRoleCreate(payload) => CacheEvent::RoleCreate {
                guild_id: payload.guild_id,
                role: payload.role.clone(),
            },
            Self::GuildRoleUpdate(payload) => CacheEvent::RoleUpdate {
                guild_id: payload.guild_id,
                patch: payload.role.clone(),
            },
            Self::GuildRoleDelete(payload) => CacheEvent::RoleDelete {
                guild_id: payload.guild_id,
                role_id: payload.role_id,
            },
            Self::GuildEmojisUpdate(payload) => CacheEvent::EmojisUpdate {
                guild_id: payload.guild_id,
                emojis: payload.emojis.clone(),
            },
            Self::PresenceUpdate(presence) => CacheEvent::PresenceUpdate(presence.clone()),
            Self::UserUpdate(patch) => CacheEvent::UserUpdate(patch.clone()),
            Self::Resumed
            | Self::MessageCreate(_)
            | Self::GatewayConnected
            | Self::GatewayDisconnected
            | Self::Unknown { .. } => return None,
        };
        Some(event)
    }

    /// Wire name of the event (upper snake case, as dispatched)
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Ready(_) => "READY",
            Self::Resumed => "RESUMED",
            Self::GuildCreate(_) => "GUILD_CREATE",
            Self::GuildUpdate(_) => "GUILD_UPDATE",
            Self::GuildDelete(_) => "GUILD_DELETE",
            Self::ChannelCreate(_) => "CHANNEL_CREATE",
            Self::ChannelUpdate(_) => "CHANNEL_UPDATE",
            Self::ChannelDelete(_) => "CHANNEL_DELETE",
            Self::GuildMemberAdd(_) => "GUILD_MEMBER_ADD",
            Self::GuildMemberUpdate(_) => "GUILD_MEMBER_UPDATE",
            Self::GuildMemberRemove(_) => "GUILD_MEMBER_REMOVE",
            Self::GuildRoleCreate(_) => "GUILD_ROLE_CREATE",
            Self::GuildRoleUpdate(_) => "GUILD_ROLE_UPDATE",
            Self::GuildRoleDelete(_) => "GUILD_ROLE_DELETE",
            Self::GuildEmojisUpdate(_) => "GUILD_EMOJIS_UPDATE",
            Self::PresenceUpdate(_) => "PRESENCE_UPDATE",
            Self::MessageCreate(_) => "MESSAGE_CREATE",
            Self::UserUpdate(_) => "USER_UPDATE",
            Self::GatewayConnected => "GATEWAY_CONNECTED",
            Self::GatewayDisconnected => "GATEWAY_DISCONNECTED",
            Self::Unknown { name, .. } => name,
        }
    }
}

fn unavailable_stub(id: Snowflake) -> Guild {
    Guild {
        id,
        name: String::new(),
        icon: None,
        description: None,
        owner_id: Snowflake::new(0),
        unavailable: true,
    }
}
