//! Cache delta events
//!
//! The projection of stream dispatch events that touches cached state. The
//! gateway builds these from decoded frames; everything else (messages,
//! typing, unknown events) bypasses the cache entirely.

use parley_core::{
    Channel, ChannelPatch, Emoji, Guild, GuildMember, GuildPatch, MemberPatch, Presence, Role,
    RolePatch, Snowflake, User, UserPatch,
};

/// A state delta to apply to the cache, in delivery order
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// Initial bulk snapshot for a fresh session. Replaces all cached state.
    Ready {
        user: User,
        /// Unavailable guild shells; each is filled in by a later GuildCreate
        guilds: Vec<Guild>,
    },
    /// Guild became available (or was joined), with its full contents
    GuildCreate {
        guild: Guild,
        channels: Vec<Channel>,
        roles: Vec<Role>,
        members: Vec<GuildMember>,
        presences: Vec<Presence>,
        emojis: Vec<Emoji>,
    },
    GuildUpdate(GuildPatch),
    GuildDelete {
        id: Snowflake,
    },
    ChannelCreate(Channel),
    ChannelUpdate(ChannelPatch),
    ChannelDelete {
        id: Snowflake,
    },
    MemberAdd {
        guild_id: Snowflake,
        member: GuildMember,
    },
    MemberUpdate(MemberPatch),
    MemberRemove {
        guild_id: Snowflake,
        user_id: Snowflake,
    },
    RoleCreate {
        guild_id: Snowflake,
        role: Role,
    },
    RoleUpdate {
        guild_id: Snowflake,
        patch: RolePatch,
    },
    RoleDelete {
        guild_id: Snowflake,
        role_id: Snowflake,
    },
    /// Full replacement of a guild's emoji set
    EmojisUpdate {
        guild_id: Snowflake,
        emojis: Vec<Emoji>,
    },
    PresenceUpdate(Presence),
    UserUpdate(UserPatch),
}

impl CacheEvent {
    /// Short name used in trace output
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::GuildCreate { .. } => "guild_create",
            Self::GuildUpdate(_) => "guild_update",
            Self::GuildDelete { .. } => "guild_delete",
            Self::ChannelCreate(_) => "channel_create",
            Self::ChannelUpdate(_) => "channel_update",
            Self::ChannelDelete { .. } => "channel_delete",
            Self::MemberAdd { .. } => "member_add",
            Self::MemberUpdate(_) => "member_update",
            Self::MemberRemove { .. } => "member_remove",
            Self::RoleCreate { .. } => "role_create",
            Self::RoleUpdate { .. } => "role_update",
            Self::RoleDelete { .. } => "role_delete",
            Self::EmojisUpdate { .. } => "emojis_update",
            Self::PresenceUpdate(_) => "presence_update",
            Self::UserUpdate(_) => "user_update",
        }
    }
}
