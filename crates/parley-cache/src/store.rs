//! State cache store
//!
//! Entity maps are mutated exclusively by `apply`, which the stream calls
//! sequentially in delivery order. Every `apply` runs under a single write
//! guard, so a concurrent reader observes each delta atomically - never a
//! half-applied event.

use std::collections::HashMap;

use parking_lot::RwLock;
use parley_core::{
    Channel, Emoji, Guild, GuildMember, Presence, Role, Snowflake, User,
};

use crate::event::CacheEvent;

#[derive(Debug, Default)]
struct CacheInner {
    current_user: Option<User>,
    guilds: HashMap<Snowflake, Guild>,
    channels: HashMap<Snowflake, Channel>,
    users: HashMap<Snowflake, User>,
    /// guild id -> role id -> role
    roles: HashMap<Snowflake, HashMap<Snowflake, Role>>,
    /// guild id -> user id -> member
    members: HashMap<Snowflake, HashMap<Snowflake, GuildMember>>,
    /// guild id -> user id -> presence
    presences: HashMap<Snowflake, HashMap<Snowflake, Presence>>,
    /// guild id -> emoji id -> emoji
    emojis: HashMap<Snowflake, HashMap<Snowflake, Emoji>>,
}

/// The local mirror of remote entities
///
/// Lookups return `None` for anything not cached; absence is a normal
/// outcome, not an error. Derived views are computed from the id maps on
/// every read so there is never a second copy to drift.
#[derive(Debug, Default)]
pub struct StateCache {
    inner: RwLock<CacheInner>,
}

impl StateCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one delta from the event stream
    ///
    /// Deltas must be applied in the order they were delivered; the cache
    /// never reorders. An update referencing an entity that is not cached
    /// (possible after a resume gap) is dropped - the entity arrives whole in
    /// a later create or snapshot event.
    pub fn apply(&self, event: &CacheEvent) {
        tracing::trace!(event = event.name(), "applying cache event");
        let mut inner = self.inner.write();
        match event {
            CacheEvent::Ready { user, guilds } => {
                // Fresh session: every map is rebuilt from this snapshot
                *inner = CacheInner::default();
                inner.current_user = Some(user.clone());
                inner.users.insert(user.id, user.clone());
                for guild in guilds {
                    inner.guilds.insert(guild.id, guild.clone());
                }
            }
            CacheEvent::GuildCreate {
                guild,
                channels,
                roles,
                members,
                presences,
                emojis,
            } => {
                inner.guilds.insert(guild.id, guild.clone());
                for channel in channels {
                    inner.channels.insert(channel.id, channel.clone());
                }
                let role_map = inner.roles.entry(guild.id).or_default();
                role_map.clear();
                for role in roles {
                    role_map.insert(role.id, role.clone());
                }
                let member_map = inner.members.entry(guild.id).or_default();
                member_map.clear();
                for member in members {
                    member_map.insert(member.user.id, member.clone());
                }
                for member in members {
                    inner.users.insert(member.user.id, member.user.clone());
                }
                let presence_map = inner.presences.entry(guild.id).or_default();
                presence_map.clear();
                for presence in presences {
                    presence_map.insert(presence.user_id, presence.clone());
                }
                let emoji_map = inner.emojis.entry(guild.id).or_default();
                emoji_map.clear();
                for emoji in emojis {
                    emoji_map.insert(emoji.id, emoji.clone());
                }
            }
            CacheEvent::GuildUpdate(patch) => {
                if let Some(guild) = inner.guilds.get_mut(&patch.id) {
                    guild.apply_patch(patch);
                } else {
                    tracing::debug!(guild_id = %patch.id, "update for uncached guild dropped");
                }
            }
            CacheEvent::GuildDelete { id } => {
                inner.guilds.remove(id);
                inner.channels.retain(|_, c| c.guild_id != Some(*id));
                inner.roles.remove(id);
                inner.members.remove(id);
                inner.presences.remove(id);
                inner.emojis.remove(id);
            }
            CacheEvent::ChannelCreate(channel) => {
                inner.channels.insert(channel.id, channel.clone());
            }
            CacheEvent::ChannelUpdate(patch) => {
                if let Some(channel) = inner.channels.get_mut(&patch.id) {
                    channel.apply_patch(patch);
                } else {
                    tracing::debug!(channel_id = %patch.id, "update for uncached channel dropped");
                }
            }
            CacheEvent::ChannelDelete { id } => {
                inner.channels.remove(id);
            }
            CacheEvent::MemberAdd { guild_id, member } => {
                inner.users.insert(member.user.id, member.user.clone());
                inner
                    .members
                    .entry(*guild_id)
                    .or_default()
                    .insert(member.user.id, member.clone());
            }
            CacheEvent::MemberUpdate(patch) => {
                inner.users.insert(patch.user.id, patch.user.clone());
                match inner
                    .members
                    .get_mut(&patch.guild_id)
                    .and_then(|m| m.get_mut(&patch.user.id))
                {
                    Some(member) => member.apply_patch(patch),
                    None => tracing::debug!(
                        guild_id = %patch.guild_id,
                        user_id = %patch.user.id,
                        "update for uncached member dropped"
                    ),
                }
            }
            CacheEvent::MemberRemove { guild_id, user_id } => {
                if let Some(members) = inner.members.get_mut(guild_id) {
                    members.remove(user_id);
                }
                if let Some(presences) = inner.presences.get_mut(guild_id) {
                    presences.remove(user_id);
                }
            }
            CacheEvent::RoleCreate { guild_id, role } => {
                inner
                    .roles
                    .entry(*guild_id)
                    .or_default()
                    .insert(role.id, role.clone());
            }
            CacheEvent::RoleUpdate { guild_id, patch } => {
                match inner
                    .roles
                    .get_mut(guild_id)
                    .and_then(|r| r.get_mut(&patch.id))
                {
                    Some(role) => role.apply_patch(patch),
                    None => tracing::debug!(
                        guild_id = %guild_id,
                        role_id = %patch.id,
                        "update for uncached role dropped"
                    ),
                }
            }
            CacheEvent::RoleDelete { guild_id, role_id } => {
                if let Some(roles) = inner.roles.get_mut(guild_id) {
                    roles.remove(role_id);
                }
            }
            CacheEvent::EmojisUpdate { guild_id, emojis } => {
                let emoji_map = inner.emojis.entry(*guild_id).or_default();
                emoji_map.clear();
                for emoji in emojis {
                    emoji_map.insert(emoji.id, emoji.clone());
                }
            }
            CacheEvent::PresenceUpdate(presence) => {
                let Some(guild_id) = presence.guild_id else {
                    tracing::debug!(user_id = %presence.user_id, "presence without guild dropped");
                    return;
                };
                inner
                    .presences
                    .entry(guild_id)
                    .or_default()
                    .insert(presence.user_id, presence.clone());
            }
            CacheEvent::UserUpdate(patch) => {
                if let Some(user) = inner.users.get_mut(&patch.id) {
                    user.apply_patch(patch);
                }
                if let Some(current) = inner.current_user.as_mut() {
                    if current.id == patch.id {
                        current.apply_patch(patch);
                    }
                }
            }
        }
    }

    // === Point lookups ===

    /// The authenticated user, once a snapshot has been applied
    pub fn current_user(&self) -> Option<User> {
        self.inner.read().current_user.clone()
    }

    pub fn guild(&self, id: Snowflake) -> Option<Guild> {
        self.inner.read().guilds.get(&id).cloned()
    }

    pub fn channel(&self, id: Snowflake) -> Option<Channel> {
        self.inner.read().channels.get(&id).cloned()
    }

    pub fn user(&self, id: Snowflake) -> Option<User> {
        self.inner.read().users.get(&id).cloned()
    }

    pub fn role(&self, guild_id: Snowflake, role_id: Snowflake) -> Option<Role> {
        self.inner
            .read()
            .roles
            .get(&guild_id)
            .and_then(|r| r.get(&role_id))
            .cloned()
    }

    pub fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<GuildMember> {
        self.inner
            .read()
            .members
            .get(&guild_id)
            .and_then(|m| m.get(&user_id))
            .cloned()
    }

    pub fn presence(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Presence> {
        self.inner
            .read()
            .presences
            .get(&guild_id)
            .and_then(|p| p.get(&user_id))
            .cloned()
    }

    pub fn emoji(&self, guild_id: Snowflake, emoji_id: Snowflake) -> Option<Emoji> {
        self.inner
            .read()
            .emojis
            .get(&guild_id)
            .and_then(|e| e.get(&emoji_id))
            .cloned()
    }

    // === Derived views (computed on read, never stored) ===

    /// All cached guilds
    pub fn guilds(&self) -> Vec<Guild> {
        self.inner.read().guilds.values().cloned().collect()
    }

    /// Channels of one guild, sorted by position then id
    pub fn guild_channels(&self, guild_id: Snowflake) -> Vec<Channel> {
        let inner = self.inner.read();
        let mut channels: Vec<Channel> = inner
            .channels
            .values()
            .filter(|c| c.guild_id == Some(guild_id))
            .cloned()
            .collect();
        channels.sort_by_key(|c| (c.position, c.id));
        channels
    }

    /// Roles of one guild, sorted by position then id
    pub fn guild_roles(&self, guild_id: Snowflake) -> Vec<Role> {
        let inner = self.inner.read();
        let mut roles: Vec<Role> = inner
            .roles
            .get(&guild_id)
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default();
        roles.sort_by_key(|r| (r.position, r.id));
        roles
    }

    /// Cached members of one guild
    pub fn guild_members(&self, guild_id: Snowflake) -> Vec<GuildMember> {
        self.inner
            .read()
            .members
            .get(&guild_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of cached guilds
    pub fn guild_count(&self) -> usize {
        self.inner.read().guilds.len()
    }
}
