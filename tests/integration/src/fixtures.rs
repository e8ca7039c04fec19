//! Test fixtures: canned gateway payloads

use serde_json::{json, Value};

pub fn ready(session_id: &str, guild_ids: &[u64]) -> Value {
    json!({
        "v": 10,
        "user": { "id": "1", "username": "quokka", "discriminator": "0001" },
        "guilds": guild_ids
            .iter()
            .map(|id| json!({ "id": id.to_string(), "unavailable": true }))
            .collect::<Vec<_>>(),
        "session_id": session_id,
    })
}

pub fn guild_create(guild_id: u64) -> Value {
    json!({
        "id": guild_id.to_string(),
        "name": "den",
        "owner_id": "1",
        "channels": [
            {
                "id": "5",
                "guild_id": guild_id.to_string(),
                "name": "general",
                "type": 0,
                "topic": "talk",
                "position": 0
            },
            {
                "id": "6",
                "guild_id": guild_id.to_string(),
                "name": "random",
                "type": 0,
                "position": 1
            }
        ],
        "roles": [
            {
                "id": "20",
                "name": "mods",
                "color": 0,
                "position": 1,
                "permissions": 8,
                "hoist": true,
                "mentionable": false
            }
        ],
        "members": [
            {
                "user": { "id": "1", "username": "quokka", "discriminator": "0001" },
                "roles": ["20"],
                "joined_at": "2026-01-01T00:00:00Z"
            }
        ],
        "presences": [],
        "emojis": []
    })
}

pub fn channel_rename(channel_id: u64, name: &str) -> Value {
    json!({ "id": channel_id.to_string(), "name": name })
}

pub fn channel_delete(channel_id: u64, guild_id: u64) -> Value {
    json!({
        "id": channel_id.to_string(),
        "guild_id": guild_id.to_string(),
        "type": 0,
        "position": 0
    })
}
