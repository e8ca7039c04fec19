//! Guild member entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::user::User;
use crate::serde_util::nullable;
use crate::value_objects::Snowflake;

/// A user's membership in one guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMember {
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    pub joined_at: DateTime<Utc>,
}

impl GuildMember {
    /// The member's display name (nickname, falling back to username)
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.user.username)
    }

    /// Check if the member carries a role
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.roles.contains(&role_id)
    }

    /// Merge an update payload into this member
    pub fn apply_patch(&mut self, patch: &MemberPatch) {
        // Member updates always carry the full user object
        self.user = patch.user.clone();
        if let Some(nick) = &patch.nick {
            self.nick = nick.clone();
        }
        if let Some(roles) = &patch.roles {
            self.roles = roles.clone();
        }
    }
}

/// Partial member update (GUILD_MEMBER_UPDATE payload)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPatch {
    pub guild_id: Snowflake,
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub nick: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Snowflake>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> GuildMember {
        GuildMember {
            user: User {
                id: Snowflake::new(1),
                username: "quokka".to_string(),
                discriminator: "0001".to_string(),
                avatar: None,
                bot: false,
            },
            nick: Some("rock wallaby".to_string()),
            roles: vec![Snowflake::new(7)],
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name_prefers_nick() {
        let mut m = member();
        assert_eq!(m.display_name(), "rock wallaby");
        m.nick = None;
        assert_eq!(m.display_name(), "quokka");
    }

    #[test]
    fn test_roles_replaced_nick_kept() {
        let mut m = member();
        let patch: MemberPatch = serde_json::from_str(
            r#"{
                "guild_id": "10",
                "user": {"id":"1","username":"quokka","discriminator":"0001","avatar":null},
                "roles": ["8","9"]
            }"#,
        )
        .unwrap();
        m.apply_patch(&patch);

        assert_eq!(m.roles, vec![Snowflake::new(8), Snowflake::new(9)]);
        assert_eq!(m.nick.as_deref(), Some("rock wallaby"));
        assert!(m.has_role(Snowflake::new(9)));
    }

    #[test]
    fn test_nick_cleared_by_null() {
        let mut m = member();
        let patch: MemberPatch = serde_json::from_str(
            r#"{
                "guild_id": "10",
                "user": {"id":"1","username":"quokka","discriminator":"0001","avatar":null},
                "nick": null
            }"#,
        )
        .unwrap();
        m.apply_patch(&patch);
        assert_eq!(m.nick, None);
    }
}
