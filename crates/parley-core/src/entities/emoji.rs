//! Custom emoji entity

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Guild custom emoji
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub animated: bool,
}

impl Emoji {
    /// Markup used to render this emoji in message content
    pub fn mention(&self) -> String {
        if self.animated {
            format!("<a:{}:{}>", self.name, self.id)
        } else {
            format!("<:{}:{}>", self.name, self.id)
        }
    }
}
