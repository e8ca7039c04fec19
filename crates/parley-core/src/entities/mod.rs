//! Entity models mirrored from the platform's wire format
//!
//! Each mutable entity has a companion `*Patch` struct carrying only the
//! fields present in an update payload. `apply_patch` implements merge
//! semantics: keys absent from the payload never touch the cached value.

mod channel;
mod emoji;
mod guild;
mod member;
mod message;
mod presence;
mod role;
mod user;

pub use channel::{Channel, ChannelPatch, ChannelType};
pub use emoji::Emoji;
pub use guild::{Guild, GuildPatch};
pub use member::{GuildMember, MemberPatch};
pub use message::Message;
pub use presence::{OnlineStatus, Presence};
pub use role::{Role, RolePatch};
pub use user::{User, UserPatch};
