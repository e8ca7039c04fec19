use parley_core::Snowflake;
use reqwest::Method;

/// A REST route: verb plus path template plus major parameter
///
/// Quota buckets are shared per path template and major parameter, so two
/// calls editing the same channel contend for one bucket while calls against
/// different channels do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    GetGatewayBot,
    GetChannel { channel_id: Snowflake },
    EditChannel { channel_id: Snowflake },
    DeleteChannel { channel_id: Snowflake },
    CreateMessage { channel_id: Snowflake },
}

impl Route {
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Self::GetGatewayBot | Self::GetChannel { .. } => Method::GET,
            Self::EditChannel { .. } => Method::PATCH,
            Self::DeleteChannel { .. } => Method::DELETE,
            Self::CreateMessage { .. } => Method::POST,
        }
    }

    /// Path relative to the API base url
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::GetGatewayBot => "/gateway/bot".to_string(),
            Self::GetChannel { channel_id }
            | Self::EditChannel { channel_id }
            | Self::DeleteChannel { channel_id } => format!("/channels/{channel_id}"),
            Self::CreateMessage { channel_id } => {
                format!("/channels/{channel_id}/messages")
            }
        }
    }

    /// Bucket key: path template keyed by its major parameter
    #[must_use]
    pub fn bucket_key(&self) -> String {
        match self {
            Self::GetGatewayBot => "gateway/bot".to_string(),
            Self::GetChannel { channel_id }
            | Self::EditChannel { channel_id }
            | Self::DeleteChannel { channel_id } => format!("channels/{channel_id}"),
            Self::CreateMessage { channel_id } => {
                format!("channels/{channel_id}/messages")
            }
        }
    }
}
