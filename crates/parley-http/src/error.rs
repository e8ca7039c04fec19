use std::time::Duration;

/// Errors surfaced by REST calls
///
/// A single absorbed 429 never reaches the caller; `RateLimited` means the
/// server rejected the retry as well.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("api error {status}: {message}")]
    Api {
        status: u16,
        code: Option<u32>,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}
