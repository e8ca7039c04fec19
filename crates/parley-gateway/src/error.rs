use crate::protocol::CloseCode;

/// Errors raised by the event stream
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("websocket transport error: {0}")]
    Transport(String),

    #[error("failed to decode gateway frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("server closed the connection: {0}")]
    FatalClose(CloseCode),
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
