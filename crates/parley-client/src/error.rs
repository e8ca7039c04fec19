use parley_common::ConfigError;
use parley_gateway::GatewayError;
use parley_http::HttpError;

/// Errors surfaced by the client façade
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("client is already started")]
    AlreadyStarted,

    #[error("event stream did not become ready within {0:?}")]
    ReadyTimeout(std::time::Duration),
}
