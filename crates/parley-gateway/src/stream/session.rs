/// A live or resumable gateway session
///
/// Held between connection attempts while the close-code policy allows a
/// resume; discarded when the server demands a fresh identify.
#[derive(Debug, Clone)]
pub struct Session {
    /// Server-issued id, presented in the resume payload
    pub id: String,
    /// Preferred url for resuming, when the server announced one
    pub resume_url: Option<String>,
}

/// Lifecycle of the event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport, not yet asked to connect
    Disconnected,
    /// Transport up, identify/resume in flight
    Handshaking,
    /// Session acknowledged, events flowing
    Connected,
    /// Dropped, waiting out backoff before the next attempt
    Reconnecting,
    /// Shut down for good, by request or fatally
    Closed,
}

impl ConnectionState {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Handshaking => "handshaking",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
