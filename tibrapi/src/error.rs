//! Error types for the AzuraCast client

/// Result type alias for AzuraCast operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when using the AzuraCast client
///
/// The type is `Clone` because a single request outcome is handed to every
/// caller that joined the same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The server answered with a non-success status
    #[error("HTTP Error: {status}")]
    Network { status: u16 },

    /// Connection, timeout or other transport-level failure
    #[error("Transport failure: {0}")]
    Transport(String),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Parse(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// HTTP status carried by a `Network` error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Network {
                status: status.as_u16(),
            },
            None => Self::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}
