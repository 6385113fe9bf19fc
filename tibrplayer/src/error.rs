use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// Fatal condition reported by the media pipeline
    #[error("Playback Error: {message}")]
    Playback {
        message: String,
        debug: Option<String>,
    },
    #[error("Unexpected end of stream")]
    EndOfStream,
    #[error("AzuraCast client error: {0}")]
    Api(#[from] tibrapi::Error),
}

impl PlayerError {
    pub fn playback(message: &str, debug: Option<&str>) -> Self {
        PlayerError::Playback {
            message: message.to_string(),
            debug: debug.map(str::to_string),
        }
    }

    /// Text for the user-facing error notification
    pub fn notification(&self) -> String {
        match self {
            PlayerError::EndOfStream => format!("Playback Error: {self}"),
            _ => self.to_string(),
        }
    }
}
