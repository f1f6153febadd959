/// Result alias that carries the custom [`ShadowplayError`] type.
pub type Result<T> = std::result::Result<T, ShadowplayError>;

/// Common error type for the core crate.
///
/// Only fatal conditions surface here. Dangling references inside a beat
/// (unknown characters, unknown action tags, scene indices past the end) are
/// logged and skipped instead.
#[derive(Debug, thiserror::Error)]
pub enum ShadowplayError {
    /// Free-form message for failures without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// The episode document parsed but breaks a structural rule.
    #[error("invalid episode: {0}")]
    InvalidEpisode(String),
    /// Malformed JSON in an episode, config or duration document.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl ShadowplayError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn invalid_episode<T: Into<String>>(msg: T) -> Self {
        Self::InvalidEpisode(msg.into())
    }
}

impl From<&str> for ShadowplayError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ShadowplayError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
