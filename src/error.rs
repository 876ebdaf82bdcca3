// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArenaError>;

/// Failures surfaced by the MoltArena API client.
#[derive(Error, Debug)]
pub enum ArenaError {
    #[error("MOLTARENA_API_KEY is not set; issue one at moltarena.crosstoken.io/settings/api")]
    MissingApiKey,

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("API request timed out, try again shortly")]
    Timeout,

    #[error("cannot reach the API server, check the network")]
    Connection,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("{0}")]
    NotFound(String),

    #[error("notification source panicked")]
    SourcePanicked,

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
}

impl From<reqwest::Error> for ArenaError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ArenaError::Timeout
        } else if e.is_connect() {
            ArenaError::Connection
        } else if e.is_decode() {
            ArenaError::Decode(e.to_string())
        } else {
            ArenaError::Http(e)
        }
    }
}

impl ArenaError {
    /// Text shown to the end user after a failed command.
    pub fn user_message(&self) -> String {
        match self {
            ArenaError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
