use thiserror::Error;

/// Coarse classification of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Transport failure or a non-2xx response.
    Network,
    /// The body could not be turned into a snapshot.
    Parse,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Open-Meteo request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to reach Open-Meteo: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to parse Open-Meteo JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Open-Meteo response is missing `{0}`")]
    MissingField(&'static str),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Status { .. } | FetchError::Transport(_) => FetchErrorKind::Network,
            FetchError::Decode(_) | FetchError::MissingField(_) => FetchErrorKind::Parse,
        }
    }
}
