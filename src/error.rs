use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubtransError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Malformed reply: {0}")]
    Reply(String),

    #[error("Invalid run transition: {from} -> {to}")]
    Transition { from: String, to: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SubtransError {
    /// True when the remote service asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SubtransError::RateLimited(_))
    }

    /// True when repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SubtransError::RateLimited(_)
            | SubtransError::Api(_)
            | SubtransError::Reply(_)
            | SubtransError::Http(_)
            | SubtransError::Json(_) => true,
            SubtransError::Config(_)
            | SubtransError::FileNotFound(_)
            | SubtransError::Auth(_)
            | SubtransError::Transition { .. }
            | SubtransError::Io(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SubtransError>;
