//! Error types for the remora filter crates

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for remora filters
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration, detected at configuration load
    #[error("configuration error: {0}")]
    Config(String),

    /// A codec backend failed mid-stream; fatal to that stream only
    #[error("codec error: {0}")]
    Codec(String),

    /// Middleware chain error
    #[error("middleware error: {0}")]
    Middleware(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not happen in production)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert error to HTTP status code
    pub fn to_status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Http(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
