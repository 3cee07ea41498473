use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach the server: {0}")]
    Network(#[source] reqwest::Error),

    #[error("sign in required")]
    Unauthorized,

    #[error("not permitted for this role")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    /// The server refused the request as sent (4xx).
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// The server or one of its upstreams failed (5xx).
    #[error("server error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    #[error("unexpected response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl ClientError {
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::NOT_FOUND => Self::NotFound(message),
            s if s.is_server_error() => Self::Server { status, message },
            _ => Self::Rejected { status, message },
        }
    }

    /// Whether asking the user to sign in again could fix this.
    pub fn needs_sign_in(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
