use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a usable response.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status. `message` carries the
    /// server's JSON error body when one was provided.
    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// The progress stream failed in transport or delivered a malformed
    /// event.
    #[error("progress stream failed: {0}")]
    Stream(String),
}
