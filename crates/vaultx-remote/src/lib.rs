//! VaultX Remote - HTTP transport
//!
//! Talks to the remote metadata service and moves ciphertext blobs through
//! pre-signed URLs.
//!
//! ## Modules
//!
//! - [`client`] - Base-URL aware `reqwest` wrapper with status mapping
//! - [`transport`] - [`HttpTransport`], the `ITransport` implementation

pub mod client;
pub mod transport;

pub use client::ApiClient;
pub use transport::HttpTransport;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the remote API
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The credential was rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The credential lacks access to the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A server-side error occurred (5xx)
    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    /// Any other non-success status
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Maps a non-success status and its body text to an error
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => RemoteError::Unauthorized(body),
            StatusCode::FORBIDDEN => RemoteError::Forbidden(body),
            StatusCode::NOT_FOUND => RemoteError::NotFound(body),
            s if s.is_server_error() => RemoteError::ServerError {
                status: s.as_u16(),
                body,
            },
            s => RemoteError::UnexpectedStatus {
                status: s.as_u16(),
                body,
            },
        }
    }
}
