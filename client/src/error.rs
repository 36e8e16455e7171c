use reqwest::StatusCode;
use thiserror::Error;

/// Transport-level failures talking to the admin endpoint.
///
/// A decoded verdict with `success: false` is not a `ClientError`; only
/// exchanges that produced no usable verdict land here.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never completed: DNS, connect, TLS, or timeout.
    #[error("request to admin endpoint failed")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered outside 2xx; body capped for logging.
    #[error("admin endpoint returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// A 2xx answer that was not a valid verdict document.
    #[error("could not decode admin response")]
    Decode(#[source] reqwest::Error),
}

impl ClientError {
    /// True when retrying later could plausibly succeed (transient network
    /// conditions or server-side 5xx).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(err) => err.is_timeout() || err.is_connect(),
            ClientError::Status { status, .. } => status.is_server_error(),
            ClientError::Decode(_) => false,
        }
    }
}
