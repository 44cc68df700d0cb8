//! Webex REST API client.
//!
//! Wraps the handful of Webex endpoints the gateway proxies: the OAuth
//! token exchange, profile fetch (`people/me`), room listing, message send
//! and message delete. Every call authenticates with a caller-supplied
//! bearer token; the client itself holds no credential.

mod client;
mod exchange;

pub use client::{Profile, RoomSummary, SentMessage, WebexClient};

/// Errors from the Webex API.
///
/// Distinguishes transport faults (connection refused, timeout, malformed
/// body) from upstream rejections that carried an HTTP status and payload.
#[derive(Debug)]
pub enum WebexError {
    /// Network-level failure or unparseable response
    Transport(reqwest::Error),
    /// Non-2xx response from the Webex API
    Upstream {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl std::fmt::Display for WebexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebexError::Transport(e) => write!(f, "Webex request failed: {}", e),
            WebexError::Upstream { status, body } => {
                write!(f, "Webex API returned {}: {}", status, body)
            }
        }
    }
}

impl std::error::Error for WebexError {}

impl From<reqwest::Error> for WebexError {
    fn from(e: reqwest::Error) -> Self {
        WebexError::Transport(e)
    }
}

/// Convert a non-2xx response into an `Upstream` error, consuming the body.
pub(crate) async fn upstream_error(response: reqwest::Response) -> WebexError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    WebexError::Upstream { status, body }
}
