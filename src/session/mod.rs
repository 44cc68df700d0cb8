//! Server-side sessions.
//!
//! A session binds a browser's signed cookie to an authenticated Webex
//! identity and the credential used to call the API on its behalf.
//! Sessions live in SQLite with a fixed TTL; the access token is encrypted
//! at rest with AES-256-GCM. The credential never outlives its session.

mod cookie;
mod encryption;
mod store;

pub use cookie::{
    clear_cookie_header, cookie_value, session_cookie_header, session_id_from_headers,
    SESSION_COOKIE,
};
pub use store::{run_session_purge, SessionStore};

use chrono::{DateTime, Utc};

/// Who the session belongs to. Fetched once from the profile endpoint at
/// login and immutable for the life of the session (the bot switch replaces
/// the whole identity, it never edits one).
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    pub email: String,
    pub nick_name: Option<String>,
    pub avatar: Option<String>,
}

/// The bearer token a session uses against the Webex API.
///
/// Replaced wholesale by the bot switch, never mutated in place.
#[derive(Clone, Debug)]
pub struct Credential {
    pub access_token: String,
    /// True when the token was supplied directly rather than obtained via
    /// the OAuth flow.
    pub is_bot: bool,
}

/// A stored session.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: String,
    pub identity: Identity,
    pub credential: Credential,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session missing any of token, avatar or nickname counts as
    /// unauthenticated. Partial state is legal and routes the caller back
    /// to login rather than erroring.
    pub fn is_authenticated(&self) -> bool {
        !self.credential.access_token.is_empty()
            && self.identity.avatar.is_some()
            && self.identity.nick_name.is_some()
    }
}
