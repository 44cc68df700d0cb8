//! Signed session cookie.
//!
//! The cookie value is `"{session_id}.{signature}"` where the signature is
//! an HMAC-SHA256 of the session id under the configured cookie secret,
//! base64url-encoded. The session itself lives server-side; the cookie only
//! names it, and tampering with either half invalidates it.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "cardrelay_session";

fn sign(session_id: &str, secret: &str) -> String {
    // HMAC accepts keys of any length, so new_from_slice cannot fail
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(session_id.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Build the signed cookie value for a session id.
pub fn cookie_value(session_id: &str, secret: &str) -> String {
    format!("{}.{}", session_id, sign(session_id, secret))
}

/// Verify a cookie value, returning the session id when the signature holds.
pub fn verify_cookie_value(value: &str, secret: &str) -> Option<String> {
    let (session_id, signature_segment) = value.split_once('.')?;
    if session_id.is_empty() || signature_segment.is_empty() {
        return None;
    }

    let signature = URL_SAFE_NO_PAD.decode(signature_segment).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(session_id.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(session_id.to_string())
}

/// `Set-Cookie` header value establishing the session cookie.
pub fn session_cookie_header(session_id: &str, secret: &str, max_age_seconds: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        cookie_value(session_id, secret),
        max_age_seconds
    )
}

/// `Set-Cookie` header value clearing the session cookie.
pub fn clear_cookie_header() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Extract and verify the session id from request headers.
pub fn session_id_from_headers(headers: &HeaderMap, secret: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for part in raw.split(';') {
        let mut pieces = part.trim().splitn(2, '=');
        let key = pieces.next()?.trim();
        let value = pieces.next()?.trim();

        if key == SESSION_COOKIE {
            return verify_cookie_value(value, secret);
        }
    }

    None
}
