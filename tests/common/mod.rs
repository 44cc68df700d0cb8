// Shared fixtures for the integration tests.

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use cardrelay::api::GatewayState;
use cardrelay::config::GatewayConfig;
use cardrelay::ledger::ActivityLedger;
use cardrelay::session::{cookie_value, Credential, Identity, Session, SessionStore, SESSION_COOKIE};
use cardrelay::webex::WebexClient;
use chrono::Duration;
use std::sync::Arc;
use tower::ServiceExt;

pub const COOKIE_SECRET: &str = "test-cookie-secret";
pub const STATE_STRING: &str = "anti-forgery";
pub const FRONTEND_URL: &str = "http://localhost:4000";

/// Gateway state with in-memory stores, pointed at `webex_base_url`
/// (usually a mockito server).
pub fn test_state(webex_base_url: &str) -> GatewayState {
    let session_key = BASE64.encode([0u8; 32]);

    let config = GatewayConfig {
        client_id: "cid".to_string(),
        client_secret: "csecret".to_string(),
        redirect_uri: "http://localhost:3000/callback".to_string(),
        state_string: STATE_STRING.to_string(),
        allowed_domains: vec!["example.com".to_string()],
        frontend_url: FRONTEND_URL.to_string(),
        session_ttl_hours: 8,
        cookie_secret: COOKIE_SECRET.to_string(),
        session_key: session_key.clone(),
        db_path: ":memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        webex_base_url: webex_base_url.to_string(),
    };

    GatewayState {
        config: Arc::new(config),
        webex: Arc::new(WebexClient::new(webex_base_url)),
        sessions: Arc::new(SessionStore::new(":memory:", &session_key).expect("session store")),
        ledger: Arc::new(ActivityLedger::new(":memory:").expect("ledger")),
    }
}

/// Create an authenticated session directly in the store and return it
/// along with the Cookie header value a browser would send.
pub fn login_session(state: &GatewayState, email: &str) -> (Session, String) {
    let identity = Identity {
        email: email.to_string(),
        nick_name: Some("Ada".to_string()),
        avatar: Some("https://avatars.example.com/ada.png".to_string()),
    };
    let credential = Credential {
        access_token: "user-token".to_string(),
        is_bot: false,
    };

    let session = state
        .sessions
        .create(identity, credential, Duration::hours(8))
        .expect("create session");
    let cookie = format!(
        "{}={}",
        SESSION_COOKIE,
        cookie_value(&session.id, COOKIE_SECRET)
    );
    (session, cookie)
}

/// Fire one request through the router.
pub async fn send_request(
    app: axum::Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
