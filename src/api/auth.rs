//! OAuth login flow, logout and the bot/impersonation switch.
//!
//! The authorization-code flow:
//! 1. GET /login → redirect to the Webex authorize page
//! 2. User authorizes on Webex
//! 3. Webex redirects to GET /callback with code + state
//! 4. Exchange code for token, fetch profile, gate the email domain
//! 5. Commit identity + credential into a server-side session, set the
//!    signed cookie, redirect to the front-end

use super::{require_session, AppError, ErrorResponse, GatewayState};
use crate::auth::is_allowed_domain;
use crate::ledger::{Activity, ActivityRecord};
use crate::session::{
    clear_cookie_header, session_cookie_header, session_id_from_headers, Credential, Identity,
};
use crate::webex::Profile;
use axum::{
    extract::{Path, Query, State},
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use chrono::Duration;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

/// OAuth callback query parameters.
#[derive(Deserialize)]
pub struct OAuthCallback {
    code: Option<String>,
    state: Option<String>,
}

pub fn create_auth_router(state: GatewayState) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
        .route("/bot/:token", get(bot_switch))
        .with_state(state)
}

/// GET /login
///
/// Redirects to the Webex authorize endpoint with the fixed scope set and
/// the server-held anti-forgery state.
async fn login(State(state): State<GatewayState>) -> Redirect {
    Redirect::temporary(&state.config.build_authorize_url())
}

/// GET /callback?code&state
///
/// Completes the credential exchange. Failures here are terminal for the
/// attempt and render a plain message rather than redirecting; only a
/// fully gated, committed session redirects to the front-end.
async fn callback(
    State(state): State<GatewayState>,
    Query(callback): Query<OAuthCallback>,
) -> Response {
    let Some(code) = callback.code else {
        error!("No authorization code provided in the callback query string");
        return failure_page("Authorization code missing. Something went wrong with the OAuth flow.");
    };

    if callback.state.as_deref() != Some(state.config.state_string.as_str()) {
        error!("OAuth state string mismatch");
        return failure_page("State string has been tampered with. Something went wrong with the OAuth flow.");
    }

    // Token exchange, then profile fetch. Either failing aborts the login;
    // the upstream payload is logged but the client secret never surfaces.
    let access_token = match state
        .webex
        .exchange_code(
            &code,
            &state.config.redirect_uri,
            &state.config.client_id,
            &state.config.client_secret,
        )
        .await
    {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "Token exchange failed");
            return failure_page("An error occurred during the OAuth process.");
        }
    };

    let profile = match state.webex.get_profile(&access_token).await {
        Ok(profile) => profile,
        Err(e) => {
            error!(error = %e, "Profile fetch failed after token exchange");
            return failure_page("An error occurred during the OAuth process.");
        }
    };

    let Some(email) = profile.email().map(str::to_string) else {
        error!("Webex profile carried no email address");
        return failure_page("An error occurred during the OAuth process.");
    };

    // Domain gate runs before any session exists. The rejected attempt is
    // still recorded in the ledger with the attempted email.
    if !is_allowed_domain(&email, &state.config.allowed_domains) {
        warn!(email = %email, "Login rejected: domain not allowed");
        record_activity(&state, ActivityRecord::new(&email, Activity::Login, false));
        return failure_page("This email domain is not allowed to sign in.");
    }

    let identity = identity_from_profile(&email, &profile);
    let credential = Credential {
        access_token,
        is_bot: false,
    };

    let session = match state.sessions.create(
        identity,
        credential,
        Duration::hours(state.config.session_ttl_hours),
    ) {
        Ok(session) => session,
        Err(e) => {
            error!(email = %email, error = %e, "Failed to create session");
            return failure_page("An error occurred during the OAuth process.");
        }
    };

    record_activity(&state, ActivityRecord::new(&email, Activity::Login, true));
    info!(email = %email, "Login completed");

    let cookie = session_cookie_header(
        &session.id,
        &state.config.cookie_secret,
        state.config.session_ttl_hours * 3600,
    );
    redirect_with_cookie(&state.config.frontend_url, &cookie)
}

/// GET /logout
///
/// Destroys the session and clears the cookie. Logging out without a
/// session is a 400, not a silent success: it surfaces client-side
/// session-cookie bugs.
async fn logout(State(state): State<GatewayState>, headers: axum::http::HeaderMap) -> Response {
    let Some(session_id) = session_id_from_headers(&headers, &state.config.cookie_secret) else {
        return (StatusCode::BAD_REQUEST, "No session to log out.").into_response();
    };

    let session = match state.sessions.get(&session_id) {
        Ok(Some(session)) => session,
        Ok(None) => {
            return (StatusCode::BAD_REQUEST, "No session to log out.").into_response();
        }
        Err(e) => {
            error!(error = %e, "Failed to read session during logout");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to log out. Please try again.",
            )
                .into_response();
        }
    };

    // The logout record carries the outgoing identity, not a null one
    record_activity(
        &state,
        ActivityRecord::new(&session.identity.email, Activity::Logout, true),
    );

    if let Err(e) = state.sessions.delete(&session_id) {
        error!(email = %session.identity.email, error = %e, "Failed to destroy session");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to log out. Please try again.",
        )
            .into_response();
    }

    info!(email = %session.identity.email, "Logout completed");
    redirect_with_cookie(&state.config.frontend_url, &clear_cookie_header())
}

/// GET /bot/:token
///
/// Swaps the session's credential for a caller-supplied token after
/// re-validating it through the profile endpoint. An invalid or expired
/// token is a normal outcome (400), not a fault to log loudly, and leaves
/// the session untouched. Bot tokens are deliberately not domain-gated;
/// see DESIGN.md.
async fn bot_switch(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
    headers: axum::http::HeaderMap,
) -> Result<Json<super::user::UserStatus>, AppError> {
    let session = require_session(&headers, &state)?;

    let profile = match state.webex.get_profile(&token).await {
        Ok(profile) => profile,
        Err(e) => {
            debug!(email = %session.identity.email, error = %e, "Bot token rejected");
            return Err(AppError::BadRequest("Invalid bot token.".to_string()));
        }
    };

    // A profile without an email is the "unknown identity" sentinel:
    // treat it exactly like an invalid token.
    let Some(email) = profile.email().map(str::to_string) else {
        debug!(email = %session.identity.email, "Bot token resolved to no identity");
        return Err(AppError::BadRequest("Invalid bot token.".to_string()));
    };

    let identity = identity_from_profile(&email, &profile);
    let credential = Credential {
        access_token: token,
        is_bot: true,
    };

    // Identity and credential swap as one atomic unit
    match state
        .sessions
        .replace_credential(&session.id, &identity, &credential)
    {
        Ok(true) => {}
        Ok(false) => return Err(AppError::Unauthorized),
        Err(e) => {
            error!(email = %email, error = %e, "Failed to switch session credential");
            return Err(AppError::ServerError(
                "Failed to switch to bot token.".to_string(),
            ));
        }
    }

    record_activity(&state, ActivityRecord::new(&email, Activity::Login, true));
    info!(
        previous = %session.identity.email,
        email = %email,
        "Session switched to bot credential"
    );

    Ok(Json(super::user::UserStatus {
        avatar_url: identity.avatar.unwrap_or_default(),
        is_authenticated: true,
        nick_name: identity.nick_name.unwrap_or_default(),
        is_bot: true,
    }))
}

fn identity_from_profile(email: &str, profile: &Profile) -> Identity {
    Identity {
        email: email.to_string(),
        nick_name: profile
            .nick_name
            .clone()
            .or_else(|| profile.display_name.clone()),
        avatar: profile.avatar.clone(),
    }
}

/// Audit writes never block or fail the primary outcome.
pub(super) fn record_activity(state: &GatewayState, record: ActivityRecord) {
    if let Err(e) = state.ledger.record(&record) {
        error!(
            email = %record.email,
            activity = %record.activity,
            error = %e,
            "Failed to write activity record"
        );
    }
}

fn failure_page(message: &str) -> Response {
    (StatusCode::OK, message.to_string()).into_response()
}

fn redirect_with_cookie(location: &str, cookie: &str) -> Response {
    let mut response = Redirect::temporary(location).into_response();
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
            response
        }
        Err(e) => {
            error!(error = %e, "Failed to build session cookie header");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    message: "Failed to establish session.".to_string(),
                }),
            )
                .into_response()
        }
    }
}
