//! Gateway configuration.
//!
//! All settings come from environment variables and are resolved once at
//! startup into an immutable [`GatewayConfig`] that is shared by reference
//! with every component. There is no ambient lookup after construction.

use anyhow::{anyhow, Result};

/// OAuth scopes requested from Webex. Fixed for the life of the process.
pub const OAUTH_SCOPES: &str = "spark:messages_write spark:people_read spark:rooms_read";

/// Default Webex REST API base URL.
pub const WEBEX_BASE_URL: &str = "https://webexapis.com/v1";

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// OAuth client ID registered with Webex
    pub client_id: String,

    /// OAuth client secret. Never logged, never surfaced in responses.
    pub client_secret: String,

    /// Redirect URI registered for the OAuth callback
    pub redirect_uri: String,

    /// Server-held anti-forgery state constant for the OAuth flow
    pub state_string: String,

    /// Email domains allowed to log in (comma-separated in the env var)
    pub allowed_domains: Vec<String>,

    /// Front-end URL users are redirected to after login/logout
    pub frontend_url: String,

    /// Session lifetime in hours
    pub session_ttl_hours: i64,

    /// HMAC key for signing the session cookie
    pub cookie_secret: String,

    /// Base64-encoded 32-byte AES key for encrypting access tokens at rest
    pub session_key: String,

    /// Path to the SQLite database file
    pub db_path: String,

    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Webex API base URL (overridable for tests against a mock server)
    pub webex_base_url: String,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Fails with a descriptive error naming the first missing required
    /// variable. Optional variables fall back to defaults.
    pub fn from_env() -> Result<Self> {
        let allowed_domains = required("CARDRELAY_ALLOWED_DOMAINS")?
            .split(',')
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>();
        if allowed_domains.is_empty() {
            return Err(anyhow!("CARDRELAY_ALLOWED_DOMAINS must list at least one domain"));
        }

        let session_ttl_hours = match std::env::var("CARDRELAY_SESSION_TTL_HOURS") {
            Ok(v) => v
                .parse::<i64>()
                .map_err(|_| anyhow!("CARDRELAY_SESSION_TTL_HOURS must be an integer, got '{}'", v))?,
            Err(_) => 8,
        };

        Ok(Self {
            client_id: required("CARDRELAY_CLIENT_ID")?,
            client_secret: required("CARDRELAY_CLIENT_SECRET")?,
            redirect_uri: required("CARDRELAY_REDIRECT_URI")?,
            state_string: required("CARDRELAY_STATE_STRING")?,
            allowed_domains,
            frontend_url: optional("CARDRELAY_FRONTEND_URL", "http://localhost:4000"),
            session_ttl_hours,
            cookie_secret: required("CARDRELAY_COOKIE_SECRET")?,
            session_key: required("CARDRELAY_SESSION_KEY")?,
            db_path: optional("CARDRELAY_DB_PATH", "cardrelay.db"),
            bind_addr: optional("CARDRELAY_BIND_ADDR", "0.0.0.0:3000"),
            webex_base_url: optional("CARDRELAY_WEBEX_BASE_URL", WEBEX_BASE_URL),
        })
    }

    /// Build the Webex authorization URL for the login redirect.
    pub fn build_authorize_url(&self) -> String {
        format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
            self.webex_base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(OAUTH_SCOPES),
            urlencoding::encode(&self.state_string)
        )
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| anyhow!("Missing required environment variable {}", name))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
