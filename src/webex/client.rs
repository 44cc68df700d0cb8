use super::{upstream_error, WebexError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Webex user profile from `GET /people/me`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub nick_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Profile {
    /// Primary email, if the profile carried one.
    pub fn email(&self) -> Option<&str> {
        self.emails.first().map(String::as_str)
    }
}

/// A conversation space, reduced to the fields the gateway exposes.
///
/// Deserializing into exactly these fields is the minimization boundary:
/// whatever else the upstream payload carries is dropped here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSummary {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub room_type: String,
}

#[derive(Deserialize)]
struct RoomsResponse {
    #[serde(default)]
    items: Vec<RoomSummary>,
}

/// Result of a message send: the raw upstream payload plus the message id
/// extracted from it (Webex may omit it).
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub id: Option<String>,
    pub payload: Value,
}

/// HTTP client for the Webex REST API.
///
/// Holds no credential; every method takes the bearer token of the session
/// making the call.
pub struct WebexClient {
    http: reqwest::Client,
    base_url: String,
}

impl WebexClient {
    /// Create a client for the given API base URL (e.g.
    /// `https://webexapis.com/v1`, or a mock server in tests).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the profile of the user the token belongs to.
    pub async fn get_profile(&self, token: &str) -> Result<Profile, WebexError> {
        let url = format!("{}/people/me", self.base_url);
        let response = self.http.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        Ok(response.json::<Profile>().await?)
    }

    /// List the caller's rooms sorted by last activity, truncated to `max`.
    ///
    /// Retries exactly once on any failure. If the retry also fails the
    /// result is an empty list, not an error: callers treat an empty list
    /// as "no rooms or transient failure" and the upstream error is never
    /// surfaced to the end user.
    pub async fn list_rooms(&self, token: &str, max: usize) -> Vec<RoomSummary> {
        match self.fetch_rooms(token, max).await {
            Ok(rooms) => rooms,
            Err(first) => {
                warn!(error = %first, "Room listing failed, retrying once");
                match self.fetch_rooms(token, max).await {
                    Ok(rooms) => rooms,
                    Err(second) => {
                        warn!(error = %second, "Room listing retry failed, returning empty list");
                        Vec::new()
                    }
                }
            }
        }
    }

    async fn fetch_rooms(&self, token: &str, max: usize) -> Result<Vec<RoomSummary>, WebexError> {
        let url = format!("{}/rooms?max={}&sortBy=lastactivity", self.base_url, max);
        let response = self.http.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let rooms = response.json::<RoomsResponse>().await?;
        Ok(rooms.items)
    }

    /// Post a card attachment with a human-readable fallback string.
    pub async fn send_message(
        &self,
        token: &str,
        room_id: &str,
        card: &Value,
        fallback_text: &str,
    ) -> Result<SentMessage, WebexError> {
        let url = format!("{}/messages", self.base_url);
        let body = serde_json::json!({
            "roomId": room_id,
            "markdown": fallback_text,
            "attachments": [{
                "contentType": "application/vnd.microsoft.card.adaptive",
                "content": card,
            }],
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let payload = response.json::<Value>().await?;
        let id = payload
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        if id.is_none() {
            warn!("Webex send response carried no message id");
        }

        Ok(SentMessage { id, payload })
    }

    /// Delete a message by identifier.
    pub async fn delete_message(&self, token: &str, message_id: &str) -> Result<(), WebexError> {
        let url = format!("{}/messages/{}", self.base_url, message_id);
        let response = self.http.delete(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        Ok(())
    }
}
