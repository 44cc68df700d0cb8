//! OAuth token exchange.
//!
//! Turns the authorization code from the callback into an access token.
//! The profile fetch that completes the credential exchange lives on
//! [`WebexClient::get_profile`](super::WebexClient::get_profile).

use super::{upstream_error, WebexClient, WebexError};
use serde::Deserialize;
use std::collections::HashMap;

/// OAuth token response (standard OAuth 2.0; Webex includes more fields,
/// only the access token is kept).
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
}

impl WebexClient {
    /// Exchange an authorization code for an access token.
    ///
    /// Posts `application/x-www-form-urlencoded` to `{base}/access_token`.
    /// Upstream rejections surface the upstream payload; the client secret
    /// never appears in the error.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, WebexError> {
        let mut form_data = HashMap::new();
        form_data.insert("grant_type", "authorization_code");
        form_data.insert("code", code);
        form_data.insert("redirect_uri", redirect_uri);
        form_data.insert("client_id", client_id);
        form_data.insert("client_secret", client_secret);

        let url = format!("{}/access_token", self.base_url());
        tracing::debug!("Exchanging authorization code for token");

        let response = self.http().post(&url).form(&form_data).send().await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let token_response = response.json::<TokenResponse>().await?;
        Ok(token_response.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_exchange_code_success() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/access_token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "auth-code-1".into()),
                Matcher::UrlEncoded("client_id".into(), "cid".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "access_token": "tok_abc",
                    "expires_in": 1209599,
                    "refresh_token": "ref_xyz",
                    "token_type": "Bearer"
                }"#,
            )
            .create_async()
            .await;

        let client = WebexClient::new(server.url());
        let token = client
            .exchange_code("auth-code-1", "http://localhost:3000/callback", "cid", "csecret")
            .await
            .unwrap();

        assert_eq!(token, "tok_abc");
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/access_token")
            .with_status(400)
            .with_body(r#"{"message": "invalid authorization code"}"#)
            .create_async()
            .await;

        let client = WebexClient::new(server.url());
        let err = client
            .exchange_code("bad-code", "http://localhost:3000/callback", "cid", "csecret")
            .await
            .unwrap_err();

        match err {
            WebexError::Upstream { status, body } => {
                assert_eq!(status.as_u16(), 400);
                assert!(body.contains("invalid authorization code"));
                // The secret must never leak through the error
                assert!(!body.contains("csecret"));
            }
            other => panic!("expected Upstream error, got {:?}", other),
        }
    }

    #[test]
    fn test_token_response_ignores_extra_fields() {
        let json = r#"{"access_token": "tok", "refresh_token": "r", "expires_in": 60}"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "tok");
    }
}
