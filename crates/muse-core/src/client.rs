//! HTTP client for the Muse creations API.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::feed::{FeedClient, FeedSource};
use crate::likes::{LikeTransport, ToggleLikeResponse};
use crate::models::{Creation, CreationId};
use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

const USER_CREATIONS_PATH: &str = "/api/user/get-user-creations";
const PUBLISHED_CREATIONS_PATH: &str = "/api/user/get-published-creations";
const TOGGLE_LIKE_PATH: &str = "/api/user/toggle-like-creations";

#[derive(Clone)]
pub struct MuseClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for MuseClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("MuseClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct CreationsEnvelope {
    success: bool,
    #[serde(default)]
    creations: Vec<Creation>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ToggleLikeRequest<'a> {
    id: &'a CreationId,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl MuseClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let token = normalize_text_option(Some(token.into()))
            .ok_or_else(|| Error::InvalidInput("API token must not be empty".to_string()))?;
        Ok(Self {
            base_url,
            token,
            client: reqwest::Client::builder().build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_published(&self) -> Result<Vec<Creation>> {
        self.fetch(PUBLISHED_CREATIONS_PATH).await
    }

    pub async fn fetch_own(&self) -> Result<Vec<Creation>> {
        self.fetch(USER_CREATIONS_PATH).await
    }

    /// Flip the caller's like.
    ///
    /// Any reply carrying a `{success: false, message}` envelope, including
    /// 401 and 429, comes back as `Ok` so callers see the server's refusal.
    /// Only replies without a readable envelope are errors.
    pub async fn toggle_like(&self, id: &CreationId) -> Result<ToggleLikeResponse> {
        let response = self
            .client
            .post(self.url(TOGGLE_LIKE_PATH))
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .json(&ToggleLikeRequest { id })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return rejection_from_body(status, &body);
        }

        Ok(response.json::<ToggleLikeResponse>().await?)
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Creation>> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(parse_api_error(status, &body)));
        }

        let envelope = response.json::<CreationsEnvelope>().await?;
        envelope_into_creations(envelope)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl FeedClient for MuseClient {
    async fn fetch_creations(&self, source: FeedSource) -> Result<Vec<Creation>> {
        match source {
            FeedSource::Published => self.fetch_published().await,
            FeedSource::Own => self.fetch_own().await,
        }
    }
}

impl LikeTransport for MuseClient {
    // The bearer token identifies the actor server-side.
    async fn toggle_like(
        &self,
        creation_id: CreationId,
        _actor_id: &str,
    ) -> Result<ToggleLikeResponse> {
        Self::toggle_like(self, &creation_id).await
    }
}

fn envelope_into_creations(envelope: CreationsEnvelope) -> Result<Vec<Creation>> {
    if envelope.success {
        Ok(envelope.creations)
    } else {
        Err(Error::Api(
            envelope
                .message
                .unwrap_or_else(|| "request was not successful".to_string()),
        ))
    }
}

fn rejection_from_body(status: StatusCode, body: &str) -> Result<ToggleLikeResponse> {
    match serde_json::from_str::<ToggleLikeResponse>(body) {
        Ok(response) if !response.success => {
            tracing::debug!(status = status.as_u16(), "Like refused by server");
            Ok(response)
        }
        _ => Err(Error::Api(parse_api_error(status, body))),
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("API URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "API URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::likes::{LikeError, LikeSynchronizer};
    use crate::models::{CreationKind, NewCreation};
    use crate::store::CreationStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn base_url_requires_scheme_and_drops_trailing_slash() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url(" https://api.example.com/ ".to_string()).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(MuseClient::new("https://api.example.com", "  ").is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let client = MuseClient::new("https://api.example.com", "secret-token").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(
            client.url(TOGGLE_LIKE_PATH),
            "https://api.example.com/api/user/toggle-like-creations"
        );
    }

    #[test]
    fn failed_envelope_becomes_api_error() {
        let envelope: CreationsEnvelope =
            serde_json::from_str(r#"{"success":false,"message":"Unauthorized"}"#).unwrap();
        let err = envelope_into_creations(envelope).unwrap_err();
        assert_eq!(err.to_string(), "API error: Unauthorized");
    }

    #[test]
    fn successful_envelope_parses_creations() {
        let body = r#"{"success":true,"creations":[{
            "id":"0191f0a4-7c1e-7d53-9a55-2c4d1b7e6a10",
            "user_id":"user_1","prompt":"cat","content":"https://img/cat.png",
            "type":"image","publish":true,"likes":["user_2"],"created_at":1700000000000
        }]}"#;
        let envelope: CreationsEnvelope = serde_json::from_str(body).unwrap();
        let creations = envelope_into_creations(envelope).unwrap();
        assert_eq!(creations.len(), 1);
        assert!(creations[0].is_liked_by("user_2"));
    }

    #[test]
    fn refusal_envelope_on_error_status_is_a_response() {
        let response = rejection_from_body(
            StatusCode::UNAUTHORIZED,
            r#"{"success":false,"message":"Unauthorized: Token is expired"}"#,
        )
        .unwrap();
        assert_eq!(
            response,
            ToggleLikeResponse::rejected("Unauthorized: Token is expired")
        );

        let err = rejection_from_body(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>")
            .unwrap_err();
        assert!(matches!(err, Error::Api(_)));
    }

    /// Serve one canned HTTP reply on a loopback port
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0_u8; 4096];
            let _ = socket.read(&mut request).await;
            let reply = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn rate_limited_like_is_rejected_by_server_and_reverted() {
        let base_url = serve_once(
            "429 Too Many Requests",
            r#"{"success":false,"message":"Too many requests: Rate limit exceeded for toggle_like"}"#,
        )
        .await;
        let creation = NewCreation::new("owner", "p", "https://img/p.png", CreationKind::Image)
            .published(true)
            .into_creation();
        let id = creation.id;
        let store = CreationStore::with_creations(vec![creation]);
        let client = MuseClient::new(base_url, "token").unwrap();
        let sync = LikeSynchronizer::new(store.clone(), client);

        let result = sync.toggle(id, "u1").await;

        assert_eq!(
            result,
            Err(LikeError::RejectedByServer(
                "Too many requests: Rate limit exceeded for toggle_like".to_string()
            ))
        );
        assert!(!store.get(&id).await.unwrap().is_liked_by("u1"));
    }

    #[tokio::test]
    async fn unreadable_error_reply_is_transport_failure() {
        let base_url = serve_once("502 Bad Gateway", "upstream down").await;
        let creation = NewCreation::new("owner", "p", "https://img/p.png", CreationKind::Image)
            .into_creation();
        let id = creation.id;
        let sync = LikeSynchronizer::new(
            CreationStore::with_creations(vec![creation]),
            MuseClient::new(base_url, "token").unwrap(),
        );

        let result = sync.toggle(id, "u1").await;
        assert!(matches!(
            result,
            Err(LikeError::TransportFailure(message)) if message.contains("502")
        ));
    }

    #[test]
    fn api_error_prefers_message_field() {
        assert_eq!(
            parse_api_error(StatusCode::TOO_MANY_REQUESTS, r#"{"message":"slow down"}"#),
            "slow down (429)"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, "  "), "HTTP 502");
    }
}
