//! Twitter Account Activity webhook payloads and the direct-message API client.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::oauth1::{authorization_header, OAuthCredentials};

pub const DEFAULT_API_BASE_URL: &str = "https://api.twitter.com";
pub const DIRECT_MESSAGE_SEND_PATH: &str = "/1.1/direct_messages/events/new.json";

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request signing failed: {0}")]
    Signing(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("media exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

// ============================================================================
// Webhook payload
// ============================================================================

/// Account Activity delivery body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TwitterWebhookPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_message_events: Option<Vec<TwitterDirectMessageEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_message_indicate_typing_events: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TwitterDirectMessageEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub id: String,
    /// Epoch milliseconds as a decimal string.
    #[serde(default)]
    pub created_timestamp: String,
    #[serde(default)]
    pub message_create: TwitterMessageCreate,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TwitterMessageCreate {
    #[serde(default)]
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TwitterTarget>,
    #[serde(default)]
    pub message_data: TwitterMessageData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TwitterTarget {
    pub recipient_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TwitterMessageData {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<TwitterAttachment>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TwitterAttachment {
    #[serde(rename = "type", default)]
    pub attachment_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<TwitterMedia>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TwitterMedia {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MediaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_str: Option<String>,
    #[serde(default)]
    pub media_url: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display_url: String,
}

impl TwitterMedia {
    /// Media id as a string, preferring `id_str` over the numeric id.
    pub fn media_id(&self) -> Option<String> {
        self.id_str
            .as_ref()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .or_else(|| self.id.as_ref().map(|id| id.to_string()))
    }
}

/// Media ids arrive either as JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MediaId {
    Number(u64),
    Text(String),
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaId::Number(value) => write!(f, "{}", value),
            MediaId::Text(value) => f.write_str(value),
        }
    }
}

// ============================================================================
// Direct message send payload
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessageReply {
    pub event: ReplyEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub message_create: ReplyMessageCreate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessageCreate {
    pub target: TwitterTarget,
    pub message_data: ReplyMessageData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessageData {
    pub text: String,
}

impl DirectMessageReply {
    pub fn new(recipient_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            event: ReplyEvent {
                event_type: "message_create".to_string(),
                message_create: ReplyMessageCreate {
                    target: TwitterTarget {
                        recipient_id: recipient_id.into(),
                    },
                    message_data: ReplyMessageData { text: text.into() },
                },
            },
        }
    }

    pub fn recipient_id(&self) -> &str {
        &self.event.message_create.target.recipient_id
    }

    pub fn text(&self) -> &str {
        &self.event.message_create.message_data.text
    }
}

// ============================================================================
// API client
// ============================================================================

/// OAuth 1.0a authenticated client for media downloads and DM sends.
#[derive(Clone)]
pub struct TwitterClient {
    client: Client,
    credentials: OAuthCredentials,
    api_base: String,
}

impl TwitterClient {
    pub fn new(
        credentials: OAuthCredentials,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            credentials,
            api_base: api_base.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn signed_request(&self, method: Method, url: &str) -> Result<reqwest::RequestBuilder, ProviderError> {
        let parsed = Url::parse(url).map_err(|err| ProviderError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        let nonce = Uuid::new_v4().simple().to_string();
        let header = authorization_header(
            &self.credentials,
            method.as_str(),
            &parsed,
            &nonce,
            Utc::now().timestamp(),
        )
        .map_err(|err| ProviderError::Signing(err.to_string()))?;
        Ok(self
            .client
            .request(method, parsed)
            .header("Authorization", header))
    }

    /// Downloads media, failing if the body is larger than `max_bytes`.
    pub async fn fetch_media(&self, media_url: &str, max_bytes: usize) -> Result<Vec<u8>, ProviderError> {
        let mut response = self.signed_request(Method::GET, media_url)?.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if response
            .content_length()
            .is_some_and(|length| length > max_bytes as u64)
        {
            return Err(ProviderError::TooLarge { limit: max_bytes });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > max_bytes {
                return Err(ProviderError::TooLarge { limit: max_bytes });
            }
            body.extend_from_slice(&chunk);
        }
        debug!("fetched media {} ({} bytes)", media_url, body.len());
        Ok(body)
    }

    pub async fn send_direct_message(&self, reply: &DirectMessageReply) -> Result<(), ProviderError> {
        let url = format!("{}{}", self.api_base, DIRECT_MESSAGE_SEND_PATH);
        let payload = serde_json::to_vec(reply)?;
        let response = self
            .signed_request(Method::POST, &url)?
            .header("content-type", "application/json")
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        info!("sent direct message to {}", reply.recipient_id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_message_with_media() {
        let payload = r#"{
            "for_user_id": "4337869213",
            "direct_message_events": [{
                "type": "message_create",
                "id": "954491830116155396",
                "created_timestamp": "1516403560557",
                "message_create": {
                    "target": {"recipient_id": "4337869213"},
                    "sender_id": "3001969357",
                    "message_data": {
                        "text": "Look https://t.co/abc",
                        "entities": {"hashtags": [], "urls": []},
                        "attachment": {
                            "type": "media",
                            "media": {
                                "id": 954491810340679680,
                                "id_str": "954491810340679680",
                                "media_url": "https://ton.twitter.com/1.1/ton/data/dm/954491830116155396/954491810340679680/abc.jpg",
                                "url": "https://t.co/abc",
                                "display_url": "pic.twitter.com/abc"
                            }
                        }
                    }
                }
            }]
        }"#;
        let parsed: TwitterWebhookPayload = serde_json::from_str(payload).unwrap();
        let events = parsed.direct_message_events.unwrap();
        assert_eq!(events.len(), 1);
        let media = events[0]
            .message_create
            .message_data
            .attachment
            .as_ref()
            .and_then(|attachment| attachment.media.as_ref())
            .unwrap();
        assert_eq!(media.media_id().as_deref(), Some("954491810340679680"));
        assert_eq!(events[0].message_create.sender_id, "3001969357");
    }

    #[test]
    fn numeric_media_id_without_id_str() {
        let media: TwitterMedia =
            serde_json::from_str(r#"{"id": 42, "media_url": "https://x/1.jpg"}"#).unwrap();
        assert_eq!(media.media_id().as_deref(), Some("42"));

        let media: TwitterMedia =
            serde_json::from_str(r#"{"id": "77", "media_url": "https://x/1.jpg"}"#).unwrap();
        assert_eq!(media.media_id().as_deref(), Some("77"));
    }

    #[test]
    fn reply_payload_shape() {
        let reply = DirectMessageReply::new("3001969357", "hello");
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "event": {
                    "type": "message_create",
                    "message_create": {
                        "target": {"recipient_id": "3001969357"},
                        "message_data": {"text": "hello"}
                    }
                }
            })
        );
    }

    #[test]
    fn invalid_media_url_is_reported() {
        let client = TwitterClient::new(
            OAuthCredentials {
                consumer_key: "k".to_string(),
                consumer_secret: "s".to_string(),
                token: "t".to_string(),
                token_secret: "ts".to_string(),
            },
            DEFAULT_API_BASE_URL,
            Duration::from_secs(5),
        )
        .unwrap();
        let err = client.signed_request(Method::GET, "not a url").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidUrl { .. }));
    }
}
