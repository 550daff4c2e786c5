use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adapters::twitter::{TwitterDirectMessageEvent, TwitterWebhookPayload};
use crate::event::{DirectMessageEvent, PipelineEnvelope};
use crate::verify::verify_signature;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("webhook signature does not match body")]
    SignatureInvalid,
    #[error("malformed input: {0}")]
    Decode(String),
    #[error("entry {index} has invalid created_timestamp {value:?}")]
    InvalidTimestamp { index: usize, value: String },
}

/// Webhook delivery as forwarded by the transport: the provider's signature
/// header plus the raw body, base64 encoded so it survives JSON transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDelivery {
    #[serde(rename = "webhooks-signature")]
    pub signature: String,
    #[serde(rename = "rawinput")]
    pub raw_input: String,
}

impl WebhookDelivery {
    pub fn new(signature: impl Into<String>, raw_body: &[u8]) -> Self {
        Self {
            signature: signature.into(),
            raw_input: BASE64_STANDARD.encode(raw_body),
        }
    }
}

/// Verifies a delivery and normalizes its body.
pub fn ingest_delivery(
    secret: &str,
    delivery: &WebhookDelivery,
) -> Result<PipelineEnvelope<DirectMessageEvent>, NormalizeError> {
    let body = BASE64_STANDARD
        .decode(delivery.raw_input.trim().as_bytes())
        .map_err(|err| {
            warn!("delivery rawinput is not valid base64: {}", err);
            NormalizeError::Decode(format!("rawinput: {}", err))
        })?;
    if !verify_signature(secret, &body, &delivery.signature) {
        return Err(NormalizeError::SignatureInvalid);
    }
    normalize_bytes(&body)
}

/// Parses and normalizes an already verified raw body.
pub fn normalize_bytes(raw_body: &[u8]) -> Result<PipelineEnvelope<DirectMessageEvent>, NormalizeError> {
    let payload: TwitterWebhookPayload = serde_json::from_slice(raw_body)
        .map_err(|err| NormalizeError::Decode(format!("payload: {}", err)))?;
    normalize(&payload)
}

/// Maps provider message events onto canonical events.
///
/// Any unparseable timestamp rejects the whole batch.
pub fn normalize(
    payload: &TwitterWebhookPayload,
) -> Result<PipelineEnvelope<DirectMessageEvent>, NormalizeError> {
    let Some(raw_events) = payload.direct_message_events.as_ref() else {
        return Ok(PipelineEnvelope::empty());
    };

    let events = raw_events
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_event(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    let envelope = PipelineEnvelope::from_events(events);
    info!(
        "normalized {} direct message events (picture_exists={})",
        envelope.len(),
        envelope.picture_exists
    );
    Ok(envelope)
}

fn normalize_event(
    index: usize,
    raw: &TwitterDirectMessageEvent,
) -> Result<DirectMessageEvent, NormalizeError> {
    let create_timestamp = raw
        .created_timestamp
        .trim()
        .parse::<i64>()
        .map_err(|_| NormalizeError::InvalidTimestamp {
            index,
            value: raw.created_timestamp.clone(),
        })?;

    let message_data = &raw.message_create.message_data;
    let media = message_data
        .attachment
        .as_ref()
        .and_then(|attachment| attachment.media.as_ref())
        .filter(|media| !media.media_url.is_empty());

    Ok(DirectMessageEvent {
        sender_id: raw.message_create.sender_id.clone(),
        create_timestamp,
        media_id: media.and_then(|media| media.media_id()),
        media_url: media.map(|media| media.media_url.clone()),
        url: media
            .map(|media| media.url.clone())
            .filter(|value| !value.is_empty()),
        text: message_data.text.clone(),
    })
}
