//! Event records passed between pipeline stages.
//!
//! Each stage produces its own record type. Later records embed the earlier
//! one (flattened on the wire), so a stage can only read fields that the
//! previous stage actually set.

use serde::{Deserialize, Serialize};

use crate::faces::FaceSummary;

/// Access to the canonical message fields shared by every stage record.
pub trait MessageEvent {
    fn message(&self) -> &DirectMessageEvent;

    fn has_media(&self) -> bool {
        self.message().has_media()
    }
}

/// Canonical direct message produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessageEvent {
    pub sender_id: String,
    /// Epoch milliseconds.
    pub create_timestamp: i64,
    #[serde(rename = "mediaID", default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub text: String,
}

impl DirectMessageEvent {
    /// True when `media_url` is present and non-empty.
    pub fn has_media(&self) -> bool {
        self.media_url
            .as_deref()
            .is_some_and(|value| !value.is_empty())
    }
}

impl MessageEvent for DirectMessageEvent {
    fn message(&self) -> &DirectMessageEvent {
        self
    }
}

/// Message whose media has been persisted to object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessageEvent {
    #[serde(flatten)]
    pub message: DirectMessageEvent,
    pub storage_bucket: String,
    pub storage_path: String,
}

impl MessageEvent for StoredMessageEvent {
    fn message(&self) -> &DirectMessageEvent {
        &self.message
    }
}

/// Stored message plus the reduced face-detection result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedMessageEvent {
    #[serde(flatten)]
    pub stored: StoredMessageEvent,
    #[serde(default)]
    pub faces: Vec<FaceSummary>,
}

impl MessageEvent for AnalyzedMessageEvent {
    fn message(&self) -> &DirectMessageEvent {
        &self.stored.message
    }
}

/// Batch of events handed from one stage to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "E: Deserialize<'de>"))]
pub struct PipelineEnvelope<E> {
    #[serde(rename = "direct-message-events", default)]
    pub direct_message_events: Vec<E>,
    #[serde(rename = "picture-exists", default)]
    pub picture_exists: bool,
}

impl<E: MessageEvent> PipelineEnvelope<E> {
    /// Builds an envelope, deriving `picture_exists` from the events.
    pub fn from_events(events: Vec<E>) -> Self {
        let picture_exists = events.iter().any(MessageEvent::has_media);
        Self {
            direct_message_events: events,
            picture_exists,
        }
    }

    pub fn empty() -> Self {
        Self {
            direct_message_events: Vec::new(),
            picture_exists: false,
        }
    }

    pub fn len(&self) -> usize {
        self.direct_message_events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direct_message_events.is_empty()
    }

    pub fn first(&self) -> Option<&E> {
        self.direct_message_events.first()
    }

    pub fn events(&self) -> &[E] {
        &self.direct_message_events
    }

    pub fn into_events(self) -> Vec<E> {
        self.direct_message_events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(media_url: Option<&str>) -> DirectMessageEvent {
        DirectMessageEvent {
            sender_id: "1001".to_string(),
            create_timestamp: 1577836800000,
            media_id: media_url.map(|_| "42".to_string()),
            media_url: media_url.map(str::to_string),
            url: media_url.map(|_| "https://t.co/abc".to_string()),
            text: "hi".to_string(),
        }
    }

    #[test]
    fn picture_exists_tracks_media() {
        let envelope = PipelineEnvelope::from_events(vec![message(None), message(None)]);
        assert!(!envelope.picture_exists);

        let envelope = PipelineEnvelope::from_events(vec![
            message(None),
            message(Some("https://ton.twitter.com/1.jpg")),
        ]);
        assert!(envelope.picture_exists);
    }

    #[test]
    fn only_empty_media_url_is_not_media() {
        assert!(!message(Some("")).has_media());
        assert!(message(Some(" ")).has_media());

        let envelope = PipelineEnvelope::from_events(vec![message(None), message(Some(" "))]);
        assert!(envelope.picture_exists);
    }

    #[test]
    fn stored_event_flattens_message_fields() {
        let stored = StoredMessageEvent {
            message: message(Some("https://ton.twitter.com/1.jpg")),
            storage_bucket: "pictures".to_string(),
            storage_path: "media/2020/01/01/42.jpg".to_string(),
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["sender_id"], "1001");
        assert_eq!(value["mediaID"], "42");
        assert_eq!(value["storage_bucket"], "pictures");
        assert!(value.get("message").is_none());
    }

    #[test]
    fn analyzed_envelope_reads_back() {
        let raw = r#"{
            "direct-message-events": [{
                "sender_id": "1001",
                "create_timestamp": 1577836800000,
                "mediaID": "42",
                "media_url": "https://ton.twitter.com/1.jpg",
                "text": "",
                "storage_bucket": "pictures",
                "storage_path": "media/2020/01/01/42.jpg",
                "faces": [{
                    "dominant_emotion": "HAPPY",
                    "gender": "Female",
                    "age_range_low": 20,
                    "age_range_high": 28
                }]
            }],
            "picture-exists": true
        }"#;
        let envelope: PipelineEnvelope<AnalyzedMessageEvent> = serde_json::from_str(raw).unwrap();
        let first = envelope.first().unwrap();
        assert_eq!(first.message().sender_id, "1001");
        assert_eq!(first.stored.storage_path, "media/2020/01/01/42.jpg");
        assert_eq!(first.faces[0].dominant_emotion, "HAPPY");
        assert!(first.message().url.is_none());
    }
}
