use tracing::info;

use crate::adapters::twitter::{DirectMessageReply, ProviderError};
use crate::context::PipelineContext;
use crate::event::{AnalyzedMessageEvent, MessageEvent, PipelineEnvelope};
use crate::faces::FaceSummary;

pub const NO_FACE_REPLY: &str = "No face detected in your picture.";

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("envelope has no events to reply to")]
    EmptyEnvelope,
    #[error("event has no sender to reply to")]
    MissingRecipient,
    #[error("reply send failed: {0}")]
    SendFailed(#[source] ProviderError),
}

pub fn format_face_reply(face: &FaceSummary) -> String {
    format!(
        "Only the first detected face is described\nface: 0\nage between {} and {}\ngender: {}\nemotion: {}",
        face.age_range_low, face.age_range_high, face.gender, face.dominant_emotion
    )
}

/// Builds the reply for one event from its first face.
pub fn compose_reply(event: &AnalyzedMessageEvent) -> Result<DirectMessageReply, ReplyError> {
    let recipient = event.message().sender_id.trim();
    if recipient.is_empty() {
        return Err(ReplyError::MissingRecipient);
    }
    let text = match event.faces.first() {
        Some(face) => format_face_reply(face),
        None => NO_FACE_REPLY.to_string(),
    };
    Ok(DirectMessageReply::new(recipient, text))
}

/// Only the first event of the batch is answered.
pub fn compose_envelope_reply(
    envelope: &PipelineEnvelope<AnalyzedMessageEvent>,
) -> Result<DirectMessageReply, ReplyError> {
    let first = envelope.first().ok_or(ReplyError::EmptyEnvelope)?;
    compose_reply(first)
}

pub async fn send_reply(
    ctx: &PipelineContext,
    envelope: &PipelineEnvelope<AnalyzedMessageEvent>,
) -> Result<DirectMessageReply, ReplyError> {
    let reply = compose_envelope_reply(envelope)?;
    ctx.provider
        .send_direct_message(&reply)
        .await
        .map_err(ReplyError::SendFailed)?;
    if envelope.len() > 1 {
        info!(
            "replied to first of {} events; the rest are not answered",
            envelope.len()
        );
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DirectMessageEvent, StoredMessageEvent};

    fn analyzed(sender_id: &str, faces: Vec<FaceSummary>) -> AnalyzedMessageEvent {
        AnalyzedMessageEvent {
            stored: StoredMessageEvent {
                message: DirectMessageEvent {
                    sender_id: sender_id.to_string(),
                    create_timestamp: 1577836800000,
                    media_id: Some("42".to_string()),
                    media_url: Some("https://ton.twitter.com/42.jpg".to_string()),
                    url: None,
                    text: String::new(),
                },
                storage_bucket: "pictures".to_string(),
                storage_path: "media/2020/01/01/42.jpg".to_string(),
            },
            faces,
        }
    }

    fn face(emotion: &str, low: u32, high: u32) -> FaceSummary {
        FaceSummary {
            dominant_emotion: emotion.to_string(),
            gender: "Male".to_string(),
            age_range_low: low,
            age_range_high: high,
        }
    }

    #[test]
    fn first_face_is_described() {
        let event = analyzed("111", vec![face("ANGRY", 30, 40), face("HAPPY", 5, 9)]);
        let reply = compose_reply(&event).unwrap();
        assert_eq!(reply.recipient_id(), "111");
        assert_eq!(
            reply.text(),
            "Only the first detected face is described\nface: 0\nage between 30 and 40\ngender: Male\nemotion: ANGRY"
        );
    }

    #[test]
    fn no_faces_gets_fixed_text() {
        let reply = compose_reply(&analyzed("111", vec![])).unwrap();
        assert_eq!(reply.text(), NO_FACE_REPLY);
    }

    #[test]
    fn blank_sender_cannot_be_answered() {
        assert!(matches!(
            compose_reply(&analyzed(" ", vec![])),
            Err(ReplyError::MissingRecipient)
        ));
    }

    #[test]
    fn only_first_event_is_answered() {
        let envelope = PipelineEnvelope::from_events(vec![
            analyzed("111", vec![]),
            analyzed("222", vec![face("CALM", 1, 2)]),
        ]);
        let reply = compose_envelope_reply(&envelope).unwrap();
        assert_eq!(reply.recipient_id(), "111");
        assert_eq!(reply.text(), NO_FACE_REPLY);
    }

    #[test]
    fn empty_envelope_is_an_error() {
        let envelope: PipelineEnvelope<AnalyzedMessageEvent> = PipelineEnvelope::empty();
        assert!(matches!(
            compose_envelope_reply(&envelope),
            Err(ReplyError::EmptyEnvelope)
        ));
    }

    #[test]
    fn wire_payload_shape() {
        let reply = compose_reply(&analyzed("111", vec![])).unwrap();
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["event"]["type"], "message_create");
        assert_eq!(
            value["event"]["message_create"]["target"]["recipient_id"],
            "111"
        );
        assert_eq!(
            value["event"]["message_create"]["message_data"]["text"],
            NO_FACE_REPLY
        );
    }
}
