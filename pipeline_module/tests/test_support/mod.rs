#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use pipeline_module::adapters::TwitterClient;
use pipeline_module::face_detection::{
    AgeRange, DetectionError, EmotionCandidate, FaceDetail, FaceDetector, GenderAttribute,
};
use pipeline_module::object_store::{ObjectStore, StoreError};
use pipeline_module::{DirectMessageEvent, PipelineConfig, PipelineContext};

pub const WEBHOOK_SECRET: &str = "csecret";

pub fn test_config(api_base: &str) -> PipelineConfig {
    let vars = [
        ("CONSUMER_KEY", "ckey"),
        ("CONSUMER_SECRET_KEY", WEBHOOK_SECRET),
        ("OAUTH_TOKEN", "tok"),
        ("OAUTH_SECRET", "tsecret"),
        ("PICTURE_BUCKET", "pictures"),
        ("AWS_ACCESS_KEY_ID", "AKID"),
        ("AWS_SECRET_ACCESS_KEY", "aws-secret"),
        ("OBJECT_STORE_BACKEND", "memory"),
        ("TWITTER_API_BASE_URL", api_base),
        ("STAGE_CONCURRENCY", "2"),
        ("HTTP_TIMEOUT_SECS", "5"),
    ];
    PipelineConfig::from_lookup(|key| {
        vars.iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.to_string())
    })
    .expect("test config")
}

pub fn test_context(
    api_base: &str,
    store: Arc<dyn ObjectStore>,
    detector: Arc<dyn FaceDetector>,
) -> PipelineContext {
    let config = test_config(api_base);
    let provider = TwitterClient::new(
        config.oauth.clone(),
        &config.twitter_api_base,
        config.http_timeout,
    )
    .expect("twitter client");
    PipelineContext::new(config, provider, store, detector)
}

pub fn media_event(sender_id: &str, media_id: &str, media_url: String) -> DirectMessageEvent {
    DirectMessageEvent {
        sender_id: sender_id.to_string(),
        create_timestamp: 1577836800000,
        media_id: Some(media_id.to_string()),
        media_url: Some(media_url),
        url: Some("https://t.co/abc".to_string()),
        text: String::new(),
    }
}

pub fn face(emotions: &[(&str, f64)], low: u32, high: u32, gender: &str) -> FaceDetail {
    FaceDetail {
        age_range: Some(AgeRange {
            low: Some(low),
            high: Some(high),
        }),
        gender: Some(GenderAttribute {
            value: Some(gender.to_string()),
            confidence: Some(99.0),
        }),
        emotions: emotions
            .iter()
            .map(|(label, confidence)| EmotionCandidate {
                emotion_type: label.to_string(),
                confidence: *confidence,
            })
            .collect(),
        confidence: Some(99.9),
    }
}

pub struct StaticDetector(pub Vec<FaceDetail>);

#[async_trait]
impl FaceDetector for StaticDetector {
    async fn detect_faces(&self, _image: &[u8]) -> Result<Vec<FaceDetail>, DetectionError> {
        Ok(self.0.clone())
    }
}

pub struct FailingDetector(pub &'static str);

#[async_trait]
impl FaceDetector for FailingDetector {
    async fn detect_faces(&self, _image: &[u8]) -> Result<Vec<FaceDetail>, DetectionError> {
        Err(DetectionError::from_service(self.0, "stubbed failure"))
    }
}

/// Store that rejects every write.
pub struct FailingStore;

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put(
        &self,
        _bucket: &str,
        _key: &str,
        _body: Vec<u8>,
        _content_type: &'static str,
    ) -> Result<(), StoreError> {
        Err(StoreError::Storage("write refused".to_string()))
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        Err(StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}
