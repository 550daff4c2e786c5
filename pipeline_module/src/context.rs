use std::sync::Arc;

use tracing::info;

use crate::adapters::twitter::{ProviderError, TwitterClient};
use crate::config::PipelineConfig;
use crate::face_detection::{DetectionError, FaceDetector, RekognitionDetector};
use crate::object_store::{build_object_store, ObjectStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("provider client: {0}")]
    Provider(#[from] ProviderError),
    #[error("object store: {0}")]
    Store(#[from] StoreError),
    #[error("face detector: {0}")]
    Detection(#[from] DetectionError),
}

/// Read-only state shared by every stage invocation.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<PipelineConfig>,
    pub provider: Arc<TwitterClient>,
    pub store: Arc<dyn ObjectStore>,
    pub detector: Arc<dyn FaceDetector>,
}

impl PipelineContext {
    pub fn new(
        config: PipelineConfig,
        provider: TwitterClient,
        store: Arc<dyn ObjectStore>,
        detector: Arc<dyn FaceDetector>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            provider: Arc::new(provider),
            store,
            detector,
        }
    }

    /// Builds the production collaborators described by `config`.
    pub fn from_config(config: PipelineConfig) -> Result<Self, ContextError> {
        let provider = TwitterClient::new(
            config.oauth.clone(),
            &config.twitter_api_base,
            config.http_timeout,
        )?;
        let store = build_object_store(&config.object_store, config.http_timeout)?;
        let detector: Arc<dyn FaceDetector> = Arc::new(RekognitionDetector::new(
            &config.rekognition,
            config.http_timeout,
        )?);
        info!(
            "pipeline context ready: bucket={}, store={}, region={}",
            config.picture_bucket,
            config.object_store.backend_name(),
            config.rekognition.region
        );
        Ok(Self::new(config, provider, store, detector))
    }
}
