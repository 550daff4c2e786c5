use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use pipeline_module::{DirectMessageEvent, Pipeline, PipelineEnvelope, PipelineOutcome};

#[derive(Clone)]
pub(super) struct GatewayState {
    pub(super) runner: PipelineRunner,
}

impl GatewayState {
    pub(super) fn webhook_secret(&self) -> &str {
        self.runner.pipeline().context().config.webhook_secret()
    }
}

/// Runs the media stages for accepted deliveries in the background.
///
/// Every run is tracked so shutdown can wait for it, and at most
/// `max_in_flight` runs execute at once.
#[derive(Clone)]
pub(super) struct PipelineRunner {
    pipeline: Pipeline,
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
}

impl PipelineRunner {
    pub(super) fn new(pipeline: Pipeline, max_in_flight: usize) -> Self {
        Self {
            pipeline,
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    pub(super) fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub(super) fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    pub(super) fn spawn(&self, envelope: PipelineEnvelope<DirectMessageEvent>) {
        let pipeline = self.pipeline.clone();
        let permits = self.permits.clone();
        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                warn!("pipeline permits closed; batch of {} dropped", envelope.len());
                return;
            };
            match pipeline.run_media(envelope).await {
                Ok(PipelineOutcome::Replied { recipient_id, .. }) => {
                    info!("pipeline replied to {}", recipient_id);
                }
                Ok(outcome) => info!("pipeline finished without reply: {:?}", outcome),
                Err(err) => error!("pipeline failed: {}", err),
            }
        });
    }

    /// Stops taking new runs and waits for the tracked ones to finish.
    pub(super) async fn drain(&self) {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            info!("waiting for {} pipeline runs to finish", pending);
        }
        self.tracker.wait().await;
        info!("pipeline runs drained");
    }
}

#[cfg(test)]
pub(super) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;
    use pipeline_module::adapters::TwitterClient;
    use pipeline_module::face_detection::{DetectionError, FaceDetail, FaceDetector};
    use pipeline_module::object_store::MemoryObjectStore;
    use pipeline_module::{Pipeline, PipelineConfig, PipelineContext};

    use super::{GatewayState, PipelineRunner};

    pub(crate) const SECRET: &str = "ss";

    struct NoFaces;

    #[async_trait]
    impl FaceDetector for NoFaces {
        async fn detect_faces(&self, _image: &[u8]) -> Result<Vec<FaceDetail>, DetectionError> {
            Ok(Vec::new())
        }
    }

    pub(crate) fn test_state(api_base: &str, max_in_flight: usize) -> Arc<GatewayState> {
        let config = PipelineConfig::from_lookup(|key| {
            let value = match key {
                "CONSUMER_KEY" => "ckey",
                "CONSUMER_SECRET_KEY" => SECRET,
                "OAUTH_TOKEN" => "tok",
                "OAUTH_SECRET" => "tsecret",
                "PICTURE_BUCKET" => "pictures",
                "AWS_ACCESS_KEY_ID" => "AKID",
                "AWS_SECRET_ACCESS_KEY" => "aws-secret",
                "OBJECT_STORE_BACKEND" => "memory",
                "TWITTER_API_BASE_URL" => api_base,
                _ => return None,
            };
            Some(value.to_string())
        })
        .unwrap();
        let provider =
            TwitterClient::new(config.oauth.clone(), &config.twitter_api_base, config.http_timeout)
                .unwrap();
        let ctx = PipelineContext::new(
            config,
            provider,
            Arc::new(MemoryObjectStore::new()),
            Arc::new(NoFaces),
        );
        Arc::new(GatewayState {
            runner: PipelineRunner::new(Pipeline::new(ctx), max_in_flight),
        })
    }
}
