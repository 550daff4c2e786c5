//! Stage chaining.
//!
//! `Pipeline` runs the stages in process for the gateway. `run_stage_json`
//! runs a single stage over its JSON envelope for external step hosts.

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::context::PipelineContext;
use crate::event::{AnalyzedMessageEvent, DirectMessageEvent, PipelineEnvelope, StoredMessageEvent};
use crate::stages::normalize::WebhookDelivery;
use crate::stages::{
    analyze_batch, ingest_delivery, send_reply, store_media_batch, NormalizeError, ReplyError,
};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Reply(#[from] ReplyError),
    #[error("invalid stage input: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown stage: {0}")]
    UnknownStage(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The batch carried no media; nothing past normalization ran.
    NoMedia { events: usize },
    /// Every media fetch or store failed.
    NothingStored,
    Replied { recipient_id: String, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    FetchStore,
    Analyze,
    Reply,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Normalize, Stage::FetchStore, Stage::Analyze, Stage::Reply];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::FetchStore => "fetch-store",
            Stage::Analyze => "analyze",
            Stage::Reply => "reply",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == value || stage.as_str().replace('-', "_") == value)
            .ok_or(PipelineError::UnknownStage(value))
    }
}

/// In-process orchestrator over a shared context.
#[derive(Clone)]
pub struct Pipeline {
    ctx: PipelineContext,
}

impl Pipeline {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Verifies and normalizes a delivery, then runs the media stages when
    /// the batch carries a picture.
    pub async fn run_delivery(
        &self,
        raw_body: &[u8],
        signature: &str,
    ) -> Result<PipelineOutcome, PipelineError> {
        let delivery = WebhookDelivery::new(signature, raw_body);
        let envelope = ingest_delivery(self.ctx.config.webhook_secret(), &delivery)?;
        self.run_media(envelope).await
    }

    /// Fetch/store, analyze and reply for an already normalized batch.
    pub async fn run_media(
        &self,
        envelope: PipelineEnvelope<DirectMessageEvent>,
    ) -> Result<PipelineOutcome, PipelineError> {
        if !envelope.picture_exists {
            return Ok(PipelineOutcome::NoMedia {
                events: envelope.len(),
            });
        }

        let stored = store_media_batch(&self.ctx, envelope).await;
        if stored.is_empty() {
            info!("no media stored; skipping analysis and reply");
            return Ok(PipelineOutcome::NothingStored);
        }

        let analyzed = analyze_batch(&self.ctx, stored).await;
        let reply = send_reply(&self.ctx, &analyzed).await?;
        Ok(PipelineOutcome::Replied {
            recipient_id: reply.recipient_id().to_string(),
            text: reply.text().to_string(),
        })
    }
}

/// Runs one stage over its JSON input and returns the JSON output.
pub async fn run_stage_json(
    ctx: &PipelineContext,
    stage: Stage,
    input: &str,
) -> Result<String, PipelineError> {
    let output = match stage {
        Stage::Normalize => {
            let delivery: WebhookDelivery = serde_json::from_str(input)?;
            let envelope = ingest_delivery(ctx.config.webhook_secret(), &delivery)?;
            serde_json::to_string(&envelope)?
        }
        Stage::FetchStore => {
            let envelope: PipelineEnvelope<DirectMessageEvent> = serde_json::from_str(input)?;
            serde_json::to_string(&store_media_batch(ctx, envelope).await)?
        }
        Stage::Analyze => {
            let envelope: PipelineEnvelope<StoredMessageEvent> = serde_json::from_str(input)?;
            serde_json::to_string(&analyze_batch(ctx, envelope).await)?
        }
        Stage::Reply => {
            let envelope: PipelineEnvelope<AnalyzedMessageEvent> = serde_json::from_str(input)?;
            serde_json::to_string(&send_reply(ctx, &envelope).await?)?
        }
    };
    Ok(output)
}
