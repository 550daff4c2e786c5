use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use crate::context::PipelineContext;
use crate::event::{AnalyzedMessageEvent, PipelineEnvelope, StoredMessageEvent};
use crate::face_detection::DetectionError;
use crate::faces::{reduce_faces, FaceSummary};
use crate::object_store::{StoreError, APPLICATION_JSON};

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("stored media read failed: {0}")]
    ReadFailed(#[source] StoreError),
    #[error("face detection failed: {0}")]
    DetectionFailed(#[source] DetectionError),
}

impl AnalyzeError {
    /// Short code for log lines.
    pub fn code(&self) -> &str {
        match self {
            AnalyzeError::ReadFailed(_) => "ReadFailed",
            AnalyzeError::DetectionFailed(err) => err.code(),
        }
    }
}

pub fn sidecar_key(storage_path: &str) -> String {
    format!("{}.json", storage_path)
}

/// Reads the stored media back and reduces the detector output.
pub async fn analyze(
    ctx: &PipelineContext,
    event: &StoredMessageEvent,
) -> Result<Vec<FaceSummary>, AnalyzeError> {
    let image = ctx
        .store
        .get(&event.storage_bucket, &event.storage_path)
        .await
        .map_err(AnalyzeError::ReadFailed)?;
    let details = ctx
        .detector
        .detect_faces(&image)
        .await
        .map_err(AnalyzeError::DetectionFailed)?;
    Ok(reduce_faces(&details))
}

/// Analyzes one entry. Failures leave the entry with no faces.
pub async fn analyze_event(ctx: &PipelineContext, event: StoredMessageEvent) -> AnalyzedMessageEvent {
    let faces = match analyze(ctx, &event).await {
        Ok(faces) => {
            write_sidecar(ctx, &event, &faces).await;
            faces
        }
        Err(err) => {
            error!(
                "analysis of {}/{} failed [{}]: {}",
                event.storage_bucket,
                event.storage_path,
                err.code(),
                err
            );
            Vec::new()
        }
    };
    AnalyzedMessageEvent {
        stored: event,
        faces,
    }
}

async fn write_sidecar(ctx: &PipelineContext, event: &StoredMessageEvent, faces: &[FaceSummary]) {
    let key = sidecar_key(&event.storage_path);
    let body = match serde_json::to_vec(faces) {
        Ok(body) => body,
        Err(err) => {
            warn!("could not encode face summary for {}: {}", key, err);
            return;
        }
    };
    if let Err(err) = ctx
        .store
        .put(&event.storage_bucket, &key, body, APPLICATION_JSON)
        .await
    {
        warn!("face summary sidecar {} not written: {}", key, err);
    }
}

/// Analyzes every entry with bounded concurrency. All entries are kept, in order.
pub async fn analyze_batch(
    ctx: &PipelineContext,
    envelope: PipelineEnvelope<StoredMessageEvent>,
) -> PipelineEnvelope<AnalyzedMessageEvent> {
    let analyzed: Vec<AnalyzedMessageEvent> = stream::iter(envelope.into_events())
        .map(|event| {
            let ctx = ctx.clone();
            async move { analyze_event(&ctx, event).await }
        })
        .buffered(ctx.config.stage_concurrency.max(1))
        .collect()
        .await;

    let with_faces = analyzed.iter().filter(|event| !event.faces.is_empty()).count();
    info!("analyzed {} entries, {} with faces", analyzed.len(), with_faces);
    PipelineEnvelope::from_events(analyzed)
}
