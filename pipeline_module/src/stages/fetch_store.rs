use chrono::DateTime;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info};

use crate::adapters::twitter::ProviderError;
use crate::context::PipelineContext;
use crate::event::{DirectMessageEvent, MessageEvent, PipelineEnvelope, StoredMessageEvent};
use crate::object_store::{StoreError, IMAGE_JPEG};

#[derive(Debug, thiserror::Error)]
pub enum FetchStoreError {
    #[error("event has no media")]
    MissingMedia,
    #[error("create_timestamp {0} is out of range")]
    InvalidTimestamp(i64),
    #[error("media fetch failed: {0}")]
    FetchFailed(#[source] ProviderError),
    #[error("media store failed: {0}")]
    StoreFailed(#[source] StoreError),
}

/// `<namespace>/<YYYY>/<MM>/<DD>/<media_id>.jpg`, dated in UTC from epoch ms.
///
/// Seconds are floored, so pre-epoch milliseconds fall on the earlier day.
pub fn media_object_key(namespace: &str, create_timestamp_ms: i64, media_id: &str) -> Option<String> {
    let created = DateTime::from_timestamp(create_timestamp_ms.div_euclid(1000), 0)?;
    let date = created.format("%Y/%m/%d");
    let namespace = namespace.trim_matches('/');
    if namespace.is_empty() {
        Some(format!("{}/{}.jpg", date, media_id))
    } else {
        Some(format!("{}/{}/{}.jpg", namespace, date, media_id))
    }
}

/// Downloads one event's media and writes it to the picture bucket.
///
/// Returns the bucket and key the bytes were written under.
pub async fn fetch_and_store(
    ctx: &PipelineContext,
    event: &DirectMessageEvent,
    namespace: &str,
) -> Result<(String, String), FetchStoreError> {
    let media_url = event
        .media_url
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or(FetchStoreError::MissingMedia)?;
    let media_id = event
        .media_id
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .ok_or(FetchStoreError::MissingMedia)?;
    let key = media_object_key(namespace, event.create_timestamp, media_id)
        .ok_or(FetchStoreError::InvalidTimestamp(event.create_timestamp))?;

    let body = ctx
        .provider
        .fetch_media(media_url, ctx.config.media_max_bytes)
        .await
        .map_err(FetchStoreError::FetchFailed)?;

    let bucket = ctx.config.picture_bucket.clone();
    ctx.store
        .put(&bucket, &key, body, IMAGE_JPEG)
        .await
        .map_err(FetchStoreError::StoreFailed)?;

    Ok((bucket, key))
}

/// Stores media for every event that has some, keeping input order.
///
/// Failed entries are logged and dropped. Entries without media are skipped.
pub async fn store_media_batch(
    ctx: &PipelineContext,
    envelope: PipelineEnvelope<DirectMessageEvent>,
) -> PipelineEnvelope<StoredMessageEvent> {
    let total = envelope.len();

    let results: Vec<Option<StoredMessageEvent>> = stream::iter(envelope.into_events().into_iter().enumerate())
        .map(|(index, event)| {
            let ctx = ctx.clone();
            async move { store_entry(&ctx, index, event).await }
        })
        .buffered(ctx.config.stage_concurrency.max(1))
        .collect()
        .await;

    let stored: Vec<StoredMessageEvent> = results.into_iter().flatten().collect();
    info!("stored media for {}/{} entries", stored.len(), total);
    PipelineEnvelope::from_events(stored)
}

async fn store_entry(
    ctx: &PipelineContext,
    index: usize,
    event: DirectMessageEvent,
) -> Option<StoredMessageEvent> {
    if !event.has_media() {
        debug!("entry {} from {} has no media; skipping", index, event.sender_id);
        return None;
    }
    match fetch_and_store(ctx, &event, &ctx.config.media_key_prefix).await {
        Ok((storage_bucket, storage_path)) => Some(StoredMessageEvent {
            message: event,
            storage_bucket,
            storage_path,
        }),
        Err(err) => {
            error!(
                "entry {} media {:?} dropped: {}",
                index,
                event.media_id.as_deref().unwrap_or_default(),
                err
            );
            None
        }
    }
}
