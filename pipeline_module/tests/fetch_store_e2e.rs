mod test_support;

use std::sync::Arc;

use mockito::{Matcher, Server};
use pipeline_module::object_store::{MemoryObjectStore, IMAGE_JPEG};
use pipeline_module::stages::{fetch_and_store, store_media_batch, FetchStoreError};
use pipeline_module::{DirectMessageEvent, PipelineEnvelope};

use test_support::{media_event, test_context, FailingStore, StaticDetector};

#[tokio::test]
async fn failed_fetch_drops_only_that_entry() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/media/1.jpg")
        .match_header("authorization", Matcher::Regex("^OAuth ".to_string()))
        .with_status(200)
        .with_header("content-type", "image/jpeg")
        .with_body(b"jpeg-one".to_vec())
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/media/2.jpg")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;
    let third = server
        .mock("GET", "/media/3.jpg")
        .with_status(200)
        .with_body(b"jpeg-three".to_vec())
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let ctx = test_context(&server.url(), store.clone(), Arc::new(StaticDetector(vec![])));
    let envelope = PipelineEnvelope::from_events(vec![
        media_event("111", "1", format!("{}/media/1.jpg", server.url())),
        media_event("222", "2", format!("{}/media/2.jpg", server.url())),
        media_event("333", "3", format!("{}/media/3.jpg", server.url())),
    ]);

    let stored = store_media_batch(&ctx, envelope).await;

    first.assert_async().await;
    second.assert_async().await;
    third.assert_async().await;

    assert_eq!(stored.len(), 2);
    assert!(stored.picture_exists);
    let paths: Vec<&str> = stored
        .events()
        .iter()
        .map(|event| event.storage_path.as_str())
        .collect();
    assert_eq!(paths, vec!["media/2020/01/01/1.jpg", "media/2020/01/01/3.jpg"]);
    assert_eq!(stored.events()[0].message.sender_id, "111");
    assert_eq!(stored.events()[1].storage_bucket, "pictures");

    let object = store.object("pictures", "media/2020/01/01/1.jpg").unwrap();
    assert_eq!(object.body, b"jpeg-one".to_vec());
    assert_eq!(object.content_type, IMAGE_JPEG);
    assert!(store.object("pictures", "media/2020/01/01/2.jpg").is_none());
}

#[tokio::test]
async fn entries_without_media_are_skipped() {
    let server = Server::new_async().await;
    let store = Arc::new(MemoryObjectStore::new());
    let ctx = test_context(&server.url(), store.clone(), Arc::new(StaticDetector(vec![])));
    let text_only = DirectMessageEvent {
        sender_id: "111".to_string(),
        create_timestamp: 1577836800000,
        media_id: None,
        media_url: None,
        url: None,
        text: "hello".to_string(),
    };

    let stored = store_media_batch(&ctx, PipelineEnvelope::from_events(vec![text_only])).await;
    assert!(stored.is_empty());
    assert!(!stored.picture_exists);
    assert!(store.keys("pictures").is_empty());
}

#[tokio::test]
async fn oversized_media_is_rejected() {
    let mut server = Server::new_async().await;
    let _media = server
        .mock("GET", "/media/big.jpg")
        .with_status(200)
        .with_body(vec![0u8; 64])
        .create_async()
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let mut ctx = test_context(&server.url(), store, Arc::new(StaticDetector(vec![])));
    let mut config = (*ctx.config).clone();
    config.media_max_bytes = 16;
    ctx.config = Arc::new(config);

    let event = media_event("111", "big", format!("{}/media/big.jpg", server.url()));
    let err = fetch_and_store(&ctx, &event, "media").await.unwrap_err();
    assert!(matches!(err, FetchStoreError::FetchFailed(_)));
}

#[tokio::test]
async fn store_failure_is_reported() {
    let mut server = Server::new_async().await;
    let _media = server
        .mock("GET", "/media/1.jpg")
        .with_status(200)
        .with_body(b"jpeg".to_vec())
        .create_async()
        .await;

    let ctx = test_context(&server.url(), Arc::new(FailingStore), Arc::new(StaticDetector(vec![])));
    let event = media_event("111", "1", format!("{}/media/1.jpg", server.url()));

    let err = fetch_and_store(&ctx, &event, "media").await.unwrap_err();
    assert!(matches!(err, FetchStoreError::StoreFailed(_)));

    let stored = store_media_batch(&ctx, PipelineEnvelope::from_events(vec![event])).await;
    assert!(stored.is_empty());
}
