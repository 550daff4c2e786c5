//! The pipeline stages after verification.
//!
//! Each stage consumes its input envelope and builds the next one.

pub mod analyze;
pub mod fetch_store;
pub mod normalize;
pub mod reply;

pub use analyze::{analyze, analyze_batch, analyze_event, AnalyzeError};
pub use fetch_store::{fetch_and_store, media_object_key, store_media_batch, FetchStoreError};
pub use normalize::{ingest_delivery, normalize, normalize_bytes, NormalizeError, WebhookDelivery};
pub use reply::{compose_envelope_reply, compose_reply, send_reply, ReplyError, NO_FACE_REPLY};
