pub mod adapters;
pub mod config;
pub mod context;
pub mod event;
pub mod face_detection;
pub mod faces;
pub mod object_store;
pub mod pipeline;
pub mod stages;
pub mod verify;

pub use config::{ConfigError, PipelineConfig};
pub use context::{ContextError, PipelineContext};
pub use event::{
    AnalyzedMessageEvent, DirectMessageEvent, MessageEvent, PipelineEnvelope, StoredMessageEvent,
};
pub use faces::FaceSummary;
pub use pipeline::{Pipeline, PipelineError, PipelineOutcome, Stage};
