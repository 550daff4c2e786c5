//! Object storage addressed by `(bucket, key)`.

pub mod azure;
pub mod memory;
pub mod supabase;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use azure::AzureBlobObjectStore;
pub use memory::MemoryObjectStore;
pub use supabase::SupabaseObjectStore;

pub const IMAGE_JPEG: &str = "image/jpeg";
pub const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("azure error: {0}")]
    Azure(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store lock poisoned")]
    LockPoisoned,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &'static str,
    ) -> Result<(), StoreError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectStoreConfig {
    Supabase {
        project_url: String,
        secret_key: String,
    },
    Azure {
        connection_string: String,
    },
    Memory,
}

impl ObjectStoreConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            ObjectStoreConfig::Supabase { .. } => "supabase",
            ObjectStoreConfig::Azure { .. } => "azure",
            ObjectStoreConfig::Memory => "memory",
        }
    }
}

pub fn build_object_store(
    config: &ObjectStoreConfig,
    timeout: Duration,
) -> Result<Arc<dyn ObjectStore>, StoreError> {
    let store: Arc<dyn ObjectStore> = match config {
        ObjectStoreConfig::Supabase {
            project_url,
            secret_key,
        } => Arc::new(SupabaseObjectStore::new(project_url, secret_key, timeout)?),
        ObjectStoreConfig::Azure { connection_string } => {
            Arc::new(AzureBlobObjectStore::new(connection_string)?)
        }
        ObjectStoreConfig::Memory => Arc::new(MemoryObjectStore::new()),
    };
    Ok(store)
}
