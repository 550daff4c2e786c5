use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{error, info};

use super::{ObjectStore, StoreError};

/// Supabase Storage REST backend.
#[derive(Clone)]
pub struct SupabaseObjectStore {
    client: Client,
    base: String,
    key: String,
}

impl SupabaseObjectStore {
    pub fn new(project_url: &str, secret_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let base = project_url.trim().trim_end_matches('/').to_string();
        if base.is_empty() {
            return Err(StoreError::Storage("empty project url".to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            key: secret_key.trim().to_string(),
        })
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base, bucket, path)
    }
}

#[async_trait]
impl ObjectStore for SupabaseObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &'static str,
    ) -> Result<(), StoreError> {
        let size = body.len();
        let response = self
            .client
            .post(self.object_url(bucket, key))
            .header("Authorization", format!("Bearer {}", self.key))
            .header("apikey", &self.key)
            .header("x-upsert", "true")
            .header("content-type", content_type)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("supabase upload failed for {}/{}: {}", bucket, key, status);
            return Err(StoreError::Storage(format!(
                "upload failed (status {}): {}",
                status, body
            )));
        }

        info!("stored {}/{} ({} bytes)", bucket, key, size);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .client
            .get(self.object_url(bucket, key))
            .header("Authorization", format!("Bearer {}", self.key))
            .header("apikey", &self.key)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::Storage(format!(
                    "download failed (status {}): {}",
                    status, body
                )))
            }
        }
    }
}
