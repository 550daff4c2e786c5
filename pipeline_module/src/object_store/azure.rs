use async_trait::async_trait;
use azure_storage::StorageCredentials;
use azure_storage_blobs::prelude::*;
use tracing::{error, info};

use super::{ObjectStore, StoreError};

/// Azure Blob Storage backend. Buckets map to containers.
#[derive(Clone)]
pub struct AzureBlobObjectStore {
    service_client: BlobServiceClient,
    account_name: String,
}

/// Parse a connection string into (account_name, account_key)
fn parse_connection_string(connection_string: &str) -> Result<(String, String), StoreError> {
    let mut account_name = None;
    let mut account_key = None;

    for part in connection_string.split(';') {
        let part = part.trim();
        if let Some(val) = part.strip_prefix("AccountName=") {
            account_name = Some(val.to_string());
        } else if let Some(val) = part.strip_prefix("AccountKey=") {
            account_key = Some(val.to_string());
        }
    }

    match (account_name, account_key) {
        (Some(name), Some(key)) if !name.is_empty() && !key.is_empty() => Ok((name, key)),
        _ => Err(StoreError::InvalidConnectionString(
            "missing AccountName or AccountKey".to_string(),
        )),
    }
}

fn is_not_found(message: &str) -> bool {
    message.contains("BlobNotFound") || message.contains("ContainerNotFound") || message.contains("404")
}

impl AzureBlobObjectStore {
    pub fn new(connection_string: &str) -> Result<Self, StoreError> {
        let (account_name, account_key) = parse_connection_string(connection_string)?;
        let credentials = StorageCredentials::access_key(&account_name, account_key);
        let service_client = BlobServiceClient::new(&account_name, credentials);
        Ok(Self {
            service_client,
            account_name,
        })
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }
}

#[async_trait]
impl ObjectStore for AzureBlobObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &'static str,
    ) -> Result<(), StoreError> {
        let size = body.len();
        let blob_client = self.service_client.container_client(bucket).blob_client(key);
        blob_client
            .put_block_blob(body)
            .content_type(content_type)
            .await
            .map_err(|e| {
                error!("failed to write blob {}/{}: {}", bucket, key, e);
                StoreError::Azure(e.to_string())
            })?;
        info!("stored blob {}/{} ({} bytes)", bucket, key, size);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let blob_client = self.service_client.container_client(bucket).blob_client(key);
        match blob_client.get_content().await {
            Ok(data) => Ok(data),
            Err(e) if is_not_found(&e.to_string()) => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => {
                error!("failed to read blob {}/{}: {}", bucket, key, e);
                Err(StoreError::Azure(e.to_string()))
            }
        }
    }
}
