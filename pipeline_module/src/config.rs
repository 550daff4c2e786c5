use std::env;
use std::time::Duration;

use crate::adapters::oauth1::OAuthCredentials;
use crate::adapters::twitter::DEFAULT_API_BASE_URL;
use crate::face_detection::rekognition::{RekognitionConfig, DEFAULT_REGION};
use crate::face_detection::sigv4::AwsCredentials;
use crate::object_store::ObjectStoreConfig;

pub const DEFAULT_MEDIA_KEY_PREFIX: &str = "media";
pub const DEFAULT_STAGE_CONCURRENCY: usize = 4;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MEDIA_MAX_BYTES: usize = 15 * 1024 * 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable: {key}")]
    MissingEnv { key: &'static str },
    #[error("invalid value for {key}: {value} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub oauth: OAuthCredentials,
    pub picture_bucket: String,
    pub media_key_prefix: String,
    pub twitter_api_base: String,
    pub stage_concurrency: usize,
    pub http_timeout: Duration,
    pub media_max_bytes: usize,
    pub object_store: ObjectStoreConfig,
    pub rekognition: RekognitionConfig,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::MissingEnv { key });

        let oauth = OAuthCredentials {
            consumer_key: require("CONSUMER_KEY")?,
            consumer_secret: require("CONSUMER_SECRET_KEY")?,
            token: require("OAUTH_TOKEN")?,
            token_secret: require("OAUTH_SECRET")?,
        };
        let picture_bucket = require("PICTURE_BUCKET")?;

        let media_key_prefix = lookup("MEDIA_KEY_PREFIX")
            .map(|value| value.trim().trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_MEDIA_KEY_PREFIX.to_string());
        let twitter_api_base =
            get("TWITTER_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let stage_concurrency = parse_positive(
            "STAGE_CONCURRENCY",
            get("STAGE_CONCURRENCY"),
            DEFAULT_STAGE_CONCURRENCY as u64,
        )? as usize;
        let http_timeout = Duration::from_secs(parse_positive(
            "HTTP_TIMEOUT_SECS",
            get("HTTP_TIMEOUT_SECS"),
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        let media_max_bytes = parse_positive(
            "MEDIA_MAX_BYTES",
            get("MEDIA_MAX_BYTES"),
            DEFAULT_MEDIA_MAX_BYTES as u64,
        )? as usize;

        let object_store = match get("OBJECT_STORE_BACKEND")
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("supabase") => ObjectStoreConfig::Supabase {
                project_url: require("SUPABASE_PROJECT_URL")?,
                secret_key: require("SUPABASE_SECRET_KEY")?,
            },
            Some("azure") => ObjectStoreConfig::Azure {
                connection_string: require("AZURE_STORAGE_CONNECTION_STRING")?,
            },
            Some("memory") => ObjectStoreConfig::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "OBJECT_STORE_BACKEND",
                    value: other.to_string(),
                    reason: "expected supabase, azure or memory",
                })
            }
        };

        let rekognition = RekognitionConfig {
            region: get("REKOGNITION_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint: get("REKOGNITION_ENDPOINT"),
            credentials: AwsCredentials {
                access_key_id: require("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
                session_token: get("AWS_SESSION_TOKEN"),
            },
        };

        Ok(Self {
            oauth,
            picture_bucket,
            media_key_prefix,
            twitter_api_base,
            stage_concurrency,
            http_timeout,
            media_max_bytes,
            object_store,
            rekognition,
        })
    }

    /// Shared secret for webhook signatures and CRC responses.
    pub fn webhook_secret(&self) -> &str {
        &self.oauth.consumer_secret
    }
}

fn parse_positive(key: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected a positive integer",
        }),
    }
}
