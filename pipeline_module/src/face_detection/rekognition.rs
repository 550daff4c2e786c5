//! Amazon Rekognition `DetectFaces` client over the JSON 1.1 protocol.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sigv4::{amz_date, authorization_header, AwsCredentials, SigningRequest};
use super::{DetectionError, FaceDetail, FaceDetector};

pub const DEFAULT_REGION: &str = "eu-west-1";
const SERVICE: &str = "rekognition";
const TARGET: &str = "RekognitionService.DetectFaces";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Debug, Clone)]
pub struct RekognitionConfig {
    pub region: String,
    /// Overrides `https://rekognition.<region>.amazonaws.com`.
    pub endpoint: Option<String>,
    pub credentials: AwsCredentials,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectFacesRequest<'a> {
    image: ImageBytes,
    attributes: [&'a str; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ImageBytes {
    bytes: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectFacesResponse {
    #[serde(default)]
    face_details: Vec<FaceDetail>,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

#[derive(Clone)]
pub struct RekognitionDetector {
    client: Client,
    endpoint: Url,
    region: String,
    credentials: AwsCredentials,
}

impl RekognitionDetector {
    pub fn new(config: &RekognitionConfig, timeout: Duration) -> Result<Self, DetectionError> {
        let endpoint = config
            .endpoint
            .clone()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| format!("https://{}.{}.amazonaws.com", SERVICE, config.region));
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|err| DetectionError::Transport(format!("invalid endpoint: {}", err)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DetectionError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            region: config.region.clone(),
            credentials: config.credentials.clone(),
        })
    }

    fn host_header(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }
}

#[async_trait]
impl FaceDetector for RekognitionDetector {
    async fn detect_faces(&self, image: &[u8]) -> Result<Vec<FaceDetail>, DetectionError> {
        let request = DetectFacesRequest {
            image: ImageBytes {
                bytes: BASE64_STANDARD.encode(image),
            },
            attributes: ["ALL"],
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|err| DetectionError::InvalidResponse(err.to_string()))?;

        let timestamp = Utc::now();
        let mut headers = vec![
            ("content-type".to_string(), CONTENT_TYPE.to_string()),
            ("host".to_string(), self.host_header()),
            ("x-amz-date".to_string(), amz_date(timestamp)),
            ("x-amz-target".to_string(), TARGET.to_string()),
        ];
        if let Some(token) = self.credentials.session_token.as_ref() {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        let path = self.endpoint.path();
        let path = if path.is_empty() { "/" } else { path };
        let authorization = authorization_header(
            &self.credentials,
            &SigningRequest {
                method: "POST",
                path,
                query: "",
                headers: &headers,
                payload: &payload,
                region: &self.region,
                service: SERVICE,
                timestamp,
            },
        )
        .map_err(|err| DetectionError::Signing(err.to_string()))?;

        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header("authorization", authorization);
        for (name, value) in &headers {
            if name != "host" {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        debug!("rekognition detect_faces image_bytes={}", image.len());
        let response = builder
            .body(payload)
            .send()
            .await
            .map_err(|err| DetectionError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| DetectionError::Transport(err.to_string()))?;

        if !status.is_success() {
            let parsed: Option<ServiceErrorBody> = serde_json::from_slice(&body).ok();
            let (code, message) = match parsed {
                Some(ServiceErrorBody {
                    error_type: Some(code),
                    message,
                }) => (code, message.unwrap_or_default()),
                _ => {
                    return Err(DetectionError::Transport(format!(
                        "status {}: {}",
                        status,
                        String::from_utf8_lossy(&body)
                    )))
                }
            };
            return Err(DetectionError::from_service(&code, message));
        }

        let parsed: DetectFacesResponse = serde_json::from_slice(&body)
            .map_err(|err| DetectionError::InvalidResponse(err.to_string()))?;
        Ok(parsed.face_details)
    }
}
