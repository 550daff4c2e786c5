//! Face-detection collaborator.
//!
//! The detector accepts raw image bytes and returns per-face attribute
//! records. Failures from the service are classified into a closed set of
//! error codes so callers can match on them exhaustively.

pub mod rekognition;
pub mod sigv4;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use rekognition::{RekognitionConfig, RekognitionDetector};

#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Detects faces in `image`, requesting the full attribute set.
    async fn detect_faces(&self, image: &[u8]) -> Result<Vec<FaceDetail>, DetectionError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaceDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<AgeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<GenderAttribute>,
    #[serde(default)]
    pub emotions: Vec<EmotionCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgeRange {
    #[serde(default)]
    pub low: Option<u32>,
    #[serde(default)]
    pub high: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GenderAttribute {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionCandidate {
    #[serde(rename = "Type", default)]
    pub emotion_type: String,
    #[serde(rename = "Confidence", default)]
    pub confidence: f64,
}

/// Documented failure classes of the detection service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionErrorCode {
    InvalidImageReference,
    InvalidParameter,
    ImageTooLarge,
    AccessDenied,
    InternalServerError,
    Throttling,
    ProvisionedThroughputExceeded,
    InvalidImageFormat,
}

impl DetectionErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionErrorCode::InvalidImageReference => "InvalidS3ObjectException",
            DetectionErrorCode::InvalidParameter => "InvalidParameterException",
            DetectionErrorCode::ImageTooLarge => "ImageTooLargeException",
            DetectionErrorCode::AccessDenied => "AccessDeniedException",
            DetectionErrorCode::InternalServerError => "InternalServerError",
            DetectionErrorCode::Throttling => "ThrottlingException",
            DetectionErrorCode::ProvisionedThroughputExceeded => {
                "ProvisionedThroughputExceededException"
            }
            DetectionErrorCode::InvalidImageFormat => "InvalidImageFormatException",
        }
    }

    /// Parses a service error code. Namespaced codes such as
    /// `com.amazonaws.rekognition#ThrottlingException` are accepted.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.rsplit('#').next().unwrap_or(code).trim();
        let code = code.split(':').next().unwrap_or(code);
        match code {
            "InvalidS3ObjectException" => Some(DetectionErrorCode::InvalidImageReference),
            "InvalidParameterException" => Some(DetectionErrorCode::InvalidParameter),
            "ImageTooLargeException" => Some(DetectionErrorCode::ImageTooLarge),
            "AccessDeniedException" => Some(DetectionErrorCode::AccessDenied),
            "InternalServerError" => Some(DetectionErrorCode::InternalServerError),
            "ThrottlingException" => Some(DetectionErrorCode::Throttling),
            "ProvisionedThroughputExceededException" => {
                Some(DetectionErrorCode::ProvisionedThroughputExceeded)
            }
            "InvalidImageFormatException" => Some(DetectionErrorCode::InvalidImageFormat),
            _ => None,
        }
    }
}

impl fmt::Display for DetectionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("{code}: {message}")]
    Service {
        code: DetectionErrorCode,
        message: String,
    },
    #[error("unrecognized detection error {code}: {message}")]
    Unrecognized { code: String, message: String },
    #[error("detection request failed: {0}")]
    Transport(String),
    #[error("invalid detection response: {0}")]
    InvalidResponse(String),
    #[error("detection signing failed: {0}")]
    Signing(String),
}

impl DetectionError {
    /// Code used when logging the failure.
    pub fn code(&self) -> &str {
        match self {
            DetectionError::Service { code, .. } => code.as_str(),
            DetectionError::Unrecognized { code, .. } => code,
            DetectionError::Transport(_) => "Transport",
            DetectionError::InvalidResponse(_) => "InvalidResponse",
            DetectionError::Signing(_) => "Signing",
        }
    }

    pub fn from_service(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match DetectionErrorCode::from_code(code) {
            Some(code) => DetectionError::Service { code, message },
            None => DetectionError::Unrecognized {
                code: code.to_string(),
                message,
            },
        }
    }
}
