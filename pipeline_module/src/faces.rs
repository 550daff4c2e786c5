//! Reduction of raw face-detection output into per-face summaries.

use serde::{Deserialize, Serialize};

use crate::face_detection::{EmotionCandidate, FaceDetail};

pub const UNKNOWN_EMOTION: &str = "UNKNOWN";
pub const UNKNOWN_GENDER: &str = "Unknown";

/// Compact description of one detected face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceSummary {
    pub dominant_emotion: String,
    pub gender: String,
    pub age_range_low: u32,
    pub age_range_high: u32,
}

/// Returns the candidate with the strictly highest confidence.
///
/// Candidates are scanned once in detector order, so the first of several
/// equal maxima is kept.
pub fn dominant_emotion(candidates: &[EmotionCandidate]) -> Option<&EmotionCandidate> {
    let mut best: Option<&EmotionCandidate> = None;
    for candidate in candidates {
        let replace = match best {
            None => true,
            Some(current) => candidate.confidence > current.confidence,
        };
        if replace {
            best = Some(candidate);
        }
    }
    best
}

pub fn summarize_face(detail: &FaceDetail) -> FaceSummary {
    let dominant_emotion = dominant_emotion(&detail.emotions)
        .map(|candidate| candidate.emotion_type.clone())
        .filter(|label| !label.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_EMOTION.to_string());

    let gender = detail
        .gender
        .as_ref()
        .and_then(|gender| gender.value.clone())
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_GENDER.to_string());

    let (low, high) = detail
        .age_range
        .as_ref()
        .map(|range| {
            let low = range.low.unwrap_or(0);
            let high = range.high.unwrap_or(low);
            (low, high)
        })
        .unwrap_or((0, 0));

    FaceSummary {
        dominant_emotion,
        gender,
        age_range_low: low.min(high),
        age_range_high: low.max(high),
    }
}

pub fn reduce_faces(details: &[FaceDetail]) -> Vec<FaceSummary> {
    details.iter().map(summarize_face).collect()
}
