use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use pipeline_module::stages::normalize_bytes;
use pipeline_module::verify::{crc_response, verify_request};

use super::state::GatewayState;

pub(super) async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[derive(Debug, Deserialize)]
pub(super) struct CrcParams {
    crc_token: Option<String>,
}

/// Answers the provider's challenge-response check (GET request).
pub(super) async fn crc_challenge(
    State(state): State<Arc<GatewayState>>,
    Query(params): Query<CrcParams>,
) -> Response {
    let Some(token) = params
        .crc_token
        .filter(|value| !value.trim().is_empty())
    else {
        info!("crc request without crc_token");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "missing_crc_token"})),
        )
            .into_response();
    };

    match crc_response(state.webhook_secret(), &token) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => {
            error!("crc response failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "crc_error"})),
            )
                .into_response()
        }
    }
}

/// Receives direct message deliveries (POST request).
pub(super) async fn receive_webhook(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(reason) = verify_request(state.webhook_secret(), &headers, &body) {
        warn!("webhook rejected: {}", reason);
        return (StatusCode::BAD_REQUEST, "bad crc\n").into_response();
    }

    let envelope = match normalize_bytes(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            error!("webhook payload could not be normalized: {}", err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "normalize_failed"})),
            )
                .into_response();
        }
    };

    if !envelope.picture_exists {
        info!("webhook with {} events and no picture", envelope.len());
        return (StatusCode::OK, Json(json!({"status": "no_media"}))).into_response();
    }

    if state.runner.is_closed() {
        warn!("webhook with picture arrived during shutdown");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "shutting_down"})),
        )
            .into_response();
    }
    state.runner.spawn(envelope);

    (StatusCode::OK, Json(json!({"status": "accepted"}))).into_response()
}
