use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-twitter-webhooks-signature";
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Body returned to the provider for a CRC challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrcResponse {
    pub response_token: String,
}

/// Checks a `sha256=<base64>` signature over `raw_body` in constant time.
pub fn verify_signature(secret: &str, raw_body: &[u8], signature_header: &str) -> bool {
    let Some(encoded) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let provided = match BASE64_STANDARD.decode(encoded.as_bytes()) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!("webhook signature is not valid base64: {}", err);
            return false;
        }
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    mac.verify_slice(&provided).is_ok()
}

/// Response token for the provider's registration handshake.
pub fn compute_challenge_response(secret: &str, crc_token: &str) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(crc_token.as_bytes());
    let encoded = BASE64_STANDARD.encode(mac.finalize().into_bytes());
    Ok(format!("{}{}", SIGNATURE_PREFIX, encoded))
}

pub fn crc_response(secret: &str, crc_token: &str) -> Result<CrcResponse, InvalidLength> {
    Ok(CrcResponse {
        response_token: compute_challenge_response(secret, crc_token)?,
    })
}

pub fn verify_request(secret: &str, headers: &HeaderMap, body: &[u8]) -> Result<(), &'static str> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or("missing_signature")?;
    if !verify_signature(secret, body, signature) {
        return Err("invalid_signature");
    }
    Ok(())
}
