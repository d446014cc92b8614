use anyhow::{anyhow, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use sha2::Sha256;
use time::{Duration, OffsetDateTime};

type HmacSha256 = Hmac<Sha256>;

pub type Claims = Map<String, Value>;

const HS256_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("token is not a compact JWS")]
    Malformed,
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// Signing primitive behind launch tokens.
pub trait TokenSigner: Send + Sync {
    /// Signs `claims`, stamping issue and expiry times.
    fn sign(&self, claims: Claims, secret: &[u8]) -> Result<String>;

    /// Checks signature and expiry and hands the claims back.
    fn verify(&self, token: &str, secret: &[u8]) -> Result<Claims, VerifyError>;
}

/// Compact JWS with an HMAC-SHA256 signature.
#[derive(Debug, Clone)]
pub struct Hs256Signer {
    ttl: Duration,
    now: fn() -> OffsetDateTime,
}

impl Hs256Signer {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            now: OffsetDateTime::now_utc,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_clock(ttl: Duration, now: fn() -> OffsetDateTime) -> Self {
        Self { ttl, now }
    }
}

fn keyed_mac(secret: &[u8], signing_input: &str) -> Result<HmacSha256, String> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|err| err.to_string())?;
    mac.update(signing_input.as_bytes());
    Ok(mac)
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, VerifyError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| VerifyError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| VerifyError::Malformed)
}

impl TokenSigner for Hs256Signer {
    fn sign(&self, mut claims: Claims, secret: &[u8]) -> Result<String> {
        let issued_at = (self.now)().unix_timestamp();
        claims.insert("iat".into(), json!(issued_at));
        claims.insert("exp".into(), json!(issued_at + self.ttl.whole_seconds()));

        let header = URL_SAFE_NO_PAD.encode(HS256_HEADER);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{header}.{payload}");
        let mac =
            keyed_mac(secret, &signing_input).map_err(|err| anyhow!("invalid hmac key: {err}"))?;
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{signing_input}.{signature}"))
    }

    fn verify(&self, token: &str, secret: &[u8]) -> Result<Claims, VerifyError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(VerifyError::Malformed);
        };

        let header_json: Value = decode_segment(header)?;
        if header_json.get("alg").and_then(Value::as_str) != Some("HS256") {
            return Err(VerifyError::UnsupportedAlgorithm);
        }
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| VerifyError::Malformed)?;
        keyed_mac(secret, &format!("{header}.{payload}"))
            .map_err(VerifyError::InvalidKey)?
            .verify_slice(&signature)
            .map_err(|_| VerifyError::BadSignature)?;

        let claims: Claims = decode_segment(payload)?;
        let expires_at = claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or(VerifyError::Malformed)?;
        if (self.now)().unix_timestamp() >= expires_at {
            return Err(VerifyError::Expired);
        }
        Ok(claims)
    }
}
