use axum::http::HeaderMap;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;
use tracing::error;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[derive(Debug, Error)]
pub enum PublicKeyError {
    #[error("public key is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("public key must be 32 bytes, got {0}")]
    Length(usize),
    #[error("public key is not a valid ed25519 point")]
    Point,
}

/// Checks that an interaction was signed by the platform. A verifier built
/// without a usable key rejects everything.
#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    key: Option<VerifyingKey>,
}

impl SignatureVerifier {
    pub fn from_hex(public_key: &str) -> Result<Self, PublicKeyError> {
        let bytes = hex::decode(public_key.trim())?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| PublicKeyError::Length(bytes.len()))?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|_| PublicKeyError::Point)?;
        Ok(Self { key: Some(key) })
    }

    /// Build from an optional configured key, logging why verification will
    /// fail closed when the key is absent or unusable.
    pub fn from_config(public_key: Option<&str>) -> Self {
        match public_key {
            Some(hex_key) => Self::from_hex(hex_key).unwrap_or_else(|err| {
                error!(error = %err, "discord public key is unusable; rejecting all interactions");
                Self::fail_closed()
            }),
            None => {
                error!("discord public key is not configured; rejecting all interactions");
                Self::fail_closed()
            }
        }
    }

    pub fn fail_closed() -> Self {
        Self { key: None }
    }

    pub fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    /// Verify `signature` over `timestamp || body`. The body must be the raw
    /// bytes as received.
    pub fn verify(&self, signature: Option<&str>, timestamp: Option<&str>, body: &[u8]) -> bool {
        let (Some(key), Some(signature), Some(timestamp)) = (self.key.as_ref(), signature, timestamp)
        else {
            return false;
        };
        let Ok(signature_bytes) = hex::decode(signature.trim()) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&signature_bytes) else {
            return false;
        };
        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);
        key.verify(&message, &signature).is_ok()
    }

    pub fn verify_headers(&self, headers: &HeaderMap, body: &[u8]) -> bool {
        let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
        self.verify(header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER), body)
    }
}
