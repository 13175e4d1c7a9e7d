//! Webhook request authentication
//!
//! Every pull-transport request is signed by the platform: an Ed25519
//! signature over the timestamp header concatenated with the raw body
//! bytes. Verification is a pure function of the application's public key
//! and the request — no state, no retries. A failed check is terminal for
//! that request.

use crate::error::{InteractionError, Result};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Header carrying the hex-encoded Ed25519 signature
pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";

/// Header carrying the decimal Unix timestamp string
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

/// Verifies platform request signatures against the application public key
///
/// Construct once at startup and share freely — verification has no shared
/// mutable state and is safe to invoke concurrently.
#[derive(Debug, Clone)]
pub struct Authenticator {
    key: VerifyingKey,
}

impl Authenticator {
    /// Create an authenticator from the hex-encoded 32-byte public key the
    /// platform issues to the application
    pub fn new(public_key_hex: &str) -> Result<Self> {
        let bytes = hex::decode(public_key_hex)
            .map_err(|e| InteractionError::Authentication(format!("invalid public key hex: {}", e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            InteractionError::Authentication("public key must be 32 bytes".to_string())
        })?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|e| {
            InteractionError::Authentication(format!("invalid public key: {}", e))
        })?;

        Ok(Self { key })
    }

    /// Verify a request signature
    ///
    /// The signed message is the timestamp bytes immediately followed by the
    /// raw body bytes, no delimiter. Malformed signature encoding fails
    /// closed the same as a bad signature.
    pub fn verify(&self, timestamp: &str, body: &[u8], signature_hex: &str) -> Result<()> {
        let sig_bytes = hex::decode(signature_hex)
            .map_err(|e| InteractionError::Authentication(format!("invalid signature hex: {}", e)))?;
        let sig_bytes: [u8; 64] = sig_bytes.try_into().map_err(|_| {
            InteractionError::Authentication("signature must be 64 bytes".to_string())
        })?;
        let signature = Signature::from_bytes(&sig_bytes);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify(&message, &signature)
            .map_err(|_| InteractionError::Authentication("signature verification failed".to_string()))
    }
}
