//! Processor webhook signature verification.
//!
//! The processor signs the raw request body with HMAC-SHA256 using the shared
//! webhook secret and sends the hex digest in the `X-Processor-Signature`
//! header, optionally prefixed with `sha256=`.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::OnboardingError;
use super::processor_event::ProcessorWebhookPayload;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-Processor-Signature";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verifier for processor webhook signatures.
pub struct ProcessorWebhookVerifier {
    secret: SecretString,
}

impl ProcessorWebhookVerifier {
    /// Creates a new verifier with the given shared secret.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies the signature over `payload`, then parses it.
    ///
    /// The payload is only parsed after the signature matched, so a forged
    /// body can never influence anything downstream.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` - header missing, not hex, or digest mismatch
    /// - `MalformedPayload` - signature fine but JSON not understood
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<ProcessorWebhookPayload, OnboardingError> {
        self.verify(payload, signature_header)?;

        serde_json::from_slice(payload)
            .map_err(|e| OnboardingError::MalformedPayload(e.to_string()))
    }

    /// Checks the signature only.
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<(), OnboardingError> {
        let header = signature_header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                tracing::warn!("Webhook rejected: missing signature header");
                OnboardingError::Unauthorized
            })?;

        let hex_digest = header.strip_prefix(SIGNATURE_PREFIX).unwrap_or(header);
        let provided = hex::decode(hex_digest).map_err(|_| {
            tracing::warn!("Webhook rejected: signature is not valid hex");
            OnboardingError::Unauthorized
        })?;

        let expected = self.compute_signature(payload)?;

        if !constant_time_compare(&expected, &provided) {
            tracing::warn!(payload_len = payload.len(), "Webhook rejected: signature mismatch");
            return Err(OnboardingError::Unauthorized);
        }

        Ok(())
    }

    fn compute_signature(&self, payload: &[u8]) -> Result<Vec<u8>, OnboardingError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| OnboardingError::Unauthorized)?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Signs `payload` the way the processor does; returns the full header value.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
