//! Webhook signature generation and verification

use crate::{Result, WebhookError};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 signer/verifier for `t=<unix>,v1=<hex>` headers.
///
/// The signed message is `"<t>.<body>"`.
#[derive(Clone)]
pub struct WebhookSignature {
    secret: SecretString,
}

impl fmt::Debug for WebhookSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSignature")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Parsed signature header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// Every `v1` entry, in header order
    pub signatures: Vec<String>,
}

impl WebhookSignature {
    /// Create a new signature utility with the given secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
        }
    }

    /// Sign `payload` with the current time
    pub fn sign(&self, payload: &[u8]) -> Result<String> {
        self.sign_at(payload, chrono::Utc::now().timestamp())
    }

    /// Sign `payload` as if sent at `timestamp`; returns the full header value
    pub fn sign_at(&self, payload: &[u8], timestamp: i64) -> Result<String> {
        let mac = self.mac_for(timestamp, payload)?;
        Ok(format!(
            "t={},v1={}",
            timestamp,
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    /// Verify `header` against `payload` using the current time.
    ///
    /// Returns the signed timestamp.
    pub fn verify(&self, payload: &[u8], header: &str, tolerance: Duration) -> Result<i64> {
        self.verify_at(payload, header, tolerance, chrono::Utc::now().timestamp())
    }

    /// Verify `header` against `payload` as of `now` (unix seconds).
    pub fn verify_at(
        &self,
        payload: &[u8],
        header: &str,
        tolerance: Duration,
        now: i64,
    ) -> Result<i64> {
        let parsed = Self::parse_header(header)?;
        let mac = self.mac_for(parsed.timestamp, payload)?;

        // Any v1 entry may match, which allows secret rotation
        let matched = parsed.signatures.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        });
        if !matched {
            return Err(WebhookError::SignatureMismatch);
        }

        let age_secs = now.abs_diff(parsed.timestamp);
        let tolerance_secs = tolerance.as_secs();
        if age_secs > tolerance_secs {
            return Err(WebhookError::TimestampOutOfTolerance {
                age_secs,
                tolerance_secs,
            });
        }

        Ok(parsed.timestamp)
    }

    /// Parse a `t=<unix>,v1=<hex>[,v1=<hex>...]` header.
    pub fn parse_header(header: &str) -> Result<SignatureHeader> {
        if header.trim().is_empty() {
            return Err(WebhookError::MissingSignature);
        }

        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", t)) => timestamp = Some(t.to_string()),
                Some(("v1", v)) if !v.is_empty() => signatures.push(v.to_string()),
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| WebhookError::MalformedSignature("missing timestamp".to_string()))?;
        if signatures.is_empty() {
            return Err(WebhookError::MalformedSignature(
                "missing v1 signature".to_string(),
            ));
        }

        let timestamp = timestamp.parse::<i64>().map_err(|_| {
            WebhookError::MalformedSignature(format!("invalid timestamp '{}'", timestamp))
        })?;

        Ok(SignatureHeader {
            timestamp,
            signatures,
        })
    }

    fn mac_for(&self, timestamp: i64, payload: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| WebhookError::Config(e.to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

/// Header names used by payment processors
pub mod headers {
    /// Stripe-style signature header
    pub const SIGNATURE: &str = "Stripe-Signature";

    /// Generic signature header
    pub const SIGNATURE_ALT: &str = "X-Webhook-Signature";
}
