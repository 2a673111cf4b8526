//! Webhook signature verification.
//!
//! Asana signs every event delivery with HMAC-SHA256 over the raw request body,
//! keyed by the secret exchanged during the webhook handshake, and sends the
//! lowercase hex digest in the `X-Hook-Signature` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verifies Asana webhook signatures.
///
/// # Security
///
/// - Uses constant-time comparison of the decoded digests
/// - Fails closed: an absent secret or a malformed header never verifies
/// - Never logs secrets or signature values
///
/// # Examples
///
/// ```
/// use asana_sdk::webhook::SignatureVerifier;
///
/// let body = br#"{"events":[]}"#;
/// let signature = SignatureVerifier::compute_signature("secret", body);
///
/// assert!(SignatureVerifier::verify(Some("secret"), &signature, body));
/// assert!(!SignatureVerifier::verify(None, &signature, body));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Check `signature_header` against the HMAC of `raw_body` keyed by `secret`.
    ///
    /// `raw_body` must be the exact bytes received; re-serializing a parsed body
    /// can change formatting and break verification.
    ///
    /// Returns `false` when `secret` is `None` (unknown or pending webhook).
    pub fn verify(secret: Option<&str>, signature_header: &str, raw_body: &[u8]) -> bool {
        let secret = match secret {
            Some(s) => s,
            None => return false,
        };

        let provided = match hex::decode(signature_header.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        let expected = Self::compute_hmac(secret, raw_body);

        // Length check is safe in non-constant time
        if provided.len() != expected.len() {
            return false;
        }

        provided.ct_eq(&expected).into()
    }

    /// Compute the hex encoded signature Asana would send for `raw_body`.
    pub fn compute_signature(secret: &str, raw_body: &[u8]) -> String {
        hex::encode(Self::compute_hmac(secret, raw_body))
    }

    fn compute_hmac(secret: &str, raw_body: &[u8]) -> Vec<u8> {
        // HMAC accepts keys of any length, so construction cannot fail.
        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return Vec::new(),
        };
        mac.update(raw_body);
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
