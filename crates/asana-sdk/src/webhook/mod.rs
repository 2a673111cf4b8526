//! Asana webhook protocol support.
//!
//! Asana webhooks follow a two-phase protocol:
//!
//! 1. **Handshake** - when a subscription is created, Asana POSTs to the target
//!    URL with an `X-Hook-Secret` header and no signature. The receiver must
//!    answer 200 with the same `X-Hook-Secret` header to prove control of the
//!    URL, and keep the secret.
//! 2. **Events** - later deliveries carry `X-Hook-Signature`, the hex
//!    HMAC-SHA256 of the raw body keyed by the handshake secret.
//!
//! Answering 410 Gone to a delivery tells Asana to delete the subscription.
//!
//! # Examples
//!
//! ```rust
//! use asana_sdk::webhook::{EventBatch, SignatureVerifier, HOOK_SIGNATURE_HEADER};
//!
//! let body = br#"{"events":[{"action":"changed","resource":{"gid":"42"}}]}"#;
//! let signature = SignatureVerifier::compute_signature("handshake-secret", body);
//!
//! if SignatureVerifier::verify(Some("handshake-secret"), &signature, body) {
//!     let batch = EventBatch::from_slice(body).unwrap();
//!     assert_eq!(batch.events.len(), 1);
//! }
//! # let _ = HOOK_SIGNATURE_HEADER;
//! ```

pub mod events;
pub mod validation;

pub use events::{EventBatch, WebhookEvent};
pub use validation::SignatureVerifier;

/// Header carrying the handshake secret, on the request and echoed on the response.
pub const HOOK_SECRET_HEADER: &str = "X-Hook-Secret";

/// Header carrying the hex HMAC-SHA256 signature of an event delivery.
pub const HOOK_SIGNATURE_HEADER: &str = "X-Hook-Signature";
