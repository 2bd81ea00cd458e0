//! Payment gateway webhook parsing and signature verification.
//!
//! Stripe signs each delivery with HMAC-SHA256 over `"{timestamp}.{body}"`
//! and sends the result in the `Stripe-Signature` header as
//! `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the gateway signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Event type that confirms a paid checkout session.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Maximum age of a signed delivery, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Signing timestamp (unix seconds)
    pub timestamp: i64,
    /// Candidate `v1` signatures
    pub signatures: Vec<Vec<u8>>,
}

/// Parses a `Stripe-Signature` header.
///
/// Returns `None` when the timestamp or every `v1` entry is missing or
/// malformed. Unknown schemes are ignored.
#[must_use]
pub fn parse_signature_header(header: &str) -> Option<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp?;
    if signatures.is_empty() {
        return None;
    }
    Some(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Computes the `v1` signature for a payload signed at `timestamp`.
#[must_use]
pub fn compute_signature(payload: &[u8], timestamp: i64, secret: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Formats a header value the way the gateway sends it.
#[must_use]
pub fn format_signature_header(timestamp: i64, signature: &[u8]) -> String {
    format!("t={timestamp},v1={}", hex::encode(signature))
}

/// Verifies a delivery against the shared secret.
///
/// Rejects deliveries signed more than [`SIGNATURE_TOLERANCE_SECS`] away
/// from `now`. Comparison is constant-time.
#[must_use]
pub fn verify_signature(payload: &[u8], header: &str, secret: &[u8], now: DateTime<Utc>) -> bool {
    let Some(parsed) = parse_signature_header(header) else {
        return false;
    };
    if (now.timestamp() - parsed.timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    parsed.signatures.iter().any(|candidate| {
        let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
            return false;
        };
        mac.update(parsed.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(candidate).is_ok()
    })
}

/// Minimal view of a gateway event.
#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
    /// Event type, e.g. `checkout.session.completed`
    #[serde(rename = "type")]
    pub kind: String,
    /// Event payload
    pub data: GatewayEventData,
}

/// Event payload wrapper.
#[derive(Debug, Deserialize)]
pub struct GatewayEventData {
    /// The object the event refers to
    pub object: GatewayObject,
}

/// The checkout session an event refers to.
#[derive(Debug, Deserialize)]
pub struct GatewayObject {
    /// Session id
    pub id: String,
}

impl GatewayEvent {
    /// Session id of a completed checkout, `None` for any other event.
    #[must_use]
    pub fn completed_session(&self) -> Option<&str> {
        (self.kind == CHECKOUT_COMPLETED).then_some(self.data.object.id.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &[u8] = b"whsec_test";

    fn signed(payload: &[u8], at: DateTime<Utc>) -> String {
        let ts = at.timestamp();
        format_signature_header(ts, &compute_signature(payload, ts, SECRET).unwrap())
    }

    #[test]
    fn test_valid_signature_verifies() {
        let now = Utc::now();
        let payload = br#"{"type":"checkout.session.completed"}"#;
        assert!(verify_signature(payload, &signed(payload, now), SECRET, now));
    }

    #[test]
    fn test_tampered_payload_or_wrong_secret_fails() {
        let now = Utc::now();
        let header = signed(b"original", now);
        assert!(!verify_signature(b"tampered", &header, SECRET, now));
        assert!(!verify_signature(b"original", &header, b"other", now));
    }

    #[test]
    fn test_stale_signature_fails() {
        let signed_at = Utc::now() - Duration::minutes(10);
        let header = signed(b"payload", signed_at);
        assert!(!verify_signature(b"payload", &header, SECRET, Utc::now()));
    }

    #[test]
    fn test_any_v1_candidate_may_match() {
        let now = Utc::now();
        let good = signed(b"payload", now);
        let header = format!("t={},v1={},{}", now.timestamp(), "00".repeat(32), &good[good.find("v1=").unwrap()..]);
        assert!(verify_signature(b"payload", &header, SECRET, now));
    }

    #[test]
    fn test_parse_rejects_malformed_headers() {
        assert!(parse_signature_header("").is_none());
        assert!(parse_signature_header("v1=abcd").is_none());
        assert!(parse_signature_header("t=123").is_none());
        assert!(parse_signature_header("t=abc,v1=abcd").is_none());
        assert!(parse_signature_header("t=123,v1=zz").is_none());
        assert_eq!(
            parse_signature_header("t=123, v1=abcd, v0=ffff").unwrap(),
            SignatureHeader {
                timestamp: 123,
                signatures: vec![vec![0xab, 0xcd]],
            }
        );
    }

    #[test]
    fn test_completed_session_only_for_checkout_completed() {
        let event: GatewayEvent = serde_json::from_str(
            r#"{"type":"checkout.session.completed","data":{"object":{"id":"cs_1"}}}"#,
        )
        .unwrap();
        assert_eq!(event.completed_session(), Some("cs_1"));

        let other: GatewayEvent = serde_json::from_str(
            r#"{"type":"checkout.session.expired","data":{"object":{"id":"cs_1"}}}"#,
        )
        .unwrap();
        assert_eq!(other.completed_session(), None);
    }
}
