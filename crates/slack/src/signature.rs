//! Slack request signing (the `X-Slack-Signature` scheme).
//!
//! Slack signs each interactivity request with
//! `v0=hex(hmac_sha256(secret, "v0:{timestamp}:{body}"))`. Requests older
//! than five minutes are refused to limit replay.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const MAX_TIMESTAMP_SKEW_SECS: i64 = 300;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("request timestamp is malformed")]
    MalformedTimestamp,
    #[error("request timestamp is outside the accepted window")]
    StaleTimestamp,
    #[error("signature header is malformed")]
    MalformedSignature,
    #[error("signature does not match")]
    Mismatch,
}

/// Computes the expected signature for a timestamp and raw request body.
pub fn sign(signing_secret: &SecretString, timestamp: &str, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(signing_secret.expose_secret().as_bytes())
        .unwrap_or_else(|_| unreachable!("hmac accepts keys of any length"));
    mac.update(format!("v0:{timestamp}:{body}").as_bytes());
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a request against its `X-Slack-Signature` and
/// `X-Slack-Request-Timestamp` headers. `now_unix` is injected so the
/// staleness window can be tested without a clock.
pub fn verify(
    signing_secret: &SecretString,
    timestamp: &str,
    body: &str,
    provided: &str,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let request_time: i64 =
        timestamp.parse().map_err(|_| SignatureError::MalformedTimestamp)?;
    if (now_unix - request_time).abs() > MAX_TIMESTAMP_SKEW_SECS {
        return Err(SignatureError::StaleTimestamp);
    }

    if !provided.starts_with("v0=") {
        return Err(SignatureError::MalformedSignature);
    }

    let expected = sign(signing_secret, timestamp, body);
    if constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{sign, verify, SignatureError, MAX_TIMESTAMP_SKEW_SECS};

    fn secret() -> SecretString {
        SecretString::from("8f742231b10e8888abcd99yyyzzz85a5")
    }

    #[test]
    fn valid_signature_passes() {
        let body = "payload=%7B%22type%22%3A%22block_actions%22%7D";
        let timestamp = "1730000000";
        let signature = sign(&secret(), timestamp, body);

        assert_eq!(verify(&secret(), timestamp, body, &signature, 1_730_000_010), Ok(()));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let timestamp = "1730000000";
        let signature = sign(&secret(), timestamp, "payload=original");

        assert_eq!(
            verify(&secret(), timestamp, "payload=tampered", &signature, 1_730_000_010),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let body = "payload=%7B%7D";
        let timestamp = "1730000000";
        let signature = sign(&secret(), timestamp, body);
        let now = 1_730_000_000 + MAX_TIMESTAMP_SKEW_SECS + 1;

        assert_eq!(
            verify(&secret(), timestamp, body, &signature, now),
            Err(SignatureError::StaleTimestamp)
        );
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let body = "payload=%7B%7D";
        assert_eq!(
            verify(&secret(), "not-a-number", body, "v0=00", 1_730_000_000),
            Err(SignatureError::MalformedTimestamp)
        );
        assert_eq!(
            verify(&secret(), "1730000000", body, "sha256=00", 1_730_000_000),
            Err(SignatureError::MalformedSignature)
        );
    }
}
