//! Webhook signature verification.

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    hmac::{Hmac, Mac},
    sha2::Sha256,
    tracing::warn,
};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Compute the signature LINE would send for `body`: base64 of
/// HMAC-SHA256 keyed with the channel secret.
pub fn sign(body: &[u8], channel_secret: &str) -> Option<String> {
    let mut mac = match HmacSha256::new_from_slice(channel_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("failed to create HMAC");
            return None;
        },
    };
    mac.update(body);
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify the `X-Line-Signature` header value against the raw request body.
pub fn verify_signature(body: &[u8], signature_header: &str, channel_secret: &str) -> bool {
    let expected = signature_header.trim();
    if expected.is_empty() {
        return false;
    }
    match sign(body, channel_secret) {
        Some(computed) => constant_time_eq(&computed, expected),
        None => false,
    }
}

/// Constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
