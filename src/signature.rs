//! Webhook signature generation and verification using HMAC-SHA1.
//!
//! GitHub signs webhook payloads with HMAC-SHA1 over the raw request body,
//! using a secret shared between GitHub and the receiver. The signature is
//! delivered in the `X-Hub-Signature` header as `sha1=<lowercase hex>`.
//!
//! Verification happens before any payload parsing; a request whose
//! signature does not match is rejected without further inspection.

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Computes the raw HMAC-SHA1 digest of a payload using the given secret.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC accepts keys of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a raw digest as a signature header value, `sha1=<hex>`.
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha1={}", hex::encode(signature))
}

/// Signs a payload, returning the full header value (`sha1=<hex>`).
///
/// Deterministic: the same payload and secret always produce the same
/// signature.
pub fn sign(payload: &[u8], secret: &[u8]) -> String {
    format_signature_header(&compute_signature(payload, secret))
}

/// Parses a signature header value (e.g. `sha1=abc123...`) into raw bytes.
///
/// Returns `None` for malformed headers (missing prefix, wrong algorithm
/// tag, invalid hex). Never panics.
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix("sha1=")?;
    hex::decode(hex_sig).ok()
}

/// Verifies a presented signature header against the payload and secret.
///
/// Recomputes the expected digest and compares it with the presented one in
/// constant time (via the `hmac` crate's `verify_slice`), so verification
/// latency does not leak how much of the signature matched. On failure,
/// neither the secret nor the expected digest is exposed to the caller.
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let presented = match parse_signature_header(signature_header) {
        Some(sig) => sig,
        None => return false,
    };

    let mut mac = match HmacSha1::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    mac.verify_slice(&presented).is_ok()
}
