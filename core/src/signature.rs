//! Payment callback signature verification.
//!
//! The gateway signs `"{order_id}|{payment_id}"` with HMAC-SHA256 using the
//! account secret and sends the lower-case hex digest.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt::Write as _;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `"{order_id}|{payment_id}"` under `secret`.
#[must_use]
pub fn expected_signature(secret: &str, order_id: &str, payment_id: &str) -> String {
    // HMAC accepts keys of any length, so construction cannot fail.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());

    let digest = mac.finalize().into_bytes();
    digest.iter().fold(String::with_capacity(digest.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Constant-time comparison of `signature` against the expected digest.
#[must_use]
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let expected = expected_signature(secret, order_id, payment_id);
    !expected.is_empty() && constant_time_eq::constant_time_eq(expected.as_bytes(), signature.as_bytes())
}
