//! Delivery signature validation.
//!
//! GitHub signs every delivery with HMAC-SHA256 over the raw body and puts
//! the hex digest in `X-Hub-Signature-256` as `sha256=<hex>`. Comparison is
//! constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex HMAC-SHA256 of a delivery body.
#[must_use]
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a `X-Hub-Signature-256` header value against the raw body.
#[must_use]
pub fn verify_signature(secret: &str, body: &[u8], header_value: &str) -> bool {
    let Some(received_hex) = header_value.strip_prefix("sha256=") else {
        return false;
    };
    let computed = compute_signature(secret, body);
    constant_time_eq(received_hex.as_bytes(), computed.as_bytes())
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signature_verifies() {
        let body = br#"{"action":"added"}"#;
        let header = format!("sha256={}", compute_signature("development", body));
        assert!(verify_signature("development", body, &header));
    }

    #[test]
    fn wrong_secret_fails() {
        let body = b"payload";
        let header = format!("sha256={}", compute_signature("secret-a", body));
        assert!(!verify_signature("secret-b", body, &header));
    }

    #[test]
    fn tampered_body_fails() {
        let header = format!("sha256={}", compute_signature("development", b"original"));
        assert!(!verify_signature("development", b"tampered", &header));
    }

    #[test]
    fn missing_prefix_fails() {
        let digest = compute_signature("development", b"body");
        assert!(!verify_signature("development", b"body", &digest));
    }

    #[test]
    fn signature_is_hex_of_sha256_width() {
        let digest = compute_signature("development", b"body");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
