//! `X-Hub-Signature-256` verification.
//!
//! Meta signs every webhook POST with HMAC-SHA256 over the raw request
//! body, keyed by the app secret, and sends `sha256=<hex_digest>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use wabridge_core::error::ChannelError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Validate a hex-encoded HMAC-SHA256 digest of `payload` keyed by `secret`.
///
/// `signature_hex` is the bare digest (prefix already stripped). Returns
/// `false` on any mismatch or malformed input, including an empty
/// signature. Uses constant-time comparison to prevent timing attacks.
pub fn verify(payload: &[u8], signature_hex: &str, secret: &str) -> bool {
    // Invalid hex = reject
    let Ok(provided) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);

    // Constant-time comparison via `verify_slice`
    mac.verify_slice(&provided).is_ok()
}

/// Compute the lowercase hex HMAC-SHA256 digest of `payload`.
pub fn sign(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Strip exactly the `sha256=` prefix from a header value.
///
/// An absent header, or one without the prefix, yields the empty string,
/// which never verifies.
pub fn signature_from_header(header: Option<&str>) -> &str {
    header
        .and_then(|h| h.strip_prefix(SIGNATURE_PREFIX))
        .unwrap_or("")
}

/// Verifier bound to the configured app secret.
///
/// Construction fails when no secret is configured, so an unconfigured
/// deployment cannot start rather than accepting unsigned traffic.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Result<Self, ChannelError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(ChannelError::NotConfigured(
                "APP_SECRET is required to verify webhook signatures".into(),
            ));
        }
        Ok(Self { secret })
    }

    /// Check a raw body against the value of the signature header.
    pub fn verify_header(&self, payload: &[u8], header: Option<&str>) -> bool {
        verify(payload, signature_from_header(header), &self.secret)
    }

    /// Header value (`sha256=...`) for `payload`.
    pub fn header_value(&self, payload: &[u8]) -> String {
        format!("{SIGNATURE_PREFIX}{}", sign(payload, &self.secret))
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
