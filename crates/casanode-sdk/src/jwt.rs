//! Bearer expiry decoding.
//!
//! The node issues JWTs, `base64url(header).base64url(body).base64url(sig)`.
//! The client never verifies them; it only reads the `exp` claim of the
//! body to know when to refresh.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

/// URL-safe alphabet, with or without trailing `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    NO_PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Expiry of a JWT in milliseconds since the Unix epoch.
///
/// Returns `None` when the token has no body segment, the body is not
/// base64url JSON, or `exp` is missing, zero or not a number.
#[allow(clippy::cast_possible_truncation)]
pub fn expiration_ms(token: &str) -> Option<i64> {
    let body = token.split('.').nth(1)?;
    let bytes = URL_SAFE_LENIENT.decode(body).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_f64()?;
    if exp <= 0.0 || !exp.is_finite() {
        return None;
    }
    Some((exp * 1000.0) as i64)
}

/// Build an unsigned JWT carrying `claims`, for tests.
#[cfg(test)]
pub(crate) fn unsigned_token(claims: &serde_json::Value) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{body}.sig")
}
