use demodeck_core::{AppError, AppResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Checks an `X-Hub-Signature-256` header against the raw request body.
pub(super) fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> AppResult<()> {
    let header =
        header.ok_or_else(|| AppError::Unauthorized("missing webhook signature".to_owned()))?;
    let provided = header
        .strip_prefix(SIGNATURE_PREFIX)
        .and_then(|digest| hex::decode(digest.trim()).ok())
        .ok_or_else(|| AppError::Unauthorized("malformed webhook signature".to_owned()))?;

    let expected = compute_signature(secret, body)?;
    if expected.len() != provided.len() || !bool::from(expected.ct_eq(provided.as_slice())) {
        return Err(AppError::Unauthorized("invalid webhook signature".to_owned()));
    }

    Ok(())
}

fn compute_signature(secret: &str, body: &[u8]) -> AppResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|error| AppError::Internal(format!("invalid webhook secret: {error}")))?;
    mac.update(body);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Formats a header value the way GitHub signs deliveries.
#[cfg(test)]
pub(crate) fn sign(secret: &str, body: &[u8]) -> String {
    let digest = compute_signature(secret, body).unwrap_or_default();
    format!("{SIGNATURE_PREFIX}{}", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use demodeck_core::AppError;

    use super::{sign, verify_signature};

    #[test]
    fn matching_signature_is_accepted() {
        let body = br#"{"ref":"refs/heads/main"}"#;
        let header = sign("topsecret", body);

        assert!(verify_signature("topsecret", body, Some(header.as_str())).is_ok());
    }

    #[test]
    fn known_github_example_is_accepted() {
        let header = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";

        assert!(verify_signature("It's a Secret to Everybody", b"Hello, World!", Some(header)).is_ok());
    }

    #[test]
    fn wrong_secret_tampered_body_and_bad_headers_are_unauthorized() {
        let body = br#"{"ref":"refs/heads/main"}"#;
        let header = sign("topsecret", body);

        let cases = [
            verify_signature("other", body, Some(header.as_str())),
            verify_signature("topsecret", b"{}", Some(header.as_str())),
            verify_signature("topsecret", body, None),
            verify_signature("topsecret", body, Some("sha1=abcdef")),
            verify_signature("topsecret", body, Some("sha256=not-hex")),
            verify_signature("topsecret", body, Some("sha256=abcd")),
        ];

        for result in cases {
            assert!(matches!(result, Err(AppError::Unauthorized(_))));
        }
    }
}
