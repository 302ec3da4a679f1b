//! Request signing for the e24cloud API.
//!
//! Every request carries an `X-Date` header and an `Authorization` header of
//! the form `<api key>:<signature>`. The signature is a base64-encoded
//! HMAC-SHA256 over the canonical string
//!
//! ```text
//! METHOD\nhost\nx-date\n/path\nbody
//! ```
//!
//! The server rebuilds the same string from the request it receives, so the
//! host and path must come from the URL that is actually sent.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Errors raised while signing a request.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SigningError {
    /// Raised when the request URL cannot be canonicalised.
    #[error("cannot build canonical request string for {url}")]
    EmptyCanonical {
        /// URL that failed to parse.
        url: String,
    },
    /// Raised when the HMAC cannot be keyed with the secret.
    #[error("api secret cannot be used as an HMAC key")]
    InvalidKey,
}

/// Headers derived from a single signing pass.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestSignature {
    /// Value of the `X-Date` header; the same string was signed.
    pub x_date: String,
    /// Value of the `Authorization` header.
    pub authorization: String,
}

/// Formats an instant as an RFC 7231 HTTP-date (`Sun, 06 Nov 1994 08:49:37 GMT`).
#[must_use]
pub fn http_date(instant: DateTime<Utc>) -> String {
    instant.format(HTTP_DATE_FORMAT).to_string()
}

/// Builds the canonical string signed by both client and server.
///
/// Returns an empty string when `url` does not parse or has no host; callers
/// must treat that as a signing fault rather than send the request.
#[must_use]
pub fn canonical_string(method: &str, url: &str, timestamp: &str, body: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    let Some(host) = parsed.host_str() else {
        return String::new();
    };
    let authority = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };

    [method, authority.as_str(), timestamp, parsed.path(), body].join("\n")
}

/// Computes the base64 HMAC-SHA256 of `canonical` keyed with `secret`.
///
/// # Errors
///
/// Returns [`SigningError::InvalidKey`] if the HMAC rejects the key.
pub fn sign(canonical: &str, secret: &str) -> Result<String, SigningError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SigningError::InvalidKey)?;
    mac.update(canonical.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Formats the `Authorization` header value.
#[must_use]
pub fn authorization(api_key: &str, signature: &str) -> String {
    format!("{api_key}:{signature}")
}

/// Signs one request at `now`, producing both headers from the same timestamp.
///
/// # Errors
///
/// Returns [`SigningError::EmptyCanonical`] when the URL cannot be
/// canonicalised and [`SigningError::InvalidKey`] when the secret is unusable.
pub fn sign_request(
    api_key: &str,
    api_secret: &str,
    method: &str,
    url: &str,
    body: &[u8],
    now: DateTime<Utc>,
) -> Result<RequestSignature, SigningError> {
    let x_date = http_date(now);
    let canonical = canonical_string(method, url, &x_date, &String::from_utf8_lossy(body));
    if canonical.is_empty() {
        return Err(SigningError::EmptyCanonical {
            url: url.to_owned(),
        });
    }
    let signature = sign(&canonical, api_secret)?;
    Ok(RequestSignature {
        x_date,
        authorization: authorization(api_key, &signature),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    const DATE: &str = "Sun, 06 Nov 1994 08:49:37 GMT";

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37)
            .single()
            .unwrap_or_else(|| panic!("fixed instant should be unambiguous"))
    }

    #[test]
    fn http_date_uses_imf_fixdate() {
        assert_eq!(http_date(fixed_instant()), DATE);
    }

    #[test]
    fn canonical_string_joins_five_fields() {
        let canonical = canonical_string(
            "PUT",
            "https://eu-poland-1warszawa.api.e24cloud.com/v2/virtual-machines",
            DATE,
            "{\"a\":1}",
        );
        assert_eq!(
            canonical,
            format!(
                "PUT\neu-poland-1warszawa.api.e24cloud.com\n{DATE}\n/v2/virtual-machines\n{{\"a\":1}}"
            )
        );
        assert_eq!(canonical.split('\n').count(), 5);
    }

    #[test]
    fn canonical_string_drops_query_and_fragment() {
        let canonical = canonical_string(
            "GET",
            "https://host.example/v2/templates?page=2#top",
            DATE,
            "",
        );
        assert_eq!(canonical, format!("GET\nhost.example\n{DATE}\n/v2/templates\n"));
    }

    #[test]
    fn canonical_string_keeps_explicit_port() {
        let canonical = canonical_string("GET", "http://127.0.0.1:8080/v2/account", DATE, "");
        assert!(canonical.starts_with("GET\n127.0.0.1:8080\n"), "{canonical}");
    }

    #[rstest]
    #[case("not a url")]
    #[case("/v2/relative")]
    #[case("")]
    fn canonical_string_is_empty_for_unparseable_urls(#[case] url: &str) {
        assert_eq!(canonical_string("GET", url, DATE, ""), "");
    }

    #[test]
    fn sign_is_deterministic() {
        let canonical = canonical_string("GET", "https://h.example/v2/regions", DATE, "");
        let first = sign(&canonical, "secret").unwrap_or_else(|err| panic!("sign: {err}"));
        let second = sign(&canonical, "secret").unwrap_or_else(|err| panic!("sign: {err}"));
        assert_eq!(first, second);
        // 32 byte digest, padded standard base64
        assert_eq!(first.len(), 44);
        assert!(first.ends_with('='));
    }

    #[test]
    fn sign_matches_known_vector() {
        // RFC 4231 test case 2
        let token = sign("what do ya want for nothing?", "Jefe")
            .unwrap_or_else(|err| panic!("sign: {err}"));
        assert_eq!(token, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM=");
    }

    #[rstest]
    #[case("POST", "h.example", DATE, "/v2/regions", "")]
    #[case("GET", "other.example", DATE, "/v2/regions", "")]
    #[case("GET", "h.example", "Mon, 07 Nov 1994 08:49:37 GMT", "/v2/regions", "")]
    #[case("GET", "h.example", DATE, "/v2/templates", "")]
    #[case("GET", "h.example", DATE, "/v2/regions", "{}")]
    fn sign_changes_when_any_field_changes(
        #[case] method: &str,
        #[case] host: &str,
        #[case] date: &str,
        #[case] path: &str,
        #[case] body: &str,
    ) {
        let base = canonical_string("GET", "https://h.example/v2/regions", DATE, "");
        let changed = canonical_string(method, &format!("https://{host}{path}"), date, body);
        let base_token = sign(&base, "secret").unwrap_or_else(|err| panic!("sign: {err}"));
        let changed_token = sign(&changed, "secret").unwrap_or_else(|err| panic!("sign: {err}"));
        assert_ne!(base_token, changed_token);
    }

    #[test]
    fn sign_request_reuses_timestamp_for_header_and_signature() {
        let url = "https://h.example/v2/account";
        let signature = sign_request("key", "secret", "GET", url, b"", fixed_instant())
            .unwrap_or_else(|err| panic!("sign_request: {err}"));
        assert_eq!(signature.x_date, DATE);

        let expected = sign(&canonical_string("GET", url, DATE, ""), "secret")
            .unwrap_or_else(|err| panic!("sign: {err}"));
        assert_eq!(signature.authorization, format!("key:{expected}"));
    }

    #[test]
    fn sign_request_rejects_unparseable_url() {
        let err = sign_request("key", "secret", "GET", "::", b"", fixed_instant())
            .expect_err("unparseable url must not be signed");
        assert!(matches!(err, SigningError::EmptyCanonical { .. }));
    }
}
