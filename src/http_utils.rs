use crate::{AccessToken, ClientId, ClientSecret};

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use http::header::{
    HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, AUTHORIZATION, CONTENT_TYPE,
};

pub const MIME_TYPE_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MIME_TYPE_JOSE: &str = "application/jose";
pub const MIME_TYPE_JSON: &str = "application/json";

pub const BASIC: &str = "Basic";
pub const BEARER: &str = "Bearer";

pub fn header_starts_with_ignoring_case(header: &HeaderValue, expected_start: &str) -> bool {
    header
        .to_str()
        .ok()
        .filter(|ct| ct.to_lowercase().starts_with(&expected_start.to_lowercase()))
        .is_some()
}

pub fn content_type_is(headers: &HeaderMap, expected_content_type: &str) -> bool {
    headers
        .get(CONTENT_TYPE)
        .map_or(false, |content_type| {
            header_starts_with_ignoring_case(content_type, expected_content_type)
        })
}

pub fn check_content_type(headers: &HeaderMap, expected_content_type: &str) -> Result<(), String> {
    headers
        .get(CONTENT_TYPE)
        .map_or(Ok(()), |content_type|
            // Section 3.1.1.1 of RFC 7231 indicates that media types are case insensitive and
            // may be followed by optional whitespace and/or a parameter (e.g., charset).
            // See https://tools.ietf.org/html/rfc7231#section-3.1.1.1.
            if !header_starts_with_ignoring_case(content_type, expected_content_type) {
                Err(
                    format!(
                        "Unexpected response Content-Type: {:?}, should be `{}`",
                        content_type,
                        expected_content_type
                    )
                )
            } else {
                Ok(())
            }
        )
}

pub fn auth_bearer(
    access_token: &AccessToken,
) -> Result<(HeaderName, HeaderValue), InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("{} {}", BEARER, access_token.secret()))?;
    value.set_sensitive(true);
    Ok((AUTHORIZATION, value))
}

// The provider expects the literal `client_id:secret` pair, without the form-urlencoding of each
// half that RFC 6749 Section 2.3.1 calls for.
pub fn auth_basic(
    client_id: &ClientId,
    client_secret: &ClientSecret,
) -> Result<(HeaderName, HeaderValue), InvalidHeaderValue> {
    let credentials = BASE64_STANDARD.encode(format!(
        "{}:{}",
        client_id.as_str(),
        client_secret.secret()
    ));
    let mut value = HeaderValue::from_str(&format!("{} {}", BASIC, credentials))?;
    value.set_sensitive(true);
    Ok((AUTHORIZATION, value))
}
