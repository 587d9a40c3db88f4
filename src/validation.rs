use thiserror::Error;
use url::{Host, Url};

/// Missing or malformed call parameter.
///
/// Parameters are always validated before any network call is attempted.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    /// A mandatory parameter is missing or empty.
    #[error("Validation: `{0}` is mandatory")]
    MissingField(&'static str),
    /// A parameter that must be an absolute `http` or `https` URL isn't one.
    #[error("Validation: `{field}` must be a valid http URL, got `{value}`")]
    InvalidUrl {
        /// Name of the offending parameter.
        field: &'static str,
        /// Value that failed validation.
        value: String,
    },
}
impl ValidationError {
    /// Returns the name of the offending parameter.
    pub fn field(&self) -> &'static str {
        match *self {
            ValidationError::MissingField(field) => field,
            ValidationError::InvalidUrl { field, .. } => field,
        }
    }
}

/// Returns true if `url` is an absolute `http` or `https` URL with a non-empty host.
///
/// Hosts don't need a top-level domain (`http://localhost:8080/cb` is valid), but every label of
/// a domain name must be non-empty, so `http://example.` is rejected.
pub fn is_valid_http_url(url: &str) -> bool {
    let url = match Url::parse(url) {
        Ok(url) => url,
        Err(_) => return false,
    };
    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }
    match url.host() {
        Some(Host::Domain(domain)) => !domain.is_empty() && !domain.split('.').any(str::is_empty),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        None => false,
    }
}

pub(crate) fn require<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ValidationError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

pub(crate) fn require_http_url<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ValidationError> {
    let value = require(field, value)?;
    if is_valid_http_url(value) {
        Ok(value)
    } else {
        Err(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        })
    }
}
