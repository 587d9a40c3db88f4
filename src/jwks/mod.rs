use crate::http_utils::{check_content_type, MIME_TYPE_JSON};
use crate::jwk::{JsonWebKey, JsonWebKeyType, JsonWebKeyUse};
use crate::{AsyncHttpClient, HttpRequest, HttpResponse};

use http::header::{HeaderValue, ACCEPT};
use http::{Method, StatusCode};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, VecSkipError};
use thiserror::Error;


/// Key ID fragment marking provider keys that must never be selected automatically.
///
/// The provider publishes keys carrying this fragment alongside the keys clients are meant to
/// use; they are excluded regardless of their declared usage.
pub const UNSELECTABLE_KEY_ID_MARKER: &str = "any.oidc-signature";

const MIME_TYPE_JWKS: &str = "application/jwk-set+json";

/// JSON Web Key Set.
#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct JsonWebKeySet {
    // Ignores invalid keys rather than failing. That way, clients can function using the keys that
    // they do understand.
    #[serde_as(as = "VecSkipError<_>")]
    keys: Vec<JsonWebKey>,
}
impl JsonWebKeySet {
    /// Create a new JSON Web Key Set.
    pub fn new(keys: Vec<JsonWebKey>) -> Self {
        Self { keys }
    }

    /// Return the keys in this JWKS, in published order.
    pub fn keys(&self) -> &Vec<JsonWebKey> {
        &self.keys
    }

    /// Selects the first key matching `selector`, in published order.
    ///
    /// The selected key must be an RSA key with a key ID; if it isn't, selection fails rather than
    /// falling through to a later key.
    pub fn select(&self, selector: &KeySelector) -> Result<&JsonWebKey, KeySelectionError> {
        let key = self
            .keys
            .iter()
            .find(|key| selector.matches(key))
            .ok_or_else(|| KeySelectionError::NoMatchingKey {
                usage: selector.usage().as_ref().to_string(),
                kid_hint: selector.kid_hint().map(ToString::to_string),
            })?;

        let kid = key.key_id().ok_or_else(|| KeySelectionError::MissingKeyId {
            usage: selector.usage().as_ref().to_string(),
        })?;
        if *key.key_type() != JsonWebKeyType::RSA {
            return Err(KeySelectionError::UnsupportedKeyType {
                kid: kid.to_string(),
                kty: serde_plain::to_string(key.key_type())
                    .unwrap_or_else(|_| format!("{:?}", key.key_type())),
            });
        }

        debug!(
            "selected `{}` key `{}`",
            selector.usage().as_ref(),
            kid.as_str()
        );
        Ok(key)
    }

    /// Fetch a remote JSON Web Key Set from the specified `url` using the given async
    /// `http_client`.
    pub async fn fetch_async<'c, C>(
        url: &url::Url,
        http_client: &'c C,
    ) -> Result<Self, KeyFetchError<<C as AsyncHttpClient<'c>>::Error>>
    where
        C: AsyncHttpClient<'c>,
    {
        let fetch_request = Self::fetch_request(url)
            .map_err(|err| KeyFetchError::Other(format!("failed to prepare request: {err}")))?;

        debug!("fetching JSON Web Key Set from {}", url);
        http_client
            .call(fetch_request)
            .await
            .map_err(KeyFetchError::Request)
            .and_then(|http_response| Self::fetch_response(url, http_response))
    }

    fn fetch_request(url: &url::Url) -> Result<HttpRequest, http::Error> {
        http::Request::builder()
            .uri(url.to_string())
            .method(Method::GET)
            .header(ACCEPT, HeaderValue::from_static(MIME_TYPE_JSON))
            .body(Vec::new())
    }

    fn fetch_response<RE>(
        url: &url::Url,
        http_response: HttpResponse,
    ) -> Result<Self, KeyFetchError<RE>>
    where
        RE: std::error::Error + 'static,
    {
        if http_response.status() != StatusCode::OK {
            return Err(KeyFetchError::Response(
                http_response.status(),
                http_response.body().to_owned(),
                format!("HTTP status code {} at {}", http_response.status(), url),
            ));
        }

        check_content_type(http_response.headers(), MIME_TYPE_JSON)
            .or_else(|err| {
                check_content_type(http_response.headers(), MIME_TYPE_JWKS).map_err(|_| err)
            })
            .map_err(|err_msg| {
                KeyFetchError::Response(
                    http_response.status(),
                    http_response.body().to_owned(),
                    err_msg,
                )
            })?;

        serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(
            http_response.body(),
        ))
        .map_err(KeyFetchError::Parse)
    }
}

/// Predicate choosing which published key to use for an operation.
///
/// A key matches when its `use` equals the requested usage, its key ID does not contain
/// [`UNSELECTABLE_KEY_ID_MARKER`], and (if a hint is given) its key ID contains the hint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySelector {
    usage: JsonWebKeyUse,
    kid_hint: Option<String>,
}
impl KeySelector {
    /// Selects keys with the given usage and no key ID hint.
    pub fn new(usage: JsonWebKeyUse) -> Self {
        Self {
            usage,
            kid_hint: None,
        }
    }

    /// Additionally requires the key ID to contain `kid_hint`.
    pub fn set_kid_hint(mut self, kid_hint: Option<String>) -> Self {
        self.kid_hint = kid_hint;
        self
    }

    /// Returns the required key usage.
    pub fn usage(&self) -> &JsonWebKeyUse {
        &self.usage
    }

    /// Returns the key ID hint, if any.
    pub fn kid_hint(&self) -> Option<&str> {
        self.kid_hint.as_deref()
    }

    /// Returns true if `key` satisfies this selector.
    pub fn matches(&self, key: &JsonWebKey) -> bool {
        if key.key_use() != Some(&self.usage) {
            return false;
        }
        let kid = key.key_id().map(|kid| kid.as_str()).unwrap_or_default();
        if kid.contains(UNSELECTABLE_KEY_ID_MARKER) {
            return false;
        }
        match self.kid_hint {
            Some(ref hint) => key.key_id().is_some() && kid.contains(hint.as_str()),
            None => true,
        }
    }
}

/// Error fetching a JSON Web Key Set.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeyFetchError<RE>
where
    RE: std::error::Error + 'static,
{
    /// An unexpected error occurred.
    #[error("Other error: {0}")]
    Other(String),
    /// Failed to parse server response.
    #[error("Failed to parse server response")]
    Parse(#[source] serde_path_to_error::Error<serde_json::Error>),
    /// An error occurred while sending the request or receiving the response (e.g., network
    /// connectivity failed).
    #[error("Request failed")]
    Request(#[source] RE),
    /// Server returned an invalid response.
    #[error("Server returned invalid response: {2}")]
    Response(StatusCode, Vec<u8>, String),
}

/// Error selecting a key from a JSON Web Key Set.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeySelectionError {
    /// No key has the requested usage and key ID hint.
    #[error("No `{usage}` key found{}", .kid_hint.as_ref().map(|hint| format!(" matching `{}`", hint)).unwrap_or_default())]
    NoMatchingKey {
        /// Requested key usage.
        usage: String,
        /// Requested key ID fragment, if any.
        kid_hint: Option<String>,
    },
    /// The selected key has no key ID.
    #[error("Selected `{usage}` key has no key ID")]
    MissingKeyId {
        /// Requested key usage.
        usage: String,
    },
    /// The selected key is not an RSA key.
    #[error("Selected key `{kid}` has unsupported key type `{kty}`")]
    UnsupportedKeyType {
        /// ID of the selected key.
        kid: String,
        /// Key type of the selected key.
        kty: String,
    },
}
