use crate::validation::{require, ValidationError};
use crate::AccessToken;

use serde::{Deserialize, Deserializer, Serialize};

/// Claims consulted, in priority order, when deriving the normalized `ssn` claim.
///
/// When several are present, the first one listed wins; conflicting values aren't reconciled.
pub const SSN_CLAIM_NAMES: [&str; 5] = [
    "signicat.national_id",
    "ftn.hetu",
    "nbid.nin",
    "sbid.nin",
    "nin",
];

/// Name of the normalized national identity number claim.
pub const SSN_CLAIM: &str = "ssn";

/// Parameters of a user info request.
#[derive(Clone, Debug, Default)]
pub struct UserInfoParameters {
    access_token: Option<AccessToken>,
}
impl UserInfoParameters {
    /// Creates parameters for the given access token.
    pub fn new(access_token: AccessToken) -> Self {
        Self {
            access_token: Some(access_token),
        }
    }

    /// Returns the access token, if set.
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    pub(crate) fn validate(&self) -> Result<&AccessToken, ValidationError> {
        require(
            "access_token",
            self.access_token.as_ref().map(|token| token.secret().as_str()),
        )?;
        self.access_token
            .as_ref()
            .ok_or(ValidationError::MissingField("access_token"))
    }
}

/// Response body that is normally JSON.
///
/// Bodies that can't be parsed as JSON (including decrypted payloads that turn out not to be
/// JSON) are surfaced as [`ResponseBody::Text`] instead of being discarded.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody<T> {
    /// Parsed JSON body.
    Json(T),
    /// Body that isn't valid JSON for `T`.
    Text(String),
}
impl<T> ResponseBody<T> {
    /// Returns the parsed body, if it was JSON.
    pub fn json(&self) -> Option<&T> {
        match self {
            ResponseBody::Json(json) => Some(json),
            ResponseBody::Text(_) => None,
        }
    }

    /// Returns the raw body, if it wasn't JSON.
    pub fn text(&self) -> Option<&str> {
        match self {
            ResponseBody::Json(_) => None,
            ResponseBody::Text(text) => Some(text),
        }
    }

    /// Consumes the body, returning the parsed JSON (if any).
    pub fn into_json(self) -> Option<T> {
        match self {
            ResponseBody::Json(json) => Some(json),
            ResponseBody::Text(_) => None,
        }
    }

    /// Maps a JSON body, leaving text bodies untouched.
    pub fn map<U, F>(self, f: F) -> ResponseBody<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            ResponseBody::Json(json) => ResponseBody::Json(f(json)),
            ResponseBody::Text(text) => ResponseBody::Text(text),
        }
    }
}

/// Claims describing the authenticated end user.
///
/// On construction, the normalized `ssn` claim is set from the first claim in
/// [`SSN_CLAIM_NAMES`] holding a non-empty string. Candidates of any other JSON type are skipped.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IdentityClaims(serde_json::Map<String, serde_json::Value>);
impl IdentityClaims {
    /// Wraps a claim set, deriving the normalized `ssn` claim.
    pub fn new(mut claims: serde_json::Map<String, serde_json::Value>) -> Self {
        let ssn = SSN_CLAIM_NAMES
            .iter()
            .filter_map(|name| claims.get(*name))
            .filter_map(serde_json::Value::as_str)
            .find(|ssn| !ssn.is_empty())
            .map(ToString::to_string);
        if let Some(ssn) = ssn {
            claims.insert(SSN_CLAIM.to_string(), serde_json::Value::String(ssn));
        }
        Self(claims)
    }

    /// Returns the normalized national identity number, if any.
    pub fn ssn(&self) -> Option<&str> {
        self.0.get(SSN_CLAIM).and_then(serde_json::Value::as_str)
    }

    /// Returns the subject identifier (`sub`).
    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(serde_json::Value::as_str)
    }

    /// Returns the claim with the given name.
    pub fn claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    /// Returns all claims.
    pub fn claims(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }

    /// Consumes the claims, returning the underlying map.
    pub fn into_claims(self) -> serde_json::Map<String, serde_json::Value> {
        self.0
    }
}
impl<'de> Deserialize<'de> for IdentityClaims {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Map::deserialize(deserializer).map(Self::new)
    }
}
