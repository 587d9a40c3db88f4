use crate::user_info::ResponseBody;
use crate::validation::{require, require_http_url, ValidationError};
use crate::{AccessToken, RefreshToken};

use serde::{Deserialize, Serialize};

/// Parameters of an authorization code exchange.
///
/// All three parameters are mandatory, and `redirect_uri` must be an absolute `http` or `https`
/// URL.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessTokenRequestParameters {
    code: Option<String>,
    grant_type: Option<String>,
    redirect_uri: Option<String>,
}
impl AccessTokenRequestParameters {
    /// Sets the authorization `code` returned to the redirect URI.
    pub fn set_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the `grant_type` (normally `authorization_code`).
    pub fn set_grant_type(mut self, grant_type: impl Into<String>) -> Self {
        self.grant_type = Some(grant_type.into());
        self
    }

    /// Sets the `redirect_uri` used in the authorization request.
    pub fn set_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Returns the authorization code, if set.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Returns the grant type, if set.
    pub fn grant_type(&self) -> Option<&str> {
        self.grant_type.as_deref()
    }

    /// Returns the redirect URI, if set.
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        require("code", self.code.as_deref())?;
        require("grant_type", self.grant_type.as_deref())?;
        require_http_url("redirect_uri", self.redirect_uri.as_deref())?;
        Ok(())
    }
}

/// Successful response from the token endpoint.
///
/// Members the provider returns beyond the ones modeled here are preserved in
/// [`extra_fields`](AccessTokenResponse::extra_fields), so the response serializes back to what
/// the provider sent (plus the `nonce`, when one was recovered from the identity token). The
/// unwrapped identity token is only available through
/// [`id_token_payload`](AccessTokenResponse::id_token_payload).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AccessTokenResponse {
    access_token: AccessToken,
    token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<RefreshToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
    #[serde(skip)]
    id_token_payload: Option<ResponseBody<serde_json::Map<String, serde_json::Value>>>,

    #[serde(flatten)]
    extra_fields: serde_json::Map<String, serde_json::Value>,
}
impl AccessTokenResponse {
    /// Returns the access token.
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Returns the token type (normally `Bearer`).
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Returns the refresh token, if any.
    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    /// Returns the granted scope, if returned.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Returns the access token lifetime in seconds, if returned.
    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }

    /// Returns the raw identity token as received (possibly a compact JWE or JWS).
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    /// Returns the `nonce` recovered from the identity token, if any.
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    pub(crate) fn set_nonce(&mut self, nonce: Option<String>) {
        self.nonce = nonce;
    }

    /// Returns the identity token after decryption (`FTN`) and signature verification (`useSig`).
    ///
    /// Verified tokens yield their claims. A decrypted token that isn't verified is parsed as a
    /// JSON claim set when possible and is otherwise returned as text (for example a nested JWS).
    /// `None` when neither protection is configured or no identity token was returned.
    pub fn id_token_payload(
        &self,
    ) -> Option<&ResponseBody<serde_json::Map<String, serde_json::Value>>> {
        self.id_token_payload.as_ref()
    }

    pub(crate) fn set_id_token_payload(
        &mut self,
        payload: ResponseBody<serde_json::Map<String, serde_json::Value>>,
    ) {
        self.id_token_payload = Some(payload);
    }

    /// Returns any members not modeled above.
    pub fn extra_fields(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.extra_fields
    }
}
