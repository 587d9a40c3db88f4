use crate::jwk::JsonWebKey;
use crate::user_info::ResponseBody;
use crate::validation::{require, require_http_url, ValidationError};
use crate::AccessToken;

use serde::Serialize;

const DEFAULT_SESSION_LIFETIME_SECS: u64 = 60;
const SESSION_FLOW: &str = "redirect";

/// Attributes requested when none are configured explicitly.
pub const DEFAULT_REQUESTED_ATTRIBUTES: [&str; 7] = [
    "firstName",
    "lastName",
    "email",
    "dateOfBirth",
    "phoneNumber",
    "address",
    "gender",
];

/// Parameters for creating an authentication session through the session API.
///
/// If no access token is supplied, one is obtained with the client credentials grant before the
/// session is created.
#[derive(Clone, Debug)]
pub struct CreateSessionParameters {
    redirect_uri: Option<String>,
    access_token: Option<AccessToken>,
    state: Option<String>,
    nonce: Option<String>,
    ui_locales: Option<String>,
    theme_id: Option<String>,
    requested_attributes: Vec<String>,
    allowed_providers: Vec<String>,
    prefilled_input: Option<serde_json::Map<String, serde_json::Value>>,
    additional_parameters: Option<serde_json::Map<String, serde_json::Value>>,
    session_lifetime: u64,
}
impl Default for CreateSessionParameters {
    fn default() -> Self {
        Self {
            redirect_uri: None,
            access_token: None,
            state: None,
            nonce: None,
            ui_locales: None,
            theme_id: None,
            requested_attributes: DEFAULT_REQUESTED_ATTRIBUTES
                .iter()
                .map(ToString::to_string)
                .collect(),
            allowed_providers: Vec::new(),
            prefilled_input: None,
            additional_parameters: None,
            session_lifetime: DEFAULT_SESSION_LIFETIME_SECS,
        }
    }
}
impl CreateSessionParameters {
    /// Sets the URL the end user returns to on success, abort and error alike.
    pub fn set_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Supplies an access token for the session API, skipping the client credentials grant.
    pub fn set_access_token(mut self, access_token: Option<AccessToken>) -> Self {
        self.access_token = access_token;
        self
    }

    /// Sets the caller's reference for the session (sent as `externalReference`).
    pub fn set_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Sets the nonce attached to the returned [`SessionDescriptor`].
    pub fn set_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sets the user interface language (sent as `language`).
    pub fn set_ui_locales(mut self, ui_locales: impl Into<String>) -> Self {
        self.ui_locales = Some(ui_locales.into());
        self
    }

    /// Sets the provider theme.
    pub fn set_theme_id(mut self, theme_id: impl Into<String>) -> Self {
        self.theme_id = Some(theme_id.into());
        self
    }

    /// Replaces the requested attributes.
    pub fn set_requested_attributes(mut self, requested_attributes: Vec<String>) -> Self {
        self.requested_attributes = requested_attributes;
        self
    }

    /// Restricts the identity providers offered to the end user.
    pub fn set_allowed_providers(mut self, allowed_providers: Vec<String>) -> Self {
        self.allowed_providers = allowed_providers;
        self
    }

    /// Prefills identity provider input (e.g., `nin`, `email`).
    pub fn set_prefilled_input(
        mut self,
        prefilled_input: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Self {
        self.prefilled_input = prefilled_input;
        self
    }

    /// Sets provider-specific parameters.
    pub fn set_additional_parameters(
        mut self,
        additional_parameters: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Self {
        self.additional_parameters = additional_parameters;
        self
    }

    /// Sets the session lifetime in seconds.
    pub fn set_session_lifetime(mut self, session_lifetime: u64) -> Self {
        self.session_lifetime = session_lifetime;
        self
    }

    /// Returns the supplied access token, if any.
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    /// Returns the nonce, if set.
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        require_http_url("redirect_uri", self.redirect_uri.as_deref())?;
        if let Some(ref access_token) = self.access_token {
            require("access_token", Some(access_token.secret().as_str()))?;
        }
        Ok(())
    }

    pub(crate) fn request_body<'a>(
        &'a self,
        encryption_public_key: Option<&'a JsonWebKey>,
    ) -> CreateSessionRequest<'a> {
        let redirect_uri = self.redirect_uri.as_deref().unwrap_or_default();
        CreateSessionRequest {
            callback_urls: CallbackUrls {
                success: redirect_uri,
                abort: redirect_uri,
                error: redirect_uri,
            },
            encryption_public_key,
            language: self.ui_locales.as_deref(),
            flow: SESSION_FLOW,
            theme_id: self.theme_id.as_deref(),
            requested_attributes: &self.requested_attributes,
            allowed_providers: Some(self.allowed_providers.as_slice())
                .filter(|providers| !providers.is_empty()),
            prefilled_input: self.prefilled_input.as_ref(),
            additional_parameters: self.additional_parameters.as_ref(),
            external_reference: self.state.as_deref(),
            session_lifetime: self.session_lifetime,
        }
    }
}

#[derive(Debug, Serialize)]
struct CallbackUrls<'a> {
    success: &'a str,
    abort: &'a str,
    error: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateSessionRequest<'a> {
    callback_urls: CallbackUrls<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encryption_public_key: Option<&'a JsonWebKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    flow: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    theme_id: Option<&'a str>,
    requested_attributes: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_providers: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefilled_input: Option<&'a serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_parameters: Option<&'a serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_reference: Option<&'a str>,
    session_lifetime: u64,
}

/// Parameters for retrieving an authentication session.
#[derive(Clone, Debug, Default)]
pub struct GetSessionParameters {
    session_id: Option<String>,
    access_token: Option<AccessToken>,
    nonce: Option<String>,
}
impl GetSessionParameters {
    /// Sets the ID of the session to retrieve.
    pub fn set_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Supplies an access token for the session API, skipping the client credentials grant.
    pub fn set_access_token(mut self, access_token: Option<AccessToken>) -> Self {
        self.access_token = access_token;
        self
    }

    /// Sets the nonce attached to the returned [`SessionDescriptor`].
    pub fn set_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Returns the supplied access token, if any.
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    /// Returns the nonce, if set.
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    pub(crate) fn validate(&self) -> Result<&str, ValidationError> {
        if let Some(ref access_token) = self.access_token {
            require("access_token", Some(access_token.secret().as_str()))?;
        }
        require("session_id", self.session_id.as_deref())
    }
}

/// Session returned by the session API, annotated with the caller's nonce.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionDescriptor {
    body: ResponseBody<serde_json::Value>,
    nonce: Option<String>,
}
impl SessionDescriptor {
    pub(crate) fn new(body: ResponseBody<serde_json::Value>, nonce: Option<String>) -> Self {
        Self { body, nonce }
    }

    /// Returns the (decrypted) session body.
    pub fn body(&self) -> &ResponseBody<serde_json::Value> {
        &self.body
    }

    /// Returns the nonce supplied by the caller.
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    /// Returns the session ID.
    pub fn id(&self) -> Option<&str> {
        self.member("id")
    }

    /// Returns the session status (e.g., `CREATED`, `SUCCESS`).
    pub fn status(&self) -> Option<&str> {
        self.member("status")
    }

    /// Returns the URL the end user is sent to for authentication.
    pub fn authentication_url(&self) -> Option<&str> {
        self.member("authenticationUrl")
    }

    fn member(&self, name: &str) -> Option<&str> {
        self.body
            .json()
            .and_then(|body| body.get(name))
            .and_then(serde_json::Value::as_str)
    }

    /// Returns the session body with the nonce merged in as a `nonce` member.
    ///
    /// Text bodies are returned unchanged.
    pub fn to_json(&self) -> ResponseBody<serde_json::Value> {
        match self.body {
            ResponseBody::Json(serde_json::Value::Object(ref body)) => {
                let mut body = body.clone();
                body.insert(
                    "nonce".to_string(),
                    self.nonce
                        .clone()
                        .map_or(serde_json::Value::Null, serde_json::Value::String),
                );
                ResponseBody::Json(serde_json::Value::Object(body))
            }
            ref other => other.clone(),
        }
    }
}
