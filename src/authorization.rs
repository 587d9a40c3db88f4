use crate::validation::{require, require_http_url, ValidationError};
use crate::ClientId;

use serde::Serialize;
use url::Url;

/// Value of an authorization request parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Parameter with a single value.
    Single(String),
    /// Multi-valued parameter, emitted once per element (in order) in query strings and as an
    /// array in request objects.
    Multiple(Vec<String>),
}
impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}
impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}
impl From<Vec<String>> for ParameterValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multiple(values)
    }
}

/// Parameters of an authorization request.
///
/// `response_type`, `scope`, `redirect_uri` and `state` are mandatory; omissions are reported as
/// a [`ValidationError`] when the authorization URL is built. Parameters are emitted in the order
/// of the setters below, followed by any extra parameters in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorizationRequestParameters {
    response_type: Option<String>,
    scope: Option<String>,
    redirect_uri: Option<String>,
    state: Option<String>,
    nonce: Option<String>,
    acr_values: Option<String>,
    login_hints: Vec<String>,
    ui_locales: Option<String>,
    prompt: Option<String>,
    extra_params: Vec<(String, ParameterValue)>,
}
impl AuthorizationRequestParameters {
    /// Sets the `response_type` (normally `code`).
    pub fn set_response_type(mut self, response_type: impl Into<String>) -> Self {
        self.response_type = Some(response_type.into());
        self
    }

    /// Sets the requested `scope`, passed through verbatim.
    pub fn set_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the `redirect_uri`, which must be an absolute `http` or `https` URL.
    pub fn set_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Sets the opaque `state` returned with the authorization response.
    pub fn set_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Sets the `nonce` echoed in the identity token.
    pub fn set_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sets the requested authentication methods (e.g., `urn:signicat:oidc:method:ftn-op-auth`).
    pub fn set_acr_values(mut self, acr_values: impl Into<String>) -> Self {
        self.acr_values = Some(acr_values.into());
        self
    }

    /// Appends a `login_hint`. Each hint is sent as a separate parameter.
    pub fn add_login_hint(mut self, login_hint: impl Into<String>) -> Self {
        self.login_hints.push(login_hint.into());
        self
    }

    /// Sets the preferred user interface languages.
    pub fn set_ui_locales(mut self, ui_locales: impl Into<String>) -> Self {
        self.ui_locales = Some(ui_locales.into());
        self
    }

    /// Sets the `prompt` parameter.
    pub fn set_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Appends an extra parameter.
    ///
    /// This method allows provider extensions to be used without direct support from this crate.
    /// If `name` conflicts with a parameter managed by this crate, the behavior is undefined.
    pub fn add_extra_param(
        mut self,
        name: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Self {
        self.extra_params.push((name.into(), value.into()));
        self
    }

    /// Returns the `response_type`, if set.
    pub fn response_type(&self) -> Option<&str> {
        self.response_type.as_deref()
    }

    /// Returns the `scope`, if set.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Returns the `redirect_uri`, if set.
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    /// Returns the `state`, if set.
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Returns the `nonce`, if set.
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    /// Returns the login hints.
    pub fn login_hints(&self) -> &[String] {
        &self.login_hints
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        require("state", self.state.as_deref())?;
        require("redirect_uri", self.redirect_uri.as_deref())?;
        require("response_type", self.response_type.as_deref())?;
        require("scope", self.scope.as_deref())?;
        require_http_url("redirect_uri", self.redirect_uri.as_deref())?;
        Ok(())
    }

    /// Returns every parameter that is set, in emission order.
    pub fn parameters(&self) -> Vec<(&str, ParameterValue)> {
        let single = [
            ("response_type", &self.response_type),
            ("scope", &self.scope),
            ("redirect_uri", &self.redirect_uri),
            ("state", &self.state),
            ("nonce", &self.nonce),
            ("acr_values", &self.acr_values),
        ];
        let mut parameters = single
            .into_iter()
            .filter_map(|(name, value)| {
                value
                    .as_ref()
                    .map(|value| (name, ParameterValue::Single(value.clone())))
            })
            .collect::<Vec<_>>();

        if !self.login_hints.is_empty() {
            parameters.push((
                "login_hint",
                ParameterValue::Multiple(self.login_hints.clone()),
            ));
        }
        if let Some(ref ui_locales) = self.ui_locales {
            parameters.push(("ui_locales", ParameterValue::Single(ui_locales.clone())));
        }
        if let Some(ref prompt) = self.prompt {
            parameters.push(("prompt", ParameterValue::Single(prompt.clone())));
        }
        parameters.extend(
            self.extra_params
                .iter()
                .map(|(name, value)| (name.as_str(), value.clone())),
        );
        parameters
    }

    pub(crate) fn append_to_url(&self, url: &mut Url) {
        let mut query = url.query_pairs_mut();
        for (name, value) in self.parameters() {
            match value {
                ParameterValue::Single(ref value) => {
                    query.append_pair(name, value);
                }
                ParameterValue::Multiple(ref values) => {
                    for value in values {
                        query.append_pair(name, value);
                    }
                }
            }
        }
    }

    /// Builds the JSON request object: every parameter plus the `client_id`.
    pub(crate) fn to_request_object(&self, client_id: &ClientId) -> serde_json::Value {
        let mut object = self
            .parameters()
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    ParameterValue::Single(value) => serde_json::Value::String(value),
                    ParameterValue::Multiple(values) => serde_json::Value::Array(
                        values.into_iter().map(serde_json::Value::String).collect(),
                    ),
                };
                (name.to_string(), value)
            })
            .collect::<serde_json::Map<_, _>>();
        object.insert(
            "client_id".to_string(),
            serde_json::Value::String(client_id.to_string()),
        );
        serde_json::Value::Object(object)
    }
}
