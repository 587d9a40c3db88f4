use crate::authorization::AuthorizationRequestParameters;
use crate::config::{ClientConfiguration, ConfigurationError, Endpoints};
use crate::http_utils::{
    auth_basic, auth_bearer, check_content_type, content_type_is, MIME_TYPE_FORM_URLENCODED,
    MIME_TYPE_JOSE, MIME_TYPE_JSON,
};
use crate::jose::{self, DecryptionError, EncryptionError, SignatureVerificationError};
use crate::jwk::{JsonWebKey, JsonWebKeyUse};
use crate::jwks::{JsonWebKeySet, KeyFetchError, KeySelectionError, KeySelector};
use crate::session::{CreateSessionParameters, GetSessionParameters, SessionDescriptor};
use crate::token::{AccessTokenRequestParameters, AccessTokenResponse};
use crate::user_info::{IdentityClaims, ResponseBody, UserInfoParameters};
use crate::validation::ValidationError;
use crate::{AccessToken, AsyncHttpClient, HttpRequest, HttpResponse};

use http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use http::{Method, StatusCode};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use url::{form_urlencoded, Url};


const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";
const SESSION_API_SCOPE: &str = "signicat-api";

type Claims = serde_json::Map<String, serde_json::Value>;

/// OpenID Connect client for the Signicat identity provider.
///
/// A client is cheap to share: every operation borrows it immutably and keeps all of its state in
/// the returned future, so any number of operations may run concurrently. Provider keys are
/// fetched from the published key set each time an operation needs one.
///
/// The protection applied to each step follows the [`ClientConfiguration`] flags:
///
/// | Step                | `useJwe`            | `FTN`                     | `useSig`                 |
/// |---------------------|---------------------|---------------------------|--------------------------|
/// | Authorization URL   | encrypted `request` | encrypted `request`       |                          |
/// | Identity token      |                     | decrypted                 | verified, `nonce` copied |
/// | User info           |                     | decrypted                 | verified                 |
/// | Session API bodies  |                     | decrypted                 |                          |
#[derive(Clone, Debug)]
pub struct Client {
    config: ClientConfiguration,
    endpoints: Endpoints,
}
impl Client {
    /// Validates `config` and resolves the provider endpoints.
    pub fn new(config: ClientConfiguration) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let endpoints = config.issuer_profile().endpoints()?;
        debug!(
            "configured client `{}` for {} (request encryption: {}, response decryption: {}, \
             signature verification: {})",
            config.client_id().as_str(),
            endpoints.base_url,
            config.encrypts_requests(),
            config.decrypts_responses(),
            config.verifies_signatures(),
        );
        Ok(Self { config, endpoints })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfiguration {
        &self.config
    }

    /// Returns the base URL of the provider endpoints.
    pub fn api_url(&self) -> &Url {
        &self.endpoints.base_url
    }

    /// Fetches the provider's published key set and selects the key with the given usage whose
    /// key ID contains `kid_hint` (if any).
    ///
    /// See [`KeySelector`] for the selection rules.
    pub async fn public_key<'c, C>(
        &self,
        usage: JsonWebKeyUse,
        kid_hint: Option<&str>,
        http_client: &'c C,
    ) -> Result<JsonWebKey, ClientError<<C as AsyncHttpClient<'c>>::Error>>
    where
        C: AsyncHttpClient<'c>,
    {
        let jwks = JsonWebKeySet::fetch_async(&self.endpoints.jwks, http_client).await?;
        let selector = KeySelector::new(usage).set_kid_hint(kid_hint.map(ToString::to_string));
        Ok(jwks.select(&selector)?.clone())
    }

    /// Decrypts a compact JWE with the configured private key.
    pub fn decrypt_token(&self, token: &str) -> Result<String, DecryptionError> {
        let private_key = self.config.private_jwk().ok_or_else(|| {
            DecryptionError::InvalidKey("no private key (`privateJwk`) configured".to_string())
        })?;
        jose::decrypt(token, private_key)
    }

    /// Verifies a compact JWS against the provider's signature key and returns its claims.
    pub async fn verify_token_signature<'c, C>(
        &self,
        token: &str,
        http_client: &'c C,
    ) -> Result<Claims, ClientError<<C as AsyncHttpClient<'c>>::Error>>
    where
        C: AsyncHttpClient<'c>,
    {
        let key = self
            .public_key(
                JsonWebKeyUse::Signature,
                self.config.public_sig_identifier(),
                http_client,
            )
            .await?;
        Ok(jose::verify(token, &key)?)
    }

    /// Builds the URL the end user is redirected to for authentication.
    ///
    /// With request encryption enabled, the parameters (plus the `client_id`) are encrypted to
    /// the provider's `enc` key and sent as a single `request` parameter next to the `client_id`.
    /// Otherwise each parameter is appended individually after the `client_id`. The HTTP client
    /// is only used to fetch the provider's key set.
    pub async fn authorization_url<'c, C>(
        &self,
        params: &AuthorizationRequestParameters,
        http_client: &'c C,
    ) -> Result<Url, ClientError<<C as AsyncHttpClient<'c>>::Error>>
    where
        C: AsyncHttpClient<'c>,
    {
        params.validate()?;

        let mut url = self.endpoints.authorization.clone();
        if self.config.encrypts_requests() {
            let key = self
                .public_key(
                    JsonWebKeyUse::Encryption,
                    self.config.public_enc_identifier(),
                    http_client,
                )
                .await?;
            let request_object = params.to_request_object(self.config.client_id());
            let payload =
                serde_json::to_vec(&request_object).map_err(EncryptionError::SerializationError)?;
            let request = jose::encrypt(&payload, &key)?;

            debug!("built encrypted authorization request for {}", url);
            url.query_pairs_mut()
                .append_pair("client_id", self.config.client_id().as_str())
                .append_pair("request", &request);
        } else {
            url.query_pairs_mut()
                .append_pair("client_id", self.config.client_id().as_str());
            params.append_to_url(&mut url);
        }
        Ok(url)
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// When response decryption or signature verification is enabled, the identity token is
    /// unwrapped and kept on the response
    /// ([`id_token_payload`](AccessTokenResponse::id_token_payload)), and its `nonce` copied into
    /// the response. A decrypted identity token that is neither verified nor a JSON claim set is
    /// kept as text and yields no `nonce`.
    pub async fn post_access_token<'c, C>(
        &self,
        params: &AccessTokenRequestParameters,
        http_client: &'c C,
    ) -> Result<AccessTokenResponse, ClientError<<C as AsyncHttpClient<'c>>::Error>>
    where
        C: AsyncHttpClient<'c>,
    {
        params.validate()?;

        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", self.config.client_id().as_str())
            .append_pair("redirect_uri", params.redirect_uri().unwrap_or_default())
            .append_pair("grant_type", params.grant_type().unwrap_or_default())
            .append_pair("code", params.code().unwrap_or_default())
            .finish();
        let http_request = self
            .token_request(&self.endpoints.token, body)
            .map_err(|err| ClientError::Other(format!("failed to prepare request: {err}")))?;

        debug!("exchanging authorization code at {}", self.endpoints.token);
        let http_response = http_client
            .call(http_request)
            .await
            .map_err(ClientError::Request)?;
        let mut response: AccessTokenResponse =
            json_response(&self.endpoints.token, &http_response)?;

        if self.config.decrypts_responses() || self.config.verifies_signatures() {
            if let Some(id_token) = response.id_token().map(ToString::to_string) {
                let payload = self.unwrap_identity_token(&id_token, http_client).await?;
                let nonce = payload
                    .json()
                    .and_then(|claims| claims.get("nonce"))
                    .and_then(serde_json::Value::as_str)
                    .map(ToString::to_string);
                response.set_nonce(nonce);
                response.set_id_token_payload(payload);
            }
        }
        Ok(response)
    }

    /// Obtains a session API access token with the client credentials grant.
    pub async fn obtain_access_token<'c, C>(
        &self,
        http_client: &'c C,
    ) -> Result<AccessToken, ClientError<<C as AsyncHttpClient<'c>>::Error>>
    where
        C: AsyncHttpClient<'c>,
    {
        #[derive(Deserialize)]
        struct ClientCredentialsResponse {
            access_token: AccessToken,
        }

        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", CLIENT_CREDENTIALS_GRANT)
            .append_pair("scope", SESSION_API_SCOPE)
            .finish();
        let http_request = self
            .token_request(&self.endpoints.session_api_token, body)
            .map_err(|err| ClientError::Other(format!("failed to prepare request: {err}")))?;

        debug!(
            "obtaining session API access token at {}",
            self.endpoints.session_api_token
        );
        let http_response = http_client
            .call(http_request)
            .await
            .map_err(ClientError::Request)?;
        let response: ClientCredentialsResponse =
            json_response(&self.endpoints.session_api_token, &http_response)?;
        Ok(response.access_token)
    }

    /// Fetches the claims describing the authenticated end user.
    ///
    /// With response decryption enabled the body must be a compact JWE, and with signature
    /// verification enabled the (decrypted) body must be a compact JWS signed by the provider.
    /// A body that turns out not to be JSON is returned as [`ResponseBody::Text`].
    pub async fn user_info<'c, C>(
        &self,
        params: &UserInfoParameters,
        http_client: &'c C,
    ) -> Result<ResponseBody<IdentityClaims>, ClientError<<C as AsyncHttpClient<'c>>::Error>>
    where
        C: AsyncHttpClient<'c>,
    {
        let access_token = params.validate()?;

        let http_request = bearer_request(Method::GET, &self.endpoints.user_info, access_token)
            .and_then(|builder| builder.body(Vec::new()))
            .map_err(|err| ClientError::Other(format!("failed to prepare request: {err}")))?;

        debug!("fetching user info from {}", self.endpoints.user_info);
        let http_response = http_client
            .call(http_request)
            .await
            .map_err(ClientError::Request)?;
        check_status(&self.endpoints.user_info, &http_response)?;

        let decrypts = self.config.decrypts_responses();
        let verifies = self.config.verifies_signatures();
        if !decrypts && !verifies {
            return Ok(parse_body(http_response.body()));
        }

        let token = compact_token(http_response.body());
        let token = if decrypts {
            debug!("decrypting user info");
            self.decrypt_token(&token.map_err(DecryptionError::Malformed)?)?
        } else {
            token.map_err(SignatureVerificationError::Malformed)?
        };

        if verifies {
            debug!("verifying user info signature");
            let claims = self.verify_token_signature(&token, http_client).await?;
            Ok(ResponseBody::Json(IdentityClaims::new(claims)))
        } else {
            Ok(parse_decrypted(token, "user info"))
        }
    }

    /// Creates an authentication session through the session API.
    ///
    /// The client's public key is sent along so the provider can encrypt the session, and the
    /// caller's nonce is attached to the returned descriptor.
    pub async fn create_session<'c, C>(
        &self,
        params: &CreateSessionParameters,
        http_client: &'c C,
    ) -> Result<SessionDescriptor, ClientError<<C as AsyncHttpClient<'c>>::Error>>
    where
        C: AsyncHttpClient<'c>,
    {
        params.validate()?;
        let access_token = self
            .session_access_token(params.access_token(), http_client)
            .await?;

        let encryption_public_key = self
            .config
            .public_jwk()
            .cloned()
            .or_else(|| self.config.private_jwk().map(JsonWebKey::to_public_key));
        let body = serde_json::to_vec(&params.request_body(encryption_public_key.as_ref()))
            .map_err(|err| ClientError::Other(format!("failed to serialize request: {err}")))?;

        let url = &self.endpoints.sessions;
        let http_request = bearer_request(Method::POST, url, &access_token)
            .and_then(|builder| {
                builder
                    .header(CONTENT_TYPE, HeaderValue::from_static(MIME_TYPE_JSON))
                    .body(body)
            })
            .map_err(|err| ClientError::Other(format!("failed to prepare request: {err}")))?;

        debug!("creating session at {}", url);
        let http_response = http_client
            .call(http_request)
            .await
            .map_err(ClientError::Request)?;
        check_status(url, &http_response)?;
        self.session_response(&http_response, params.nonce())
    }

    /// Retrieves an authentication session through the session API.
    pub async fn get_session<'c, C>(
        &self,
        params: &GetSessionParameters,
        http_client: &'c C,
    ) -> Result<SessionDescriptor, ClientError<<C as AsyncHttpClient<'c>>::Error>>
    where
        C: AsyncHttpClient<'c>,
    {
        let session_id = params.validate()?;
        let access_token = self
            .session_access_token(params.access_token(), http_client)
            .await?;

        let mut url = self.endpoints.sessions.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::Other(format!(
                    "cannot append a session ID to {}",
                    self.endpoints.sessions
                ))
            })?
            .push(session_id);
        let http_request = bearer_request(Method::GET, &url, &access_token)
            .and_then(|builder| builder.body(Vec::new()))
            .map_err(|err| ClientError::Other(format!("failed to prepare request: {err}")))?;

        debug!("fetching session from {}", url);
        let http_response = http_client
            .call(http_request)
            .await
            .map_err(ClientError::Request)?;
        check_status(&url, &http_response)?;
        self.session_response(&http_response, params.nonce())
    }

    async fn session_access_token<'c, C>(
        &self,
        access_token: Option<&AccessToken>,
        http_client: &'c C,
    ) -> Result<AccessToken, ClientError<<C as AsyncHttpClient<'c>>::Error>>
    where
        C: AsyncHttpClient<'c>,
    {
        match access_token {
            Some(access_token) => {
                debug!("using supplied session API access token");
                Ok(access_token.clone())
            }
            None => self.obtain_access_token(http_client).await,
        }
    }

    async fn unwrap_identity_token<'c, C>(
        &self,
        id_token: &str,
        http_client: &'c C,
    ) -> Result<ResponseBody<Claims>, ClientError<<C as AsyncHttpClient<'c>>::Error>>
    where
        C: AsyncHttpClient<'c>,
    {
        let token = if self.config.decrypts_responses() {
            debug!("decrypting identity token");
            self.decrypt_token(id_token)?
        } else {
            id_token.to_string()
        };

        if self.config.verifies_signatures() {
            debug!("verifying identity token signature");
            Ok(ResponseBody::Json(
                self.verify_token_signature(&token, http_client).await?,
            ))
        } else {
            Ok(parse_decrypted(token, "identity token"))
        }
    }

    fn session_response<RE>(
        &self,
        http_response: &HttpResponse,
        nonce: Option<&str>,
    ) -> Result<SessionDescriptor, ClientError<RE>>
    where
        RE: std::error::Error + 'static,
    {
        let encrypted =
            self.config.is_ftn() || content_type_is(http_response.headers(), MIME_TYPE_JOSE);
        let body = if encrypted {
            debug!("decrypting session");
            let token =
                compact_token(http_response.body()).map_err(DecryptionError::Malformed)?;
            parse_decrypted(self.decrypt_token(&token)?, "session")
        } else {
            match serde_json::from_slice(http_response.body()) {
                Ok(body) => ResponseBody::Json(body),
                Err(_) => {
                    ResponseBody::Text(String::from_utf8_lossy(http_response.body()).into_owned())
                }
            }
        };
        Ok(SessionDescriptor::new(body, nonce.map(ToString::to_string)))
    }

    fn token_request(&self, url: &Url, body: String) -> Result<HttpRequest, http::Error> {
        let (auth_header, auth_value) =
            auth_basic(self.config.client_id(), self.config.client_secret())?;
        http::Request::builder()
            .uri(url.to_string())
            .method(Method::POST)
            .header(ACCEPT, HeaderValue::from_static(MIME_TYPE_JSON))
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static(MIME_TYPE_FORM_URLENCODED),
            )
            .header(auth_header, auth_value)
            .body(body.into_bytes())
    }
}

fn bearer_request(
    method: Method,
    url: &Url,
    access_token: &AccessToken,
) -> Result<http::request::Builder, http::Error> {
    let (auth_header, auth_value): (HeaderName, HeaderValue) = auth_bearer(access_token)?;
    Ok(http::Request::builder()
        .uri(url.to_string())
        .method(method)
        .header(ACCEPT, HeaderValue::from_static(MIME_TYPE_JSON))
        .header(auth_header, auth_value))
}

fn check_status<RE>(url: &Url, http_response: &HttpResponse) -> Result<(), ClientError<RE>>
where
    RE: std::error::Error + 'static,
{
    if http_response.status().is_success() {
        Ok(())
    } else {
        Err(ClientError::Response(
            http_response.status(),
            http_response.body().to_owned(),
            format!("HTTP status code {} at {}", http_response.status(), url),
        ))
    }
}

fn json_response<T, RE>(url: &Url, http_response: &HttpResponse) -> Result<T, ClientError<RE>>
where
    T: DeserializeOwned,
    RE: std::error::Error + 'static,
{
    check_status(url, http_response)?;
    check_content_type(http_response.headers(), MIME_TYPE_JSON).map_err(|err_msg| {
        ClientError::Response(
            http_response.status(),
            http_response.body().to_owned(),
            err_msg,
        )
    })?;
    serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(
        http_response.body(),
    ))
    .map_err(ClientError::Parse)
}

fn parse_body(body: &[u8]) -> ResponseBody<IdentityClaims> {
    match serde_json::from_slice(body) {
        Ok(claims) => ResponseBody::Json(claims),
        Err(_) => ResponseBody::Text(String::from_utf8_lossy(body).into_owned()),
    }
}

fn parse_decrypted<T>(plaintext: String, what: &str) -> ResponseBody<T>
where
    T: DeserializeOwned,
{
    match serde_json::from_str(&plaintext) {
        Ok(parsed) => ResponseBody::Json(parsed),
        Err(err) => {
            warn!("decrypted {} is not JSON ({}); returning it as text", what, err);
            ResponseBody::Text(plaintext)
        }
    }
}

// Compact tokens are sometimes delivered as a JSON string literal rather than as the raw token.
fn compact_token(body: &[u8]) -> Result<String, String> {
    let text = std::str::from_utf8(body)
        .map_err(|_| "response body is not valid UTF-8".to_string())?
        .trim();
    if text.starts_with('"') {
        serde_json::from_str(text).map_err(|err| format!("invalid JSON string: {}", err))
    } else {
        Ok(text.to_string())
    }
}

/// Error performing a client operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError<RE>
where
    RE: std::error::Error + 'static,
{
    /// A call parameter is missing or malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The provider's key set couldn't be fetched.
    #[error("Failed to fetch provider keys")]
    KeyFetch(#[from] KeyFetchError<RE>),
    /// No usable provider key matches the requested usage.
    #[error("Failed to select provider key")]
    KeySelection(#[from] KeySelectionError),
    /// A provider response couldn't be decrypted.
    #[error("Failed to decrypt response")]
    Decryption(#[from] DecryptionError),
    /// The authorization request couldn't be encrypted.
    #[error("Failed to encrypt request")]
    Encryption(#[from] EncryptionError),
    /// A provider signature couldn't be verified.
    #[error("Failed to verify signature")]
    SignatureVerification(#[from] SignatureVerificationError),
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
    /// An unexpected error occurred.
    #[error("Other error: {0}")]
    Other(String),
}
