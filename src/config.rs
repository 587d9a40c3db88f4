use crate::jwk::JsonWebKey;
use crate::{ClientId, ClientSecret};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const PREPROD_BASE_URL: &str = "https://preprod.signicat.com/oidc/";
const PRODUCTION_BASE_URL: &str = "https://id.signicat.com/oidc/";

// The session API lives on a separate host and doesn't follow the configured issuer.
const SESSION_API_TOKEN_URL: &str = "https://api.signicat.com/auth/open/connect/token";
const SESSION_API_SESSIONS_URL: &str = "https://api.signicat.com/auth/rest/sessions";

/// Static configuration of a [`Client`](crate::Client).
///
/// The configuration can be assembled programmatically:
///
/// ```rust
/// use signicat_oidc::{ClientConfiguration, ClientId, ClientSecret};
///
/// let config = ClientConfiguration::new(
///     ClientId::new("demo-preprod".to_string()),
///     ClientSecret::new("client-secret".to_string()),
/// )
/// .set_use_jwe(true)
/// .set_public_enc_identifier(Some("test.jwk.v.2".to_string()));
/// assert!(config.encrypts_requests());
/// ```
///
/// or deserialized from JSON using the provider's established member names (`client_id`,
/// `secret`, `isProd`, `issuerUrl`, `privateJwk`, `publicJwk`, `publicSigIdentifier`,
/// `publicEncIdentifier`, `FTN`, `useJwe`, `useSig`) with
/// [`from_json`](ClientConfiguration::from_json). Boolean flags must be JSON booleans.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ClientConfiguration {
    client_id: ClientId,
    secret: ClientSecret,
    #[serde(rename = "isProd", default)]
    production: bool,
    #[serde(rename = "issuerUrl", default, skip_serializing_if = "Option::is_none")]
    issuer_url: Option<Url>,
    #[serde(rename = "privateJwk", default, skip_serializing_if = "Option::is_none")]
    private_jwk: Option<JsonWebKey>,
    #[serde(rename = "publicJwk", default, skip_serializing_if = "Option::is_none")]
    public_jwk: Option<JsonWebKey>,
    #[serde(
        rename = "publicSigIdentifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    public_sig_identifier: Option<String>,
    #[serde(
        rename = "publicEncIdentifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    public_enc_identifier: Option<String>,
    #[serde(rename = "FTN", default)]
    ftn: bool,
    #[serde(rename = "useJwe", default)]
    use_jwe: bool,
    #[serde(rename = "useSig", default)]
    use_sig: bool,
}
impl ClientConfiguration {
    /// Creates a plain-mode configuration for the pre-production environment.
    pub fn new(client_id: ClientId, secret: ClientSecret) -> Self {
        Self {
            client_id,
            secret,
            production: false,
            issuer_url: None,
            private_jwk: None,
            public_jwk: None,
            public_sig_identifier: None,
            public_enc_identifier: None,
            ftn: false,
            use_jwe: false,
            use_sig: false,
        }
    }

    /// Parses a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_str(json))
            .map_err(|err| ConfigurationError::Parse(err.to_string()))
    }

    /// Selects the production (`true`) or pre-production (`false`) environment.
    ///
    /// Ignored when an issuer URL is set.
    pub fn set_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Sets an explicit issuer URL, which takes precedence over the environment selection.
    pub fn set_issuer_url(mut self, issuer_url: Option<Url>) -> Self {
        self.issuer_url = issuer_url;
        self
    }

    /// Sets the client's private key, used to decrypt provider responses.
    pub fn set_private_jwk(mut self, private_jwk: Option<JsonWebKey>) -> Self {
        self.private_jwk = private_jwk;
        self
    }

    /// Sets the client's public key, sent to the session API so the provider can encrypt its
    /// responses. Defaults to the public half of the private key.
    pub fn set_public_jwk(mut self, public_jwk: Option<JsonWebKey>) -> Self {
        self.public_jwk = public_jwk;
        self
    }

    /// Sets the key ID fragment used to select the provider's signature key.
    pub fn set_public_sig_identifier(mut self, public_sig_identifier: Option<String>) -> Self {
        self.public_sig_identifier = public_sig_identifier;
        self
    }

    /// Sets the key ID fragment used to select the provider's encryption key.
    pub fn set_public_enc_identifier(mut self, public_enc_identifier: Option<String>) -> Self {
        self.public_enc_identifier = public_enc_identifier;
        self
    }

    /// Enables the FTN full message-level encryption profile.
    pub fn set_ftn(mut self, ftn: bool) -> Self {
        self.ftn = ftn;
        self
    }

    /// Enables encrypted authorization request objects.
    pub fn set_use_jwe(mut self, use_jwe: bool) -> Self {
        self.use_jwe = use_jwe;
        self
    }

    /// Enables signature verification of identity tokens and user info.
    pub fn set_use_sig(mut self, use_sig: bool) -> Self {
        self.use_sig = use_sig;
        self
    }

    /// Returns the client identifier.
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Returns the client secret.
    pub fn client_secret(&self) -> &ClientSecret {
        &self.secret
    }

    /// Returns true if the production environment is selected.
    pub fn is_production(&self) -> bool {
        self.production
    }

    /// Returns the explicit issuer URL, if any.
    pub fn issuer_url(&self) -> Option<&Url> {
        self.issuer_url.as_ref()
    }

    /// Returns the client's private key, if any.
    pub fn private_jwk(&self) -> Option<&JsonWebKey> {
        self.private_jwk.as_ref()
    }

    /// Returns the configured public key, if any.
    pub fn public_jwk(&self) -> Option<&JsonWebKey> {
        self.public_jwk.as_ref()
    }

    /// Returns the signature key ID fragment, if any.
    pub fn public_sig_identifier(&self) -> Option<&str> {
        self.public_sig_identifier.as_deref()
    }

    /// Returns the encryption key ID fragment, if any.
    pub fn public_enc_identifier(&self) -> Option<&str> {
        self.public_enc_identifier.as_deref()
    }

    /// Returns true if the FTN profile is enabled.
    pub fn is_ftn(&self) -> bool {
        self.ftn
    }

    /// Returns true if authorization requests are sent as encrypted request objects.
    pub fn encrypts_requests(&self) -> bool {
        self.use_jwe || self.ftn
    }

    /// Returns true if identity tokens and user info arrive encrypted.
    pub fn decrypts_responses(&self) -> bool {
        self.ftn
    }

    /// Returns true if identity tokens and user info arrive signed.
    pub fn verifies_signatures(&self) -> bool {
        self.use_sig
    }

    /// Returns the issuer profile selected by this configuration.
    pub fn issuer_profile(&self) -> IssuerProfile {
        match self.issuer_url {
            Some(ref issuer_url) => IssuerProfile::Issuer(issuer_url.clone()),
            None => IssuerProfile::Legacy {
                production: self.production,
            },
        }
    }

    /// Checks the invariants that can't be expressed in the type system.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.client_id.is_empty() {
            return Err(ConfigurationError::MissingField("client_id"));
        }
        if self.secret.secret().is_empty() {
            return Err(ConfigurationError::MissingField("secret"));
        }

        match self.private_jwk {
            Some(ref private_jwk) => {
                private_jwk
                    .rsa_private_key()
                    .map_err(ConfigurationError::InvalidPrivateKey)?;
            }
            None if self.decrypts_responses() => {
                return Err(ConfigurationError::MissingPrivateKey);
            }
            None => {}
        }

        if let Some(ref issuer_url) = self.issuer_url {
            if !crate::validation::is_valid_http_url(issuer_url.as_str()) {
                return Err(ConfigurationError::InvalidIssuerUrl(issuer_url.to_string()));
            }
        }
        Ok(())
    }
}

/// Provider deployment the client talks to, and the endpoint layout that goes with it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum IssuerProfile {
    /// Fixed pre-production or production base URL with the flat endpoint layout
    /// (`authorize`, `token`, `userinfo`, `jwks.json`).
    Legacy {
        /// Whether the production environment is selected.
        production: bool,
    },
    /// Explicit issuer URL with the `connect/*` endpoint layout.
    Issuer(Url),
}
impl IssuerProfile {
    /// Returns the base URL all provider endpoints are relative to, always ending in `/`.
    pub fn base_url(&self) -> Result<Url, ConfigurationError> {
        match self {
            IssuerProfile::Legacy { production: true } => parse_url(PRODUCTION_BASE_URL),
            IssuerProfile::Legacy { production: false } => parse_url(PREPROD_BASE_URL),
            IssuerProfile::Issuer(issuer_url) => {
                if issuer_url.path().ends_with('/') {
                    Ok(issuer_url.clone())
                } else {
                    parse_url(&format!("{}/", issuer_url.as_str()))
                }
            }
        }
    }

    pub(crate) fn endpoints(&self) -> Result<Endpoints, ConfigurationError> {
        let base_url = self.base_url()?;
        let paths = match self {
            IssuerProfile::Legacy { .. } => ["authorize", "token", "userinfo", "jwks.json"],
            IssuerProfile::Issuer(_) => [
                "connect/authorize",
                "connect/token",
                "connect/userinfo",
                ".well-known/openid-configuration/jwks",
            ],
        };
        let join = |path: &str| {
            base_url
                .join(path)
                .map_err(|err| ConfigurationError::InvalidIssuerUrl(format!("{}: {}", path, err)))
        };

        Ok(Endpoints {
            authorization: join(paths[0])?,
            token: join(paths[1])?,
            user_info: join(paths[2])?,
            jwks: join(paths[3])?,
            session_api_token: parse_url(SESSION_API_TOKEN_URL)?,
            sessions: parse_url(SESSION_API_SESSIONS_URL)?,
            base_url,
        })
    }
}

fn parse_url(url: &str) -> Result<Url, ConfigurationError> {
    Url::parse(url).map_err(|err| ConfigurationError::InvalidIssuerUrl(format!("{}: {}", url, err)))
}

/// Endpoints resolved once from the issuer profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Endpoints {
    pub base_url: Url,
    pub authorization: Url,
    pub token: Url,
    pub user_info: Url,
    pub jwks: Url,
    pub session_api_token: Url,
    pub sessions: Url,
}

/// Invalid client configuration.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// A mandatory member is missing or empty.
    #[error("Configuration: `{0}` is mandatory")]
    MissingField(&'static str),
    /// Response decryption is enabled without a private key.
    #[error("Configuration: `privateJwk` is required when FTN is enabled")]
    MissingPrivateKey,
    /// The private key can't be used for decryption.
    #[error("Configuration: invalid `privateJwk`: {0}")]
    InvalidPrivateKey(String),
    /// The issuer URL isn't an absolute `http` or `https` URL.
    #[error("Configuration: invalid `issuerUrl`: {0}")]
    InvalidIssuerUrl(String),
    /// The configuration document couldn't be parsed.
    #[error("Configuration: failed to parse: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use crate::config::{ClientConfiguration, ConfigurationError, IssuerProfile};
    use crate::jose::tests::test_private_key;
    use crate::jwk::JsonWebKeyUse;
    use crate::{ClientId, ClientSecret};

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use url::Url;

    fn demo_config() -> ClientConfiguration {
        ClientConfiguration::new(
            ClientId::new("demo-preprod".to_string()),
            ClientSecret::new("mqZ-_75-f2wNsiQTONb7On4aAZ7zc218mrRVk1oufa8".to_string()),
        )
    }

    #[test]
    fn test_from_json() {
        let private_jwk = test_private_key(Some(JsonWebKeyUse::Encryption));
        let config = ClientConfiguration::from_json(
            &json!({
                "client_id": "demo-preprod",
                "secret": "mqZ-_75-f2wNsiQTONb7On4aAZ7zc218mrRVk1oufa8",
                "isProd": false,
                "issuerUrl": "https://example.signicat.com/auth/open/",
                "privateJwk": private_jwk,
                "publicEncIdentifier": "test.jwk.v.2",
                "FTN": true,
                "useSig": true,
            })
            .to_string(),
        )
        .expect("failed to parse configuration");

        assert_eq!(config.client_id().as_str(), "demo-preprod");
        assert_eq!(config.private_jwk(), Some(&private_jwk));
        assert_eq!(config.public_enc_identifier(), Some("test.jwk.v.2"));
        assert_eq!(config.public_sig_identifier(), None);
        assert!(config.is_ftn());
        assert!(config.encrypts_requests());
        assert!(config.decrypts_responses());
        assert!(config.verifies_signatures());
        assert_eq!(
            config.issuer_profile(),
            IssuerProfile::Issuer(Url::parse("https://example.signicat.com/auth/open/").unwrap())
        );
        assert_eq!(config.validate(), Ok(()));

        let minimal = ClientConfiguration::from_json(
            r#"{"client_id": "demo-preprod", "secret": "secret"}"#,
        )
        .unwrap();
        assert!(!minimal.encrypts_requests());
        assert!(!minimal.decrypts_responses());
        assert!(!minimal.verifies_signatures());
        assert_eq!(
            minimal.issuer_profile(),
            IssuerProfile::Legacy { production: false }
        );
    }

    #[test]
    fn test_from_json_rejects_truthy_strings() {
        for flag in ["isProd", "FTN", "useJwe", "useSig"] {
            let mut doc = json!({"client_id": "demo-preprod", "secret": "secret"});
            doc[flag] = json!("true");
            match ClientConfiguration::from_json(&doc.to_string()) {
                Err(ConfigurationError::Parse(msg)) => assert!(msg.starts_with(flag), "{}", msg),
                other => panic!("unexpected result for {}: {:?}", flag, other),
            }
        }

        assert!(matches!(
            ClientConfiguration::from_json(r#"{"secret": "secret"}"#),
            Err(ConfigurationError::Parse(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert_eq!(demo_config().validate(), Ok(()));

        assert_eq!(
            ClientConfiguration::new(
                ClientId::new(String::new()),
                ClientSecret::new("secret".to_string())
            )
            .validate(),
            Err(ConfigurationError::MissingField("client_id"))
        );
        assert_eq!(
            ClientConfiguration::new(
                ClientId::new("demo-preprod".to_string()),
                ClientSecret::new(String::new())
            )
            .validate(),
            Err(ConfigurationError::MissingField("secret"))
        );

        // FTN needs a private key; request encryption alone doesn't.
        assert_eq!(
            demo_config().set_ftn(true).validate(),
            Err(ConfigurationError::MissingPrivateKey)
        );
        assert_eq!(demo_config().set_use_jwe(true).validate(), Ok(()));
        assert_eq!(
            demo_config()
                .set_ftn(true)
                .set_private_jwk(Some(test_private_key(None)))
                .validate(),
            Ok(())
        );

        let public_only = test_private_key(None).to_public_key();
        match demo_config()
            .set_ftn(true)
            .set_private_jwk(Some(public_only))
            .validate()
        {
            Err(ConfigurationError::InvalidPrivateKey(msg)) => assert!(msg.contains("`d`")),
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(matches!(
            demo_config()
                .set_issuer_url(Some(Url::parse("ftp://example.com/").unwrap()))
                .validate(),
            Err(ConfigurationError::InvalidIssuerUrl(_))
        ));
    }

    #[test]
    fn test_legacy_endpoints() {
        let preprod = demo_config().issuer_profile().endpoints().unwrap();
        assert_eq!(
            preprod.base_url.as_str(),
            "https://preprod.signicat.com/oidc/"
        );
        assert_eq!(
            preprod.authorization.as_str(),
            "https://preprod.signicat.com/oidc/authorize"
        );
        assert_eq!(preprod.token.as_str(), "https://preprod.signicat.com/oidc/token");
        assert_eq!(
            preprod.user_info.as_str(),
            "https://preprod.signicat.com/oidc/userinfo"
        );
        assert_eq!(
            preprod.jwks.as_str(),
            "https://preprod.signicat.com/oidc/jwks.json"
        );

        let production = demo_config()
            .set_production(true)
            .issuer_profile()
            .endpoints()
            .unwrap();
        assert_eq!(production.base_url.as_str(), "https://id.signicat.com/oidc/");
        assert_eq!(
            production.session_api_token.as_str(),
            "https://api.signicat.com/auth/open/connect/token"
        );
        assert_eq!(
            production.sessions.as_str(),
            "https://api.signicat.com/auth/rest/sessions"
        );
    }

    #[test]
    fn test_issuer_endpoints() {
        // The explicit issuer wins over the environment flag, with or without a trailing slash.
        for issuer in [
            "https://example.signicat.com/auth/open",
            "https://example.signicat.com/auth/open/",
        ] {
            let endpoints = demo_config()
                .set_production(true)
                .set_issuer_url(Some(Url::parse(issuer).unwrap()))
                .issuer_profile()
                .endpoints()
                .unwrap();
            assert_eq!(
                endpoints.base_url.as_str(),
                "https://example.signicat.com/auth/open/"
            );
            assert_eq!(
                endpoints.authorization.as_str(),
                "https://example.signicat.com/auth/open/connect/authorize"
            );
            assert_eq!(
                endpoints.token.as_str(),
                "https://example.signicat.com/auth/open/connect/token"
            );
            assert_eq!(
                endpoints.user_info.as_str(),
                "https://example.signicat.com/auth/open/connect/userinfo"
            );
            assert_eq!(
                endpoints.jwks.as_str(),
                "https://example.signicat.com/auth/open/.well-known/openid-configuration/jwks"
            );
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = demo_config().set_private_jwk(Some(test_private_key(None)));
        let debug = format!("{:?}", config);
        assert!(!debug.contains("mqZ-_75-f2wNsiQTONb7On4aAZ7zc218mrRVk1oufa8"));
        assert!(debug.contains("demo-preprod"));
    }
}
