#![warn(missing_docs)]
#![allow(clippy::result_large_err)]
//!
//! [OpenID Connect](https://openid.net/specs/openid-connect-core-1_0.html) relying-party client
//! for the [Signicat](https://developer.signicat.com/) identity provider.
//!
//! Besides the standard authorization code flow, this crate implements the provider's
//! message-level protection profiles:
//!
//!  * **Encrypted request objects** (`useJwe`): authorization parameters are serialized, encrypted
//!    to the provider's published `enc` key (RSA-OAEP + A128CBC-HS256) and sent as a single
//!    `request` query parameter.
//!  * **Encrypted responses** (`FTN`, the Finnish Trust Network "full message-level encryption"
//!    profile): identity tokens, user info and session bodies arrive as compact JWE and are
//!    decrypted with the client's private key.
//!  * **Signed responses** (`useSig`): the (decrypted) payload is a compact JWS verified against
//!    the provider's published `sig` key before any claim is trusted.
//!
//! Provider keys are fetched from the published key set on every operation that needs them, so
//! key rotation on the provider side is always honored.
//!
//! # Getting started
//!
//! ```rust,no_run
//! use signicat_oidc::reqwest;
//! use signicat_oidc::{
//!     AuthorizationRequestParameters, Client, ClientConfiguration, ClientId, ClientSecret,
//! };
//!
//! # async fn example() -> Result<(), anyhow::Error> {
//! let http_client = reqwest::ClientBuilder::new()
//!     // Following redirects opens the client up to SSRF vulnerabilities.
//!     .redirect(reqwest::redirect::Policy::none())
//!     .build()?;
//! let client = Client::new(
//!     ClientConfiguration::new(
//!         ClientId::new("demo-preprod".to_string()),
//!         ClientSecret::new("client-secret".to_string()),
//!     )
//!     .set_production(false),
//! )?;
//!
//! let authorization_url = client
//!     .authorization_url(
//!         &AuthorizationRequestParameters::default()
//!             .set_response_type("code")
//!             .set_scope("openid profile")
//!             .set_redirect_uri("https://example.com/redirect")
//!             .set_state("123abc")
//!             .set_nonce("sessionId"),
//!         &http_client,
//!     )
//!     .await?;
//!
//! println!("Browse to: {}", authorization_url);
//! # Ok(())
//! # }
//! ```
//!
//! # HTTP clients
//!
//! Every network operation takes an `http_client` implementing [`AsyncHttpClient`]. With the
//! default `reqwest` feature enabled, a `reqwest::Client` can be passed directly. Timeouts and
//! connection pooling are configured on the HTTP client; cancelling an operation is done by
//! dropping its future.
//!

pub use oauth2::{
    AccessToken, AsyncHttpClient, ClientId, ClientSecret, HttpClientError, HttpRequest,
    HttpResponse, RefreshToken,
};

#[cfg(feature = "reqwest")]
pub use oauth2::reqwest;

pub use crate::authorization::{AuthorizationRequestParameters, ParameterValue};
pub use crate::client::{Client, ClientError};
pub use crate::config::{ClientConfiguration, ConfigurationError, IssuerProfile};
pub use crate::jose::{
    decrypt, encrypt, verify, DecryptionError, EncryptionError, JweContentEncryptionAlgorithm,
    JweKeyManagementAlgorithm, JwsSigningAlgorithm, SignatureVerificationError,
};
pub use crate::jwk::{JsonWebKey, JsonWebKeyId, JsonWebKeyType, JsonWebKeyUse};
pub use crate::jwks::{
    JsonWebKeySet, KeyFetchError, KeySelectionError, KeySelector, UNSELECTABLE_KEY_ID_MARKER,
};
pub use crate::session::{
    CreateSessionParameters, GetSessionParameters, SessionDescriptor, DEFAULT_REQUESTED_ATTRIBUTES,
};
pub use crate::token::{AccessTokenRequestParameters, AccessTokenResponse};
pub use crate::user_info::{
    IdentityClaims, ResponseBody, UserInfoParameters, SSN_CLAIM, SSN_CLAIM_NAMES,
};
pub use crate::validation::{is_valid_http_url, ValidationError};

// Defined first since other modules need the macros, and definition order is significant for
// macros.
#[macro_use]
mod macros;

mod authorization;
mod client;
mod config;
mod helpers;
mod http_utils;
mod jose;
mod jwk;
mod jwks;
mod session;
mod token;
mod user_info;
mod validation;
