use crate::helpers::{deserialize_option_or_none, Base64UrlEncodedBytes};

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::BigUint;
use serde::{Deserialize, Serialize};

use std::fmt::{Debug, Formatter, Result as FormatterResult};


new_type![
    /// ID of a JSON Web Key.
    #[derive(Deserialize, Hash, Ord, PartialOrd, Serialize)]
    pub JsonWebKeyId(String)
];

/// Type of JSON Web Key.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum JsonWebKeyType {
    /// Elliptic Curve Cryptography (ECC) key.
    ///
    /// ECC keys are never selected; the provider only publishes RSA keys for this client.
    #[serde(rename = "EC")]
    EllipticCurve,
    /// RSA key.
    #[serde(rename = "RSA")]
    RSA,
    /// EdDSA key.
    #[serde(rename = "OKP")]
    OctetKeyPair,
    /// Symmetric key.
    #[serde(rename = "oct")]
    Symmetric,
}

/// Usage restriction for a JSON Web key.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum JsonWebKeyUse {
    /// Key may be used for digital signatures.
    Signature,

    /// Key may be used for encryption.
    Encryption,

    /// Fallback case for other key uses not understood by this library.
    Other(String),
}
impl JsonWebKeyUse {
    fn from_str(s: &str) -> Self {
        match s {
            "sig" => Self::Signature,
            "enc" => Self::Encryption,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns true if the associated key may be used for digital signatures, or false otherwise.
    pub fn allows_signature(&self) -> bool {
        matches!(*self, JsonWebKeyUse::Signature)
    }

    /// Returns true if the associated key may be used for encryption, or false otherwise.
    pub fn allows_encryption(&self) -> bool {
        matches!(*self, JsonWebKeyUse::Encryption)
    }
}
impl AsRef<str> for JsonWebKeyUse {
    fn as_ref(&self) -> &str {
        match self {
            JsonWebKeyUse::Signature => "sig",
            JsonWebKeyUse::Encryption => "enc",
            JsonWebKeyUse::Other(other) => other.as_str(),
        }
    }
}
// serde(other) only supports unit variants, so the `Other(String)` fallback needs these.
deserialize_from_str!(JsonWebKeyUse);
serialize_as_str!(JsonWebKeyUse);

// Section 4 of RFC 7517 states that "member names used for representing key parameters for
// different keys types need not be distinct", so a non-RSA key may reuse one of the member names
// below with a different type. Those members are parsed leniently and dropped instead of failing
// the whole key.
/// RSA public or private key expressed as a JSON Web Key.
///
/// Public keys are read from the provider's published key set. Private keys (holding `d`, `p`,
/// `q` and optionally the CRT parameters) are supplied by the client configuration and used to
/// decrypt provider responses. The private members are never included in `Debug` output.
#[derive(Clone, Deserialize, PartialEq, Eq, Serialize)]
pub struct JsonWebKey {
    pub(crate) kty: JsonWebKeyType,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub(crate) use_: Option<JsonWebKeyUse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) kid: Option<JsonWebKeyId>,
    #[serde(
        default,
        deserialize_with = "deserialize_option_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) alg: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_option_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) n: Option<Base64UrlEncodedBytes>,
    #[serde(
        default,
        deserialize_with = "deserialize_option_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) e: Option<Base64UrlEncodedBytes>,

    // Private key members (RFC 7518 Section 6.3.2).
    #[serde(
        default,
        deserialize_with = "deserialize_option_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) d: Option<Base64UrlEncodedBytes>,
    #[serde(
        default,
        deserialize_with = "deserialize_option_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) p: Option<Base64UrlEncodedBytes>,
    #[serde(
        default,
        deserialize_with = "deserialize_option_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) q: Option<Base64UrlEncodedBytes>,
    #[serde(
        default,
        deserialize_with = "deserialize_option_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) dp: Option<Base64UrlEncodedBytes>,
    #[serde(
        default,
        deserialize_with = "deserialize_option_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) dq: Option<Base64UrlEncodedBytes>,
    #[serde(
        default,
        deserialize_with = "deserialize_option_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) qi: Option<Base64UrlEncodedBytes>,
}
impl JsonWebKey {
    /// Instantiate a new RSA public key from the raw modulus (`n`) and public exponent (`e`),
    /// along with an optional key ID and key use.
    ///
    /// The provider requires a key ID on every key used for encryption so that it can select the
    /// matching private key on its side.
    pub fn new_rsa(
        n: Vec<u8>,
        e: Vec<u8>,
        kid: Option<JsonWebKeyId>,
        use_: Option<JsonWebKeyUse>,
    ) -> Self {
        Self {
            kty: JsonWebKeyType::RSA,
            use_,
            kid,
            alg: None,
            n: Some(Base64UrlEncodedBytes::new(n)),
            e: Some(Base64UrlEncodedBytes::new(e)),
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
        }
    }

    /// Converts a PKCS#1 PEM-encoded RSA private key into a private JSON Web Key.
    pub fn from_pkcs1_pem(
        pem: &str,
        kid: Option<JsonWebKeyId>,
        use_: Option<JsonWebKeyUse>,
    ) -> Result<Self, String> {
        let private_key = rsa::RsaPrivateKey::from_pkcs1_pem(pem).map_err(|err| err.to_string())?;
        Ok(Self::from_rsa_private_key(&private_key, kid, use_))
    }

    fn from_rsa_private_key(
        private_key: &rsa::RsaPrivateKey,
        kid: Option<JsonWebKeyId>,
        use_: Option<JsonWebKeyUse>,
    ) -> Self {
        let primes = private_key.primes();
        let encode = |value: Option<&BigUint>| {
            value.map(|v| Base64UrlEncodedBytes::new(v.to_bytes_be()))
        };
        // The CRT members are optional and recomputed from `p` and `q` when the key is loaded.
        Self {
            d: encode(Some(private_key.d())),
            p: encode(primes.first()),
            q: encode(primes.get(1)),
            ..Self::new_rsa(
                private_key.n().to_bytes_be(),
                private_key.e().to_bytes_be(),
                kid,
                use_,
            )
        }
    }

    /// Returns the key ID, if any.
    pub fn key_id(&self) -> Option<&JsonWebKeyId> {
        self.kid.as_ref()
    }

    /// Returns the key type (e.g., RSA).
    pub fn key_type(&self) -> &JsonWebKeyType {
        &self.kty
    }

    /// Returns the allowed key usage (e.g., signing or encryption), if any.
    pub fn key_use(&self) -> Option<&JsonWebKeyUse> {
        self.use_.as_ref()
    }

    /// Returns the algorithm the key is intended for, if the key set declares one.
    pub fn algorithm(&self) -> Option<&str> {
        self.alg.as_deref()
    }

    /// Returns true if this key carries private key material.
    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Returns a copy of this key with all private members removed.
    pub fn to_public_key(&self) -> Self {
        Self {
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
            ..self.clone()
        }
    }

    fn rsa_components(&self) -> Result<(&Base64UrlEncodedBytes, &Base64UrlEncodedBytes), String> {
        if self.kty != JsonWebKeyType::RSA {
            Err("RSA key required".to_string())
        } else if let Some(n) = self.n.as_ref() {
            if let Some(e) = self.e.as_ref() {
                Ok((n, e))
            } else {
                Err("RSA exponent `e` is missing".to_string())
            }
        } else {
            Err("RSA modulus `n` is missing".to_string())
        }
    }

    pub(crate) fn rsa_public_key(&self) -> Result<rsa::RsaPublicKey, String> {
        let (n, e) = self.rsa_components()?;
        rsa::RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
            .map_err(|err| err.to_string())
    }

    pub(crate) fn rsa_private_key(&self) -> Result<rsa::RsaPrivateKey, String> {
        let (n, e) = self.rsa_components()?;
        let member = |value: &Option<Base64UrlEncodedBytes>, name: &str| {
            value
                .as_ref()
                .map(|v| BigUint::from_bytes_be(v))
                .ok_or_else(|| format!("RSA private key member `{}` is missing", name))
        };
        let d = member(&self.d, "d")?;
        let p = member(&self.p, "p")?;
        let q = member(&self.q, "q")?;

        let mut private_key = rsa::RsaPrivateKey::from_components(
            BigUint::from_bytes_be(n),
            BigUint::from_bytes_be(e),
            d,
            vec![p, q],
        )
        .map_err(|err| err.to_string())?;
        private_key.precompute().map_err(|err| err.to_string())?;
        Ok(private_key)
    }
}
impl Debug for JsonWebKey {
    fn fmt(&self, f: &mut Formatter) -> FormatterResult {
        const REDACTED: &str = "[redacted]";
        let redact = |value: &Option<Base64UrlEncodedBytes>| value.as_ref().map(|_| REDACTED);

        f.debug_struct("JsonWebKey")
            .field("kty", &self.kty)
            .field("use", &self.use_)
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .field("n", &self.n)
            .field("e", &self.e)
            .field("d", &redact(&self.d))
            .field("p", &redact(&self.p))
            .field("q", &redact(&self.q))
            .field("dp", &redact(&self.dp))
            .field("dq", &redact(&self.dq))
            .field("qi", &redact(&self.qi))
            .finish()
    }
}
