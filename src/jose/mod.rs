//! Compact JWE decryption/encryption and compact JWS verification.
//!
//! Only the subset of [RFC 7516](https://tools.ietf.org/html/rfc7516) and
//! [RFC 7515](https://tools.ietf.org/html/rfc7515) used by the provider is supported: RSA key
//! management for JWE, and RSA PKCS#1 v1.5 signatures for JWS.

use crate::helpers::base64_url_safe_no_pad;
use crate::jwk::JsonWebKeyId;

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod jwe;
mod jws;

pub use jwe::{decrypt, encrypt};
#[cfg(test)]
pub(crate) use jwe::encrypt_with;
pub use jws::verify;


/// JSON Web Encryption (JWE) key management algorithm.
#[derive(Clone, Copy, Debug, Deserialize, Hash, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum JweKeyManagementAlgorithm {
    /// RSAES OAEP using default parameters (SHA-1 and MGF1 with SHA-1).
    #[serde(rename = "RSA-OAEP")]
    RsaOaep,
    /// RSAES OAEP using SHA-256 and MGF1 with SHA-256.
    #[serde(rename = "RSA-OAEP-256")]
    RsaOaepSha256,
}

/// JSON Web Encryption (JWE) content encryption algorithm.
#[derive(Clone, Copy, Debug, Deserialize, Hash, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum JweContentEncryptionAlgorithm {
    /// AES-128 CBC HMAC SHA-256 authenticated encryption.
    #[serde(rename = "A128CBC-HS256")]
    Aes128CbcHmacSha256,
    /// AES-192 CBC HMAC SHA-384 authenticated encryption.
    #[serde(rename = "A192CBC-HS384")]
    Aes192CbcHmacSha384,
    /// AES-256 CBC HMAC SHA-512 authenticated encryption.
    #[serde(rename = "A256CBC-HS512")]
    Aes256CbcHmacSha512,
    /// AES GCM using 128-bit key.
    #[serde(rename = "A128GCM")]
    Aes128Gcm,
    /// AES GCM using 256-bit key.
    #[serde(rename = "A256GCM")]
    Aes256Gcm,
}
impl JweContentEncryptionAlgorithm {
    /// Length in bytes of the content encryption key (CEK).
    pub fn key_len(&self) -> usize {
        match self {
            Self::Aes128CbcHmacSha256 => 32,
            Self::Aes192CbcHmacSha384 => 48,
            Self::Aes256CbcHmacSha512 => 64,
            Self::Aes128Gcm => 16,
            Self::Aes256Gcm => 32,
        }
    }

    /// Length in bytes of the initialization vector.
    pub fn iv_len(&self) -> usize {
        match self {
            Self::Aes128CbcHmacSha256 | Self::Aes192CbcHmacSha384 | Self::Aes256CbcHmacSha512 => 16,
            Self::Aes128Gcm | Self::Aes256Gcm => 12,
        }
    }
}

/// JSON Web Signature (JWS) algorithm.
#[derive(Clone, Copy, Debug, Deserialize, Hash, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum JwsSigningAlgorithm {
    /// RSA SSA PKCS#1 v1.5 using SHA-256.
    #[serde(rename = "RS256")]
    RsaSsaPkcs1V15Sha256,
    /// RSA SSA PKCS#1 v1.5 using SHA-384.
    #[serde(rename = "RS384")]
    RsaSsaPkcs1V15Sha384,
    /// RSA SSA PKCS#1 v1.5 using SHA-512.
    #[serde(rename = "RS512")]
    RsaSsaPkcs1V15Sha512,
}

// Algorithm names are kept as strings here so that an unrecognized algorithm is reported as
// unsupported rather than as a malformed header.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub(crate) struct JoseHeader {
    pub alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<JsonWebKeyId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    // Critical extensions must be understood by the recipient. Since none are, any JOSE object
    // carrying this member is rejected (see https://tools.ietf.org/html/rfc7515#section-4.1.11).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crit: Option<Vec<String>>,
}
impl JoseHeader {
    fn from_base64(header_base64: &str) -> Result<Self, String> {
        let header_json = base64_url_safe_no_pad()
            .decode(header_base64)
            .map_err(|err| format!("invalid base64url header: {}", err))?;
        serde_json::from_slice(&header_json).map_err(|err| format!("invalid header JSON: {}", err))
    }

    fn algorithm<T>(value: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        serde_plain::from_str(value).ok()
    }
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>, String> {
    base64_url_safe_no_pad()
        .decode(segment)
        .map_err(|err| format!("invalid base64url {}: {}", name, err))
}

/// Error decrypting a JSON Web Encryption (JWE) object.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecryptionError {
    /// Authenticated decryption failed. Either the key does not match the one the content was
    /// encrypted to, or the ciphertext was tampered with.
    #[error("Crypto error: {0}")]
    CryptoError(String),
    /// The supplied key cannot be used for decryption (e.g., it has no private members or its
    /// usage is restricted to signatures).
    #[error("Invalid cryptographic key: {0}")]
    InvalidKey(String),
    /// The input is not a compact-serialized JWE.
    #[error("Malformed JWE: {0}")]
    Malformed(String),
    /// The key management or content encryption algorithm (or another header feature) is not
    /// supported.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    /// An unexpected error occurred.
    #[error("Other error: {0}")]
    Other(String),
}

/// Error producing a JSON Web Encryption (JWE) object.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncryptionError {
    /// Encryption with the recipient key failed.
    #[error("Crypto error: {0}")]
    CryptoError(String),
    /// The recipient key cannot be used for encryption.
    #[error("Invalid cryptographic key: {0}")]
    InvalidKey(String),
    /// Failed to serialize the protected header.
    #[error("Failed to serialize JWE header")]
    SerializationError(#[source] serde_json::Error),
    /// An unexpected error occurred.
    #[error("Other error: {0}")]
    Other(String),
}

/// Error verifying a JSON Web Signature (JWS).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SignatureVerificationError {
    /// Invalid signature for the supplied payload and signing key.
    #[error("Crypto error: {0}")]
    CryptoError(String),
    /// The supplied signature algorithm is disallowed by the verifier.
    #[error("Disallowed signature algorithm: {0}")]
    DisallowedAlg(String),
    /// The supplied key cannot be used in this context. This may occur if the key type does not
    /// match the signature type or the JWK usage disallows signatures.
    #[error("Invalid cryptographic key: {0}")]
    InvalidKey(String),
    /// The input is not a compact-serialized JWS.
    #[error("Malformed JWS: {0}")]
    Malformed(String),
    /// The signature is valid but the payload could not be parsed.
    #[error("Failed to parse verified payload: {0}")]
    Payload(String),
    /// Unsupported signature algorithm.
    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedAlg(String),
    /// An unexpected error occurred.
    #[error("Other error: {0}")]
    Other(String),
}
