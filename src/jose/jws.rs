use crate::jose::{decode_segment, JoseHeader, JwsSigningAlgorithm, SignatureVerificationError};
use crate::jwk::{JsonWebKey, JsonWebKeyType};

use log::debug;
use serde::de::DeserializeOwned;
use sha2::Digest;

/// Verifies a compact-serialized JWS against the given public key and parses the verified
/// payload as JSON.
///
/// The payload is only parsed once the signature has been verified, and a payload that is not
/// valid JSON for `P` is reported as [`SignatureVerificationError::Payload`].
pub fn verify<P>(
    compact_jws: &str,
    public_key: &JsonWebKey,
) -> Result<P, SignatureVerificationError>
where
    P: DeserializeOwned,
{
    let parts = compact_jws.split('.').collect::<Vec<_>>();
    if parts.len() != 3 {
        return Err(SignatureVerificationError::Malformed(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    }

    let header =
        JoseHeader::from_base64(parts[0]).map_err(SignatureVerificationError::Malformed)?;
    if let Some(ref crit) = header.crit {
        return Err(SignatureVerificationError::Other(format!(
            "unsupported critical header parameters {:?}",
            crit
        )));
    }
    // NB: These comparisons are case-sensitive. Section 4.1.1 of RFC 7515 states: "The "alg"
    // value is a case-sensitive ASCII string containing a StringOrURI value."
    if header.alg == "none" {
        return Err(SignatureVerificationError::DisallowedAlg(header.alg));
    }
    let alg = JoseHeader::algorithm::<JwsSigningAlgorithm>(&header.alg)
        .ok_or_else(|| SignatureVerificationError::UnsupportedAlg(header.alg.clone()))?;

    if header.kid.is_some() && header.kid.as_ref() != public_key.key_id() {
        debug!(
            "JWS `kid` {:?} differs from verification key `kid` {:?}",
            header.kid,
            public_key.key_id()
        );
    }

    let signature =
        decode_segment(parts[2], "signature").map_err(SignatureVerificationError::Malformed)?;
    let signing_input = format!("{}.{}", parts[0], parts[1]);
    verify_signature(public_key, &alg, signing_input.as_bytes(), &signature)?;

    let payload =
        decode_segment(parts[1], "payload").map_err(SignatureVerificationError::Malformed)?;
    serde_json::from_slice(&payload)
        .map_err(|err| SignatureVerificationError::Payload(err.to_string()))
}

fn verify_signature(
    key: &JsonWebKey,
    signature_alg: &JwsSigningAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> Result<(), SignatureVerificationError> {
    if let Some(use_) = key.key_use() {
        if !use_.allows_signature() {
            return Err(SignatureVerificationError::InvalidKey(
                "key usage not permitted for digital signatures".to_string(),
            ));
        }
    }
    if *key.key_type() != JsonWebKeyType::RSA {
        return Err(SignatureVerificationError::InvalidKey(
            "key type does not match signature algorithm".to_string(),
        ));
    }
    let public_key = key
        .rsa_public_key()
        .map_err(SignatureVerificationError::InvalidKey)?;

    let verified = match *signature_alg {
        JwsSigningAlgorithm::RsaSsaPkcs1V15Sha256 => {
            let hash = sha2::Sha256::digest(message);
            public_key.verify(rsa::Pkcs1v15Sign::new::<sha2::Sha256>(), &hash, signature)
        }
        JwsSigningAlgorithm::RsaSsaPkcs1V15Sha384 => {
            let hash = sha2::Sha384::digest(message);
            public_key.verify(rsa::Pkcs1v15Sign::new::<sha2::Sha384>(), &hash, signature)
        }
        JwsSigningAlgorithm::RsaSsaPkcs1V15Sha512 => {
            let hash = sha2::Sha512::digest(message);
            public_key.verify(rsa::Pkcs1v15Sign::new::<sha2::Sha512>(), &hash, signature)
        }
    };
    verified.map_err(|_| SignatureVerificationError::CryptoError("bad signature".to_string()))
}
