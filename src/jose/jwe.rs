use crate::jose::{
    decode_segment, DecryptionError, EncryptionError, JoseHeader, JweContentEncryptionAlgorithm,
    JweKeyManagementAlgorithm,
};
use crate::jwk::JsonWebKey;

use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use log::debug;
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Decrypts a compact-serialized JWE with the given private key, returning the plaintext.
///
/// Supports `RSA-OAEP` and `RSA-OAEP-256` key management with any of the `A*CBC-HS*` or
/// `A128GCM`/`A256GCM` content encryption algorithms. Decryption is all-or-nothing: no plaintext
/// is returned unless the authentication tag validates.
pub fn decrypt(compact_jwe: &str, private_key: &JsonWebKey) -> Result<String, DecryptionError> {
    let parts = compact_jwe.split('.').collect::<Vec<_>>();
    if parts.len() != 5 {
        return Err(DecryptionError::Malformed(format!(
            "expected 5 segments, found {}",
            parts.len()
        )));
    }
    let header_base64 = parts[0];

    let header = JoseHeader::from_base64(header_base64).map_err(DecryptionError::Malformed)?;
    if let Some(ref crit) = header.crit {
        return Err(DecryptionError::UnsupportedAlg(format!(
            "critical header parameters {:?}",
            crit
        )));
    }
    if let Some(ref zip) = header.zip {
        return Err(DecryptionError::UnsupportedAlg(format!(
            "compression algorithm `{}`",
            zip
        )));
    }
    let alg = JoseHeader::algorithm::<JweKeyManagementAlgorithm>(&header.alg)
        .ok_or_else(|| DecryptionError::UnsupportedAlg(header.alg.clone()))?;
    let enc_name = header.enc.as_deref().ok_or_else(|| {
        DecryptionError::Malformed("missing `enc` header parameter".to_string())
    })?;
    let enc = JoseHeader::algorithm::<JweContentEncryptionAlgorithm>(enc_name)
        .ok_or_else(|| DecryptionError::UnsupportedAlg(enc_name.to_string()))?;

    if let Some(use_) = private_key.key_use() {
        if !use_.allows_encryption() {
            return Err(DecryptionError::InvalidKey(
                "key usage not permitted for encryption".to_string(),
            ));
        }
    }
    // The provider labels its JWEs with the ID of the client key it encrypted to, which need not
    // match the `kid` the client assigned to its own copy of the key.
    if header.kid.is_some() && header.kid.as_ref() != private_key.key_id() {
        debug!(
            "JWE `kid` {:?} differs from decryption key `kid` {:?}",
            header.kid,
            private_key.key_id()
        );
    }
    let rsa_key = private_key
        .rsa_private_key()
        .map_err(DecryptionError::InvalidKey)?;

    let encrypted_key =
        decode_segment(parts[1], "encrypted key").map_err(DecryptionError::Malformed)?;
    let iv = decode_segment(parts[2], "initialization vector").map_err(DecryptionError::Malformed)?;
    let ciphertext = decode_segment(parts[3], "ciphertext").map_err(DecryptionError::Malformed)?;
    let tag = decode_segment(parts[4], "authentication tag").map_err(DecryptionError::Malformed)?;

    if iv.len() != enc.iv_len() {
        return Err(DecryptionError::Malformed(format!(
            "initialization vector must be {} bytes",
            enc.iv_len()
        )));
    }

    debug!("decrypting JWE ({} / {})", header.alg, enc_name);
    let cek = match alg {
        JweKeyManagementAlgorithm::RsaOaep => {
            rsa_key.decrypt(rsa::Oaep::new::<sha1::Sha1>(), &encrypted_key)
        }
        JweKeyManagementAlgorithm::RsaOaepSha256 => {
            rsa_key.decrypt(rsa::Oaep::new::<sha2::Sha256>(), &encrypted_key)
        }
    }
    .map_err(|_| {
        DecryptionError::CryptoError("failed to unwrap content encryption key".to_string())
    })?;
    if cek.len() != enc.key_len() {
        return Err(DecryptionError::CryptoError(
            "unwrapped content encryption key has the wrong length".to_string(),
        ));
    }

    let aad = header_base64.as_bytes();
    let plaintext = match enc {
        JweContentEncryptionAlgorithm::Aes128CbcHmacSha256 => {
            cbc_hmac_decrypt::<Hmac<sha2::Sha256>>(&cek, &iv, aad, &ciphertext, &tag)
        }
        JweContentEncryptionAlgorithm::Aes192CbcHmacSha384 => {
            cbc_hmac_decrypt::<Hmac<sha2::Sha384>>(&cek, &iv, aad, &ciphertext, &tag)
        }
        JweContentEncryptionAlgorithm::Aes256CbcHmacSha512 => {
            cbc_hmac_decrypt::<Hmac<sha2::Sha512>>(&cek, &iv, aad, &ciphertext, &tag)
        }
        JweContentEncryptionAlgorithm::Aes128Gcm => {
            gcm_decrypt::<aes_gcm::Aes128Gcm>(&cek, &iv, aad, &ciphertext, &tag)
        }
        JweContentEncryptionAlgorithm::Aes256Gcm => {
            gcm_decrypt::<aes_gcm::Aes256Gcm>(&cek, &iv, aad, &ciphertext, &tag)
        }
    }?;

    String::from_utf8(plaintext)
        .map_err(|_| DecryptionError::Malformed("plaintext is not valid UTF-8".to_string()))
}

/// Encrypts `payload` to the given RSA public key, returning a compact-serialized JWE.
///
/// Uses the key management algorithm declared by the key's `alg` member when it is a supported
/// one (`RSA-OAEP` otherwise) with `A128CBC-HS256` content encryption. The key's `kid` is placed
/// in the protected header so the recipient can select the matching private key; keys without a
/// `kid` are rejected. A fresh content encryption key and IV are generated for every call.
pub fn encrypt(payload: &[u8], public_key: &JsonWebKey) -> Result<String, EncryptionError> {
    let alg = public_key
        .algorithm()
        .and_then(JoseHeader::algorithm::<JweKeyManagementAlgorithm>)
        .unwrap_or(JweKeyManagementAlgorithm::RsaOaep);
    encrypt_with(
        payload,
        public_key,
        alg,
        JweContentEncryptionAlgorithm::Aes128CbcHmacSha256,
    )
}

pub(crate) fn encrypt_with(
    payload: &[u8],
    public_key: &JsonWebKey,
    alg: JweKeyManagementAlgorithm,
    enc: JweContentEncryptionAlgorithm,
) -> Result<String, EncryptionError> {
    if let Some(use_) = public_key.key_use() {
        if !use_.allows_encryption() {
            return Err(EncryptionError::InvalidKey(
                "key usage not permitted for encryption".to_string(),
            ));
        }
    }
    let kid = public_key
        .key_id()
        .ok_or_else(|| EncryptionError::InvalidKey("key ID (`kid`) is required".to_string()))?;
    let rsa_key = public_key
        .rsa_public_key()
        .map_err(EncryptionError::InvalidKey)?;

    let header = JoseHeader {
        alg: serde_plain::to_string(&alg).map_err(|err| EncryptionError::Other(err.to_string()))?,
        enc: Some(
            serde_plain::to_string(&enc).map_err(|err| EncryptionError::Other(err.to_string()))?,
        ),
        kid: Some(kid.clone()),
        cty: None,
        typ: None,
        zip: None,
        crit: None,
    };
    let header_json = serde_json::to_vec(&header).map_err(EncryptionError::SerializationError)?;
    let header_base64 = BASE64_URL_SAFE_NO_PAD.encode(header_json);

    let mut cek = vec![0; enc.key_len()];
    OsRng.fill_bytes(&mut cek);
    let mut iv = vec![0; enc.iv_len()];
    OsRng.fill_bytes(&mut iv);

    let encrypted_key = match alg {
        JweKeyManagementAlgorithm::RsaOaep => {
            rsa_key.encrypt(&mut OsRng, rsa::Oaep::new::<sha1::Sha1>(), &cek)
        }
        JweKeyManagementAlgorithm::RsaOaepSha256 => {
            rsa_key.encrypt(&mut OsRng, rsa::Oaep::new::<sha2::Sha256>(), &cek)
        }
    }
    .map_err(|err| EncryptionError::CryptoError(err.to_string()))?;

    let aad = header_base64.as_bytes();
    let (ciphertext, tag) = match enc {
        JweContentEncryptionAlgorithm::Aes128CbcHmacSha256 => {
            cbc_hmac_encrypt::<Hmac<sha2::Sha256>>(&cek, &iv, aad, payload)
        }
        JweContentEncryptionAlgorithm::Aes192CbcHmacSha384 => {
            cbc_hmac_encrypt::<Hmac<sha2::Sha384>>(&cek, &iv, aad, payload)
        }
        JweContentEncryptionAlgorithm::Aes256CbcHmacSha512 => {
            cbc_hmac_encrypt::<Hmac<sha2::Sha512>>(&cek, &iv, aad, payload)
        }
        JweContentEncryptionAlgorithm::Aes128Gcm => {
            gcm_encrypt::<aes_gcm::Aes128Gcm>(&cek, &iv, aad, payload)
        }
        JweContentEncryptionAlgorithm::Aes256Gcm => {
            gcm_encrypt::<aes_gcm::Aes256Gcm>(&cek, &iv, aad, payload)
        }
    }
    .map_err(EncryptionError::CryptoError)?;

    Ok(format!(
        "{}.{}.{}.{}.{}",
        header_base64,
        BASE64_URL_SAFE_NO_PAD.encode(encrypted_key),
        BASE64_URL_SAFE_NO_PAD.encode(iv),
        BASE64_URL_SAFE_NO_PAD.encode(ciphertext),
        BASE64_URL_SAFE_NO_PAD.encode(tag),
    ))
}

// RFC 7518 Section 5.2.2.1: the MAC covers AAD || IV || ciphertext || AL, where AL is the AAD
// length in bits as a 64-bit big-endian integer, and the tag is the first half of the MAC.
fn cbc_hmac_tag<M>(
    mac_key: &[u8],
    aad: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, String>
where
    M: Mac + KeyInit,
{
    let mut mac = <M as KeyInit>::new_from_slice(mac_key)
        .map_err(|err| format!("Could not create key: {}", err))?;
    mac.update(aad);
    mac.update(iv);
    mac.update(ciphertext);
    mac.update(&(aad.len() as u64 * 8).to_be_bytes());
    let full_tag = mac.finalize().into_bytes();
    Ok(full_tag[..full_tag.len() / 2].to_vec())
}

fn cbc_hmac_decrypt<M>(
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, DecryptionError>
where
    M: Mac + KeyInit,
{
    let (mac_key, enc_key) = cek.split_at(cek.len() / 2);
    let expected_tag =
        cbc_hmac_tag::<M>(mac_key, aad, iv, ciphertext).map_err(DecryptionError::CryptoError)?;
    if !bool::from(expected_tag.as_slice().ct_eq(tag)) {
        return Err(DecryptionError::CryptoError(
            "authentication tag mismatch".to_string(),
        ));
    }

    let plaintext = match enc_key.len() {
        16 => cbc::Decryptor::<aes::Aes128>::new_from_slices(enc_key, iv)
            .map_err(|err| DecryptionError::CryptoError(err.to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        24 => cbc::Decryptor::<aes::Aes192>::new_from_slices(enc_key, iv)
            .map_err(|err| DecryptionError::CryptoError(err.to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        32 => cbc::Decryptor::<aes::Aes256>::new_from_slices(enc_key, iv)
            .map_err(|err| DecryptionError::CryptoError(err.to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        other => {
            return Err(DecryptionError::CryptoError(format!(
                "unsupported AES key length {}",
                other
            )))
        }
    };
    plaintext.map_err(|_| DecryptionError::CryptoError("invalid padding".to_string()))
}

fn cbc_hmac_encrypt<M>(
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), String>
where
    M: Mac + KeyInit,
{
    let (mac_key, enc_key) = cek.split_at(cek.len() / 2);
    let ciphertext = match enc_key.len() {
        16 => cbc::Encryptor::<aes::Aes128>::new_from_slices(enc_key, iv)
            .map_err(|err| err.to_string())?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        24 => cbc::Encryptor::<aes::Aes192>::new_from_slices(enc_key, iv)
            .map_err(|err| err.to_string())?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        32 => cbc::Encryptor::<aes::Aes256>::new_from_slices(enc_key, iv)
            .map_err(|err| err.to_string())?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        other => return Err(format!("unsupported AES key length {}", other)),
    };
    let tag = cbc_hmac_tag::<M>(mac_key, aad, iv, &ciphertext)?;
    Ok((ciphertext, tag))
}

// The `aead` API expects the tag appended to the ciphertext.
const GCM_TAG_LEN: usize = 16;

fn gcm_decrypt<A>(
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, DecryptionError>
where
    A: aes_gcm::aead::Aead + aes_gcm::KeyInit,
{
    if tag.len() != GCM_TAG_LEN {
        return Err(DecryptionError::CryptoError(
            "authentication tag mismatch".to_string(),
        ));
    }
    let cipher = <A as aes_gcm::KeyInit>::new_from_slice(cek)
        .map_err(|err| DecryptionError::CryptoError(err.to_string()))?;
    let mut msg = ciphertext.to_vec();
    msg.extend_from_slice(tag);
    cipher
        .decrypt(
            aes_gcm::aead::Nonce::<A>::from_slice(iv),
            aes_gcm::aead::Payload { msg: &msg, aad },
        )
        .map_err(|_| DecryptionError::CryptoError("authentication tag mismatch".to_string()))
}

fn gcm_encrypt<A>(
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), String>
where
    A: aes_gcm::aead::Aead + aes_gcm::KeyInit,
{
    let cipher = <A as aes_gcm::KeyInit>::new_from_slice(cek).map_err(|err| err.to_string())?;
    let mut ciphertext = cipher
        .encrypt(
            aes_gcm::aead::Nonce::<A>::from_slice(iv),
            aes_gcm::aead::Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|err| err.to_string())?;
    let tag = ciphertext.split_off(ciphertext.len().saturating_sub(GCM_TAG_LEN));
    Ok((ciphertext, tag))
}
