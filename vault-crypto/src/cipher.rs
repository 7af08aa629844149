//! C1: Cipher Registry — uniform encrypt/decrypt for symmetric ciphers and
//! RSA-OAEP asymmetric wrap (`spec.md` §4.1).

use crate::cipherdict::{AsymmetricCipherdict, SymmetricCipherdict};
use crate::error::{ConfigurationError, DecryptionError};

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce as ChaChaNonce,
};
use eax::aead::generic_array::GenericArray;
use eax::{aead::AeadInPlace, Eax};
use getrandom::getrandom;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcEnc = cbc::Encryptor<aes::Aes192>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Default AAD for ChaCha20-Poly1305 when the caller supplies none.
pub const DEFAULT_CHACHA_AAD: &[u8] = b"header";

/// RSA-OAEP plaintext is split into chunks of at most this many bytes,
/// each encrypted independently (`spec.md` §4.1).
pub const RSA_OAEP_CHUNK_SIZE: usize = 60;

fn random_bytes<const N: usize>() -> Result<[u8; N], ConfigurationError> {
    let mut buf = [0u8; N];
    getrandom(&mut buf).map_err(|e| ConfigurationError(format!("RNG failure: {e}")))?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// AES-CBC
// ---------------------------------------------------------------------------

fn encrypt_aes_cbc(key: &[u8], plaintext: &[u8]) -> Result<SymmetricCipherdict, ConfigurationError> {
    let iv: [u8; 16] = random_bytes()?;
    let ciphertext = match key.len() {
        16 => Aes128CbcEnc::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        24 => Aes192CbcEnc::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        32 => Aes256CbcEnc::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        n => return Err(ConfigurationError(format!("AES key must be 16, 24 or 32 bytes, got {n}"))),
    };
    Ok(SymmetricCipherdict::AesCbc { iv: iv.to_vec(), ciphertext })
}

fn decrypt_aes_cbc(iv: &[u8], ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, DecryptionError> {
    let iv: [u8; 16] = iv
        .try_into()
        .map_err(|_| DecryptionError("malformed AES-CBC iv".into()))?;
    let plaintext = match key.len() {
        16 => Aes128CbcDec::new(key.into(), &iv.into()).decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        24 => Aes192CbcDec::new(key.into(), &iv.into()).decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        32 => Aes256CbcDec::new(key.into(), &iv.into()).decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        n => return Err(DecryptionError(format!("AES key must be 16, 24 or 32 bytes, got {n}"))),
    }
    .map_err(|_| DecryptionError("AES-CBC padding invalid".into()))?;
    Ok(plaintext)
}

// ---------------------------------------------------------------------------
// AES-EAX
// ---------------------------------------------------------------------------

fn encrypt_aes_eax(key: &[u8], plaintext: &[u8]) -> Result<SymmetricCipherdict, ConfigurationError> {
    let nonce: [u8; 16] = random_bytes()?;
    let mut buffer = plaintext.to_vec();
    let tag = match key.len() {
        16 => {
            let cipher = Eax::<aes::Aes128>::new(key.into());
            cipher
                .encrypt_in_place_detached(GenericArray::from_slice(&nonce), b"", &mut buffer)
                .map_err(|_| ConfigurationError("AES-EAX seal failed".into()))?
        }
        24 => {
            let cipher = Eax::<aes::Aes192>::new(key.into());
            cipher
                .encrypt_in_place_detached(GenericArray::from_slice(&nonce), b"", &mut buffer)
                .map_err(|_| ConfigurationError("AES-EAX seal failed".into()))?
        }
        32 => {
            let cipher = Eax::<aes::Aes256>::new(key.into());
            cipher
                .encrypt_in_place_detached(GenericArray::from_slice(&nonce), b"", &mut buffer)
                .map_err(|_| ConfigurationError("AES-EAX seal failed".into()))?
        }
        n => return Err(ConfigurationError(format!("AES key must be 16, 24 or 32 bytes, got {n}"))),
    };
    Ok(SymmetricCipherdict::AesEax {
        ciphertext: buffer,
        tag: tag.to_vec(),
        nonce: nonce.to_vec(),
    })
}

fn decrypt_aes_eax(
    ciphertext: &[u8],
    tag: &[u8],
    nonce: &[u8],
    key: &[u8],
) -> Result<Vec<u8>, DecryptionError> {
    let mut buffer = ciphertext.to_vec();
    let tag = GenericArray::clone_from_slice(tag);
    let result = match key.len() {
        16 => {
            let cipher = Eax::<aes::Aes128>::new(key.into());
            cipher.decrypt_in_place_detached(GenericArray::from_slice(nonce), b"", &mut buffer, &tag)
        }
        24 => {
            let cipher = Eax::<aes::Aes192>::new(key.into());
            cipher.decrypt_in_place_detached(GenericArray::from_slice(nonce), b"", &mut buffer, &tag)
        }
        32 => {
            let cipher = Eax::<aes::Aes256>::new(key.into());
            cipher.decrypt_in_place_detached(GenericArray::from_slice(nonce), b"", &mut buffer, &tag)
        }
        n => return Err(DecryptionError(format!("AES key must be 16, 24 or 32 bytes, got {n}"))),
    };
    result.map_err(|_| DecryptionError("AES-EAX authentication tag mismatch".into()))?;
    Ok(buffer)
}

// ---------------------------------------------------------------------------
// ChaCha20-Poly1305
// ---------------------------------------------------------------------------

fn encrypt_chacha20_poly1305(key: &[u8], plaintext: &[u8]) -> Result<SymmetricCipherdict, ConfigurationError> {
    if key.len() != 32 {
        return Err(ConfigurationError(format!(
            "ChaCha20-Poly1305 key must be 32 bytes, got {}",
            key.len()
        )));
    }
    let cipher = ChaCha20Poly1305::new(key.into());
    let nonce_bytes: [u8; 12] = random_bytes()?;
    let nonce = ChaChaNonce::from_slice(&nonce_bytes);
    let aad = DEFAULT_CHACHA_AAD;
    let ciphertext_and_tag = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|_| ConfigurationError("ChaCha20-Poly1305 seal failed".into()))?;
    // aead combines ciphertext||tag; split tag (last 16 bytes) back out to
    // mirror the dict shape the spec mandates.
    let tag_at = ciphertext_and_tag.len() - 16;
    let (ciphertext, tag) = ciphertext_and_tag.split_at(tag_at);
    Ok(SymmetricCipherdict::ChaCha20Poly1305 {
        ciphertext: ciphertext.to_vec(),
        tag: tag.to_vec(),
        nonce: nonce_bytes.to_vec(),
        aad: aad.to_vec(),
    })
}

fn decrypt_chacha20_poly1305(
    ciphertext: &[u8],
    tag: &[u8],
    nonce: &[u8],
    aad: &[u8],
    key: &[u8],
) -> Result<Vec<u8>, DecryptionError> {
    if key.len() != 32 {
        return Err(DecryptionError(format!(
            "ChaCha20-Poly1305 key must be 32 bytes, got {}",
            key.len()
        )));
    }
    let cipher = ChaCha20Poly1305::new(key.into());
    let nonce = ChaChaNonce::from_slice(nonce);
    let mut combined = Vec::with_capacity(ciphertext.len() + tag.len());
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);
    cipher
        .decrypt(nonce, Payload { msg: &combined, aad })
        .map_err(|_| DecryptionError("ChaCha20-Poly1305 authentication tag mismatch".into()))
}

// ---------------------------------------------------------------------------
// RSA-OAEP
// ---------------------------------------------------------------------------

fn split_as_chunks(data: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    if data.is_empty() {
        return vec![&data[0..0]];
    }
    data.chunks(chunk_size).collect()
}

pub fn encrypt_rsa_oaep(
    public_key: &RsaPublicKey,
    plaintext: &[u8],
) -> Result<AsymmetricCipherdict, ConfigurationError> {
    let mut rng = rand_core::OsRng;
    let mut digest_list = Vec::new();
    for chunk in split_as_chunks(plaintext, RSA_OAEP_CHUNK_SIZE) {
        let encrypted = public_key
            .encrypt(&mut rng, Oaep::new::<Sha256>(), chunk)
            .map_err(|e| ConfigurationError(format!("RSA-OAEP encryption failed: {e}")))?;
        digest_list.push(serde_bytes::ByteBuf::from(encrypted));
    }
    Ok(AsymmetricCipherdict::RsaOaep { digest_list })
}

pub fn decrypt_rsa_oaep(
    private_key: &RsaPrivateKey,
    cipherdict: &AsymmetricCipherdict,
) -> Result<Vec<u8>, DecryptionError> {
    let AsymmetricCipherdict::RsaOaep { digest_list } = cipherdict;
    let mut plaintext = Vec::new();
    for chunk in digest_list {
        let decrypted = private_key
            .decrypt(Oaep::new::<Sha256>(), chunk)
            .map_err(|e| DecryptionError(format!("RSA-OAEP decryption failed: {e}")))?;
        plaintext.extend_from_slice(&decrypted);
    }
    Ok(plaintext)
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// `encrypt(algo, key, plaintext) -> Cipherdict` (`spec.md` §4.1).
pub fn encrypt(
    algo: crate::algo::SymmetricAlgo,
    key: &[u8],
    plaintext: &[u8],
) -> Result<SymmetricCipherdict, ConfigurationError> {
    use crate::algo::SymmetricAlgo::*;
    match algo {
        AesCbc => encrypt_aes_cbc(key, plaintext),
        AesEax => encrypt_aes_eax(key, plaintext),
        ChaCha20Poly1305 => encrypt_chacha20_poly1305(key, plaintext),
    }
}

/// `decrypt(cipherdict, key) -> plaintext` (`spec.md` §4.1).
pub fn decrypt(cipherdict: &SymmetricCipherdict, key: &[u8]) -> Result<Vec<u8>, DecryptionError> {
    match cipherdict {
        SymmetricCipherdict::AesCbc { iv, ciphertext } => decrypt_aes_cbc(iv, ciphertext, key),
        SymmetricCipherdict::AesEax { ciphertext, tag, nonce } => {
            decrypt_aes_eax(ciphertext, tag, nonce, key)
        }
        SymmetricCipherdict::ChaCha20Poly1305 { ciphertext, tag, nonce, aad } => {
            decrypt_chacha20_poly1305(ciphertext, tag, nonce, aad, key)
        }
    }
}
