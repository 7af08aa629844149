//! Cipherdict: an algorithm-tagged bag of bytestrings produced by one
//! cipher invocation (`spec.md` §3).

use crate::algo::{AsymmetricEncryptionAlgo, SymmetricAlgo};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SymmetricCipherdict {
    #[serde(rename = "AES_CBC")]
    AesCbc {
        #[serde(with = "serde_bytes")]
        iv: Vec<u8>,
        #[serde(with = "serde_bytes")]
        ciphertext: Vec<u8>,
    },
    #[serde(rename = "AES_EAX")]
    AesEax {
        #[serde(with = "serde_bytes")]
        ciphertext: Vec<u8>,
        #[serde(with = "serde_bytes")]
        tag: Vec<u8>,
        #[serde(with = "serde_bytes")]
        nonce: Vec<u8>,
    },
    #[serde(rename = "CHACHA20_POLY1305")]
    ChaCha20Poly1305 {
        #[serde(with = "serde_bytes")]
        ciphertext: Vec<u8>,
        #[serde(with = "serde_bytes")]
        tag: Vec<u8>,
        #[serde(with = "serde_bytes")]
        nonce: Vec<u8>,
        #[serde(with = "serde_bytes")]
        aad: Vec<u8>,
    },
}

impl SymmetricCipherdict {
    pub fn algo(&self) -> SymmetricAlgo {
        match self {
            Self::AesCbc { .. } => SymmetricAlgo::AesCbc,
            Self::AesEax { .. } => SymmetricAlgo::AesEax,
            Self::ChaCha20Poly1305 { .. } => SymmetricAlgo::ChaCha20Poly1305,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AsymmetricCipherdict {
    #[serde(rename = "RSA_OAEP")]
    RsaOaep {
        digest_list: Vec<serde_bytes::ByteBuf>,
    },
}

impl AsymmetricCipherdict {
    pub fn algo(&self) -> AsymmetricEncryptionAlgo {
        match self {
            Self::RsaOaep { .. } => AsymmetricEncryptionAlgo::RsaOaep,
        }
    }
}

/// `{digest, timestamp_utc}` — digest is the raw signature bytes,
/// timestamp_utc is folded into the message before signing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Signature {
    #[serde(with = "serde_bytes")]
    pub digest: Vec<u8>,
    pub timestamp_utc: String,
}
