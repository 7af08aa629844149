//! The container document itself (`spec.md` §3, §6): the self-describing
//! structure produced by encryption and consumed by decryption. Serialized
//! with `ciborium` so binary fields stay typed byte strings rather than
//! being base64-reencoded into text, per §6's requirement.

use crate::conf::EscrowDescriptor;
use serde::{Deserialize, Serialize};
use vault_crypto::{KeychainUid, Signature, SignatureAlgo, SymmetricAlgo, SymmetricCipherdict};

/// The only container format this engine produces or accepts (`spec.md` §3).
pub const CONTAINER_FORMAT: &str = "WA_0.1a";

/// One layer of the key-wrapping sub-pipeline recorded on a [`Stratum`]:
/// metadata only (algorithm + escrow) — the actual ciphertext bytes for
/// every layer but the outermost are recovered by decrypting the layer
/// above it, never stored redundantly (`spec.md` §4.8, §9 "Container
/// recursion").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyEncryptionStratum {
    pub key_encryption_algo: vault_crypto::AsymmetricEncryptionAlgo,
    pub key_escrow: EscrowDescriptor,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub signature_key_type: SignatureAlgo,
    pub signature_algo: SignatureAlgo,
    pub signature_escrow: EscrowDescriptor,
    pub signature_value: Signature,
}

/// The non-ciphertext half of a stratum's data cipherdict (IV/nonce/tag/AAD):
/// the ciphertext bytes themselves are never stored per-stratum, only
/// chained implicitly — an outer stratum's cipher output, once decrypted,
/// *is* the next inner stratum's ciphertext (`spec.md` §4.8 step 3b's note
/// about sidecar fields vs. inlined cipherdicts; this format picks sidecar
/// fields).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DataCipherParams {
    #[serde(rename = "AES_CBC")]
    AesCbc {
        #[serde(with = "serde_bytes")]
        iv: Vec<u8>,
    },
    #[serde(rename = "AES_EAX")]
    AesEax {
        #[serde(with = "serde_bytes")]
        tag: Vec<u8>,
        #[serde(with = "serde_bytes")]
        nonce: Vec<u8>,
    },
    #[serde(rename = "CHACHA20_POLY1305")]
    ChaCha20Poly1305 {
        #[serde(with = "serde_bytes")]
        tag: Vec<u8>,
        #[serde(with = "serde_bytes")]
        nonce: Vec<u8>,
        #[serde(with = "serde_bytes")]
        aad: Vec<u8>,
    },
}

impl DataCipherParams {
    /// Split a freshly produced cipherdict into its ciphertext bytes (which
    /// become the next layer's input) and its sidecar parameters (which get
    /// stored on the [`Stratum`]).
    pub fn split(dict: SymmetricCipherdict) -> (Vec<u8>, Self) {
        match dict {
            SymmetricCipherdict::AesCbc { iv, ciphertext } => (ciphertext, Self::AesCbc { iv }),
            SymmetricCipherdict::AesEax { ciphertext, tag, nonce } => {
                (ciphertext, Self::AesEax { tag, nonce })
            }
            SymmetricCipherdict::ChaCha20Poly1305 { ciphertext, tag, nonce, aad } => {
                (ciphertext, Self::ChaCha20Poly1305 { tag, nonce, aad })
            }
        }
    }

    /// Recombine with the ciphertext bytes recovered from the outer layer
    /// to get back a full cipherdict ready for `Cipher.decrypt`.
    pub fn rejoin(self, ciphertext: Vec<u8>) -> SymmetricCipherdict {
        match self {
            Self::AesCbc { iv } => SymmetricCipherdict::AesCbc { iv, ciphertext },
            Self::AesEax { tag, nonce } => SymmetricCipherdict::AesEax { ciphertext, tag, nonce },
            Self::ChaCha20Poly1305 { tag, nonce, aad } => {
                SymmetricCipherdict::ChaCha20Poly1305 { ciphertext, tag, nonce, aad }
            }
        }
    }
}

/// One layer of the data onion (`spec.md` §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stratum {
    pub data_encryption_algo: SymmetricAlgo,
    pub data_cipher_params: DataCipherParams,
    /// The outermost key-wrap ciphertext; unwrapping walks
    /// `key_encryption_strata` in reverse, each step's plaintext feeding
    /// the next inner layer's cipherdict, until the raw symmetric key of
    /// length `data_encryption_algo`'s mandated size is recovered.
    #[serde(with = "serde_bytes")]
    pub key_ciphertext: Vec<u8>,
    pub key_encryption_strata: Vec<KeyEncryptionStratum>,
    pub data_signatures: Vec<SignatureRecord>,
}

/// The top-level container document (`spec.md` §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Container {
    pub container_format: String,
    pub container_uid: KeychainUid,
    pub keychain_uid: KeychainUid,
    #[serde(with = "serde_bytes")]
    pub data_ciphertext: Vec<u8>,
    /// Ordered outermost first.
    pub data_encryption_strata: Vec<Stratum>,
}

impl Container {
    pub fn to_cbor(&self) -> Result<Vec<u8>, crate::error::ContainerError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, crate::error::ContainerError> {
        Ok(ciborium::from_reader(bytes)?)
    }
}
