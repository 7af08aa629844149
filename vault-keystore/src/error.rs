//! Error types for the keystore and escrow layer.

use std::fmt;
use vault_crypto::{AsymmetricAlgo, KeychainUid};

#[derive(Debug)]
pub enum KeystoreError {
    /// No bound key exists for `(keychain_uid, algo)`, and the caller's
    /// escrow policy was read-only so none could be lazily created.
    KeyDoesNotExist { keychain_uid: KeychainUid, algo: AsymmetricAlgo },
    /// The free pool for `algo` was empty when a bound key needed creating.
    FreePoolExhausted(AsymmetricAlgo),
    Crypto(vault_crypto::CryptoError),
    Storage(String),
}

impl fmt::Display for KeystoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyDoesNotExist { keychain_uid, algo } => {
                write!(f, "no {algo} key bound to keychain {keychain_uid}")
            }
            Self::FreePoolExhausted(algo) => write!(f, "free key pool for {algo} is empty"),
            Self::Crypto(e) => write!(f, "{e}"),
            Self::Storage(msg) => write!(f, "keystore storage error: {msg}"),
        }
    }
}

impl std::error::Error for KeystoreError {}

impl From<vault_crypto::CryptoError> for KeystoreError {
    fn from(e: vault_crypto::CryptoError) -> Self {
        Self::Crypto(e)
    }
}

/// Escrow refused the operation outright — distinct from `KeystoreError`
/// because it can originate from a remote escrow over the wire, where there
/// is no local storage/crypto detail to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowError(pub String);

impl fmt::Display for EscrowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "escrow error: {}", self.0)
    }
}
impl std::error::Error for EscrowError {}

impl From<KeystoreError> for EscrowError {
    fn from(e: KeystoreError) -> Self {
        Self(e.to_string())
    }
}
