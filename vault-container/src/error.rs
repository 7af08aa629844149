//! Top-level error type for the container engine, wrapping the lower
//! crates' errors the same way the keystore crate wraps its own
//! dependencies' errors.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// Unknown container format, unknown escrow descriptor, bad configuration.
    Configuration(String),
    Decryption(String),
    SignatureVerification(String),
    Validation(String),
    /// Escrow refused the operation, or a remote escrow call failed.
    Escrow(String),
    /// Container/cipherdict (de)serialization failure.
    Codec(String),
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(m) => write!(f, "configuration error: {m}"),
            Self::Decryption(m) => write!(f, "decryption error: {m}"),
            Self::SignatureVerification(m) => write!(f, "signature verification failed: {m}"),
            Self::Validation(m) => write!(f, "validation error: {m}"),
            Self::Escrow(m) => write!(f, "escrow error: {m}"),
            Self::Codec(m) => write!(f, "container codec error: {m}"),
        }
    }
}

impl std::error::Error for ContainerError {}

impl From<vault_crypto::CryptoError> for ContainerError {
    fn from(e: vault_crypto::CryptoError) -> Self {
        match e {
            vault_crypto::CryptoError::Configuration(e) => Self::Configuration(e.0),
            vault_crypto::CryptoError::Decryption(e) => Self::Decryption(e.0),
            vault_crypto::CryptoError::SignatureVerification(e) => Self::SignatureVerification(e.0),
            vault_crypto::CryptoError::Validation(e) => Self::Validation(e.0),
        }
    }
}

impl From<vault_crypto::error::ConfigurationError> for ContainerError {
    fn from(e: vault_crypto::error::ConfigurationError) -> Self {
        Self::Configuration(e.0)
    }
}

impl From<vault_crypto::error::DecryptionError> for ContainerError {
    fn from(e: vault_crypto::error::DecryptionError) -> Self {
        Self::Decryption(e.0)
    }
}

impl From<vault_crypto::error::SignatureVerificationError> for ContainerError {
    fn from(e: vault_crypto::error::SignatureVerificationError) -> Self {
        Self::SignatureVerification(e.0)
    }
}

impl From<vault_keystore::EscrowError> for ContainerError {
    fn from(e: vault_keystore::EscrowError) -> Self {
        Self::Escrow(e.0)
    }
}

impl From<vault_keystore::KeystoreError> for ContainerError {
    fn from(e: vault_keystore::KeystoreError) -> Self {
        Self::Escrow(e.to_string())
    }
}

impl From<ciborium::de::Error<std::io::Error>> for ContainerError {
    fn from(e: ciborium::de::Error<std::io::Error>) -> Self {
        Self::Codec(e.to_string())
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for ContainerError {
    fn from(e: ciborium::ser::Error<std::io::Error>) -> Self {
        Self::Codec(e.to_string())
    }
}
