//! Unified error types for the cipher/signature/keygen/shamir registries.

use core::fmt;

/// Unknown algorithm tag, unknown container format, invalid key length or curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError(pub String);

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error: {}", self.0)
    }
}
impl std::error::Error for ConfigurationError {}

/// AEAD tag mismatch, RSA decryption failure, wrong passphrase, malformed cipherdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionError(pub String);

impl fmt::Display for DecryptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decryption error: {}", self.0)
    }
}
impl std::error::Error for DecryptionError {}

/// Signature does not match message+timestamp under the claimed public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureVerificationError(pub String);

impl fmt::Display for SignatureVerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signature verification failed: {}", self.0)
    }
}
impl std::error::Error for SignatureVerificationError {}

/// Empty identifier list, message too long, share-length/padding inconsistency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation error: {}", self.0)
    }
}
impl std::error::Error for ValidationError {}

/// Top-level error for `vault-crypto` operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    Configuration(ConfigurationError),
    Decryption(DecryptionError),
    SignatureVerification(SignatureVerificationError),
    Validation(ValidationError),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(e) => e.fmt(f),
            Self::Decryption(e) => e.fmt(f),
            Self::SignatureVerification(e) => e.fmt(f),
            Self::Validation(e) => e.fmt(f),
        }
    }
}
impl std::error::Error for CryptoError {}

impl From<ConfigurationError> for CryptoError {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}
impl From<DecryptionError> for CryptoError {
    fn from(e: DecryptionError) -> Self {
        Self::Decryption(e)
    }
}
impl From<SignatureVerificationError> for CryptoError {
    fn from(e: SignatureVerificationError) -> Self {
        Self::SignatureVerification(e)
    }
}
impl From<ValidationError> for CryptoError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}
