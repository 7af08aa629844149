//! Algorithm registries and stateless cryptographic primitives for the
//! vault container format: symmetric/asymmetric ciphers (C1), signatures
//! (C2), key generation (C3) and Shamir secret sharing (C4).
//!
//! Nothing in this crate holds state across calls — key storage and
//! escrow policy live in `vault-keystore`; the container-level onion
//! construction lives in `vault-container`.

pub mod algo;
pub mod cipher;
pub mod cipherdict;
pub mod error;
pub mod identity;
pub mod keygen;
pub mod keypair;
pub mod shamir;
pub mod signature;

pub use algo::{AsymmetricAlgo, AsymmetricEncryptionAlgo, SignatureAlgo, SymmetricAlgo};
pub use cipherdict::{AsymmetricCipherdict, Signature, SymmetricCipherdict};
pub use error::CryptoError;
pub use identity::KeychainUid;
pub use keygen::{EccCurve, GeneratedKeypair};
pub use keypair::{signature_key_family, KeyFamily, LoadedPrivateKey, LoadedPublicKey};
