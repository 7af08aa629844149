//! Loaded (in-memory) asymmetric key material, keyed by algorithm family.
//!
//! A `Keypair` (§3) stores PEM bytes; this module is the bridge between
//! those bytes and the concrete RustCrypto key types the cipher and
//! signature registries operate on.

use crate::error::ConfigurationError;
use pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

#[derive(Clone)]
pub enum LoadedPrivateKey {
    Rsa(Box<RsaPrivateKey>),
    Dsa(Box<dsa::PrivateKey>),
    EccP256(Box<p256::ecdsa::SigningKey>),
    EccP384(Box<p384::ecdsa::SigningKey>),
    EccP521(Box<p521::ecdsa::SigningKey>),
}

#[derive(Clone)]
pub enum LoadedPublicKey {
    Rsa(Box<RsaPublicKey>),
    Dsa(Box<dsa::PublicKey>),
    EccP256(Box<p256::ecdsa::VerifyingKey>),
    EccP384(Box<p384::ecdsa::VerifyingKey>),
    EccP521(Box<p521::ecdsa::VerifyingKey>),
}

/// Which concrete key family a PEM blob should be parsed as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    Dsa,
    EccP256,
    EccP384,
    EccP521,
}

pub fn load_private_key_from_pem(
    pem: &str,
    family: KeyFamily,
    passphrase: Option<&str>,
) -> Result<LoadedPrivateKey, ConfigurationError> {
    let bad = |e: String| ConfigurationError(format!("failed to load private key: {e}"));
    match family {
        KeyFamily::Rsa => {
            let key = match passphrase {
                Some(pw) => RsaPrivateKey::from_pkcs8_encrypted_pem(pem, pw)
                    .map_err(|e| bad(e.to_string()))?,
                None => RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| bad(e.to_string()))?,
            };
            Ok(LoadedPrivateKey::Rsa(Box::new(key)))
        }
        KeyFamily::Dsa => {
            let key = match passphrase {
                Some(pw) => dsa::PrivateKey::from_pkcs8_encrypted_pem(pem, pw)
                    .map_err(|e| bad(e.to_string()))?,
                None => dsa::PrivateKey::from_pkcs8_pem(pem).map_err(|e| bad(e.to_string()))?,
            };
            Ok(LoadedPrivateKey::Dsa(Box::new(key)))
        }
        KeyFamily::EccP256 => {
            let key = match passphrase {
                Some(pw) => p256::ecdsa::SigningKey::from_pkcs8_encrypted_pem(pem, pw)
                    .map_err(|e| bad(e.to_string()))?,
                None => {
                    p256::ecdsa::SigningKey::from_pkcs8_pem(pem).map_err(|e| bad(e.to_string()))?
                }
            };
            Ok(LoadedPrivateKey::EccP256(Box::new(key)))
        }
        KeyFamily::EccP384 => {
            let key = match passphrase {
                Some(pw) => p384::ecdsa::SigningKey::from_pkcs8_encrypted_pem(pem, pw)
                    .map_err(|e| bad(e.to_string()))?,
                None => {
                    p384::ecdsa::SigningKey::from_pkcs8_pem(pem).map_err(|e| bad(e.to_string()))?
                }
            };
            Ok(LoadedPrivateKey::EccP384(Box::new(key)))
        }
        KeyFamily::EccP521 => {
            let key = match passphrase {
                Some(pw) => p521::ecdsa::SigningKey::from_pkcs8_encrypted_pem(pem, pw)
                    .map_err(|e| bad(e.to_string()))?,
                None => {
                    p521::ecdsa::SigningKey::from_pkcs8_pem(pem).map_err(|e| bad(e.to_string()))?
                }
            };
            Ok(LoadedPrivateKey::EccP521(Box::new(key)))
        }
    }
}

/// Which key family a signature algorithm's keys belong to. ECC_DSS keys
/// default to P-256 here, matching the keystore's default provisioning
/// curve — a container that wraps/signs with a P-384/P-521 key must carry
/// that choice out of band (not yet surfaced on the wire format).
pub fn signature_key_family(algo: crate::algo::SignatureAlgo) -> KeyFamily {
    match algo {
        crate::algo::SignatureAlgo::DsaDss => KeyFamily::Dsa,
        crate::algo::SignatureAlgo::RsaPss => KeyFamily::Rsa,
        crate::algo::SignatureAlgo::EccDss => KeyFamily::EccP256,
    }
}

pub fn load_public_key_from_pem(
    pem: &str,
    family: KeyFamily,
) -> Result<LoadedPublicKey, ConfigurationError> {
    let bad = |e: String| ConfigurationError(format!("failed to load public key: {e}"));
    match family {
        KeyFamily::Rsa => Ok(LoadedPublicKey::Rsa(Box::new(
            RsaPublicKey::from_public_key_pem(pem).map_err(|e| bad(e.to_string()))?,
        ))),
        KeyFamily::Dsa => Ok(LoadedPublicKey::Dsa(Box::new(
            dsa::PublicKey::from_public_key_pem(pem).map_err(|e| bad(e.to_string()))?,
        ))),
        KeyFamily::EccP256 => Ok(LoadedPublicKey::EccP256(Box::new(
            p256::ecdsa::VerifyingKey::from_public_key_pem(pem).map_err(|e| bad(e.to_string()))?,
        ))),
        KeyFamily::EccP384 => Ok(LoadedPublicKey::EccP384(Box::new(
            p384::ecdsa::VerifyingKey::from_public_key_pem(pem).map_err(|e| bad(e.to_string()))?,
        ))),
        KeyFamily::EccP521 => Ok(LoadedPublicKey::EccP521(Box::new(
            p521::ecdsa::VerifyingKey::from_public_key_pem(pem).map_err(|e| bad(e.to_string()))?,
        ))),
    }
}
