//! C3: Key Generator — fresh symmetric keys and PEM-serialized asymmetric
//! keypairs for every algorithm tag (`spec.md` §4.3).
//!
//! Keys are drawn fresh on every call; nothing here is derived from a
//! `KeychainUid`. The Keystore (not this module) is what remembers a
//! generated keypair against an identity.

use crate::algo::{AsymmetricAlgo, SymmetricAlgo};
use crate::error::ConfigurationError;

use pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

/// RSA modulus size for both RSA_OAEP and RSA_PSS keys.
pub const RSA_KEY_BITS: usize = 2048;

/// A freshly generated asymmetric keypair, PEM-encoded.
pub struct GeneratedKeypair {
    pub public_key_pem: String,
    /// PKCS#8, optionally passphrase-encrypted.
    pub private_key_pem: Zeroizing<String>,
}

fn encode_pair(
    private_pem: Zeroizing<String>,
    public_pem: String,
) -> Result<GeneratedKeypair, ConfigurationError> {
    Ok(GeneratedKeypair {
        public_key_pem: public_pem,
        private_key_pem: private_pem,
    })
}

fn encode_err(e: impl std::fmt::Display) -> ConfigurationError {
    ConfigurationError(format!("failed to PEM-encode generated key: {e}"))
}

/// Generate a fresh symmetric data-encryption key of the length `algo` mandates.
pub fn generate_symmetric_key(algo: SymmetricAlgo) -> Result<Vec<u8>, ConfigurationError> {
    let mut buf = vec![0u8; algo.key_len()];
    getrandom::getrandom(&mut buf).map_err(|e| ConfigurationError(format!("RNG failure: {e}")))?;
    Ok(buf)
}

fn rsa_keypair(passphrase: Option<&str>) -> Result<GeneratedKeypair, ConfigurationError> {
    let mut rng = rand_core::OsRng;
    let private_key =
        RsaPrivateKey::new(&mut rng, RSA_KEY_BITS).map_err(|e| encode_err(e))?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_pem = match passphrase {
        Some(pw) => private_key
            .to_pkcs8_encrypted_pem(&mut rng, pw, LineEnding::LF)
            .map_err(encode_err)?,
        None => private_key.to_pkcs8_pem(LineEnding::LF).map_err(encode_err)?,
    };
    let public_pem = public_key.to_public_key_pem(LineEnding::LF).map_err(encode_err)?;
    encode_pair(private_pem, public_pem)
}

fn dsa_keypair(passphrase: Option<&str>) -> Result<GeneratedKeypair, ConfigurationError> {
    let mut rng = rand_core::OsRng;
    let components = dsa::Components::generate(&mut rng, dsa::KeySize::DSA_2048_256);
    let private_key = dsa::PrivateKey::generate(&mut rng, &components);
    let public_key = private_key.public_key();

    let private_pem = match passphrase {
        Some(pw) => private_key
            .to_pkcs8_encrypted_pem(&mut rng, pw, LineEnding::LF)
            .map_err(encode_err)?,
        None => private_key.to_pkcs8_pem(LineEnding::LF).map_err(encode_err)?,
    };
    let public_pem = public_key.to_public_key_pem(LineEnding::LF).map_err(encode_err)?;
    encode_pair(private_pem, public_pem)
}

fn ecc_p256_keypair(passphrase: Option<&str>) -> Result<GeneratedKeypair, ConfigurationError> {
    let mut rng = rand_core::OsRng;
    let private_key = p256::ecdsa::SigningKey::random(&mut rng);
    let public_key = p256::ecdsa::VerifyingKey::from(&private_key);

    let private_pem = match passphrase {
        Some(pw) => private_key
            .to_pkcs8_encrypted_pem(&mut rng, pw, LineEnding::LF)
            .map_err(encode_err)?,
        None => private_key.to_pkcs8_pem(LineEnding::LF).map_err(encode_err)?,
    };
    let public_pem = public_key.to_public_key_pem(LineEnding::LF).map_err(encode_err)?;
    encode_pair(private_pem, public_pem)
}

fn ecc_p384_keypair(passphrase: Option<&str>) -> Result<GeneratedKeypair, ConfigurationError> {
    let mut rng = rand_core::OsRng;
    let private_key = p384::ecdsa::SigningKey::random(&mut rng);
    let public_key = p384::ecdsa::VerifyingKey::from(&private_key);

    let private_pem = match passphrase {
        Some(pw) => private_key
            .to_pkcs8_encrypted_pem(&mut rng, pw, LineEnding::LF)
            .map_err(encode_err)?,
        None => private_key.to_pkcs8_pem(LineEnding::LF).map_err(encode_err)?,
    };
    let public_pem = public_key.to_public_key_pem(LineEnding::LF).map_err(encode_err)?;
    encode_pair(private_pem, public_pem)
}

fn ecc_p521_keypair(passphrase: Option<&str>) -> Result<GeneratedKeypair, ConfigurationError> {
    let mut rng = rand_core::OsRng;
    let private_key = p521::ecdsa::SigningKey::random(&mut rng);
    let public_key = p521::ecdsa::VerifyingKey::from(&private_key);

    let private_pem = match passphrase {
        Some(pw) => private_key
            .to_pkcs8_encrypted_pem(&mut rng, pw, LineEnding::LF)
            .map_err(encode_err)?,
        None => private_key.to_pkcs8_pem(LineEnding::LF).map_err(encode_err)?,
    };
    let public_pem = public_key.to_public_key_pem(LineEnding::LF).map_err(encode_err)?;
    encode_pair(private_pem, public_pem)
}

/// Which elliptic curve backs an `ECC_DSS` key. The registry defaults new
/// ECC keys to P-256; P-384/P-521 exist so a Keystore can be configured to
/// provision a stronger curve without touching the wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EccCurve {
    P256,
    P384,
    P521,
}

impl Default for EccCurve {
    fn default() -> Self {
        Self::P256
    }
}

/// Generate a fresh asymmetric keypair for `algo`, PEM-encoding the private
/// key under `passphrase` when given (`spec.md` §4.3: "passphrase-protected
/// private keys").
pub fn generate_asymmetric_keypair(
    algo: AsymmetricAlgo,
    curve: EccCurve,
    passphrase: Option<&str>,
) -> Result<GeneratedKeypair, ConfigurationError> {
    match algo {
        AsymmetricAlgo::RsaOaep | AsymmetricAlgo::RsaPss => rsa_keypair(passphrase),
        AsymmetricAlgo::DsaDss => dsa_keypair(passphrase),
        AsymmetricAlgo::EccDss => match curve {
            EccCurve::P256 => ecc_p256_keypair(passphrase),
            EccCurve::P384 => ecc_p384_keypair(passphrase),
            EccCurve::P521 => ecc_p521_keypair(passphrase),
        },
    }
}
