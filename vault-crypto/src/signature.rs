//! C2: Signature Registry — sign/verify dispatch for DSA_DSS, RSA_PSS and
//! ECC_DSS (`spec.md` §4.2).
//!
//! Every scheme signs `message || timestamp_utc` hashed with SHA-256, never
//! the raw message, so a signature is only valid paired with the timestamp
//! it was produced alongside.

use crate::algo::SignatureAlgo;
use crate::cipherdict::Signature as SignatureDict;
use crate::error::{ConfigurationError, SignatureVerificationError};
use crate::keypair::{LoadedPrivateKey, LoadedPublicKey};

use ::signature::{DigestSigner, DigestVerifier, RandomizedSigner, Signer, Verifier};
use chrono::Utc;
use rsa::pss::{SigningKey as RsaPssSigningKey, VerifyingKey as RsaPssVerifyingKey};
use sha2::Sha256;

fn preimage(message: &[u8], timestamp_utc: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(message.len() + timestamp_utc.len());
    buf.extend_from_slice(message);
    buf.extend_from_slice(timestamp_utc.as_bytes());
    buf
}

fn now_utc_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// `sign(algo, private_key, message) -> {digest, timestamp_utc}` (`spec.md` §4.2).
pub fn sign(
    algo: SignatureAlgo,
    private_key: &LoadedPrivateKey,
    message: &[u8],
) -> Result<SignatureDict, ConfigurationError> {
    let timestamp_utc = now_utc_rfc3339();
    let preimage = preimage(message, &timestamp_utc);

    let digest = match (algo, private_key) {
        (SignatureAlgo::DsaDss, LoadedPrivateKey::Dsa(key)) => {
            let mut rng = rand_core::OsRng;
            let sig: dsa::Signature = key.sign_digest_with_rng(&mut rng, Sha256::new_with_prefix(&preimage));
            sig.to_vec()
        }
        (SignatureAlgo::RsaPss, LoadedPrivateKey::Rsa(key)) => {
            let mut rng = rand_core::OsRng;
            let signing_key = RsaPssSigningKey::<Sha256>::new((**key).clone());
            let sig = signing_key.sign_with_rng(&mut rng, &preimage);
            use ::signature::SignatureEncoding;
            sig.to_vec()
        }
        (SignatureAlgo::EccDss, LoadedPrivateKey::EccP256(key)) => {
            let sig: p256::ecdsa::Signature = key.sign(&preimage);
            use ::signature::SignatureEncoding;
            sig.to_vec()
        }
        (SignatureAlgo::EccDss, LoadedPrivateKey::EccP384(key)) => {
            let sig: p384::ecdsa::Signature = key.sign(&preimage);
            use ::signature::SignatureEncoding;
            sig.to_vec()
        }
        (SignatureAlgo::EccDss, LoadedPrivateKey::EccP521(key)) => {
            let sig: p521::ecdsa::Signature = key.sign(&preimage);
            use ::signature::SignatureEncoding;
            sig.to_vec()
        }
        _ => {
            return Err(ConfigurationError(format!(
                "private key family does not match signature algo {algo}"
            )))
        }
    };

    Ok(SignatureDict { digest, timestamp_utc })
}

/// `verify(algo, public_key, message, signature) -> bool` (`spec.md` §4.2).
pub fn verify(
    algo: SignatureAlgo,
    public_key: &LoadedPublicKey,
    message: &[u8],
    signature: &SignatureDict,
) -> Result<(), SignatureVerificationError> {
    let bad = || SignatureVerificationError(format!("{algo} signature verification failed"));
    let preimage = preimage(message, &signature.timestamp_utc);

    match (algo, public_key) {
        (SignatureAlgo::DsaDss, LoadedPublicKey::Dsa(key)) => {
            let sig = dsa::Signature::try_from(signature.digest.as_slice()).map_err(|_| bad())?;
            key.verify_digest(Sha256::new_with_prefix(&preimage), &sig)
                .map_err(|_| bad())
        }
        (SignatureAlgo::RsaPss, LoadedPublicKey::Rsa(key)) => {
            let verifying_key = RsaPssVerifyingKey::<Sha256>::new((**key).clone());
            let sig = rsa::pss::Signature::try_from(signature.digest.as_slice()).map_err(|_| bad())?;
            verifying_key.verify(&preimage, &sig).map_err(|_| bad())
        }
        (SignatureAlgo::EccDss, LoadedPublicKey::EccP256(key)) => {
            let sig = p256::ecdsa::Signature::try_from(signature.digest.as_slice()).map_err(|_| bad())?;
            key.verify(&preimage, &sig).map_err(|_| bad())
        }
        (SignatureAlgo::EccDss, LoadedPublicKey::EccP384(key)) => {
            let sig = p384::ecdsa::Signature::try_from(signature.digest.as_slice()).map_err(|_| bad())?;
            key.verify(&preimage, &sig).map_err(|_| bad())
        }
        (SignatureAlgo::EccDss, LoadedPublicKey::EccP521(key)) => {
            let sig = p521::ecdsa::Signature::try_from(signature.digest.as_slice()).map_err(|_| bad())?;
            key.verify(&preimage, &sig).map_err(|_| bad())
        }
        _ => Err(SignatureVerificationError(format!(
            "public key family does not match signature algo {algo}"
        ))),
    }
}
