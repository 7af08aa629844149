//! Escrow abstraction (`spec.md` §4.5, §4.6): the policy layer that mediates
//! all access to private key material. A Read-Write escrow may lazily
//! materialize a bound key (promoting one out of the free pool) the first
//! time it is asked for; a Read-Only escrow only ever looks at what is
//! already bound and fails otherwise.

use crate::error::EscrowError;
use crate::keystore::Keystore;
use crate::types::{AuthorizationResult, KeypairIdentifier, KeypairStatus};
use vault_crypto::{AsymmetricAlgo, KeychainUid, Signature};

/// The four operations an escrow exposes over private key material
/// (`spec.md` §4.5, §4.6). None of them ever return private key bytes to the
/// caller — signing and decryption happen inside the escrow.
#[async_trait::async_trait]
pub trait Escrow: Send + Sync {
    /// `must_exist=false` (the RW default) lazily materializes a missing key;
    /// `must_exist=true`, or a Read-Only escrow, fails on a missing key
    /// instead (`spec.md` §4.6).
    async fn fetch_public_key(
        &self,
        keychain_uid: KeychainUid,
        algo: AsymmetricAlgo,
        must_exist: bool,
    ) -> Result<String, EscrowError>;

    async fn get_message_signature(
        &self,
        keychain_uid: KeychainUid,
        algo: AsymmetricAlgo,
        message: &[u8],
    ) -> Result<Signature, EscrowError>;

    /// Never materializes keys — a missing keypair fails (`spec.md` §4.6).
    /// A passphrase-protected key requires a matching entry in
    /// `passphrases`, tried in order; the first that decrypts is accepted.
    async fn decrypt_with_private_key(
        &self,
        keychain_uid: KeychainUid,
        cipherdict: &vault_crypto::AsymmetricCipherdict,
        passphrases: &[String],
    ) -> Result<Vec<u8>, EscrowError>;

    /// Authorize decryption of a batch of keypairs, e.g. for an offline or
    /// dual-control escrow that requires a human or trustee approval step
    /// before `decrypt_with_private_key` will proceed. The default escrow
    /// implementation is a stateless classification: every identifier is
    /// `accepted` if its private key is present and either unprotected or
    /// resolved by a supplied passphrase, `missing_private_key` if absent, or
    /// `missing_passphrase` if present but encrypted with no matching
    /// passphrase (`spec.md` §4.6, testable property #9). `keypair_identifiers`
    /// must not be empty.
    async fn request_decryption_authorization(
        &self,
        keypair_identifiers: &[KeypairIdentifier],
        request_message: &str,
        passphrases: &[String],
    ) -> Result<AuthorizationResult, EscrowError>;
}

/// Can this escrow lazily generate/promote keys it doesn't have bound yet?
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscrowAccess {
    ReadWrite,
    ReadOnly,
}

/// An escrow backed directly by a local [`Keystore`] (`spec.md` §4.5,
/// §4.6). `access` decides whether a missing bound key is an error
/// ([`EscrowAccess::ReadOnly`]) or gets lazily promoted from the free pool
/// ([`EscrowAccess::ReadWrite`]).
pub struct LocalEscrow {
    keystore: std::sync::Arc<Keystore>,
    access: EscrowAccess,
}

impl LocalEscrow {
    pub fn new(keystore: std::sync::Arc<Keystore>, access: EscrowAccess) -> Self {
        Self { keystore, access }
    }

    /// Looks up a bound key; under [`EscrowAccess::ReadWrite`] with
    /// `must_exist=false`, lazily materializes one (promoting a free keypair,
    /// or generating one synchronously) when absent. Any other combination
    /// fails on a missing key.
    async fn resolve_record(
        &self,
        keychain_uid: KeychainUid,
        algo: AsymmetricAlgo,
        must_exist: bool,
    ) -> Result<crate::types::KeyRecord, EscrowError> {
        if let Some(record) = self.keystore.get_bound(keychain_uid, algo)? {
            return Ok(record);
        }
        if must_exist || self.access == EscrowAccess::ReadOnly {
            return Err(crate::error::KeystoreError::KeyDoesNotExist { keychain_uid, algo }.into());
        }
        Ok(self.keystore.bind_key(keychain_uid, algo).await?)
    }
}

#[async_trait::async_trait]
impl Escrow for LocalEscrow {
    async fn fetch_public_key(
        &self,
        keychain_uid: KeychainUid,
        algo: AsymmetricAlgo,
        must_exist: bool,
    ) -> Result<String, EscrowError> {
        Ok(self.resolve_record(keychain_uid, algo, must_exist).await?.public_key_pem)
    }

    async fn get_message_signature(
        &self,
        keychain_uid: KeychainUid,
        algo: AsymmetricAlgo,
        message: &[u8],
    ) -> Result<Signature, EscrowError> {
        let record = self.resolve_record(keychain_uid, algo, false).await?;
        let signature_algo = match algo {
            AsymmetricAlgo::DsaDss => vault_crypto::SignatureAlgo::DsaDss,
            AsymmetricAlgo::RsaPss => vault_crypto::SignatureAlgo::RsaPss,
            AsymmetricAlgo::EccDss => vault_crypto::SignatureAlgo::EccDss,
            AsymmetricAlgo::RsaOaep => {
                return Err(EscrowError(format!("{algo} is not a signature algorithm")))
            }
        };
        let private_key = self.keystore.load_private_key(&record, &[])?;
        vault_crypto::signature::sign(signature_algo, &private_key, message)
            .map_err(|e| EscrowError(e.to_string()))
    }

    async fn decrypt_with_private_key(
        &self,
        keychain_uid: KeychainUid,
        cipherdict: &vault_crypto::AsymmetricCipherdict,
        passphrases: &[String],
    ) -> Result<Vec<u8>, EscrowError> {
        let record = self
            .keystore
            .get_bound(keychain_uid, vault_crypto::AsymmetricAlgo::RsaOaep)?
            .ok_or(crate::error::KeystoreError::KeyDoesNotExist {
                keychain_uid,
                algo: vault_crypto::AsymmetricAlgo::RsaOaep,
            })?;
        let private_key = self.keystore.load_private_key(&record, passphrases)?;
        let vault_crypto::LoadedPrivateKey::Rsa(rsa_key) = &private_key else {
            return Err(EscrowError("RSA-OAEP decryption requires an RSA key".into()));
        };
        vault_crypto::cipher::decrypt_rsa_oaep(rsa_key, cipherdict)
            .map_err(|e| EscrowError(e.to_string()))
    }

    async fn request_decryption_authorization(
        &self,
        keypair_identifiers: &[KeypairIdentifier],
        _request_message: &str,
        passphrases: &[String],
    ) -> Result<AuthorizationResult, EscrowError> {
        if keypair_identifiers.is_empty() {
            return Err(EscrowError(
                "request_decryption_authorization: keypair_identifiers must not be empty".into(),
            ));
        }

        let mut keypair_statuses = Vec::with_capacity(keypair_identifiers.len());
        let mut has_errors = false;
        for &identifier in keypair_identifiers {
            let status = match self.keystore.get_bound(identifier.keychain_uid, identifier.algo)? {
                None => KeypairStatus::MissingPrivateKey,
                Some(record) => match self.keystore.load_private_key(&record, passphrases) {
                    Ok(_) => KeypairStatus::Accepted,
                    Err(_) => KeypairStatus::MissingPassphrase,
                },
            };
            if status != KeypairStatus::Accepted {
                has_errors = true;
            }
            keypair_statuses.push((identifier, status));
        }

        let response_message =
            if has_errors { "denied: not every keypair was accepted".to_string() } else { "accepted".to_string() };
        Ok(AuthorizationResult { response_message, has_errors, keypair_statuses })
    }
}
