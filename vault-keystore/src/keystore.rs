//! The keystore itself: a bound map `(KeychainUid, algo) -> KeyRecord` and a
//! free map `algo -> [KeyRecord]` of pre-generated, not-yet-assigned
//! keypairs (`spec.md` §3, §4.6). Promotion from free to bound is atomic
//! per algorithm: each algorithm's free queue is guarded by its own mutex so
//! that provisioning one algorithm never blocks lookups on another.

use crate::error::KeystoreError;
use crate::storage::StorageBackend;
use crate::types::KeyRecord;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use vault_crypto::keygen::{self, EccCurve, GeneratedKeypair};
use vault_crypto::keypair::{self, KeyFamily, LoadedPrivateKey};
use vault_crypto::{AsymmetricAlgo, KeychainUid};

fn key_family_for(algo: AsymmetricAlgo) -> KeyFamily {
    match algo {
        AsymmetricAlgo::RsaOaep | AsymmetricAlgo::RsaPss => KeyFamily::Rsa,
        AsymmetricAlgo::DsaDss => KeyFamily::Dsa,
        AsymmetricAlgo::EccDss => KeyFamily::EccP256,
    }
}

pub struct Keystore {
    storage: Arc<dyn StorageBackend>,
    /// One mutex per algorithm so free-pool provisioning for RSA_OAEP never
    /// blocks a lookup against DSA_DSS's pool.
    free_locks: HashMap<AsymmetricAlgo, Mutex<()>>,
    ecc_curve: EccCurve,
}

impl Keystore {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        let free_locks = AsymmetricAlgo::ALL.into_iter().map(|a| (a, Mutex::new(()))).collect();
        Self { storage, free_locks, ecc_curve: EccCurve::default() }
    }

    pub fn get_bound(
        &self,
        keychain_uid: KeychainUid,
        algo: AsymmetricAlgo,
    ) -> Result<Option<KeyRecord>, KeystoreError> {
        self.storage.get_bound(&keychain_uid, algo)
    }

    /// Load `record`'s private key, trying it unprotected first and then
    /// each of `passphrases` in order, accepting the first that decrypts
    /// (`spec.md` §4.5's `get_private_key` candidate iteration).
    pub fn load_private_key(
        &self,
        record: &KeyRecord,
        passphrases: &[String],
    ) -> Result<LoadedPrivateKey, KeystoreError> {
        let family = key_family_for(record.algo);
        if let Ok(key) = keypair::load_private_key_from_pem(&record.private_key_pem, family, None) {
            return Ok(key);
        }
        for candidate in passphrases {
            if let Ok(key) =
                keypair::load_private_key_from_pem(&record.private_key_pem, family, Some(candidate))
            {
                return Ok(key);
            }
        }
        Err(KeystoreError::Crypto(vault_crypto::CryptoError::Decryption(
            vault_crypto::error::DecryptionError(format!(
                "could not decrypt {} private key with any supplied passphrase",
                record.algo
            )),
        )))
    }

    /// Generate one fresh keypair straight into the free pool, bypassing any
    /// binding. This is what the free-keys worker calls.
    pub fn generate_into_free_pool(&self, algo: AsymmetricAlgo) -> Result<(), KeystoreError> {
        let record = self.generate_record(algo)?;
        self.storage.push_free(&record)
    }

    fn generate_record(&self, algo: AsymmetricAlgo) -> Result<KeyRecord, KeystoreError> {
        let GeneratedKeypair { public_key_pem, private_key_pem } =
            keygen::generate_asymmetric_keypair(algo, self.ecc_curve, None)
                .map_err(|e| KeystoreError::Crypto(e.into()))?;
        Ok(KeyRecord::new(algo, public_key_pem, private_key_pem.to_string()))
    }

    /// How many free keys are currently waiting for `algo`.
    pub fn free_pool_len(&self, algo: AsymmetricAlgo) -> Result<usize, KeystoreError> {
        Ok(self.storage.list_free(algo)?.len())
    }

    /// Bind a key to `keychain_uid` under `algo`: pop one off the free pool
    /// if available, generating one on demand only if the pool is empty
    /// (`spec.md` §4.6 — lazy materialization is the fallback, not the
    /// common path; the free-keys worker is what normally keeps the pool
    /// non-empty).
    pub async fn bind_key(
        &self,
        keychain_uid: KeychainUid,
        algo: AsymmetricAlgo,
    ) -> Result<KeyRecord, KeystoreError> {
        if let Some(existing) = self.storage.get_bound(&keychain_uid, algo)? {
            return Ok(existing);
        }

        let lock = self.free_locks.get(&algo).expect("all algos have a free lock");
        let record = {
            let _guard = lock.lock().unwrap();
            match self.storage.pop_free(algo)? {
                Some(record) => record,
                None => {
                    tracing::warn!(%algo, "free key pool exhausted, generating on demand");
                    self.generate_record(algo)?
                }
            }
        };

        self.storage.put_bound(&keychain_uid, &record)?;
        Ok(record)
    }
}
