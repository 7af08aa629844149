//! C8: Container Engine — the onion encryption/decryption pipeline
//! (`spec.md` §4.8). Both directions share the same escrow resolution and
//! the same per-layer cipher/signature dispatch as the rest of the crate;
//! what differs is only the order strata are walked in.

use vault_crypto::keypair::{self, KeyFamily, LoadedPublicKey};
use vault_crypto::{
    cipher, keygen, signature, AsymmetricAlgo, AsymmetricCipherdict, KeychainUid,
};
use crate::conf::{ContainerConf, StratumConf};
use crate::document::{Container, DataCipherParams, KeyEncryptionStratum, SignatureRecord, Stratum, CONTAINER_FORMAT};
use crate::error::ContainerError;
use crate::escrow_proxy::EscrowResolver;
use vault_keystore::{Escrow, KeypairIdentifier};

/// Drives `encrypt`/`decrypt` over a [`ContainerConf`]/[`Container`],
/// resolving every escrow descriptor it encounters through an
/// [`EscrowResolver`] (`spec.md` §4.8's `_get_proxy_for_escrow`).
pub struct ContainerEngine {
    resolver: EscrowResolver,
}

impl ContainerEngine {
    pub fn new(resolver: EscrowResolver) -> Self {
        Self { resolver }
    }

    /// `spec.md` §4.8, writing direction: build a [`Container`] that wraps
    /// `data` under `conf`.
    pub async fn encrypt(&self, data: &[u8], conf: &ContainerConf) -> Result<Container, ContainerError> {
        let keychain_uid = conf.keychain_uid.unwrap_or_else(KeychainUid::generate);
        let mut current_plaintext = data.to_vec();

        // conf.data_encryption_strata is ordered outermost-first; the pipeline
        // builds innermost-first, so walk it in reverse and un-reverse the
        // finished strata before storing them on the container.
        let mut strata_innermost_first = Vec::with_capacity(conf.data_encryption_strata.len());
        for stratum_conf in conf.data_encryption_strata.iter().rev() {
            strata_innermost_first.push(self.encrypt_stratum(keychain_uid, stratum_conf, &mut current_plaintext).await?);
        }
        strata_innermost_first.reverse();

        Ok(Container {
            container_format: CONTAINER_FORMAT.to_string(),
            container_uid: KeychainUid::generate(),
            keychain_uid,
            data_ciphertext: current_plaintext,
            data_encryption_strata: strata_innermost_first,
        })
    }

    async fn encrypt_stratum(
        &self,
        keychain_uid: KeychainUid,
        stratum_conf: &StratumConf,
        current_plaintext: &mut Vec<u8>,
    ) -> Result<Stratum, ContainerError> {
        let key = keygen::generate_symmetric_key(stratum_conf.data_encryption_algo)?;

        let cipherdict = cipher::encrypt(stratum_conf.data_encryption_algo, &key, current_plaintext)?;
        let (ciphertext, data_cipher_params) = DataCipherParams::split(cipherdict);
        *current_plaintext = ciphertext;

        let key_ciphertext = self.wrap_key(keychain_uid, &stratum_conf.key_encryption_strata, key).await?;
        let key_encryption_strata = stratum_conf
            .key_encryption_strata
            .iter()
            .map(|layer| KeyEncryptionStratum {
                key_encryption_algo: layer.key_encryption_algo,
                key_escrow: layer.key_escrow.clone(),
            })
            .collect();

        let mut data_signatures = Vec::with_capacity(stratum_conf.data_signatures.len());
        for sig_conf in &stratum_conf.data_signatures {
            let escrow = self.resolver.resolve(&sig_conf.signature_escrow)?;
            let algo: AsymmetricAlgo = sig_conf.signature_algo.into();
            let signature_value = escrow
                .get_message_signature(keychain_uid, algo, current_plaintext)
                .await?;
            data_signatures.push(SignatureRecord {
                signature_key_type: sig_conf.signature_algo,
                signature_algo: sig_conf.signature_algo,
                signature_escrow: sig_conf.signature_escrow.clone(),
                signature_value,
            });
        }

        Ok(Stratum {
            data_encryption_algo: stratum_conf.data_encryption_algo,
            data_cipher_params,
            key_ciphertext,
            key_encryption_strata,
            data_signatures,
        })
    }

    /// Cascade the symmetric key through `layers` (ordered innermost-first):
    /// each layer's public-key wrap becomes the next layer's plaintext,
    /// exactly mirroring the outer data pipeline at a smaller scale
    /// (`spec.md` §9 "Container recursion").
    async fn wrap_key(
        &self,
        keychain_uid: KeychainUid,
        layers: &[crate::conf::KeyEncryptionLayerConf],
        key: Vec<u8>,
    ) -> Result<Vec<u8>, ContainerError> {
        let mut current = key;
        for layer in layers {
            let escrow = self.resolver.resolve(&layer.key_escrow)?;
            let algo: AsymmetricAlgo = layer.key_encryption_algo.into();
            let public_key_pem = escrow.fetch_public_key(keychain_uid, algo, false).await?;
            let public_key = keypair::load_public_key_from_pem(&public_key_pem, KeyFamily::Rsa)?;
            let LoadedPublicKey::Rsa(rsa_public_key) = &public_key else {
                return Err(ContainerError::Configuration(
                    "key-wrap escrow returned a non-RSA public key for RSA_OAEP".into(),
                ));
            };
            let cipherdict = cipher::encrypt_rsa_oaep(rsa_public_key, &current)?;
            current = serialize_asymmetric_cipherdict(&cipherdict)?;
        }
        Ok(current)
    }

    /// `spec.md` §4.8, reading direction: recover the original plaintext
    /// from `container`.
    pub async fn decrypt(&self, container: &Container) -> Result<Vec<u8>, ContainerError> {
        if container.container_format != CONTAINER_FORMAT {
            return Err(ContainerError::Configuration(format!(
                "Unknown container format '{}'",
                container.container_format
            )));
        }

        let mut current_ciphertext = container.data_ciphertext.clone();
        for stratum in &container.data_encryption_strata {
            self.verify_stratum_signatures(container.keychain_uid, stratum, &current_ciphertext)
                .await?;
            let key = self.unwrap_key(container.keychain_uid, stratum).await?;
            let cipherdict = stratum.data_cipher_params.clone().rejoin(current_ciphertext);
            current_ciphertext = cipher::decrypt(&cipherdict, &key)?;
        }
        Ok(current_ciphertext)
    }

    async fn verify_stratum_signatures(
        &self,
        keychain_uid: KeychainUid,
        stratum: &Stratum,
        message: &[u8],
    ) -> Result<(), ContainerError> {
        for record in &stratum.data_signatures {
            let escrow = self.resolver.resolve(&record.signature_escrow)?;
            let algo: AsymmetricAlgo = record.signature_key_type.into();
            // The signing key must already exist — it signed this stratum
            // during encryption — so a miss here is reported rather than
            // silently materializing an unrelated key that can't verify.
            let public_key_pem = escrow.fetch_public_key(keychain_uid, algo, true).await?;
            let family = keypair::signature_key_family(record.signature_key_type);
            let public_key = keypair::load_public_key_from_pem(&public_key_pem, family)?;
            signature::verify(record.signature_algo, &public_key, message, &record.signature_value)?;
        }
        Ok(())
    }

    /// Unwrap `stratum.key_ciphertext` by walking `key_encryption_strata` in
    /// reverse (outermost wrap first), each step's decrypted plaintext
    /// feeding the next inner layer's cipherdict, until the raw symmetric
    /// key is recovered (`spec.md` §4.8 step 3b).
    async fn unwrap_key(&self, keychain_uid: KeychainUid, stratum: &Stratum) -> Result<Vec<u8>, ContainerError> {
        let mut current = stratum.key_ciphertext.clone();
        for layer in stratum.key_encryption_strata.iter().rev() {
            let escrow = self.resolver.resolve(&layer.key_escrow)?;
            let algo: AsymmetricAlgo = layer.key_encryption_algo.into();
            let identifier = KeypairIdentifier { keychain_uid, algo };
            let authorization = escrow
                .request_decryption_authorization(
                    &[identifier],
                    "container decryption",
                    &[],
                )
                .await?;
            if authorization.has_errors {
                return Err(ContainerError::Escrow(authorization.response_message));
            }
            let cipherdict = deserialize_asymmetric_cipherdict(&current)?;
            current = escrow.decrypt_with_private_key(keychain_uid, &cipherdict, &[]).await?;
        }
        Ok(current)
    }
}

fn serialize_asymmetric_cipherdict(dict: &AsymmetricCipherdict) -> Result<Vec<u8>, ContainerError> {
    let mut buf = Vec::new();
    ciborium::into_writer(dict, &mut buf)?;
    Ok(buf)
}

fn deserialize_asymmetric_cipherdict(bytes: &[u8]) -> Result<AsymmetricCipherdict, ContainerError> {
    Ok(ciborium::from_reader(bytes)?)
}
