//! Core keystore types: a `KeyRecord` (one generated asymmetric keypair, PEM
//! bytes plus the algorithm it belongs to) and the containers the Keystore
//! arranges them in (`spec.md` §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vault_crypto::{AsymmetricAlgo, KeychainUid};
use zeroize::Zeroizing;

/// One generated asymmetric keypair sitting in the keystore, bound or free.
/// The passphrase protecting `private_key_pem`, if any, is never stored here
/// (`spec.md` §3) — a caller supplies candidate passphrases at the point of
/// use and the PKCS#8 PEM itself is tried against each in turn.
#[derive(Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    pub algo: AsymmetricAlgo,
    pub public_key_pem: String,
    /// PKCS#8 PEM, passphrase-encrypted when the key was generated with one.
    pub private_key_pem: Zeroizing<String>,
    pub created_at: DateTime<Utc>,
}

impl KeyRecord {
    pub fn new(algo: AsymmetricAlgo, public_key_pem: String, private_key_pem: String) -> Self {
        Self {
            algo,
            public_key_pem,
            private_key_pem: Zeroizing::new(private_key_pem),
            created_at: Utc::now(),
        }
    }
}

/// One identifier in a `request_decryption_authorization` batch (`spec.md`
/// §4.6).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct KeypairIdentifier {
    pub keychain_uid: KeychainUid,
    pub algo: AsymmetricAlgo,
}

/// Per-identifier verdict classified by `request_decryption_authorization`
/// (`spec.md` §4.6, testable property #9).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypairStatus {
    Accepted,
    MissingPrivateKey,
    MissingPassphrase,
}

/// `{response_message, has_errors, keypair_statuses}` (`spec.md` §4.6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub response_message: String,
    pub has_errors: bool,
    pub keypair_statuses: Vec<(KeypairIdentifier, KeypairStatus)>,
}

/// A `KeyRecord` once it has been promoted out of the free pool and bound to
/// a specific `KeychainUid`.
#[derive(Clone, Serialize, Deserialize)]
pub struct BoundKey {
    pub keychain_uid: KeychainUid,
    pub record: KeyRecord,
}
