//! Keystore, escrow policy and free-keys worker for the vault container
//! format: the stateful half of the system, as opposed to `vault-crypto`'s
//! stateless algorithm registries.

pub mod error;
pub mod escrow;
pub mod keystore;
pub mod storage;
pub mod types;
pub mod worker;

pub use error::{EscrowError, KeystoreError};
pub use escrow::{Escrow, EscrowAccess, LocalEscrow};
pub use keystore::Keystore;
pub use storage::{FileBackend, InMemoryBackend, StorageBackend};
pub use types::{AuthorizationResult, BoundKey, KeyRecord, KeypairIdentifier, KeypairStatus};
pub use worker::{
    generate_free_keypair_for_least_provisioned_key_algo, FreeKeysWorker, FreeKeysWorkerConfig,
    WorkerState,
};
