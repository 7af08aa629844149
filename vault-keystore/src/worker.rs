//! Free-Keys Worker (`spec.md` §4.7): a background task that keeps each
//! configured algorithm's free pool topped up to a configured ceiling,
//! picking the least-provisioned algorithm first (ties broken lexically by
//! the algorithm's wire tag) so no single algorithm starves another.

use crate::error::KeystoreError;
use crate::keystore::Keystore;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use vault_crypto::AsymmetricAlgo;

const STOPPED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPING: u8 = 2;

/// `stopped -> running -> stopping -> stopped` (`spec.md` §4.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Stopped,
    Running,
    Stopping,
}

impl From<u8> for WorkerState {
    fn from(v: u8) -> Self {
        match v {
            STOPPED => Self::Stopped,
            RUNNING => Self::Running,
            _ => Self::Stopping,
        }
    }
}

/// Which algorithms to keep provisioned, how full to keep each pool, and how
/// often the worker wakes up once every algorithm has hit the ceiling
/// (`spec.md` §4.7's `{ max_free_keys_per_algo, sleep_on_overflow_s,
/// key_algos }`).
#[derive(Clone, Debug)]
pub struct FreeKeysWorkerConfig {
    pub pool_ceiling: usize,
    pub poll_interval: Duration,
    pub key_algos: Vec<AsymmetricAlgo>,
}

impl Default for FreeKeysWorkerConfig {
    fn default() -> Self {
        Self {
            pool_ceiling: 20,
            poll_interval: Duration::from_secs(30),
            key_algos: AsymmetricAlgo::ALL.to_vec(),
        }
    }
}

/// One step of the free-keys worker (`spec.md` §4.7 steps 1-2, testable
/// property #6): pick the algorithm in `key_algos` with the least free-pool
/// count, ties broken by ascending lexical algorithm name, and if it's still
/// below `max_free_keys_per_algo`, generate one keypair into its pool.
/// Returns `true` on a successful generation, `false` once every algorithm in
/// `key_algos` has reached the ceiling.
pub fn generate_free_keypair_for_least_provisioned_key_algo(
    keystore: &Keystore,
    max_free_keys_per_algo: usize,
    key_algos: &[AsymmetricAlgo],
) -> Result<bool, KeystoreError> {
    let mut candidates: Vec<(usize, String, AsymmetricAlgo)> = Vec::with_capacity(key_algos.len());
    for &algo in key_algos {
        let len = keystore.free_pool_len(algo)?;
        if len < max_free_keys_per_algo {
            candidates.push((len, algo.to_string(), algo));
        }
    }
    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    let Some((_, _, algo)) = candidates.into_iter().next() else {
        return Ok(false);
    };
    keystore.generate_into_free_pool(algo)?;
    Ok(true)
}

pub struct FreeKeysWorker {
    keystore: Arc<Keystore>,
    config: FreeKeysWorkerConfig,
    state: AtomicU8,
    stop_requested: Notify,
}

impl FreeKeysWorker {
    pub fn new(keystore: Arc<Keystore>, config: FreeKeysWorkerConfig) -> Arc<Self> {
        Arc::new(Self {
            keystore,
            config,
            state: AtomicU8::new(STOPPED),
            stop_requested: Notify::new(),
        })
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from(self.state.load(Ordering::SeqCst))
    }

    /// Spawn the worker loop onto the current tokio runtime. Returns
    /// immediately; call [`Self::stop`] to ask it to wind down.
    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.state.store(RUNNING, Ordering::SeqCst);
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run().await })
    }

    /// Request a graceful stop; does not wait for the loop to actually exit.
    pub fn stop(&self) {
        self.state.store(STOPPING, Ordering::SeqCst);
        self.stop_requested.notify_one();
    }

    async fn run(self: Arc<Self>) {
        loop {
            if self.state() == WorkerState::Stopping {
                break;
            }

            match generate_free_keypair_for_least_provisioned_key_algo(
                &self.keystore,
                self.config.pool_ceiling,
                &self.config.key_algos,
            ) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => tracing::error!(error = %e, "free-keys worker failed to provision a key"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = self.stop_requested.notified() => {}
            }
        }
        self.state.store(STOPPED, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryBackend;

    #[test]
    fn least_provisioned_ties_broken_lexically() {
        let keystore = Keystore::new(Arc::new(InMemoryBackend::new()));
        let key_algos = [
            AsymmetricAlgo::DsaDss,
            AsymmetricAlgo::EccDss,
            AsymmetricAlgo::RsaOaep,
            AsymmetricAlgo::RsaPss,
        ];
        // All pools empty: DSA_DSS sorts before ECC_DSS, RSA_OAEP, RSA_PSS.
        assert!(generate_free_keypair_for_least_provisioned_key_algo(&keystore, 10, &key_algos).unwrap());
        assert_eq!(keystore.free_pool_len(AsymmetricAlgo::DsaDss).unwrap(), 1);
        assert!(generate_free_keypair_for_least_provisioned_key_algo(&keystore, 10, &key_algos).unwrap());
        assert_eq!(keystore.free_pool_len(AsymmetricAlgo::EccDss).unwrap(), 1);
    }

    /// `spec.md` §8's concrete scenario: `max_free_keys_per_algo=10`,
    /// `key_algos=["RSA_OAEP", "DSA_DSS"]`, 20 calls fill both pools to 10,
    /// the 21st returns `false`.
    #[test]
    fn ceiling_enforced_then_generator_returns_false() {
        let keystore = Keystore::new(Arc::new(InMemoryBackend::new()));
        let key_algos = [AsymmetricAlgo::RsaOaep, AsymmetricAlgo::DsaDss];
        for _ in 0..20 {
            assert!(generate_free_keypair_for_least_provisioned_key_algo(&keystore, 10, &key_algos).unwrap());
        }
        assert_eq!(keystore.free_pool_len(AsymmetricAlgo::RsaOaep).unwrap(), 10);
        assert_eq!(keystore.free_pool_len(AsymmetricAlgo::DsaDss).unwrap(), 10);
        assert!(!generate_free_keypair_for_least_provisioned_key_algo(&keystore, 10, &key_algos).unwrap());
    }
}
