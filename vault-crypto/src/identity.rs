//! `KeychainUid`: the 128-bit identifier selecting a set of keys across algorithms.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 128-bit identifier supplied by the caller, or minted fresh by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeychainUid(uuid::Uuid);

impl KeychainUid {
    /// Mint a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> uuid::Uuid {
        self.0
    }
}

impl fmt::Display for KeychainUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for KeychainUid {
    fn default() -> Self {
        Self::generate()
    }
}
