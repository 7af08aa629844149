//! Closed sets of algorithm tags. The string form of each variant is the
//! exact on-the-wire tag (see `spec.md` §3): `AES_CBC`, `RSA_OAEP`, etc.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymmetricAlgo {
    AesCbc,
    AesEax,
    ChaCha20Poly1305,
}

impl SymmetricAlgo {
    pub const ALL: [SymmetricAlgo; 3] = [Self::AesCbc, Self::AesEax, Self::ChaCha20Poly1305];

    /// Mandated key length in bytes for a freshly drawn data-encryption key.
    pub fn key_len(self) -> usize {
        match self {
            Self::AesCbc | Self::AesEax => 32,
            Self::ChaCha20Poly1305 => 32,
        }
    }
}

impl fmt::Display for SymmetricAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AesCbc => "AES_CBC",
            Self::AesEax => "AES_EAX",
            Self::ChaCha20Poly1305 => "CHACHA20_POLY1305",
        })
    }
}

impl FromStr for SymmetricAlgo {
    type Err = ConfigurationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AES_CBC" => Ok(Self::AesCbc),
            "AES_EAX" => Ok(Self::AesEax),
            "CHACHA20_POLY1305" => Ok(Self::ChaCha20Poly1305),
            other => Err(ConfigurationError(format!("Unknown cipher type '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AsymmetricEncryptionAlgo {
    RsaOaep,
}

impl fmt::Display for AsymmetricEncryptionAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RsaOaep => "RSA_OAEP",
        })
    }
}

impl FromStr for AsymmetricEncryptionAlgo {
    type Err = ConfigurationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RSA_OAEP" => Ok(Self::RsaOaep),
            other => Err(ConfigurationError(format!("Unknown cipher type '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgo {
    DsaDss,
    RsaPss,
    EccDss,
}

impl fmt::Display for SignatureAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DsaDss => "DSA_DSS",
            Self::RsaPss => "RSA_PSS",
            Self::EccDss => "ECC_DSS",
        })
    }
}

impl FromStr for SignatureAlgo {
    type Err = ConfigurationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DSA_DSS" => Ok(Self::DsaDss),
            "RSA_PSS" => Ok(Self::RsaPss),
            "ECC_DSS" => Ok(Self::EccDss),
            other => Err(ConfigurationError(format!("Unknown signature algo '{other}'"))),
        }
    }
}

/// Union over every algorithm tag recognized anywhere in the keystore —
/// used as the map key for the free-pool / bound-pool (`spec.md` §3 uses
/// one flat "algorithm tag" namespace across symmetric/asymmetric/signature).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AsymmetricAlgo {
    RsaOaep,
    DsaDss,
    RsaPss,
    EccDss,
}

impl AsymmetricAlgo {
    pub const ALL: [AsymmetricAlgo; 4] =
        [Self::RsaOaep, Self::DsaDss, Self::RsaPss, Self::EccDss];
}

impl fmt::Display for AsymmetricAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RsaOaep => "RSA_OAEP",
            Self::DsaDss => "DSA_DSS",
            Self::RsaPss => "RSA_PSS",
            Self::EccDss => "ECC_DSS",
        })
    }
}

impl FromStr for AsymmetricAlgo {
    type Err = ConfigurationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RSA_OAEP" => Ok(Self::RsaOaep),
            "DSA_DSS" => Ok(Self::DsaDss),
            "RSA_PSS" => Ok(Self::RsaPss),
            "ECC_DSS" => Ok(Self::EccDss),
            other => Err(ConfigurationError(format!("Unknown asymmetric key algo '{other}'"))),
        }
    }
}

impl From<AsymmetricEncryptionAlgo> for AsymmetricAlgo {
    fn from(a: AsymmetricEncryptionAlgo) -> Self {
        match a {
            AsymmetricEncryptionAlgo::RsaOaep => Self::RsaOaep,
        }
    }
}

impl From<SignatureAlgo> for AsymmetricAlgo {
    fn from(a: SignatureAlgo) -> Self {
        match a {
            SignatureAlgo::DsaDss => Self::DsaDss,
            SignatureAlgo::RsaPss => Self::RsaPss,
            SignatureAlgo::EccDss => Self::EccDss,
        }
    }
}
