//! The configuration tree a caller supplies to describe how a container
//! should be built (`spec.md` §3, §4.8): which symmetric algorithm each
//! stratum uses, which escrows wrap its key and sign its ciphertext.

use serde::de::{Error as DeError, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use vault_crypto::{AsymmetricEncryptionAlgo, KeychainUid, SignatureAlgo, SymmetricAlgo};

/// Sentinel naming the in-process escrow bound to the local keystore
/// (`spec.md` §4.8's `LOCAL_ESCROW_PLACEHOLDER`).
pub const LOCAL_ESCROW_PLACEHOLDER: &str = "LOCAL_ESCROW_PLACEHOLDER";

/// Resolves to either the local keystore's escrow or a remote proxy
/// speaking the same four-method contract over HTTP (`spec.md` §4.8, §6).
/// Any other shape — an unrecognized string, a bare `{urn: ...}` map, or
/// any other mapping without a `url` key — is a validation error at
/// deserialization time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EscrowDescriptor {
    Local,
    Remote { url: String },
}

impl Serialize for EscrowDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Local => serializer.serialize_str(LOCAL_ESCROW_PLACEHOLDER),
            Self::Remote { url } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("url", url)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for EscrowDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EscrowVisitor;

        impl<'de> Visitor<'de> for EscrowVisitor {
            type Value = EscrowDescriptor;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "the local escrow sentinel string or a {{url: ...}} map")
            }

            fn visit_str<E: DeError>(self, v: &str) -> Result<Self::Value, E> {
                if v == LOCAL_ESCROW_PLACEHOLDER {
                    Ok(EscrowDescriptor::Local)
                } else {
                    Err(E::custom(format!("unknown escrow descriptor '{v}'")))
                }
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut url: Option<String> = None;
                while let Some(key) = map.next_key::<String>()? {
                    if key == "url" {
                        url = Some(map.next_value()?);
                    } else {
                        let _: serde::de::IgnoredAny = map.next_value()?;
                    }
                }
                url.map(|url| EscrowDescriptor::Remote { url })
                    .ok_or_else(|| A::Error::custom("escrow descriptor map is missing a 'url' field"))
            }
        }

        deserializer.deserialize_any(EscrowVisitor)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyEncryptionLayerConf {
    pub key_encryption_algo: AsymmetricEncryptionAlgo,
    pub key_escrow: EscrowDescriptor,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatureConf {
    pub signature_algo: SignatureAlgo,
    pub signature_escrow: EscrowDescriptor,
}

/// One layer of the onion (`spec.md` §3's "Stratum", as supplied by the caller
/// rather than as produced in the resulting container document).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StratumConf {
    pub data_encryption_algo: SymmetricAlgo,
    /// Ordered innermost-first: the first layer wraps the raw symmetric
    /// key, each subsequent layer wraps the previous layer's ciphertext.
    pub key_encryption_strata: Vec<KeyEncryptionLayerConf>,
    pub data_signatures: Vec<SignatureConf>,
}

/// The configuration tree passed to [`crate::engine::ContainerEngine::encrypt`]
/// (`spec.md` §1, §4.8).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContainerConf {
    /// Caller-supplied identity; minted fresh when absent (`spec.md` §4.8 step 1).
    #[serde(default)]
    pub keychain_uid: Option<KeychainUid>,
    /// Ordered outermost-first, matching the container document's own
    /// `data_encryption_strata` field (`spec.md` §3).
    pub data_encryption_strata: Vec<StratumConf>,
}

impl ContainerConf {
    pub fn from_json(data: &str) -> Result<Self, crate::error::ContainerError> {
        serde_json::from_str(data).map_err(|e| crate::error::ContainerError::Configuration(e.to_string()))
    }

    pub fn from_toml(data: &str) -> Result<Self, crate::error::ContainerError> {
        toml::from_str(data).map_err(|e| crate::error::ContainerError::Configuration(e.to_string()))
    }
}
