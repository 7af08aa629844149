//! Container encryption/decryption engine: the onion pipeline that ties
//! `vault-crypto`'s algorithm registries and `vault-keystore`'s escrow
//! abstraction together into the self-describing container format
//! (`spec.md` §3, §4.8, C8).

pub mod cli;
pub mod conf;
pub mod document;
pub mod engine;
pub mod error;
pub mod escrow_proxy;

pub use conf::{ContainerConf, EscrowDescriptor, KeyEncryptionLayerConf, SignatureConf, StratumConf};
pub use document::{Container, DataCipherParams, KeyEncryptionStratum, SignatureRecord, Stratum, CONTAINER_FORMAT};
pub use engine::ContainerEngine;
pub use error::ContainerError;
pub use escrow_proxy::{EscrowResolver, RemoteEscrowProxy};
