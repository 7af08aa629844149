//! Integration tests for the container engine against `spec.md` §8's
//! testable properties and concrete scenarios (SIMPLE_CONF / COMPLEX_CONF).

use std::sync::Arc;

use vault_container::{
    ContainerConf, ContainerEngine, EscrowDescriptor, EscrowResolver, KeyEncryptionLayerConf,
    SignatureConf, StratumConf,
};
use vault_crypto::{AsymmetricEncryptionAlgo, SignatureAlgo, SymmetricAlgo};
use vault_keystore::{EscrowAccess, InMemoryBackend, Keystore, LocalEscrow};

fn test_engine() -> ContainerEngine {
    let keystore = Arc::new(Keystore::new(Arc::new(InMemoryBackend::new())));
    let local = Arc::new(LocalEscrow::new(keystore, EscrowAccess::ReadWrite));
    ContainerEngine::new(EscrowResolver::new(local))
}

fn local_escrow() -> EscrowDescriptor {
    EscrowDescriptor::Local
}

/// `spec.md` §8: single `AES_CBC` stratum, one `DSA_DSS` signature.
fn simple_conf() -> ContainerConf {
    ContainerConf {
        keychain_uid: None,
        data_encryption_strata: vec![StratumConf {
            data_encryption_algo: SymmetricAlgo::AesCbc,
            key_encryption_strata: vec![KeyEncryptionLayerConf {
                key_encryption_algo: AsymmetricEncryptionAlgo::RsaOaep,
                key_escrow: local_escrow(),
            }],
            data_signatures: vec![SignatureConf {
                signature_algo: SignatureAlgo::DsaDss,
                signature_escrow: local_escrow(),
            }],
        }],
    }
}

/// `spec.md` §8: three strata `[AES_EAX, AES_CBC, CHACHA20_POLY1305]`
/// (outermost first); the innermost stratum (`CHACHA20_POLY1305`) carries
/// two `RSA_OAEP` key-wraps and two signatures (`RSA_PSS`, `ECC_DSS`).
fn complex_conf() -> ContainerConf {
    ContainerConf {
        keychain_uid: None,
        data_encryption_strata: vec![
            StratumConf {
                data_encryption_algo: SymmetricAlgo::AesEax,
                key_encryption_strata: vec![KeyEncryptionLayerConf {
                    key_encryption_algo: AsymmetricEncryptionAlgo::RsaOaep,
                    key_escrow: local_escrow(),
                }],
                data_signatures: vec![],
            },
            StratumConf {
                data_encryption_algo: SymmetricAlgo::AesCbc,
                key_encryption_strata: vec![KeyEncryptionLayerConf {
                    key_encryption_algo: AsymmetricEncryptionAlgo::RsaOaep,
                    key_escrow: local_escrow(),
                }],
                data_signatures: vec![],
            },
            StratumConf {
                data_encryption_algo: SymmetricAlgo::ChaCha20Poly1305,
                key_encryption_strata: vec![
                    KeyEncryptionLayerConf {
                        key_encryption_algo: AsymmetricEncryptionAlgo::RsaOaep,
                        key_escrow: local_escrow(),
                    },
                    KeyEncryptionLayerConf {
                        key_encryption_algo: AsymmetricEncryptionAlgo::RsaOaep,
                        key_escrow: local_escrow(),
                    },
                ],
                data_signatures: vec![
                    SignatureConf {
                        signature_algo: SignatureAlgo::RsaPss,
                        signature_escrow: local_escrow(),
                    },
                    SignatureConf {
                        signature_algo: SignatureAlgo::EccDss,
                        signature_escrow: local_escrow(),
                    },
                ],
            },
        ],
    }
}

#[tokio::test]
async fn simple_conf_round_trips_and_has_expected_shape() {
    let engine = test_engine();
    let container = engine.encrypt(b"abc", &simple_conf()).await.unwrap();

    assert_eq!(container.data_encryption_strata.len(), 1);
    assert_eq!(container.data_encryption_strata[0].data_encryption_algo, SymmetricAlgo::AesCbc);
    assert_eq!(container.data_encryption_strata[0].data_signatures.len(), 1);
    assert_eq!(
        container.data_encryption_strata[0].data_signatures[0].signature_algo,
        SignatureAlgo::DsaDss
    );

    let plaintext = engine.decrypt(&container).await.unwrap();
    assert_eq!(plaintext, b"abc");
}

#[tokio::test]
async fn complex_conf_round_trips_and_has_expected_shape() {
    let engine = test_engine();
    let container = engine.encrypt(b"abc", &complex_conf()).await.unwrap();

    assert_eq!(container.data_encryption_strata.len(), 3);
    let algos: Vec<_> = container
        .data_encryption_strata
        .iter()
        .map(|s| s.data_encryption_algo)
        .collect();
    assert_eq!(algos, vec![SymmetricAlgo::AesEax, SymmetricAlgo::AesCbc, SymmetricAlgo::ChaCha20Poly1305]);

    let innermost = &container.data_encryption_strata[2];
    assert_eq!(innermost.key_encryption_strata.len(), 2);
    assert_eq!(innermost.data_signatures.len(), 2);
    let sig_algos: Vec<_> = innermost.data_signatures.iter().map(|s| s.signature_algo).collect();
    assert_eq!(sig_algos, vec![SignatureAlgo::RsaPss, SignatureAlgo::EccDss]);

    let plaintext = engine.decrypt(&container).await.unwrap();
    assert_eq!(plaintext, b"abc");
}

#[tokio::test]
async fn round_trip_holds_for_empty_and_larger_payloads() {
    let engine = test_engine();
    for payload in [&b""[..], &b"x"[..], &vec![0x42u8; 10_000][..]] {
        let container = engine.encrypt(payload, &simple_conf()).await.unwrap();
        let plaintext = engine.decrypt(&container).await.unwrap();
        assert_eq!(plaintext, payload);
    }
}

#[tokio::test]
async fn format_tamper_is_rejected() {
    let engine = test_engine();
    let mut container = engine.encrypt(b"abc", &simple_conf()).await.unwrap();
    container.container_format = "unknown-format".to_string();

    let err = engine.decrypt(&container).await.unwrap_err();
    assert!(
        err.to_string().contains("Unknown container format") || err.to_string().contains("format"),
        "unexpected error for tampered container_format: {err}"
    );
}

#[tokio::test]
async fn signature_tamper_is_rejected() {
    let engine = test_engine();
    let mut container = engine.encrypt(b"abc", &simple_conf()).await.unwrap();

    let record = &mut container.data_encryption_strata[0].data_signatures[0];
    record.signature_value.digest[0] ^= 0x01;

    let err = engine.decrypt(&container).await.unwrap_err();
    match err {
        vault_container::ContainerError::SignatureVerification(_) => {}
        other => panic!("expected a signature-verification error, got: {other}"),
    }
}

#[tokio::test]
async fn unknown_escrow_descriptor_string_is_a_validation_error() {
    let json = r#"{"data_encryption_strata":[{"data_encryption_algo":"AES_CBC","key_encryption_strata":[{"key_encryption_algo":"RSA_OAEP","key_escrow":"weird-value"}],"data_signatures":[]}]}"#;
    let err = ContainerConf::from_json(json).unwrap_err();
    match err {
        vault_container::ContainerError::Configuration(_) => {}
        other => panic!("expected a configuration error, got: {other}"),
    }
}
