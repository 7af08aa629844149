//! CLI driver — the external command surface `{encrypt, decrypt, validate}`
//! (`spec.md` §6): a configuration document plus an input/output path,
//! exit codes 0 on success, 1 on validation error, 2 on cryptographic
//! failure. Manual argument parsing, matching the style the rest of this
//! workspace's binaries use rather than reaching for a CLI-parsing crate.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use vault_keystore::{EscrowAccess, FileBackend, InMemoryBackend, Keystore, LocalEscrow, StorageBackend};

use crate::conf::ContainerConf;
use crate::document::Container;
use crate::engine::ContainerEngine;
use crate::escrow_proxy::EscrowResolver;

fn usage() {
    eprintln!(
        "vault — container encryption/decryption engine\n\
         \n\
         Commands:\n\
         \n\
         vault encrypt <conf.json|conf.toml> <input-file> <output-file>\n\
         Encrypt <input-file> under the strata described by <conf>, writing\n\
         a CBOR-encoded container document to <output-file>.\n\
         \n\
         vault decrypt <container-file> <output-file>\n\
         Decrypt a container document, writing the recovered plaintext to\n\
         <output-file>.\n\
         \n\
         vault validate <container-file>\n\
         Parse a container document and confirm its format tag and stratum\n\
         shape, without performing any escrow calls.\n\
         \n\
         Environment:\n\
         \n\
         VAULT_DATA_DIR     local keystore directory (default ./vault-data)\n\
         VAULT_IN_MEMORY    set to use an ephemeral in-memory keystore\n\
         VAULT_REMOTE_API_KEY  bearer token sent to {{url: ...}} escrows\n"
    );
}

fn local_keystore() -> Result<Arc<Keystore>, ExitCode> {
    let storage: Arc<dyn StorageBackend> = if std::env::var_os("VAULT_IN_MEMORY").is_some() {
        Arc::new(InMemoryBackend::new())
    } else {
        let dir = std::env::var("VAULT_DATA_DIR").unwrap_or_else(|_| "./vault-data".to_string());
        Arc::new(FileBackend::new(dir).map_err(|e| {
            eprintln!("error: failed to open keystore: {e}");
            ExitCode::from(2)
        })?)
    };
    Ok(Arc::new(Keystore::new(storage)))
}

fn engine() -> Result<ContainerEngine, ExitCode> {
    let keystore = local_keystore()?;
    let local = Arc::new(LocalEscrow::new(keystore, EscrowAccess::ReadWrite));
    let mut resolver = EscrowResolver::new(local);
    if let Ok(api_key) = std::env::var("VAULT_REMOTE_API_KEY") {
        resolver = resolver.with_remote_api_key(api_key);
    }
    Ok(ContainerEngine::new(resolver))
}

fn read_conf(path: &Path) -> Result<ContainerConf, ExitCode> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        eprintln!("error: failed to read configuration '{}': {e}", path.display());
        ExitCode::from(1)
    })?;
    let parsed = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => ContainerConf::from_toml(&text),
        _ => ContainerConf::from_json(&text),
    };
    parsed.map_err(|e| {
        eprintln!("error: invalid configuration '{}': {e}", path.display());
        ExitCode::from(1)
    })
}

async fn cmd_encrypt(args: &[String]) -> ExitCode {
    let [conf_path, input_path, output_path] = args else {
        eprintln!("error: usage: vault encrypt <conf> <input-file> <output-file>");
        return ExitCode::from(1);
    };

    let conf = match read_conf(Path::new(conf_path)) {
        Ok(conf) => conf,
        Err(code) => return code,
    };
    let data = match std::fs::read(input_path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("error: failed to read input '{input_path}': {e}");
            return ExitCode::from(1);
        }
    };
    let engine = match engine() {
        Ok(engine) => engine,
        Err(code) => return code,
    };

    let container = match engine.encrypt(&data, &conf).await {
        Ok(container) => container,
        Err(e) => {
            eprintln!("error: encryption failed: {e}");
            return ExitCode::from(2);
        }
    };
    let bytes = match container.to_cbor() {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: failed to serialize container: {e}");
            return ExitCode::from(2);
        }
    };
    if let Err(e) = std::fs::write(output_path, bytes) {
        eprintln!("error: failed to write output '{output_path}': {e}");
        return ExitCode::from(1);
    }

    eprintln!("encrypted {} bytes -> {output_path}", data.len());
    ExitCode::SUCCESS
}

async fn cmd_decrypt(args: &[String]) -> ExitCode {
    let [container_path, output_path] = args else {
        eprintln!("error: usage: vault decrypt <container-file> <output-file>");
        return ExitCode::from(1);
    };

    let bytes = match std::fs::read(container_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: failed to read container '{container_path}': {e}");
            return ExitCode::from(1);
        }
    };
    let container = match Container::from_cbor(&bytes) {
        Ok(container) => container,
        Err(e) => {
            eprintln!("error: malformed container: {e}");
            return ExitCode::from(1);
        }
    };
    let engine = match engine() {
        Ok(engine) => engine,
        Err(code) => return code,
    };

    let plaintext = match engine.decrypt(&container).await {
        Ok(plaintext) => plaintext,
        Err(e) => {
            eprintln!("error: decryption failed: {e}");
            return ExitCode::from(2);
        }
    };
    if let Err(e) = std::fs::write(output_path, &plaintext) {
        eprintln!("error: failed to write output '{output_path}': {e}");
        return ExitCode::from(1);
    }

    eprintln!("decrypted {} bytes -> {output_path}", plaintext.len());
    ExitCode::SUCCESS
}

fn cmd_validate(args: &[String]) -> ExitCode {
    let [container_path] = args else {
        eprintln!("error: usage: vault validate <container-file>");
        return ExitCode::from(1);
    };

    let bytes = match std::fs::read(container_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: failed to read container '{container_path}': {e}");
            return ExitCode::from(1);
        }
    };
    let container = match Container::from_cbor(&bytes) {
        Ok(container) => container,
        Err(e) => {
            eprintln!("error: malformed container: {e}");
            return ExitCode::from(1);
        }
    };
    if container.container_format != crate::document::CONTAINER_FORMAT {
        eprintln!(
            "error: unknown container format '{}' (expected '{}')",
            container.container_format,
            crate::document::CONTAINER_FORMAT
        );
        return ExitCode::from(1);
    }

    println!("container_uid:   {}", container.container_uid);
    println!("keychain_uid:    {}", container.keychain_uid);
    println!("strata:          {}", container.data_encryption_strata.len());
    for (i, stratum) in container.data_encryption_strata.iter().enumerate() {
        println!(
            "  [{i}] {} — {} key-wrap layer(s), {} signature(s)",
            stratum.data_encryption_algo,
            stratum.key_encryption_strata.len(),
            stratum.data_signatures.len()
        );
    }
    ExitCode::SUCCESS
}

pub async fn run(args: &[String]) -> ExitCode {
    if args.len() < 2 {
        usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "encrypt" => cmd_encrypt(&args[2..]).await,
        "decrypt" => cmd_decrypt(&args[2..]).await,
        "validate" => cmd_validate(&args[2..]),
        "--help" | "-h" => {
            usage();
            ExitCode::SUCCESS
        }
        "--version" | "-V" => {
            println!("vault {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("error: unknown command '{cmd}'");
            usage();
            ExitCode::from(1)
        }
    }
}
