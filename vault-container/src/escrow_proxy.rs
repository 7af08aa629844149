//! Escrow descriptor resolution (`spec.md` §4.8's `_get_proxy_for_escrow`):
//! turns the sentinel/`{url: ...}` shapes from [`crate::conf::EscrowDescriptor`]
//! into live [`vault_keystore::Escrow`] objects, local or remote.

use crate::conf::EscrowDescriptor;
use crate::error::ContainerError;

use std::sync::Arc;
use vault_crypto::{AsymmetricAlgo, AsymmetricCipherdict, KeychainUid, Signature};
use vault_keystore::{AuthorizationResult, Escrow, EscrowError, KeypairIdentifier, LocalEscrow};

/// A client-side stand-in for a remote escrow, speaking the same
/// JSON-shaped request/response bodies the `vault-api` server exposes at
/// `{base_url}/api/escrow/*` (`spec.md` §6's JSON-RPC boundary, rendered
/// as plain REST-over-JSON rather than a JSON-RPC 2.0 envelope — see
/// DESIGN.md).
pub struct RemoteEscrowProxy {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteEscrowProxy {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url, api_key: None }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/api/escrow/{method}", self.base_url.trim_end_matches('/'))
    }

    async fn post<Req: serde::Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &Req,
    ) -> Result<Resp, EscrowError> {
        let mut request = self.client.post(self.endpoint(method)).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| EscrowError(format!("remote escrow transport error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EscrowError(format!("remote escrow '{method}' returned {status}: {text}")));
        }

        response
            .json()
            .await
            .map_err(|e| EscrowError(format!("remote escrow '{method}' returned malformed response: {e}")))
    }
}

#[async_trait::async_trait]
impl Escrow for RemoteEscrowProxy {
    async fn fetch_public_key(
        &self,
        keychain_uid: KeychainUid,
        algo: AsymmetricAlgo,
        must_exist: bool,
    ) -> Result<String, EscrowError> {
        #[derive(serde::Serialize)]
        struct Req {
            keychain_uid: KeychainUid,
            algo: AsymmetricAlgo,
            must_exist: bool,
        }
        #[derive(serde::Deserialize)]
        struct Resp {
            public_key_pem: String,
        }
        let resp: Resp =
            self.post("fetch_public_key", &Req { keychain_uid, algo, must_exist }).await?;
        Ok(resp.public_key_pem)
    }

    async fn get_message_signature(
        &self,
        keychain_uid: KeychainUid,
        algo: AsymmetricAlgo,
        message: &[u8],
    ) -> Result<Signature, EscrowError> {
        #[derive(serde::Serialize)]
        struct Req<'a> {
            keychain_uid: KeychainUid,
            algo: AsymmetricAlgo,
            #[serde(with = "serde_bytes")]
            message: &'a [u8],
        }
        self.post("get_message_signature", &Req { keychain_uid, algo, message }).await
    }

    async fn decrypt_with_private_key(
        &self,
        keychain_uid: KeychainUid,
        cipherdict: &AsymmetricCipherdict,
        passphrases: &[String],
    ) -> Result<Vec<u8>, EscrowError> {
        #[derive(serde::Serialize)]
        struct Req<'a> {
            keychain_uid: KeychainUid,
            cipherdict: &'a AsymmetricCipherdict,
            passphrases: &'a [String],
        }
        #[derive(serde::Deserialize)]
        struct Resp {
            #[serde(with = "serde_bytes")]
            plaintext: Vec<u8>,
        }
        let resp: Resp = self
            .post("decrypt_with_private_key", &Req { keychain_uid, cipherdict, passphrases })
            .await?;
        Ok(resp.plaintext)
    }

    async fn request_decryption_authorization(
        &self,
        keypair_identifiers: &[KeypairIdentifier],
        request_message: &str,
        passphrases: &[String],
    ) -> Result<AuthorizationResult, EscrowError> {
        #[derive(serde::Serialize)]
        struct Req<'a> {
            keypair_identifiers: &'a [KeypairIdentifier],
            request_message: &'a str,
            passphrases: &'a [String],
        }
        self.post(
            "request_decryption_authorization",
            &Req { keypair_identifiers, request_message, passphrases },
        )
        .await
    }
}

/// Resolves an [`EscrowDescriptor`] to a live [`Escrow`] (`spec.md` §4.8's
/// `_get_proxy_for_escrow`). The local variant always resolves to the same
/// in-process escrow; remote variants mint a fresh [`RemoteEscrowProxy`]
/// per call (cheap: `reqwest::Client` is itself a cheap-to-clone handle
/// onto a shared connection pool).
pub struct EscrowResolver {
    local: Arc<LocalEscrow>,
    http_client: reqwest::Client,
    remote_api_key: Option<String>,
}

impl EscrowResolver {
    pub fn new(local: Arc<LocalEscrow>) -> Self {
        Self { local, http_client: reqwest::Client::new(), remote_api_key: None }
    }

    pub fn with_remote_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.remote_api_key = Some(api_key.into());
        self
    }

    pub fn resolve(&self, descriptor: &EscrowDescriptor) -> Result<Arc<dyn Escrow>, ContainerError> {
        match descriptor {
            EscrowDescriptor::Local => Ok(self.local.clone() as Arc<dyn Escrow>),
            EscrowDescriptor::Remote { url } => {
                let mut proxy = RemoteEscrowProxy::new(self.http_client.clone(), url.clone());
                if let Some(key) = &self.remote_api_key {
                    proxy = proxy.with_api_key(key.clone());
                }
                Ok(Arc::new(proxy))
            }
        }
    }
}
