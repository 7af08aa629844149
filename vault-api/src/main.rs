//! Remote Escrow API Server
//!
//! Exposes a [`vault_keystore::Escrow`] over HTTP/JSON so a container
//! engine can treat a remote trustee exactly like a local one
//! (`spec.md` §4.5, §4.8 "remote escrow proxy").
//!
//! Configuration (environment variables):
//!   VAULT_PORT              - Listen port (default: 3000)
//!   VAULT_DATA_DIR          - Persistent data directory (default: ./vault-data)
//!   VAULT_API_KEY           - Bootstrap admin key, plaintext (dev only)
//!   VAULT_API_KEY_HASH      - Bootstrap admin key, SHA-256 hex (production)
//!   VAULT_LOG_FORMAT        - "json" for structured logging, "pretty" for dev
//!   VAULT_RATE_LIMIT_RPS    - Requests per second per IP (default: 20)
//!   VAULT_RATE_LIMIT_BURST  - Burst capacity per IP (default: 50)
//!
//! API Key Scopes:
//!   escrow  - the four escrow RPCs (fetch_public_key, get_message_signature,
//!             decrypt_with_private_key, request_decryption_authorization)
//!   admin   - escrow + API key management

use axum::{
    extract::{ConnectInfo, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use subtle::ConstantTimeEq;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use vault_crypto::{AsymmetricAlgo, AsymmetricCipherdict, KeychainUid};
use vault_keystore::{
    Escrow, EscrowAccess, FileBackend, InMemoryBackend, Keystore, KeypairIdentifier, LocalEscrow,
    StorageBackend,
};

// ---------------------------------------------------------------------------
// Scopes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Scope {
    Escrow,
    Admin,
}

impl Scope {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "escrow" => Some(Scope::Escrow),
            "admin" => Some(Scope::Admin),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Scope::Escrow => "escrow",
            Scope::Admin => "admin",
        }
    }
}

fn has_scope(granted: &[Scope], required: &Scope) -> bool {
    granted.contains(&Scope::Admin) || granted.contains(required)
}

fn required_scope(path: &str) -> Option<Scope> {
    if path == "/" || path == "/health" {
        return None;
    }
    if path.starts_with("/api/auth/") {
        return Some(Scope::Admin);
    }
    Some(Scope::Escrow)
}

// ---------------------------------------------------------------------------
// API key store — bearer tokens, hashed at rest, constant-time compared
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiKeyEntry {
    id: String,
    name: String,
    key_hash: String,
    scopes: Vec<Scope>,
    created_at: String,
    active: bool,
    #[serde(default)]
    last_used: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ApiKeyStore {
    keys: Vec<ApiKeyEntry>,
}

impl ApiKeyStore {
    fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                tracing::error!("failed to parse api-keys.json: {e}");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    fn save(&self, path: &str) -> Result<(), String> {
        let data = serde_json::to_string_pretty(self).map_err(|e| format!("serialize: {e}"))?;
        std::fs::write(path, data).map_err(|e| format!("write {path}: {e}"))
    }

    fn authenticate(&self, provided_hash: &[u8; 32]) -> Option<&ApiKeyEntry> {
        let provided_hex = hex::encode(provided_hash);
        self.keys.iter().find(|k| {
            k.active && {
                let stored = k.key_hash.as_bytes();
                let provided = provided_hex.as_bytes();
                stored.len() == provided.len() && stored.ct_eq(provided).into()
            }
        })
    }

    fn touch(&mut self, id: &str) {
        if let Some(entry) = self.keys.iter_mut().find(|k| k.id == id) {
            entry.last_used = Some(chrono::Utc::now().to_rfc3339());
        }
    }
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

struct AppState {
    escrow: LocalEscrow,
    api_keys: RwLock<ApiKeyStore>,
    api_keys_path: String,
    rate_limiter: RateLimiter,
}

type Shared = Arc<AppState>;

// ---------------------------------------------------------------------------
// Rate limiter — token bucket per source IP
// ---------------------------------------------------------------------------

struct RateLimiter {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    rps: f64,
    burst: u32,
}

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    fn new(rps: f64, burst: u32) -> Self {
        Self { buckets: Mutex::new(HashMap::new()), rps, burst }
    }

    async fn check(&self, ip: IpAddr) -> bool {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let bucket = buckets
            .entry(ip)
            .or_insert(TokenBucket { tokens: self.burst as f64, last_refill: now });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rps).min(self.burst as f64);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn cleanup_rate_limiter(limiter: &RateLimiter) {
    let mut buckets = limiter.buckets.lock().await;
    let now = Instant::now();
    buckets.retain(|_, bucket| now.duration_since(bucket.last_refill).as_secs() < 300);
}

// ---------------------------------------------------------------------------
// Crypto utilities
// ---------------------------------------------------------------------------

fn hash_api_key(key: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.finalize().into()
}

fn generate_api_key() -> String {
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).expect("failed to generate random bytes");
    hex::encode(buf)
}

// ---------------------------------------------------------------------------
// Auth + rate-limit middleware
// ---------------------------------------------------------------------------

async fn rate_limit_middleware(
    State(state): State<Shared>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> impl IntoResponse {
    if req.uri().path() == "/health" {
        return next.run(req).await.into_response();
    }
    if !state.rate_limiter.check(addr.ip()).await {
        tracing::warn!(ip = %addr.ip(), "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "1")],
            Json(ApiError { error: "rate limit exceeded".into() }),
        )
            .into_response();
    }
    next.run(req).await.into_response()
}

async fn auth_middleware(
    State(state): State<Shared>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> impl IntoResponse {
    let path = req.uri().path().to_string();
    let Some(required) = required_scope(&path) else {
        return next.run(req).await.into_response();
    };

    let store = state.api_keys.read().await;
    if store.keys.is_empty() {
        return next.run(req).await.into_response();
    }

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let Some(val) = auth_header.filter(|v| v.starts_with("Bearer ")) else {
        drop(store);
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiError { error: "missing Authorization header (use: Bearer <api-key>)".into() }),
        )
            .into_response();
    };

    let provided_hash = hash_api_key(&val[7..]);
    let Some(entry) = store.authenticate(&provided_hash) else {
        drop(store);
        tracing::warn!(ip = %addr.ip(), path = %path, "invalid API key");
        return (StatusCode::UNAUTHORIZED, Json(ApiError { error: "authentication failed".into() }))
            .into_response();
    };

    if !has_scope(&entry.scopes, &required) {
        tracing::warn!(ip = %addr.ip(), key_id = %entry.id, "insufficient scope");
        return (
            StatusCode::FORBIDDEN,
            Json(ApiError {
                error: format!("insufficient scope: requires '{}' permission", required.as_str()),
            }),
        )
            .into_response();
    }

    let key_id = entry.id.clone();
    drop(store);

    let state2 = state.clone();
    tokio::spawn(async move {
        let mut s = state2.api_keys.write().await;
        s.touch(&key_id);
        let _ = s.save(&state2.api_keys_path);
    });

    next.run(req).await.into_response()
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct FetchPublicKeyReq {
    keychain_uid: KeychainUid,
    algo: AsymmetricAlgo,
    #[serde(default)]
    must_exist: bool,
}

#[derive(Deserialize)]
struct GetMessageSignatureReq {
    keychain_uid: KeychainUid,
    algo: AsymmetricAlgo,
    #[serde(with = "serde_bytes")]
    message: Vec<u8>,
}

#[derive(Deserialize)]
struct DecryptWithPrivateKeyReq {
    keychain_uid: KeychainUid,
    cipherdict: AsymmetricCipherdict,
    #[serde(default)]
    passphrases: Vec<String>,
}

#[derive(Deserialize)]
struct RequestDecryptionAuthorizationReq {
    keypair_identifiers: Vec<KeypairIdentifier>,
    request_message: String,
    #[serde(default)]
    passphrases: Vec<String>,
}

#[derive(Deserialize)]
struct CreateApiKeyReq {
    name: String,
    scopes: Vec<String>,
}

#[derive(Serialize, Clone)]
struct ApiError {
    error: String,
}

fn err(msg: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (StatusCode::BAD_REQUEST, Json(ApiError { error: msg.into() }))
}

// ---------------------------------------------------------------------------
// Escrow routes
// ---------------------------------------------------------------------------

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn fetch_public_key(
    State(state): State<Shared>,
    Json(req): Json<FetchPublicKeyReq>,
) -> impl IntoResponse {
    match state.escrow.fetch_public_key(req.keychain_uid, req.algo, req.must_exist).await {
        Ok(pem) => Json(serde_json::json!({"public_key_pem": pem})).into_response(),
        Err(e) => err(e.to_string()).into_response(),
    }
}

async fn get_message_signature(
    State(state): State<Shared>,
    Json(req): Json<GetMessageSignatureReq>,
) -> impl IntoResponse {
    match state
        .escrow
        .get_message_signature(req.keychain_uid, req.algo, &req.message)
        .await
    {
        Ok(sig) => Json(sig).into_response(),
        Err(e) => err(e.to_string()).into_response(),
    }
}

async fn decrypt_with_private_key(
    State(state): State<Shared>,
    Json(req): Json<DecryptWithPrivateKeyReq>,
) -> impl IntoResponse {
    match state
        .escrow
        .decrypt_with_private_key(req.keychain_uid, &req.cipherdict, &req.passphrases)
        .await
    {
        Ok(plaintext) => Json(serde_json::json!({"plaintext": serde_bytes::ByteBuf::from(plaintext)}))
            .into_response(),
        Err(e) => err(e.to_string()).into_response(),
    }
}

async fn request_decryption_authorization(
    State(state): State<Shared>,
    Json(req): Json<RequestDecryptionAuthorizationReq>,
) -> impl IntoResponse {
    match state
        .escrow
        .request_decryption_authorization(&req.keypair_identifiers, &req.request_message, &req.passphrases)
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(e) => err(e.to_string()).into_response(),
    }
}

// ---------------------------------------------------------------------------
// API key management (admin scope)
// ---------------------------------------------------------------------------

async fn create_api_key(State(state): State<Shared>, Json(req): Json<CreateApiKeyReq>) -> impl IntoResponse {
    if req.name.is_empty() || req.name.len() > 100 {
        return err("name must be 1-100 characters").into_response();
    }
    let mut scopes = Vec::new();
    for s in &req.scopes {
        match Scope::from_str(s) {
            Some(scope) => {
                if !scopes.contains(&scope) {
                    scopes.push(scope);
                }
            }
            None => return err(format!("invalid scope '{s}' — valid: escrow, admin")).into_response(),
        }
    }
    if scopes.is_empty() {
        return err("at least one scope required").into_response();
    }

    let plaintext_key = generate_api_key();
    let key_hash = hash_api_key(&plaintext_key);
    let key_id = format!("vk_{}", hex::encode(&key_hash[..8]));

    let entry = ApiKeyEntry {
        id: key_id.clone(),
        name: req.name.clone(),
        key_hash: hex::encode(key_hash),
        scopes: scopes.clone(),
        created_at: chrono::Utc::now().to_rfc3339(),
        active: true,
        last_used: None,
    };

    let mut store = state.api_keys.write().await;
    store.keys.push(entry);
    if let Err(e) = store.save(&state.api_keys_path) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError { error: e })).into_response();
    }
    tracing::info!(key_id = %key_id, name = %req.name, ?scopes, "created API key");

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "key_id": key_id,
            "api_key": plaintext_key,
            "scopes": scopes,
            "warning": "Save this API key now. It cannot be retrieved again."
        })),
    )
        .into_response()
}

async fn revoke_api_key(State(state): State<Shared>, Path(id): Path<String>) -> impl IntoResponse {
    let mut store = state.api_keys.write().await;
    let Some(entry) = store.keys.iter_mut().find(|k| k.id == id) else {
        return err(format!("API key '{id}' not found")).into_response();
    };
    entry.active = false;
    if let Err(e) = store.save(&state.api_keys_path) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError { error: e })).into_response();
    }
    tracing::info!(key_id = %id, "revoked API key");
    Json(serde_json::json!({"status": "revoked"})).into_response()
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

fn resolve_bootstrap_hash() -> Option<[u8; 32]> {
    if let Ok(hex_hash) = std::env::var("VAULT_API_KEY_HASH") {
        let hex_hash = hex_hash.trim();
        if hex_hash.is_empty() {
            return None;
        }
        let mut hash = [0u8; 32];
        hex::decode_to_slice(hex_hash, &mut hash).unwrap_or_else(|e| {
            tracing::error!("VAULT_API_KEY_HASH invalid hex: {e}");
            std::process::exit(1);
        });
        return Some(hash);
    }
    if let Ok(pt) = std::env::var("VAULT_API_KEY") {
        let pt = pt.trim();
        if pt.is_empty() {
            return None;
        }
        tracing::warn!("using VAULT_API_KEY (plaintext) — use VAULT_API_KEY_HASH for production");
        return Some(hash_api_key(pt));
    }
    None
}

fn bootstrap_api_keys(data_dir: &str) -> (ApiKeyStore, String) {
    let path = format!("{data_dir}/api-keys.json");
    let mut store = ApiKeyStore::load(&path);
    if !store.keys.is_empty() {
        return (store, path);
    }
    if let Some(hash_bytes) = resolve_bootstrap_hash() {
        store.keys.push(ApiKeyEntry {
            id: "vk_bootstrap".into(),
            name: "bootstrap-admin".into(),
            key_hash: hex::encode(hash_bytes),
            scopes: vec![Scope::Admin],
            created_at: chrono::Utc::now().to_rfc3339(),
            active: true,
            last_used: None,
        });
        if let Err(e) = store.save(&path) {
            tracing::error!("failed to save bootstrap key: {e}");
        }
        tracing::info!("created bootstrap admin key from environment");
    } else {
        tracing::warn!("no API keys configured — dev mode (all endpoints open)");
    }
    (store, path)
}

#[tokio::main]
async fn main() {
    let log_format = std::env::var("VAULT_LOG_FORMAT").unwrap_or_else(|_| "pretty".into());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vault_api=info,tower_http=info".into());
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).with_target(true).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let port: u16 = std::env::var("VAULT_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3000);
    let data_dir = std::env::var("VAULT_DATA_DIR").unwrap_or_else(|_| "./vault-data".into());
    let rate_rps: f64 = std::env::var("VAULT_RATE_LIMIT_RPS").ok().and_then(|v| v.parse().ok()).unwrap_or(20.0);
    let rate_burst: u32 = std::env::var("VAULT_RATE_LIMIT_BURST").ok().and_then(|v| v.parse().ok()).unwrap_or(50);

    let (api_key_store, api_keys_path) = bootstrap_api_keys(&data_dir);

    let keys_dir = format!("{data_dir}/keys");
    let storage: Arc<dyn StorageBackend> = if std::env::var("VAULT_IN_MEMORY").is_ok() {
        Arc::new(InMemoryBackend::new())
    } else {
        Arc::new(FileBackend::new(keys_dir).expect("failed to init file storage"))
    };
    let keystore = Arc::new(Keystore::new(storage));
    let escrow = LocalEscrow::new(keystore, EscrowAccess::ReadWrite);

    let state: Shared = Arc::new(AppState {
        escrow,
        api_keys: RwLock::new(api_key_store),
        api_keys_path,
        rate_limiter: RateLimiter::new(rate_rps, rate_burst),
    });

    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_rate_limiter(&cleanup_state.rate_limiter).await;
        }
    });

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/escrow/fetch_public_key", post(fetch_public_key))
        .route("/api/escrow/get_message_signature", post(get_message_signature))
        .route("/api/escrow/decrypt_with_private_key", post(decrypt_with_private_key))
        .route(
            "/api/escrow/request_decryption_authorization",
            post(request_decryption_authorization),
        )
        .route("/api/auth/keys", post(create_api_key))
        .route("/api/auth/keys/:id", delete(revoke_api_key))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(cors)
        .with_state(state);

    tracing::info!(port, rate_rps, rate_burst, "starting vault remote escrow server");
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await.unwrap();
}
