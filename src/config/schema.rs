//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::auth::models::{Role, SubscriptionStatus};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub token: TokenConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,

    #[serde(default)]
    pub users: UsersConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Server configuration for the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. Empty means permissive.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Which key type signs tokens for this deployment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SigningModeKind {
    /// HS256 with a shared secret
    #[default]
    SharedSecret,
    /// RS256 with a private key, public keys published as JWKS
    Asymmetric,
}

/// Token signing and validation settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenConfig {
    #[serde(default)]
    pub mode: SigningModeKind,

    /// Shared secret for `shared_secret` mode
    #[serde(default)]
    pub secret: Option<String>,

    /// PEM encoded RSA private key for `asymmetric` mode
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    /// `kid` header of tokens signed with the active key
    #[serde(default)]
    pub key_id: Option<String>,

    /// Public keys that are no longer used for signing but still verify
    #[serde(default)]
    pub retired_keys: Vec<RetiredKeyConfig>,

    #[serde(default)]
    pub issuer: Option<String>,

    #[serde(default)]
    pub audience: Option<String>,

    /// Clock skew tolerated when checking `iat` and `exp`
    #[serde(default)]
    pub leeway_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetiredKeyConfig {
    pub key_id: String,
    pub public_key_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Memory,
    Redis,
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default)]
    pub backend: SessionBackend,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Honour sessions written as a bare subject id by older deployments
    #[serde(default = "default_accept_legacy")]
    pub accept_legacy_sessions: bool,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_accept_legacy() -> bool {
    true
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            redis_url: default_redis_url(),
            accept_legacy_sessions: default_accept_legacy(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserBackend {
    #[default]
    Static,
    Postgres,
}

/// Where user accounts are looked up
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UsersConfig {
    #[serde(default)]
    pub backend: UserBackend,

    /// tokio-postgres connection string for the `postgres` backend
    #[serde(default)]
    pub postgres: Option<String>,

    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// A statically configured account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// bcrypt hash, see `authgate hash-password`
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
}

/// Upstream API gateway integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Trust an identity assertion forwarded by the gateway instead of
    /// verifying the bearer token locally
    #[serde(default)]
    pub trust_userinfo_header: bool,

    #[serde(default = "default_userinfo_header")]
    pub userinfo_header: String,
}

fn default_userinfo_header() -> String {
    "X-Apigateway-Api-Userinfo".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            trust_userinfo_header: false,
            userinfo_header: default_userinfo_header(),
        }
    }
}

/// Login response policy
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PolicyConfig {
    /// Answer 404 for unknown usernames instead of a generic 401
    #[serde(default)]
    pub reveal_unknown_users: bool,
}
