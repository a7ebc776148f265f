//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::Config;

pub const CONFIG_FILENAME: &str = "authgate.toml";

/// Load configuration from an explicit path, or search for authgate.toml
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    load_config_from_path(&config_path)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    let content = interpolate_env_vars(&content);
    let config: Config = toml::from_str(&content)?;
    tracing::debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Write a configuration to disk
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Result<PathBuf> {
    let mut current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").expect("literal pattern")
    });

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# authgate configuration

[server]
host = "0.0.0.0"
port = 8080
# cors_origins = ["http://localhost:3000"]

[token]
# "shared_secret" (HS256) or "asymmetric" (RS256 + JWKS)
mode = "shared_secret"
secret = "${AUTH_SECRET_KEY}"
# private_key_path = "./keys/private.pem"
# key_id = "${JWK_KEY_ID:-primary}"
# issuer = "${JWT_ISSUER_CLAIM}"
# audience = "${JWT_AUDIENCE_CLAIM}"
leeway_seconds = 0

# Keys rotated out of signing that must still verify outstanding tokens
# [[token.retired_keys]]
# key_id = "2024-01"
# public_key_path = "./keys/2024-01.pub.pem"

[sessions]
backend = "memory"  # or "redis"
redis_url = "${REDIS_URL:-redis://127.0.0.1:6379}"
accept_legacy_sessions = true

[users]
backend = "static"  # or "postgres"
# postgres = "host=localhost user=postgres password=postgres dbname=app"

# [[users.accounts]]
# id = 1
# name = "Admin"
# email = "admin@example.com"
# password_hash = "$2b$12$..."  # authgate hash-password
# role = 1
# subscription_status = "ACTIVE"

[gateway]
trust_userinfo_header = false
userinfo_header = "X-Apigateway-Api-Userinfo"

[policy]
reveal_unknown_users = false
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SessionBackend, SigningModeKind};

    #[test]
    fn test_env_interpolation() {
        env::set_var("AUTHGATE_TEST_VAR", "hello");
        let content = "value = \"${AUTHGATE_TEST_VAR}\"";
        let result = interpolate_env_vars(content);
        assert_eq!(result, "value = \"hello\"");
        env::remove_var("AUTHGATE_TEST_VAR");
    }

    #[test]
    fn test_env_interpolation_with_default() {
        let content = "value = \"${NONEXISTENT_VAR:-default_value}\"";
        let result = interpolate_env_vars(content);
        assert_eq!(result, "value = \"default_value\"");
    }

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&interpolate_env_vars(default_config_content()))
            .expect("default config should parse");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.token.mode, SigningModeKind::SharedSecret);
        assert_eq!(config.sessions.backend, SessionBackend::Memory);
        assert!(config.sessions.accept_legacy_sessions);
        assert!(!config.gateway.trust_userinfo_header);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);

        let mut config = Config::default();
        config.server.port = 9999;
        config.token.key_id = Some("k1".to_string());
        save_config(&config, &path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 9999);
        assert_eq!(loaded.token.key_id.as_deref(), Some("k1"));
    }

    #[test]
    fn test_missing_file_is_config_not_found() {
        let result = load_config_from_path(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(Error::ConfigNotFound)));
    }
}
