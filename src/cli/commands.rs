//! CLI command implementations

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::auth::keys::{self, JsonWebKeySet};
use crate::auth::password::hash_password as bcrypt_hash;
use crate::auth::{SystemClock, TokenService};
use crate::cli::{error, format_mode, info, success, warn};
use crate::config::{self, loader::CONFIG_FILENAME, Config, SigningModeKind};

/// Initialize a new authgate.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = Path::new(CONFIG_FILENAME);

    if config_path.exists() {
        warn(&format!("{} already exists", CONFIG_FILENAME));
        return Ok(());
    }

    fs::write(config_path, config::loader::default_config_content())?;

    success(&format!("Created {}", CONFIG_FILENAME));
    info("Set token.secret (or generate a key with 'authgate keygen') and run 'authgate serve'");

    Ok(())
}

/// Start the HTTP API server
pub async fn serve(config_path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info(&format!(
        "Signing mode: {}",
        format_mode(config.token.mode == SigningModeKind::Asymmetric)
    ));
    info(&format!("Starting server at http://{}:{}", host, port));

    if let Err(e) = crate::api::run_server(config, &host, port).await {
        error(&format!("Server failed: {}", e));
        return Err(e.into());
    }
    Ok(())
}

/// Generate a signing key pair
pub async fn keygen(out_dir: &Path, key_id: &str, force: bool) -> Result<()> {
    let private_path = out_dir.join("private.pem");
    let public_path = out_dir.join("public.pem");
    let jwks_path = out_dir.join("jwks.json");

    if let Some(existing) = [&private_path, &public_path, &jwks_path]
        .into_iter()
        .find(|path| path.exists())
    {
        if !force {
            warn(&format!(
                "{} already exists (use --force to overwrite)",
                existing.display()
            ));
            return Ok(());
        }
    }

    info(&format!("Generating {}-bit RSA key '{}'", keys::RSA_KEY_BITS, key_id));
    let key_id_owned = key_id.to_string();
    let generated = tokio::task::spawn_blocking(move || keys::generate_signing_key(&key_id_owned))
        .await
        .context("key generation task failed")??;

    fs::create_dir_all(out_dir)?;
    fs::write(&private_path, &generated.private_pem)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&private_path, fs::Permissions::from_mode(0o600))?;
    }
    fs::write(&public_path, &generated.public_pem)?;

    let key_set = JsonWebKeySet {
        keys: vec![generated.jwk],
    };
    fs::write(&jwks_path, serde_json::to_string_pretty(&key_set)?)?;

    success(&format!("Wrote {}", private_path.display()));
    success(&format!("Wrote {}", public_path.display()));
    success(&format!("Wrote {}", jwks_path.display()));
    info(&format!(
        "Set token.mode = \"asymmetric\", token.private_key_path = \"{}\" and token.key_id = \"{}\"",
        private_path.display(),
        key_id
    ));
    info(&format!(
        "When rotating, list {} under token.retired_keys with key_id \"{}\"",
        public_path.display(),
        key_id
    ));

    Ok(())
}

/// Print the JWKS document of the configured deployment
pub async fn jwks(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let tokens = TokenService::from_config(&config.token, Arc::new(SystemClock))?;

    match tokens.key_set() {
        Some(key_set) => println!("{}", serde_json::to_string_pretty(key_set)?),
        None => warn("Shared-secret mode publishes no keys"),
    }
    Ok(())
}

/// Hash a password with bcrypt
pub async fn hash_password(password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }

    let hash = tokio::task::spawn_blocking(move || bcrypt_hash(&password))
        .await
        .context("hashing task failed")??;
    println!("{}", hash);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    config::load_config(path).map_err(|e| {
        error(&format!("Failed to load config: {}", e));
        e.into()
    })
}
