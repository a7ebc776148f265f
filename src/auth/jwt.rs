//! JWT token handling
//!
//! Tokens carry the subject id and the session id of one login. Signing is
//! either HS256 with a shared secret or RS256 with a private key whose public
//! half is published as a JWKS document, never both in the same deployment.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clock::Clock;
use super::error::AuthError;
use super::keys::{self, JsonWebKey, JsonWebKeySet};
use crate::config::{SigningModeKind, TokenConfig};
use crate::error::{Error, Result};

/// Lifetime of a token and of the session record behind it
pub const SESSION_LIFETIME_HOURS: i64 = 24;

/// Shortest accepted HS256 secret
pub const MIN_SECRET_LEN: usize = 32;

pub fn session_lifetime() -> Duration {
    Duration::hours(SESSION_LIFETIME_HOURS)
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "subjectId")]
    pub subject_id: i64,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    /// Issued at
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

/// A freshly signed token plus what the caller needs to persist its session
#[derive(Clone)]
pub struct IssuedToken {
    pub token: String,
    pub session_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    pub fn remaining_lifetime(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"<redacted>")
            .field("session_id", &self.session_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

enum SigningKeys {
    Shared {
        encoding: EncodingKey,
        decoding: DecodingKey,
    },
    Asymmetric {
        key_id: String,
        encoding: EncodingKey,
        decoding: HashMap<String, DecodingKey>,
        key_set: JsonWebKeySet,
    },
}

/// Issues and verifies session tokens
pub struct TokenService {
    keys: SigningKeys,
    issuer: Option<String>,
    audience: Option<String>,
    leeway: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// HS256 signing with a shared secret
    pub fn shared_secret(secret: &[u8], clock: Arc<dyn Clock>) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::Config(format!(
                "token secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self {
            keys: SigningKeys::Shared {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
            },
            issuer: None,
            audience: None,
            leeway: Duration::zero(),
            clock,
        })
    }

    /// RS256 signing with `private_key_pem`; `retired` holds `(key id, public
    /// key PEM)` pairs that still verify but no longer sign
    pub fn asymmetric(
        private_key_pem: &str,
        key_id: &str,
        retired: &[(String, String)],
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if key_id.is_empty() {
            return Err(Error::Config("asymmetric signing requires a key_id".to_string()));
        }

        let private_key = keys::parse_private_key(private_key_pem)?;
        let encoding = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| Error::KeyMaterial(format!("unusable signing key: {}", e)))?;

        let mut published = vec![JsonWebKey::rs256(key_id, &private_key.to_public_key())];
        for (retired_id, public_pem) in retired {
            if published.iter().any(|key| &key.kid == retired_id) {
                return Err(Error::Config(format!("duplicate key id '{}'", retired_id)));
            }
            let public_key = keys::parse_public_key(public_pem)?;
            published.push(JsonWebKey::rs256(retired_id, &public_key));
        }

        let mut decoding = HashMap::new();
        for jwk in &published {
            let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
                .map_err(|e| Error::KeyMaterial(format!("unusable key '{}': {}", jwk.kid, e)))?;
            decoding.insert(jwk.kid.clone(), key);
        }

        Ok(Self {
            keys: SigningKeys::Asymmetric {
                key_id: key_id.to_string(),
                encoding,
                decoding,
                key_set: JsonWebKeySet { keys: published },
            },
            issuer: None,
            audience: None,
            leeway: Duration::zero(),
            clock,
        })
    }

    /// Build from configuration, reading key files from disk
    pub fn from_config(config: &TokenConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let service = match config.mode {
            SigningModeKind::SharedSecret => {
                let secret = config.secret.as_deref().unwrap_or_default();
                Self::shared_secret(secret.as_bytes(), clock)?
            }
            SigningModeKind::Asymmetric => {
                let path = config.private_key_path.as_ref().ok_or_else(|| {
                    Error::Config("asymmetric signing requires private_key_path".to_string())
                })?;
                let private_pem = fs::read_to_string(path)?;

                let mut retired = Vec::with_capacity(config.retired_keys.len());
                for key in &config.retired_keys {
                    retired.push((key.key_id.clone(), fs::read_to_string(&key.public_key_path)?));
                }

                let key_id = config.key_id.as_deref().unwrap_or_default();
                Self::asymmetric(&private_pem, key_id, &retired, clock)?
            }
        };

        Ok(service
            .with_issuer(config.issuer.clone())
            .with_audience(config.audience.clone())
            .with_leeway(Duration::seconds(config.leeway_seconds as i64)))
    }

    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer.filter(|s| !s.is_empty());
        self
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience.filter(|s| !s.is_empty());
        self
    }

    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        match self.keys {
            SigningKeys::Shared { .. } => Algorithm::HS256,
            SigningKeys::Asymmetric { .. } => Algorithm::RS256,
        }
    }

    /// Published public keys; `None` in shared-secret mode
    pub fn key_set(&self) -> Option<&JsonWebKeySet> {
        match &self.keys {
            SigningKeys::Shared { .. } => None,
            SigningKeys::Asymmetric { key_set, .. } => Some(key_set),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Sign a token for a new session of `subject_id`
    pub fn issue(&self, subject_id: i64) -> std::result::Result<IssuedToken, AuthError> {
        let issued_at = self.clock.now();
        let expires_at = issued_at + session_lifetime();
        let session_id = Uuid::new_v4().to_string();

        let claims = Claims {
            subject_id,
            session_id: session_id.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: Some(subject_id.to_string()),
        };

        let (header, key) = match &self.keys {
            SigningKeys::Shared { encoding, .. } => (Header::new(Algorithm::HS256), encoding),
            SigningKeys::Asymmetric {
                key_id, encoding, ..
            } => {
                let mut header = Header::new(Algorithm::RS256);
                header.kid = Some(key_id.clone());
                (header, encoding)
            }
        };

        let token = encode(&header, &claims, key)
            .map_err(|e| AuthError::Internal(format!("failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            session_id,
            issued_at: DateTime::from_timestamp(claims.iat, 0).unwrap_or(issued_at),
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or(expires_at),
        })
    }

    /// Check signature, then expiry
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, AuthError> {
        let header = decode_header(token).map_err(map_jwt_error)?;
        if header.alg != self.algorithm() {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let key = match &self.keys {
            SigningKeys::Shared { decoding, .. } => decoding,
            SigningKeys::Asymmetric {
                key_id, decoding, ..
            } => {
                let kid = header.kid.as_deref().unwrap_or(key_id);
                decoding
                    .get(kid)
                    .ok_or_else(|| AuthError::InvalidToken(format!("unknown key id '{}'", kid)))?
            }
        };

        // The header already decoded, so a base64 failure here is in the signature segment
        let claims = decode::<Claims>(token, key, &self.validation())
            .map_err(|e| match e.kind() {
                ErrorKind::Base64(_) => AuthError::InvalidSignature,
                _ => map_jwt_error(e),
            })?
            .claims;

        // Expiry is checked against the injected clock rather than by jsonwebtoken
        let now = self.clock.now().timestamp();
        let leeway = self.leeway.num_seconds();
        if claims.iat > now + leeway {
            return Err(AuthError::InvalidToken("token used before issue time".to_string()));
        }
        if now > claims.exp + leeway {
            return Err(AuthError::ExpiredToken);
        }

        Ok(claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm());
        validation.validate_exp = false;
        validation.leeway = 0;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken(err.to_string()),
    }
}
