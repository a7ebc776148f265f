//! RSA key material and the published JSON Web Key Set

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, LineEnding};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const RSA_KEY_BITS: usize = 2048;

/// One entry of a JWKS document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kty: String,
    pub kid: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub n: String,
    pub e: String,
}

impl JsonWebKey {
    /// Describe an RSA public key used for RS256 signatures
    pub fn rs256(key_id: &str, public_key: &RsaPublicKey) -> Self {
        Self {
            kty: "RSA".to_string(),
            kid: key_id.to_string(),
            alg: "RS256".to_string(),
            key_use: "sig".to_string(),
            n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

impl JsonWebKeySet {
    pub fn find(&self, key_id: &str) -> Option<&JsonWebKey> {
        self.keys.iter().find(|key| key.kid == key_id)
    }
}

/// Parse a private key in PKCS#1 or PKCS#8 PEM form
pub fn parse_private_key(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| Error::KeyMaterial(format!("failed to parse RSA private key: {}", e)))
}

/// Parse a public key in SPKI or PKCS#1 PEM form
pub fn parse_public_key(pem: &str) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| Error::KeyMaterial(format!("failed to parse RSA public key: {}", e)))
}

/// A freshly generated signing key
pub struct GeneratedKey {
    pub private_pem: String,
    pub public_pem: String,
    pub jwk: JsonWebKey,
}

/// Generate a new RSA key pair for token signing
pub fn generate_signing_key(key_id: &str) -> Result<GeneratedKey> {
    let mut rng = rsa::rand_core::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
        .map_err(|e| Error::KeyMaterial(format!("failed to generate RSA key: {}", e)))?;
    let public_key = private_key.to_public_key();

    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .map(|pem| String::from(pem.as_str()))
        .map_err(|e| Error::KeyMaterial(format!("failed to encode private key: {}", e)))?;
    let public_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| Error::KeyMaterial(format!("failed to encode public key: {}", e)))?;

    Ok(GeneratedKey {
        private_pem,
        public_pem,
        jwk: JsonWebKey::rs256(key_id, &public_key),
    })
}
