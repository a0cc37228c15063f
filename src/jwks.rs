// ABOUTME: JWKS (JSON Web Key Set) management for asymmetric token signing
// ABOUTME: RSA key generation, rotation with historical-key retention, and public key export
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

//! # JWKS Management
//!
//! Access and ID tokens are RS256-signed. Private keys never leave the
//! process; public keys are published through the JWKS document. Rotation
//! keeps a window of historical keys so tokens signed with a previous key
//! keep verifying until they expire.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::{
    pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey},
    RsaPrivateKey, RsaPublicKey,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// RSA key size in bits for RS256 signing keys
const RSA_KEY_SIZE: usize = 4096;

/// Age at which the active key should be rotated
const KEY_ROTATION_DAYS: i64 = 90;

/// Historical keys retained for validating older tokens
const MAX_HISTORICAL_KEYS: usize = 3;

/// JWK (JSON Web Key) representation for the JWKS document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type (always "RSA")
    pub kty: String,
    /// Public key use (always "sig")
    #[serde(rename = "use")]
    pub key_use: String,
    /// Key ID for rotation tracking
    pub kid: String,
    /// Algorithm (RS256)
    pub alg: String,
    /// RSA modulus (base64url encoded)
    pub n: String,
    /// RSA exponent (base64url encoded)
    pub e: String,
}

/// JWKS (JSON Web Key Set) container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// Array of public keys
    pub keys: Vec<JsonWebKey>,
}

/// RSA key pair with rotation metadata
#[derive(Clone)]
pub struct RsaKeyPair {
    /// Unique key identifier
    pub kid: String,
    /// Private key for signing
    pub private_key: RsaPrivateKey,
    /// Public key for verification
    pub public_key: RsaPublicKey,
    /// Key creation timestamp
    pub created_at: DateTime<Utc>,
    /// Whether this is the currently active signing key
    pub is_active: bool,
}

impl RsaKeyPair {
    /// Generate a new key pair at the production key size
    ///
    /// # Errors
    /// Returns an error if key generation fails
    pub fn generate(kid: &str) -> Result<Self> {
        Self::generate_with_key_size(kid, RSA_KEY_SIZE)
    }

    /// Generate a key pair with a configurable size.
    ///
    /// 2048 bits keeps test suites fast; production uses [`RSA_KEY_SIZE`].
    ///
    /// # Errors
    /// Returns an error if key generation fails
    pub fn generate_with_key_size(kid: &str, key_size_bits: usize) -> Result<Self> {
        use rand::rngs::OsRng;

        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, key_size_bits)
            .map_err(|e| anyhow!("Failed to generate RSA private key: {e}"))?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok(Self {
            kid: kid.to_string(),
            private_key,
            public_key,
            created_at: Utc::now(),
            is_active: true,
        })
    }

    /// Convert the public key to JWK format
    ///
    /// # Errors
    /// Returns an error if key serialization fails
    pub fn to_jwk(&self) -> Result<JsonWebKey> {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rsa::traits::PublicKeyParts;

        let n_bytes = self.public_key.n().to_bytes_be();
        let e_bytes = self.public_key.e().to_bytes_be();

        Ok(JsonWebKey {
            kty: "RSA".to_string(),
            key_use: "sig".to_string(),
            kid: self.kid.clone(),
            alg: "RS256".to_string(),
            n: URL_SAFE_NO_PAD.encode(&n_bytes),
            e: URL_SAFE_NO_PAD.encode(&e_bytes),
        })
    }

    /// Export the private key as PKCS#8 PEM
    ///
    /// # Errors
    /// Returns an error if PEM encoding fails
    pub fn export_private_key_pem(&self) -> Result<String> {
        self.private_key
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| anyhow!("Failed to export private key as PEM: {e}"))
    }

    /// Export the public key as PEM
    ///
    /// # Errors
    /// Returns an error if PEM encoding fails
    pub fn export_public_key_pem(&self) -> Result<String> {
        self.public_key
            .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| anyhow!("Failed to export public key as PEM: {e}"))
    }

    /// Import a private key from PKCS#8 PEM. Imported keys start inactive.
    ///
    /// # Errors
    /// Returns an error if PEM parsing fails
    pub fn import_private_key_pem(kid: &str, pem: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| anyhow!("Failed to parse private key PEM: {e}"))?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok(Self {
            kid: kid.to_string(),
            private_key,
            public_key,
            created_at: Utc::now(),
            is_active: false,
        })
    }

    /// Get the JWT encoding key for signing
    ///
    /// # Panics
    /// Panics if PEM export fails, which cannot happen for a valid RSA key
    #[must_use]
    pub fn encoding_key(&self) -> EncodingKey {
        let pem = self
            .export_private_key_pem()
            .expect("Failed to export private key");
        EncodingKey::from_rsa_pem(pem.as_bytes()).expect("Failed to create encoding key")
    }

    /// Get the JWT decoding key for verification
    ///
    /// # Panics
    /// Panics if PEM export fails, which cannot happen for a valid RSA key
    #[must_use]
    pub fn decoding_key(&self) -> DecodingKey {
        let pem = self
            .export_public_key_pem()
            .expect("Failed to export public key");
        DecodingKey::from_rsa_pem(pem.as_bytes()).expect("Failed to create decoding key")
    }
}

/// Key lifecycle manager backing the JWKS document
pub struct JwksManager {
    /// All keys, active and historical
    keys: HashMap<String, RsaKeyPair>,
    /// Currently active key ID for signing
    active_key_id: Option<String>,
}

impl JwksManager {
    /// Create a manager with no keys
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
            active_key_id: None,
        }
    }

    /// Generate and activate a new key pair at the production key size
    ///
    /// # Errors
    /// Returns an error if key generation fails
    pub fn generate_rsa_key_pair(&mut self, kid: &str) -> Result<()> {
        self.generate_rsa_key_pair_with_size(kid, RSA_KEY_SIZE)
    }

    /// Generate and activate a new key pair with a configurable size
    ///
    /// # Errors
    /// Returns an error if key generation fails
    pub fn generate_rsa_key_pair_with_size(
        &mut self,
        kid: &str,
        key_size_bits: usize,
    ) -> Result<()> {
        let key_pair = RsaKeyPair::generate_with_key_size(kid, key_size_bits)?;

        if let Some(prev_active_kid) = &self.active_key_id {
            if let Some(prev_key) = self.keys.get_mut(prev_active_kid) {
                prev_key.is_active = false;
            }
        }

        self.active_key_id = Some(kid.to_string());
        self.keys.insert(kid.to_string(), key_pair);

        tracing::info!(kid = %kid, "Activated new RS256 signing key");
        Ok(())
    }

    /// Get the active signing key
    ///
    /// # Errors
    /// Returns an error if no active key exists
    pub fn get_active_key(&self) -> Result<&RsaKeyPair> {
        let kid = self
            .active_key_id
            .as_ref()
            .ok_or_else(|| anyhow!("No active signing key"))?;

        self.keys
            .get(kid)
            .ok_or_else(|| anyhow!("Active key not found: {kid}"))
    }

    /// Get a key by ID (used during token verification)
    #[must_use]
    pub fn get_key(&self, kid: &str) -> Option<&RsaKeyPair> {
        self.keys.get(kid)
    }

    /// Get the JWKS document listing every retained public key
    ///
    /// # Errors
    /// Returns an error if JWK conversion fails
    pub fn get_jwks(&self) -> Result<JsonWebKeySet> {
        let mut keys = Vec::with_capacity(self.keys.len());
        for key_pair in self.keys.values() {
            keys.push(key_pair.to_jwk()?);
        }
        Ok(JsonWebKeySet { keys })
    }

    /// Serialize the JWKS document to JSON
    ///
    /// # Errors
    /// Returns an error if serialization fails
    pub fn get_jwks_json(&self) -> Result<String> {
        let jwks = self.get_jwks()?;
        serde_json::to_string_pretty(&jwks).map_err(|e| anyhow!("Failed to serialize JWKS: {e}"))
    }

    /// Rotate keys: generate and activate a fresh key, retaining old keys
    /// within the historical window so outstanding tokens keep verifying.
    ///
    /// # Errors
    /// Returns an error if key generation fails
    pub fn rotate_keys(&mut self) -> Result<String> {
        self.rotate_keys_with_size(RSA_KEY_SIZE)
    }

    /// Rotate keys with a configurable key size
    ///
    /// # Errors
    /// Returns an error if key generation fails
    pub fn rotate_keys_with_size(&mut self, key_size_bits: usize) -> Result<String> {
        let new_kid = format!("key_{}", Utc::now().format("%Y%m%d_%H%M%S"));
        self.generate_rsa_key_pair_with_size(&new_kid, key_size_bits)?;
        self.cleanup_old_keys();
        Ok(new_kid)
    }

    /// Remove keys beyond the retention limit, oldest first
    fn cleanup_old_keys(&mut self) {
        if self.keys.len() <= MAX_HISTORICAL_KEYS {
            return;
        }

        // kid as tiebreaker keeps ordering deterministic on coarse clocks
        let mut sorted_keys: Vec<_> = self
            .keys
            .iter()
            .map(|(kid, key)| (kid.clone(), key.created_at))
            .collect();
        sorted_keys.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let to_remove = sorted_keys.len() - MAX_HISTORICAL_KEYS;
        for (kid, _) in sorted_keys.iter().take(to_remove) {
            if Some(kid) != self.active_key_id.as_ref() {
                self.keys.remove(kid);
            }
        }
    }

    /// Whether the active key has aged past the rotation interval
    #[must_use]
    pub fn should_rotate_keys(&self) -> bool {
        if let Some(active_kid) = &self.active_key_id {
            if let Some(active_key) = self.keys.get(active_kid) {
                let age = Utc::now() - active_key.created_at;
                return age.num_days() >= KEY_ROTATION_DAYS;
            }
        }
        true // Rotate if no active key
    }
}

impl Default for JwksManager {
    fn default() -> Self {
        Self::new()
    }
}
