// ABOUTME: OAuth 2.0 dynamic client registration (RFC 7591) and client credential validation
// ABOUTME: Handles redirect URI vetting, Argon2 secret hashing, and static provisioning
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

use super::models::{
    ClientRegistrationRequest, ClientRegistrationResponse, OAuth2Error, OAuthClient,
};
use crate::constants::{limits, oauth};
use crate::errors::{AppError, AppResult};
use crate::store::CredentialStore;
use crate::tiers;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;
use uuid::Uuid;

/// Parameters for statically provisioning a first-party client
pub struct ProvisionClientParams {
    /// Display name
    pub client_name: String,
    /// Redirect URIs (exact-match at authorization time)
    pub redirect_uris: Vec<String>,
    /// Scopes the client may be granted
    pub allowed_scopes: Vec<String>,
    /// Grant types the client may use
    pub grant_types: Vec<String>,
    /// Response types the client may use
    pub response_types: Vec<String>,
    /// Trust tier of the client (0-5)
    pub tier_level: u8,
    /// Whether the client is trusted first-party
    pub trusted: bool,
}

/// OAuth 2.0 Client Registration Manager
pub struct ClientRegistrationManager {
    store: Arc<dyn CredentialStore>,
}

impl ClientRegistrationManager {
    /// Creates a new client registration manager
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Register a new OAuth 2.0 client (RFC 7591).
    ///
    /// Dynamically registered clients start at tier 0 and untrusted; their
    /// allowed scopes are the requested scopes filtered to the supported
    /// set, defaulting to the tier-0 scope set when no scope is requested.
    ///
    /// # Errors
    /// Returns an error if registration validation fails or storage fails
    pub async fn register_client(
        &self,
        request: ClientRegistrationRequest,
    ) -> Result<ClientRegistrationResponse, OAuth2Error> {
        Self::validate_registration_request(&request)?;

        let client_id = Self::generate_client_id();
        let client_secret = Self::generate_client_secret()?;
        let client_secret_hash = Self::hash_client_secret(&client_secret)?;

        // Conservative defaults per RFC 8252 best practices: clients must
        // explicitly request anything beyond the code flow
        let grant_types = request
            .grant_types
            .unwrap_or_else(|| vec!["authorization_code".to_owned()]);
        let response_types = request
            .response_types
            .unwrap_or_else(|| vec!["code".to_owned()]);

        let allowed_scopes = request.scope.as_deref().map_or_else(
            || {
                tiers::scopes_for_tier(0)
                    .into_iter()
                    .map(std::string::ToString::to_string)
                    .collect::<Vec<_>>()
            },
            |scope| {
                tiers::parse_scope_param(scope)
                    .into_iter()
                    .filter(|s| oauth::SUPPORTED_SCOPES.contains(&s.as_str()))
                    .collect()
            },
        );

        let created_at = Utc::now();
        let expires_at = Some(created_at + Duration::days(limits::CLIENT_REGISTRATION_EXPIRY_DAYS));

        let client = OAuthClient {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.clone(),
            client_secret_hash,
            client_name: request.client_name.clone(),
            redirect_uris: request.redirect_uris.clone(),
            allowed_scopes: allowed_scopes.clone(),
            grant_types: grant_types.clone(),
            response_types: response_types.clone(),
            tier_level: 0,
            trusted: false,
            created_at,
            expires_at,
        };

        self.store.store_client(&client).await.map_err(|e| {
            tracing::error!(error = %e, client_id = %client_id, "Failed to store client registration");
            OAuth2Error::server_error("Failed to store client registration")
        })?;

        tracing::info!(client_id = %client_id, "Registered OAuth2 client");

        Ok(ClientRegistrationResponse {
            client_id,
            client_secret,
            client_id_issued_at: Some(created_at.timestamp()),
            client_secret_expires_at: expires_at.map(|dt| dt.timestamp()),
            redirect_uris: request.redirect_uris,
            grant_types,
            response_types,
            client_name: request.client_name,
            client_uri: request.client_uri,
            scope: Some(tiers::join_scopes(&allowed_scopes)),
        })
    }

    /// Statically provision a client with explicit tier, scopes, and trust.
    ///
    /// Provisioned clients never expire. Returns the client record together
    /// with the plaintext secret, which is not recoverable afterwards.
    ///
    /// # Errors
    /// Returns an error if secret generation, hashing, or storage fails
    pub async fn provision_client(
        &self,
        params: ProvisionClientParams,
    ) -> Result<(OAuthClient, String), OAuth2Error> {
        let client_id = Self::generate_client_id();
        let client_secret = Self::generate_client_secret()?;
        let client_secret_hash = Self::hash_client_secret(&client_secret)?;

        let client = OAuthClient {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.clone(),
            client_secret_hash,
            client_name: Some(params.client_name),
            redirect_uris: params.redirect_uris,
            allowed_scopes: params.allowed_scopes,
            grant_types: params.grant_types,
            response_types: params.response_types,
            tier_level: params.tier_level,
            trusted: params.trusted,
            created_at: Utc::now(),
            expires_at: None,
        };

        self.store.store_client(&client).await.map_err(|e| {
            tracing::error!(error = %e, client_id = %client_id, "Failed to store provisioned client");
            OAuth2Error::server_error("Failed to store provisioned client")
        })?;

        tracing::info!(client_id = %client_id, tier = client.tier_level, "Provisioned OAuth2 client");
        Ok((client, client_secret))
    }

    /// Validate client credentials.
    ///
    /// # Errors
    /// Returns `invalid_client` when the client is unknown, the secret does
    /// not match, or the registration has expired
    pub async fn validate_client(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<OAuthClient, OAuth2Error> {
        tracing::debug!(client_id = %client_id, "Validating OAuth client");

        let client = self.get_client(client_id).await.map_err(|e| {
            tracing::warn!(client_id = %client_id, error = %e, "OAuth client not found");
            OAuth2Error::invalid_client()
        })?;

        Self::verify_client_secret(client_id, client_secret, &client.client_secret_hash)?;
        Self::check_client_expiry(client_id, client.expires_at)?;

        Ok(client)
    }

    /// Get a client by `client_id`
    ///
    /// # Errors
    /// Returns an error if the client is not found
    pub async fn get_client(&self, client_id: &str) -> AppResult<OAuthClient> {
        self.store
            .get_client(client_id)
            .await?
            .ok_or_else(|| AppError::not_found("OAuth2 client"))
    }

    /// Verify a client secret against its Argon2 hash
    fn verify_client_secret(
        client_id: &str,
        client_secret: &str,
        client_secret_hash: &str,
    ) -> Result<(), OAuth2Error> {
        let parsed_hash = PasswordHash::new(client_secret_hash).map_err(|e| {
            tracing::error!(client_id = %client_id, error = %e, "Failed to parse stored secret hash");
            OAuth2Error::invalid_client()
        })?;

        if Argon2::default()
            .verify_password(client_secret.as_bytes(), &parsed_hash)
            .is_err()
        {
            tracing::warn!(client_id = %client_id, "Client secret validation failed");
            return Err(OAuth2Error::invalid_client());
        }

        Ok(())
    }

    /// Reject clients whose registration has lapsed
    fn check_client_expiry(
        client_id: &str,
        expires_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<(), OAuth2Error> {
        if let Some(expires_at) = expires_at {
            if Utc::now() > expires_at {
                tracing::warn!(client_id = %client_id, "OAuth client registration expired");
                return Err(OAuth2Error::invalid_client());
            }
        }
        Ok(())
    }

    /// Validate a registration request
    fn validate_registration_request(
        request: &ClientRegistrationRequest,
    ) -> Result<(), OAuth2Error> {
        if request.redirect_uris.is_empty() {
            return Err(OAuth2Error::invalid_request(
                "At least one redirect_uri is required",
            ));
        }

        for uri in &request.redirect_uris {
            if !Self::is_valid_redirect_uri(uri) {
                return Err(OAuth2Error::invalid_request(&format!(
                    "Invalid redirect_uri: {uri}"
                )));
            }
        }

        if let Some(ref grant_types) = request.grant_types {
            for grant_type in grant_types {
                if !oauth::SUPPORTED_GRANT_TYPES.contains(&grant_type.as_str()) {
                    return Err(OAuth2Error::invalid_request(&format!(
                        "Unsupported grant_type: {grant_type}"
                    )));
                }
            }
        }

        if let Some(ref response_types) = request.response_types {
            for response_type in response_types {
                if !oauth::SUPPORTED_RESPONSE_TYPES.contains(&response_type.as_str()) {
                    return Err(OAuth2Error::invalid_request(&format!(
                        "Unsupported response_type: {response_type}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Check if a redirect URI is acceptable.
    ///
    /// RFC 6749 Section 3.1.2.2: absolute URI, no fragment. Wildcards are
    /// rejected to close subdomain-bypass attacks. HTTPS is required except
    /// for loopback addresses; the out-of-band URN for native apps
    /// (RFC 8252) is allowed.
    fn is_valid_redirect_uri(uri: &str) -> bool {
        if uri.trim().is_empty() {
            return false;
        }

        if uri.contains('#') {
            tracing::warn!(uri = %uri, "Rejected redirect_uri with fragment");
            return false;
        }

        if uri.contains('*') {
            tracing::warn!(uri = %uri, "Rejected redirect_uri with wildcard");
            return false;
        }

        if uri == "urn:ietf:wg:oauth:2.0:oob" {
            return true;
        }

        Self::validate_http_uri(uri)
    }

    /// Validate scheme and host of an HTTP(S) redirect URI
    fn validate_http_uri(uri: &str) -> bool {
        let Ok(parsed_uri) = url::Url::parse(uri) else {
            tracing::warn!(uri = %uri, "Rejected malformed redirect_uri");
            return false;
        };

        let scheme = parsed_uri.scheme();
        let is_loopback = parsed_uri.host_str() == Some("localhost")
            || parsed_uri.host_str() == Some("127.0.0.1");

        if scheme == "https" || (scheme == "http" && is_loopback) {
            return true;
        }

        tracing::warn!(uri = %uri, "Rejected redirect_uri with non-HTTPS scheme for non-loopback host");
        false
    }

    /// Generate a client ID
    fn generate_client_id() -> String {
        format!("lukhas_client_{}", Uuid::new_v4().simple())
    }

    /// Generate a client secret from 32 bytes of system randomness
    ///
    /// # Errors
    /// Returns an error if the system RNG fails
    fn generate_client_secret() -> Result<String, OAuth2Error> {
        let rng = SystemRandom::new();
        let mut secret = [0u8; 32];
        rng.fill(&mut secret).map_err(|e| {
            tracing::error!(error = ?e, "System RNG failure - cannot generate secure client secret");
            OAuth2Error::server_error("System RNG failure - cannot generate secure client secret")
        })?;

        Ok(general_purpose::STANDARD.encode(secret))
    }

    /// Hash a client secret for storage using Argon2id
    ///
    /// # Errors
    /// Returns an error if Argon2 hashing fails
    fn hash_client_secret(secret: &str) -> Result<String, OAuth2Error> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!(error = %e, "Argon2 hashing failed");
                OAuth2Error::server_error("Failed to hash client secret")
            })?;

        Ok(hash.to_string())
    }
}
