// ABOUTME: OAuth 2.0 authorization, token, introspection, and userinfo operations
// ABOUTME: Enforces scope/tier policy, PKCE, and single-use grants over the credential store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

use super::client_registration::ClientRegistrationManager;
use super::models::{
    AccessTokenRecord, AuthenticatedUser, AuthorizationCode, AuthorizeRequest, AuthorizeResponse,
    IntrospectionResponse, OAuth2Error, OAuthClient, RefreshTokenRecord, TokenRequest,
    TokenResponse, UserInfoResponse,
};
use crate::config::AuthConfig;
use crate::constants::{limits, oauth};
use crate::jwks::JwksManager;
use crate::store::CredentialStore;
use crate::tiers;
use crate::tokens::{AccessTokenParams, TokenManager};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// OAuth 2.0 / OIDC Authorization Server.
///
/// Owns the grant and exchange flows; all persistent state lives behind
/// the injected [`CredentialStore`].
pub struct AuthorizationServer {
    client_manager: ClientRegistrationManager,
    token_manager: Arc<TokenManager>,
    jwks_manager: Arc<JwksManager>,
    store: Arc<dyn CredentialStore>,
    auth_config: AuthConfig,
}

impl AuthorizationServer {
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        token_manager: Arc<TokenManager>,
        jwks_manager: Arc<JwksManager>,
        auth_config: AuthConfig,
    ) -> Self {
        let client_manager = ClientRegistrationManager::new(store.clone());

        Self {
            client_manager,
            token_manager,
            jwks_manager,
            store,
            auth_config,
        }
    }

    /// Client registration manager for this server
    #[must_use]
    pub const fn client_manager(&self) -> &ClientRegistrationManager {
        &self.client_manager
    }

    /// Handle an authorization request (GET/POST /oauth2/authorize).
    ///
    /// The caller supplies the authenticated principal out of band (session
    /// handling lives in the HTTP layer). Dispatches on `response_type`:
    /// `code` mints a single-use authorization code, `token` and `id_token`
    /// are the implicit flows.
    ///
    /// # Errors
    /// Returns an OAuth2-standard error pair; no internal failure escapes
    /// as anything other than a `server_error`
    pub async fn authorize(
        &self,
        request: AuthorizeRequest,
        user: &AuthenticatedUser,
    ) -> Result<AuthorizeResponse, OAuth2Error> {
        let client = self
            .client_manager
            .get_client(&request.client_id)
            .await
            .map_err(|e| {
                tracing::warn!(client_id = %request.client_id, error = %e, "Client lookup failed");
                OAuth2Error::invalid_client()
            })?;

        // Exact-match redirect URI validation, no prefix or pattern logic
        if !client.redirect_uris.contains(&request.redirect_uri) {
            return Err(OAuth2Error::invalid_request("Invalid redirect_uri"));
        }

        if !oauth::SUPPORTED_RESPONSE_TYPES.contains(&request.response_type.as_str()) {
            return Err(OAuth2Error::unsupported_response_type(&format!(
                "Unsupported response_type: {}",
                request.response_type
            )));
        }
        if !client.response_types.contains(&request.response_type) {
            return Err(OAuth2Error::unsupported_response_type(&format!(
                "Client is not registered for response_type: {}",
                request.response_type
            )));
        }

        let granted_scope = Self::resolve_request_scope(&client, request.scope.as_deref(), user.tier)?;

        Self::validate_pkce_params(&request)?;

        match request.response_type.as_str() {
            "code" => self.authorize_code(&request, user, granted_scope).await,
            "token" => self.authorize_implicit_token(&request, user, granted_scope).await,
            "id_token" => self.authorize_implicit_id_token(&request, user),
            _ => unreachable!("response_type validated above"),
        }
    }

    /// Resolve the scope actually granted for an authorization request.
    ///
    /// An absent `scope` parameter requests everything the client may
    /// have. The result is requested ∩ client.allowed_scopes ∩ tier table;
    /// an empty survivor set is `invalid_scope`.
    fn resolve_request_scope(
        client: &OAuthClient,
        scope_param: Option<&str>,
        tier: u8,
    ) -> Result<Vec<String>, OAuth2Error> {
        let requested = scope_param
            .map_or_else(|| client.allowed_scopes.clone(), tiers::parse_scope_param);

        let granted = tiers::resolve_scopes(&requested, &client.allowed_scopes, tier);
        if granted.is_empty() {
            return Err(OAuth2Error::invalid_scope(
                "No requested scope is permitted for this client and tier",
            ));
        }
        Ok(granted)
    }

    /// Validate PKCE parameters when a challenge is supplied (RFC 7636)
    fn validate_pkce_params(request: &AuthorizeRequest) -> Result<(), OAuth2Error> {
        if let Some(ref code_challenge) = request.code_challenge {
            if code_challenge.len() < limits::PKCE_MIN_LEN
                || code_challenge.len() > limits::PKCE_MAX_LEN
            {
                return Err(OAuth2Error::invalid_request(
                    "code_challenge must be between 43 and 128 characters",
                ));
            }

            let method = request.code_challenge_method.as_deref().unwrap_or("S256");
            if !oauth::CODE_CHALLENGE_METHODS.contains(&method) {
                return Err(OAuth2Error::invalid_request(
                    "code_challenge_method must be 'S256' or 'plain'",
                ));
            }
        }
        Ok(())
    }

    /// `response_type=code`: mint and store a single-use authorization code
    async fn authorize_code(
        &self,
        request: &AuthorizeRequest,
        user: &AuthenticatedUser,
        granted_scope: Vec<String>,
    ) -> Result<AuthorizeResponse, OAuth2Error> {
        let code = Self::generate_random_string(32).map_err(|e| {
            tracing::error!(error = %e, "Failed to generate authorization code");
            OAuth2Error::server_error("Failed to generate authorization code")
        })?;

        let now = Utc::now();
        let auth_code = AuthorizationCode {
            code: code.clone(),
            client_id: request.client_id.clone(),
            user_id: user.user_id.clone(),
            user_tier: user.tier,
            lambda_id: user.lambda_id.clone(),
            scope: granted_scope,
            redirect_uri: request.redirect_uri.clone(),
            nonce: request.nonce.clone(),
            code_challenge: request.code_challenge.clone(),
            code_challenge_method: request
                .code_challenge
                .is_some()
                .then(|| {
                    request
                        .code_challenge_method
                        .clone()
                        .unwrap_or_else(|| "S256".to_owned())
                }),
            issued_at: now,
            expires_at: now + Duration::minutes(self.auth_config.auth_code_ttl_minutes),
        };

        self.store.store_auth_code(&auth_code).await.map_err(|e| {
            tracing::error!(client_id = %request.client_id, error = %e, "Failed to store authorization code");
            OAuth2Error::server_error("Failed to store authorization code")
        })?;

        tracing::debug!(
            client_id = %request.client_id,
            user_id = %user.user_id,
            "Issued authorization code"
        );

        Ok(AuthorizeResponse::Code {
            code,
            state: request.state.clone(),
        })
    }

    /// `response_type=token`: implicit flow, access token minted directly
    async fn authorize_implicit_token(
        &self,
        request: &AuthorizeRequest,
        user: &AuthenticatedUser,
        granted_scope: Vec<String>,
    ) -> Result<AuthorizeResponse, OAuth2Error> {
        let lifetime = Duration::hours(self.auth_config.access_token_expiry_hours);
        let access_token = self
            .mint_access_token(
                &request.client_id,
                Some(user),
                user.tier,
                &granted_scope,
                lifetime,
            )
            .await?;

        Ok(AuthorizeResponse::ImplicitToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: lifetime.num_seconds(),
            state: request.state.clone(),
        })
    }

    /// `response_type=id_token`: implicit OIDC flow, signed assertion only
    fn authorize_implicit_id_token(
        &self,
        request: &AuthorizeRequest,
        user: &AuthenticatedUser,
    ) -> Result<AuthorizeResponse, OAuth2Error> {
        let id_token = self
            .token_manager
            .generate_id_token(
                &self.jwks_manager,
                &request.client_id,
                &user.user_id,
                user.tier,
                user.lambda_id.as_deref(),
                request.nonce.as_deref(),
            )
            .map_err(|e| {
                tracing::error!(client_id = %request.client_id, error = %e, "Failed to generate ID token");
                OAuth2Error::server_error("Failed to generate ID token")
            })?;

        Ok(AuthorizeResponse::IdToken {
            id_token,
            state: request.state.clone(),
        })
    }

    /// Handle a token request (POST /oauth2/token).
    ///
    /// Client credentials are validated before any grant-specific logic for
    /// every grant type (RFC 6749 Section 6): an unknown client learns
    /// nothing about codes or refresh tokens.
    ///
    /// # Errors
    /// Returns an OAuth2-standard error pair
    pub async fn token(&self, request: TokenRequest) -> Result<TokenResponse, OAuth2Error> {
        let client = self
            .client_manager
            .validate_client(&request.client_id, &request.client_secret)
            .await?;

        if !oauth::SUPPORTED_GRANT_TYPES.contains(&request.grant_type.as_str()) {
            return Err(OAuth2Error::unsupported_grant_type());
        }
        if !client.grant_types.contains(&request.grant_type) {
            return Err(OAuth2Error::unauthorized_client(&format!(
                "Client is not registered for grant_type: {}",
                request.grant_type
            )));
        }

        match request.grant_type.as_str() {
            "authorization_code" => self.handle_authorization_code_grant(request).await,
            "refresh_token" => self.handle_refresh_token_grant(request).await,
            "client_credentials" => self.handle_client_credentials_grant(&client, &request).await,
            _ => unreachable!("grant_type validated above"),
        }
    }

    /// Handle the authorization-code grant
    async fn handle_authorization_code_grant(
        &self,
        request: TokenRequest,
    ) -> Result<TokenResponse, OAuth2Error> {
        let code = request
            .code
            .ok_or_else(|| OAuth2Error::invalid_request("Missing authorization code"))?;
        let redirect_uri = request
            .redirect_uri
            .ok_or_else(|| OAuth2Error::invalid_request("Missing redirect_uri"))?;

        // Atomic consume enforces single use: validation and deletion happen
        // under one store operation, so a replayed code always fails here
        let auth_code = self
            .store
            .consume_auth_code(&code, &request.client_id, &redirect_uri, Utc::now())
            .await
            .map_err(|e| {
                tracing::error!(client_id = %request.client_id, error = %e, "Failed to consume authorization code");
                OAuth2Error::server_error("Failed to consume authorization code")
            })?
            .ok_or_else(|| {
                tracing::warn!(
                    client_id = %request.client_id,
                    "Authorization code rejected: not found, already used, expired, or mismatched"
                );
                OAuth2Error::invalid_grant("Invalid or expired authorization code")
            })?;

        // PKCE verification happens after consumption so a failed verifier
        // still burns the code instead of leaving it replayable
        Self::verify_pkce(&auth_code, request.code_verifier.as_deref())?;

        let user = AuthenticatedUser {
            user_id: auth_code.user_id.clone(),
            tier: auth_code.user_tier,
            lambda_id: auth_code.lambda_id.clone(),
        };

        let lifetime = Duration::hours(self.auth_config.access_token_expiry_hours);
        let access_token = self
            .mint_access_token(
                &request.client_id,
                Some(&user),
                auth_code.user_tier,
                &auth_code.scope,
                lifetime,
            )
            .await?;

        let refresh_token = self
            .issue_refresh_token(&request.client_id, &user, &auth_code.scope)
            .await?;

        let id_token = if auth_code.scope.iter().any(|s| s == "openid") {
            Some(
                self.token_manager
                    .generate_id_token(
                        &self.jwks_manager,
                        &request.client_id,
                        &auth_code.user_id,
                        auth_code.user_tier,
                        auth_code.lambda_id.as_deref(),
                        auth_code.nonce.as_deref(),
                    )
                    .map_err(|e| {
                        tracing::error!(client_id = %request.client_id, error = %e, "Failed to generate ID token");
                        OAuth2Error::server_error("Failed to generate ID token")
                    })?,
            )
        } else {
            None
        };

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: lifetime.num_seconds(),
            scope: Some(tiers::join_scopes(&auth_code.scope)),
            refresh_token: Some(refresh_token),
            id_token,
        })
    }

    /// Handle the refresh-token grant with rotation.
    ///
    /// The presented refresh token is consumed atomically and a fresh one
    /// is returned, so a replayed refresh token fails with `invalid_grant`.
    async fn handle_refresh_token_grant(
        &self,
        request: TokenRequest,
    ) -> Result<TokenResponse, OAuth2Error> {
        let refresh_token_value = request
            .refresh_token
            .ok_or_else(|| OAuth2Error::invalid_request("Missing refresh_token"))?;

        let old_token = self
            .store
            .consume_refresh_token(&refresh_token_value, &request.client_id, Utc::now())
            .await
            .map_err(|e| {
                tracing::error!(client_id = %request.client_id, error = %e, "Failed to consume refresh token");
                OAuth2Error::server_error("Failed to consume refresh token")
            })?
            .ok_or_else(|| {
                tracing::warn!(
                    client_id = %request.client_id,
                    "Refresh token rejected: not found, already rotated, expired, or mismatched client"
                );
                OAuth2Error::invalid_grant("Invalid or expired refresh token")
            })?;

        let user = AuthenticatedUser {
            user_id: old_token.user_id.clone(),
            tier: old_token.user_tier,
            lambda_id: old_token.lambda_id.clone(),
        };

        let lifetime = Duration::hours(self.auth_config.access_token_expiry_hours);
        let access_token = self
            .mint_access_token(
                &request.client_id,
                Some(&user),
                old_token.user_tier,
                &old_token.scope,
                lifetime,
            )
            .await?;

        let new_refresh_token = self
            .issue_refresh_token(&request.client_id, &user, &old_token.scope)
            .await?;

        tracing::info!(
            client_id = %request.client_id,
            user_id = %old_token.user_id,
            "Refresh token rotated"
        );

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: lifetime.num_seconds(),
            scope: Some(tiers::join_scopes(&old_token.scope)),
            refresh_token: Some(new_refresh_token),
            id_token: None,
        })
    }

    /// Handle the client-credentials grant: the client acts as itself
    async fn handle_client_credentials_grant(
        &self,
        client: &OAuthClient,
        request: &TokenRequest,
    ) -> Result<TokenResponse, OAuth2Error> {
        let requested = request
            .scope
            .as_deref()
            .map_or_else(|| client.allowed_scopes.clone(), tiers::parse_scope_param);

        let granted: Vec<String> = requested
            .into_iter()
            .filter(|scope| client.allowed_scopes.contains(scope))
            .collect();
        if granted.is_empty() {
            return Err(OAuth2Error::invalid_scope(
                "No requested scope is permitted for this client",
            ));
        }

        // Client tokens last longer than user tokens and get no refresh token
        let lifetime = Duration::hours(self.auth_config.client_token_expiry_hours);
        let access_token = self
            .mint_access_token(&client.client_id, None, client.tier_level, &granted, lifetime)
            .await?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: lifetime.num_seconds(),
            scope: Some(tiers::join_scopes(&granted)),
            refresh_token: None,
            id_token: None,
        })
    }

    /// Verify a PKCE verifier against the challenge stored on the code
    fn verify_pkce(
        auth_code: &AuthorizationCode,
        code_verifier: Option<&str>,
    ) -> Result<(), OAuth2Error> {
        let Some(stored_challenge) = &auth_code.code_challenge else {
            if code_verifier.is_some() {
                return Err(OAuth2Error::invalid_grant(
                    "code_verifier provided but no code_challenge was issued",
                ));
            }
            return Ok(());
        };

        let verifier = code_verifier
            .ok_or_else(|| OAuth2Error::invalid_grant("code_verifier is required (PKCE)"))?;

        // RFC 7636 Section 4.1: length and unreserved-character checks
        if verifier.len() < limits::PKCE_MIN_LEN || verifier.len() > limits::PKCE_MAX_LEN {
            return Err(OAuth2Error::invalid_grant(
                "code_verifier must be between 43 and 128 characters",
            ));
        }
        if !verifier
            .chars()
            .all(|c| matches!(c, 'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~'))
        {
            return Err(OAuth2Error::invalid_grant(
                "code_verifier contains invalid characters",
            ));
        }

        let method = auth_code.code_challenge_method.as_deref().unwrap_or("S256");
        let computed: String = match method {
            "S256" => {
                let mut hasher = Sha256::new();
                hasher.update(verifier.as_bytes());
                general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
            }
            "plain" => verifier.to_owned(),
            other => {
                return Err(OAuth2Error::invalid_grant(&format!(
                    "Unsupported code_challenge_method: {other}"
                )));
            }
        };

        // Constant-time comparison to prevent timing attacks
        if computed
            .as_bytes()
            .ct_eq(stored_challenge.as_bytes())
            .into()
        {
            tracing::debug!(client_id = %auth_code.client_id, "PKCE verification successful");
            Ok(())
        } else {
            tracing::warn!(
                client_id = %auth_code.client_id,
                "PKCE verification failed: code_verifier does not match code_challenge"
            );
            Err(OAuth2Error::invalid_grant("Invalid code_verifier"))
        }
    }

    /// Mint an access token and persist its introspectable record
    async fn mint_access_token(
        &self,
        client_id: &str,
        user: Option<&AuthenticatedUser>,
        tier: u8,
        scopes: &[String],
        lifetime: Duration,
    ) -> Result<String, OAuth2Error> {
        let access_token = self
            .token_manager
            .generate_access_token(
                &self.jwks_manager,
                &AccessTokenParams {
                    client_id,
                    user_id: user.map(|u| u.user_id.as_str()),
                    tier,
                    lambda_id: user.and_then(|u| u.lambda_id.as_deref()),
                    scopes,
                    lifetime,
                },
            )
            .map_err(|e| {
                tracing::error!(client_id = %client_id, error = %e, "Failed to generate access token");
                OAuth2Error::server_error("Failed to generate access token")
            })?;

        let now = Utc::now();
        let record = AccessTokenRecord {
            token: access_token.clone(),
            client_id: client_id.to_owned(),
            user_id: user.map(|u| u.user_id.clone()),
            user_tier: tier,
            lambda_id: user.and_then(|u| u.lambda_id.clone()),
            scope: scopes.to_vec(),
            issued_at: now,
            expires_at: now + lifetime,
            revoked: false,
        };

        self.store.store_access_token(&record).await.map_err(|e| {
            tracing::error!(client_id = %client_id, error = %e, "Failed to store access token record");
            OAuth2Error::server_error("Failed to store access token")
        })?;

        Ok(access_token)
    }

    /// Generate and persist a refresh token for a user grant
    async fn issue_refresh_token(
        &self,
        client_id: &str,
        user: &AuthenticatedUser,
        scopes: &[String],
    ) -> Result<String, OAuth2Error> {
        let token = Self::generate_random_string(32).map_err(|e| {
            tracing::error!(error = %e, "Failed to generate refresh token");
            OAuth2Error::server_error("Failed to generate secure refresh token")
        })?;

        let now = Utc::now();
        let record = RefreshTokenRecord {
            token: token.clone(),
            client_id: client_id.to_owned(),
            user_id: user.user_id.clone(),
            user_tier: user.tier,
            lambda_id: user.lambda_id.clone(),
            scope: scopes.to_vec(),
            issued_at: now,
            expires_at: now + Duration::days(self.auth_config.refresh_token_expiry_days),
        };

        self.store.store_refresh_token(&record).await.map_err(|e| {
            tracing::error!(client_id = %client_id, error = %e, "Failed to store refresh token");
            OAuth2Error::server_error("Failed to store refresh token")
        })?;

        Ok(token)
    }

    /// Token introspection (RFC 7662, POST /oauth2/introspect).
    ///
    /// Unknown, expired, revoked, and malformed tokens all produce
    /// `{active: false}` with no further detail; this is deliberate so the
    /// endpoint cannot be used to probe which tokens exist. This operation
    /// never fails.
    pub async fn introspect(&self, token: &str, requesting_client_id: &str) -> IntrospectionResponse {
        let record = match self.store.get_access_token(token).await {
            Ok(Some(record)) => record,
            Ok(None) => return IntrospectionResponse::inactive(),
            Err(e) => {
                tracing::warn!(client_id = %requesting_client_id, error = %e, "Introspection store lookup failed");
                return IntrospectionResponse::inactive();
            }
        };

        if !record.is_active(Utc::now()) {
            return IntrospectionResponse::inactive();
        }

        let sub = record
            .user_id
            .clone()
            .unwrap_or_else(|| format!("client:{}", record.client_id));

        IntrospectionResponse {
            active: true,
            scope: Some(tiers::join_scopes(&record.scope)),
            client_id: Some(record.client_id),
            sub: Some(sub),
            exp: Some(record.expires_at.timestamp()),
            iat: Some(record.issued_at.timestamp()),
            token_type: Some("Bearer".to_string()),
            lukhas_tier: Some(record.user_tier),
            lukhas_lambda_id: record.lambda_id,
        }
    }

    /// UserInfo endpoint (GET /oauth2/userinfo, Bearer token).
    ///
    /// Requires `openid` in the token's scope, then assembles claims
    /// incrementally from whichever additional scopes were granted.
    ///
    /// # Errors
    /// Returns `invalid_token` for unknown/expired/revoked tokens and
    /// `insufficient_scope` when `openid` was not granted
    pub async fn userinfo(&self, access_token: &str) -> Result<UserInfoResponse, OAuth2Error> {
        let record = self
            .store
            .get_access_token(access_token)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "UserInfo store lookup failed");
                OAuth2Error::invalid_token("Token lookup failed")
            })?
            .filter(|record| record.is_active(Utc::now()))
            .ok_or_else(|| OAuth2Error::invalid_token("Unknown or expired access token"))?;

        if !record.scope.iter().any(|s| s == "openid") {
            return Err(OAuth2Error::insufficient_scope(
                "openid scope is required for the userinfo endpoint",
            ));
        }

        let sub = record
            .user_id
            .clone()
            .unwrap_or_else(|| format!("client:{}", record.client_id));

        let profile = match &record.user_id {
            Some(user_id) => self.store.get_user_profile(user_id).await.unwrap_or_else(|e| {
                tracing::warn!(user_id = %user_id, error = %e, "Profile lookup failed");
                None
            }),
            None => None,
        };

        let mut response = UserInfoResponse {
            sub,
            lambda_id: record.lambda_id.clone(),
            trinity_compliance: true,
            ..UserInfoResponse::default()
        };

        let has_scope = |name: &str| record.scope.iter().any(|s| s == name);

        if has_scope("profile") {
            response.lukhas_tier = Some(record.user_tier);
            if let Some(profile) = &profile {
                response.name.clone_from(&profile.name);
                response.picture.clone_from(&profile.picture);
            }
        }
        if has_scope("email") {
            if let Some(profile) = &profile {
                response.email.clone_from(&profile.email);
                response.email_verified = Some(profile.email_verified);
            }
        }
        if has_scope("phone") {
            if let Some(profile) = &profile {
                response.phone_number.clone_from(&profile.phone_number);
            }
        }
        if has_scope("address") {
            if let Some(profile) = &profile {
                response.address.clone_from(&profile.address);
            }
        }

        Ok(response)
    }

    /// Revoke an access token. Returns whether the token was known.
    ///
    /// # Errors
    /// Returns a `server_error` pair if the store operation fails
    pub async fn revoke_token(&self, token: &str) -> Result<bool, OAuth2Error> {
        self.store.revoke_access_token(token).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to revoke access token");
            OAuth2Error::server_error("Failed to revoke access token")
        })
    }

    /// Generate a URL-safe random string from `length` bytes of system
    /// randomness.
    ///
    /// # Errors
    /// Returns an error if the system RNG fails; the server cannot operate
    /// securely without working randomness
    fn generate_random_string(length: usize) -> anyhow::Result<String> {
        let rng = SystemRandom::new();
        let mut bytes = vec![0u8; length];

        rng.fill(&mut bytes)
            .map_err(|e| anyhow::anyhow!("System RNG failure: {e:?}"))?;

        Ok(general_purpose::URL_SAFE_NO_PAD.encode(&bytes))
    }
}
