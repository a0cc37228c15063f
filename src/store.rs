// ABOUTME: Credential store abstraction over clients, codes, tokens, and profiles
// ABOUTME: Provides atomic consume-on-read semantics for single-use credentials
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

//! # Credential Store
//!
//! Every engine takes a [`CredentialStore`] rather than reaching for
//! module-level globals, so a database-backed implementation can be swapped
//! in without touching grant logic. Single-use credentials (authorization
//! codes, refresh tokens) are consumed with delete-on-read operations that
//! validate and remove under one write lock; callers never observe a
//! check-then-use window.

use crate::errors::AppResult;
use crate::oauth2::models::{
    AccessTokenRecord, AuthorizationCode, OAuthClient, RefreshTokenRecord, UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Storage backend for OAuth credentials and user profiles.
///
/// The `consume_*` operations are the load-bearing part of this trait: they
/// must validate and delete atomically so authorization codes and refresh
/// tokens stay single-use under concurrent exchange attempts. A database
/// implementation should back them with a transactional delete-on-read or
/// an optimistic `UPDATE ... WHERE` check.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a client registration
    async fn store_client(&self, client: &OAuthClient) -> AppResult<()>;

    /// Look up a client by public identifier
    async fn get_client(&self, client_id: &str) -> AppResult<Option<OAuthClient>>;

    /// Persist an authorization code
    async fn store_auth_code(&self, code: &AuthorizationCode) -> AppResult<()>;

    /// Atomically consume an authorization code.
    ///
    /// Returns the record only when it exists, is unexpired, and is bound
    /// to the given client and redirect URI; in every such case the record
    /// is removed so a second exchange cannot succeed. Any mismatch
    /// returns `None` without consuming the code.
    async fn consume_auth_code(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<AuthorizationCode>>;

    /// Persist an access token record
    async fn store_access_token(&self, record: &AccessTokenRecord) -> AppResult<()>;

    /// Look up an access token record by bearer string
    async fn get_access_token(&self, token: &str) -> AppResult<Option<AccessTokenRecord>>;

    /// Mark an access token revoked. Returns whether the token was known.
    async fn revoke_access_token(&self, token: &str) -> AppResult<bool>;

    /// Persist a refresh token record
    async fn store_refresh_token(&self, record: &RefreshTokenRecord) -> AppResult<()>;

    /// Atomically consume a refresh token (rotation).
    ///
    /// Returns the record only when it exists, is unexpired, and belongs
    /// to the given client; the record is removed in the same operation.
    async fn consume_refresh_token(
        &self,
        token: &str,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<RefreshTokenRecord>>;

    /// Persist or replace a user profile
    async fn store_user_profile(&self, profile: &UserProfile) -> AppResult<()>;

    /// Look up a user profile by user identifier
    async fn get_user_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>>;
}

/// In-memory credential store backed by `RwLock`-guarded maps.
///
/// Suitable for tests and single-process deployments. Each map carries its
/// own lock; consume operations hold the write lock across the validate
/// and remove steps, which is what preserves single-use semantics on a
/// multi-threaded runtime.
#[derive(Default)]
pub struct InMemoryStore {
    clients: RwLock<HashMap<String, OAuthClient>>,
    auth_codes: RwLock<HashMap<String, AuthorizationCode>>,
    access_tokens: RwLock<HashMap<String, AccessTokenRecord>>,
    refresh_tokens: RwLock<HashMap<String, RefreshTokenRecord>>,
    user_profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired codes and tokens.
    ///
    /// Expiry is always checked at access time; this is housekeeping so
    /// long-running processes do not accumulate dead records.
    pub async fn purge_expired(&self, now: DateTime<Utc>) {
        self.auth_codes
            .write()
            .await
            .retain(|_, code| code.expires_at > now);
        self.access_tokens
            .write()
            .await
            .retain(|_, token| token.expires_at > now);
        self.refresh_tokens
            .write()
            .await
            .retain(|_, token| token.expires_at > now);
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn store_client(&self, client: &OAuthClient) -> AppResult<()> {
        self.clients
            .write()
            .await
            .insert(client.client_id.clone(), client.clone());
        Ok(())
    }

    async fn get_client(&self, client_id: &str) -> AppResult<Option<OAuthClient>> {
        Ok(self.clients.read().await.get(client_id).cloned())
    }

    async fn store_auth_code(&self, code: &AuthorizationCode) -> AppResult<()> {
        self.auth_codes
            .write()
            .await
            .insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn consume_auth_code(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<AuthorizationCode>> {
        let mut codes = self.auth_codes.write().await;

        let matches = codes.get(code).is_some_and(|record| {
            record.client_id == client_id
                && record.redirect_uri == redirect_uri
                && record.expires_at > now
        });

        if matches {
            Ok(codes.remove(code))
        } else {
            // Expired codes are dead either way; drop them while we hold the lock
            if codes.get(code).is_some_and(|record| record.expires_at <= now) {
                codes.remove(code);
            }
            Ok(None)
        }
    }

    async fn store_access_token(&self, record: &AccessTokenRecord) -> AppResult<()> {
        self.access_tokens
            .write()
            .await
            .insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn get_access_token(&self, token: &str) -> AppResult<Option<AccessTokenRecord>> {
        Ok(self.access_tokens.read().await.get(token).cloned())
    }

    async fn revoke_access_token(&self, token: &str) -> AppResult<bool> {
        let mut tokens = self.access_tokens.write().await;
        match tokens.get_mut(token) {
            Some(record) => {
                record.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn store_refresh_token(&self, record: &RefreshTokenRecord) -> AppResult<()> {
        self.refresh_tokens
            .write()
            .await
            .insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn consume_refresh_token(
        &self,
        token: &str,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<RefreshTokenRecord>> {
        let mut tokens = self.refresh_tokens.write().await;

        let matches = tokens
            .get(token)
            .is_some_and(|record| record.client_id == client_id && record.expires_at > now);

        if matches {
            Ok(tokens.remove(token))
        } else {
            if tokens.get(token).is_some_and(|record| record.expires_at <= now) {
                tokens.remove(token);
            }
            Ok(None)
        }
    }

    async fn store_user_profile(&self, profile: &UserProfile) -> AppResult<()> {
        self.user_profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn get_user_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        Ok(self.user_profiles.read().await.get(user_id).cloned())
    }
}
