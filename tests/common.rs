// ABOUTME: Shared test fixtures for integration tests
// ABOUTME: Builds an authorization server over an in-memory store with a 2048-bit test key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use base64::{engine::general_purpose, Engine as _};
use lukhas_auth::config::ServerConfig;
use lukhas_auth::jwks::JwksManager;
use lukhas_auth::oauth2::models::OAuthClient;
use lukhas_auth::oauth2::{AuthorizationServer, ProvisionClientParams};
use lukhas_auth::store::InMemoryStore;
use lukhas_auth::tokens::TokenManager;
use sha2::{Digest, Sha256};
use std::sync::Arc;

pub struct TestHarness {
    pub server: AuthorizationServer,
    pub store: Arc<InMemoryStore>,
    pub config: ServerConfig,
}

/// Build an authorization server over a fresh in-memory store.
/// 2048-bit keys keep the suite fast.
pub fn test_harness() -> TestHarness {
    let config = ServerConfig::for_testing();
    let store = Arc::new(InMemoryStore::new());

    let mut jwks = JwksManager::new();
    jwks.generate_rsa_key_pair_with_size("test_key", 2048)
        .unwrap();

    let server = AuthorizationServer::new(
        store.clone(),
        Arc::new(TokenManager::new(config.issuer.clone())),
        Arc::new(jwks),
        config.auth.clone(),
    );

    TestHarness {
        server,
        store,
        config,
    }
}

pub const REDIRECT_URI: &str = "https://client.example/callback";

/// Provision a client registered for every grant and response type
pub async fn provision_client(
    server: &AuthorizationServer,
    allowed_scopes: &[&str],
    tier_level: u8,
) -> (OAuthClient, String) {
    server
        .client_manager()
        .provision_client(ProvisionClientParams {
            client_name: "Test Client".into(),
            redirect_uris: vec![REDIRECT_URI.into()],
            allowed_scopes: allowed_scopes.iter().map(|s| (*s).to_string()).collect(),
            grant_types: vec![
                "authorization_code".into(),
                "refresh_token".into(),
                "client_credentials".into(),
            ],
            response_types: vec!["code".into(), "token".into(), "id_token".into()],
            tier_level,
            trusted: true,
        })
        .await
        .unwrap()
}

/// A valid PKCE verifier/S256-challenge pair (RFC 7636 appendix value)
pub fn pkce_pair() -> (String, String) {
    let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string();
    let challenge = s256_challenge(&verifier);
    (verifier, challenge)
}

/// Compute `BASE64URL(SHA256(verifier))`
pub fn s256_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
}
