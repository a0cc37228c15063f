// ABOUTME: OIDC discovery metadata (/.well-known/openid-configuration) assembly
// ABOUTME: Serves cached provider metadata and the JWKS document
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

use crate::constants::oauth;
use crate::jwks::{JsonWebKeySet, JwksManager};
use crate::tiers;
use anyhow::Result;
use serde::Serialize;
use std::sync::OnceLock;

/// Vendor extension describing one trust tier
#[derive(Debug, Clone, Serialize)]
pub struct TierDescriptor {
    /// Numeric tier level (0-5)
    pub tier: u8,
    /// Scopes reachable at this tier
    pub scopes: Vec<String>,
}

/// OIDC provider metadata (`/.well-known/openid-configuration`)
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub introspection_endpoint: String,
    pub userinfo_endpoint: String,
    pub registration_endpoint: String,
    pub jwks_uri: String,
    pub scopes_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub response_types_supported: Vec<String>,
    pub code_challenge_methods_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub subject_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
    /// Vendor extension: the tier system gating scope grants
    pub lukhas_tier_levels: Vec<TierDescriptor>,
}

impl DiscoveryDocument {
    /// Build the provider metadata for the given issuer URL
    #[must_use]
    pub fn new(issuer: &str) -> Self {
        let base = issuer.trim_end_matches('/');

        let tier_levels = (0..=tiers::SUPERUSER_TIER)
            .map(|tier| {
                let mut scopes: Vec<String> = tiers::scopes_for_tier(tier)
                    .into_iter()
                    .map(std::string::ToString::to_string)
                    .collect();
                scopes.sort_unstable();
                TierDescriptor { tier, scopes }
            })
            .collect();

        Self {
            issuer: base.to_owned(),
            authorization_endpoint: format!("{base}/oauth2/authorize"),
            token_endpoint: format!("{base}/oauth2/token"),
            introspection_endpoint: format!("{base}/oauth2/introspect"),
            userinfo_endpoint: format!("{base}/oauth2/userinfo"),
            registration_endpoint: format!("{base}/oauth2/register"),
            jwks_uri: format!("{base}/.well-known/jwks.json"),
            scopes_supported: oauth::SUPPORTED_SCOPES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            grant_types_supported: oauth::SUPPORTED_GRANT_TYPES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            response_types_supported: oauth::SUPPORTED_RESPONSE_TYPES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            code_challenge_methods_supported: oauth::CODE_CHALLENGE_METHODS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            token_endpoint_auth_methods_supported: vec!["client_secret_post".to_owned()],
            subject_types_supported: vec!["public".to_owned()],
            id_token_signing_alg_values_supported: vec!["RS256".to_owned()],
            lukhas_tier_levels: tier_levels,
        }
    }
}

/// Serves discovery metadata and the JWKS document, both computed once.
///
/// The JWKS cache is filled on first request; key rotation requires a new
/// `DiscoveryService` (or process restart) to refresh the served document,
/// while `JwksManager` itself already retains historical keys so existing
/// tokens keep verifying through a rotation window.
pub struct DiscoveryService {
    issuer: String,
    metadata: OnceLock<DiscoveryDocument>,
    jwks: OnceLock<JsonWebKeySet>,
}

impl DiscoveryService {
    /// Create a discovery service for the given issuer
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            metadata: OnceLock::new(),
            jwks: OnceLock::new(),
        }
    }

    /// Provider metadata, computed on first access
    #[must_use]
    pub fn metadata(&self) -> &DiscoveryDocument {
        self.metadata
            .get_or_init(|| DiscoveryDocument::new(&self.issuer))
    }

    /// JWKS document, computed from the key set on first access
    ///
    /// # Errors
    /// Returns an error if JWK serialization fails on the first computation
    pub fn jwks(&self, jwks_manager: &JwksManager) -> Result<&JsonWebKeySet> {
        if let Some(cached) = self.jwks.get() {
            return Ok(cached);
        }
        let computed = jwks_manager.get_jwks()?;
        Ok(self.jwks.get_or_init(|| computed))
    }
}
