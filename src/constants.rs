// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Groups protocol limits, scope names, and service identity in nested modules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

//! Application constants grouped by domain.

/// Service identity used in token `iss`/`aud` claims and discovery metadata
pub mod service_names {
    /// Issuer identifier for minted tokens
    pub const ISSUER: &str = "lukhas-auth";
    /// Audience for access tokens consumed by LUKHAS resource servers
    pub const RESOURCE_API: &str = "lukhas-api";
}

/// Protocol limits and record lifetimes
pub mod limits {
    /// Authorization codes are single-use and short-lived
    pub const AUTH_CODE_TTL_MINUTES: i64 = 10;
    /// User access tokens (authorization code, implicit, refresh grants)
    pub const ACCESS_TOKEN_EXPIRY_HOURS: i64 = 1;
    /// Client-credentials tokens last longer than user tokens
    pub const CLIENT_TOKEN_EXPIRY_HOURS: i64 = 24;
    /// Refresh token lifetime
    pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;
    /// Registered clients expire after one year; provisioned clients never do
    pub const CLIENT_REGISTRATION_EXPIRY_DAYS: i64 = 365;
    /// PKCE code challenge/verifier length bounds (RFC 7636 Section 4.1)
    pub const PKCE_MIN_LEN: usize = 43;
    pub const PKCE_MAX_LEN: usize = 128;
}

/// API key format and rate limiting
pub mod api_keys {
    /// Leading prefix of every LUKHAS API key
    pub const KEY_PREFIX: &str = "luk";
    /// Hex characters in the random key base
    pub const KEY_BASE_LEN: usize = 32;
    /// Hex characters in the embedded HMAC signature suffix
    pub const KEY_SIGNATURE_LEN: usize = 16;
    /// Visible characters when masking a key for audit logs
    pub const KEY_MASK_VISIBLE: usize = 12;
    /// Sliding-window request cap per key
    pub const RATE_LIMIT_REQUESTS: u32 = 100;
    /// Sliding window length
    pub const RATE_LIMIT_WINDOW_SECS: u64 = 3600;
    /// Placeholder secret that the configuration loader must refuse
    pub const INSECURE_DEFAULT_SECRET: &str = "lukhas-insecure-dev-secret";
}

/// Rule engine evaluation and caching
pub mod rules {
    /// Upper bound on cached validation reports before oldest-first eviction
    pub const CACHE_MAX_ENTRIES: usize = 1000;
    /// Default per-rule report TTL when the rule does not set one
    pub const CACHE_DEFAULT_TTL_SECS: u64 = 300;
    /// Context key carrying the caller's context label, matched against a
    /// rule's applicable/excluded context lists
    pub const CONTEXT_TYPE_KEY: &str = "context_type";
}

/// OAuth2/OIDC protocol vocabulary
pub mod oauth {
    /// Grant types this server supports
    pub const SUPPORTED_GRANT_TYPES: &[&str] =
        &["authorization_code", "refresh_token", "client_credentials"];

    /// Response types this server supports
    pub const SUPPORTED_RESPONSE_TYPES: &[&str] = &["code", "token", "id_token"];

    /// PKCE challenge methods advertised in discovery
    pub const CODE_CHALLENGE_METHODS: &[&str] = &["S256", "plain"];

    /// Every scope the platform knows about. Tier policy decides which of
    /// these a given principal may actually receive.
    pub const SUPPORTED_SCOPES: &[&str] = &[
        "openid",
        "profile",
        "email",
        "phone",
        "address",
        "lukhas:basic",
        "lukhas:identity:read",
        "lukhas:identity:write",
        "lukhas:premium",
        "lukhas:admin",
    ];
}
