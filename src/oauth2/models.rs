// ABOUTME: OAuth 2.0 / OIDC data models for registration, grants, and token exchange
// ABOUTME: Implements RFC 7591/6749/7662 request, response, and stored-record structures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth 2.0 Client Registration Request (RFC 7591)
#[derive(Debug, Deserialize)]
pub struct ClientRegistrationRequest {
    /// Redirect URIs for authorization code flow
    pub redirect_uris: Vec<String>,
    /// Optional client name for display
    pub client_name: Option<String>,
    /// Optional client URI for information
    pub client_uri: Option<String>,
    /// Grant types the client can use
    pub grant_types: Option<Vec<String>>,
    /// Response types the client can use
    pub response_types: Option<Vec<String>>,
    /// Scopes the client can request (space-delimited)
    pub scope: Option<String>,
}

/// OAuth 2.0 Client Registration Response (RFC 7591)
#[derive(Debug, Serialize)]
pub struct ClientRegistrationResponse {
    /// Unique client identifier
    pub client_id: String,
    /// Client secret for authentication (returned exactly once)
    pub client_secret: String,
    /// When the client was issued
    pub client_id_issued_at: Option<i64>,
    /// When the client secret expires
    pub client_secret_expires_at: Option<i64>,
    /// Redirect URIs registered for this client
    pub redirect_uris: Vec<String>,
    /// Grant types allowed for this client
    pub grant_types: Vec<String>,
    /// Response types allowed for this client
    pub response_types: Vec<String>,
    /// Client name
    pub client_name: Option<String>,
    /// Client URI
    pub client_uri: Option<String>,
    /// Scopes this client can request (space-delimited)
    pub scope: Option<String>,
}

/// Registered OAuth 2.0 client record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClient {
    /// Internal record identifier
    pub id: String,
    /// Public client identifier
    pub client_id: String,
    /// Argon2id hash of the client secret
    pub client_secret_hash: String,
    /// Display name
    pub client_name: Option<String>,
    /// Registered redirect URIs (exact-match only)
    pub redirect_uris: Vec<String>,
    /// Scopes this client may ever be granted
    pub allowed_scopes: Vec<String>,
    /// Grant types this client may use
    pub grant_types: Vec<String>,
    /// Response types this client may use
    pub response_types: Vec<String>,
    /// Trust tier of the client itself (0-5)
    pub tier_level: u8,
    /// Whether this is a trusted first-party client
    pub trusted: bool,
    /// When the client was created
    pub created_at: DateTime<Utc>,
    /// When the registration expires (None for provisioned clients)
    pub expires_at: Option<DateTime<Utc>>,
}

/// Authenticated principal on whose behalf an authorization is requested.
///
/// Supplied out of band by the HTTP layer's session handling.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Stable user identifier
    pub user_id: String,
    /// Trust tier (0-5)
    pub tier: u8,
    /// Optional ΛiD subject identifier carried into tokens
    pub lambda_id: Option<String>,
}

impl AuthenticatedUser {
    /// Convenience constructor without a lambda identifier
    #[must_use]
    pub fn new(user_id: impl Into<String>, tier: u8) -> Self {
        Self {
            user_id: user_id.into(),
            tier,
            lambda_id: None,
        }
    }
}

/// Ephemeral authorization code record (single-use, 10-minute TTL)
#[derive(Debug, Clone)]
pub struct AuthorizationCode {
    /// The code value (store key)
    pub code: String,
    /// Client the code was issued to
    pub client_id: String,
    /// User who authorized
    pub user_id: String,
    /// User trust tier at authorization time
    pub user_tier: u8,
    /// Optional ΛiD subject identifier
    pub lambda_id: Option<String>,
    /// Granted (already narrowed) scopes
    pub scope: Vec<String>,
    /// Redirect URI bound to the code
    pub redirect_uri: String,
    /// OIDC nonce to echo into the ID token
    pub nonce: Option<String>,
    /// PKCE code challenge
    pub code_challenge: Option<String>,
    /// PKCE challenge method (S256 or plain)
    pub code_challenge_method: Option<String>,
    /// When the code was issued
    pub issued_at: DateTime<Utc>,
    /// When the code expires
    pub expires_at: DateTime<Utc>,
}

/// Stored access token record, keyed by the exact bearer string.
///
/// The bearer string itself is a signed JWT; the record exists so
/// introspection and revocation do not depend on signature checks alone.
#[derive(Debug, Clone)]
pub struct AccessTokenRecord {
    /// The bearer token (store key)
    pub token: String,
    /// Client the token was issued to
    pub client_id: String,
    /// User the token acts for (None for client-credentials tokens)
    pub user_id: Option<String>,
    /// Trust tier carried by the token
    pub user_tier: u8,
    /// Optional ΛiD subject identifier
    pub lambda_id: Option<String>,
    /// Granted scopes
    pub scope: Vec<String>,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
    /// When the token expires
    pub expires_at: DateTime<Utc>,
    /// Whether the token was explicitly revoked
    pub revoked: bool,
}

impl AccessTokenRecord {
    /// Whether this record is usable right now
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// Stored refresh token record, consumed atomically on use (rotation)
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    /// The refresh token (store key)
    pub token: String,
    /// Client the token was issued to
    pub client_id: String,
    /// User the token acts for
    pub user_id: String,
    /// Trust tier carried forward into refreshed access tokens
    pub user_tier: u8,
    /// Optional ΛiD subject identifier
    pub lambda_id: Option<String>,
    /// Granted scopes carried forward
    pub scope: Vec<String>,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
    /// When the token expires
    pub expires_at: DateTime<Utc>,
}

/// Per-user claim source consulted by the UserInfo endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable user identifier
    pub user_id: String,
    /// Display name (`profile` scope)
    pub name: Option<String>,
    /// Avatar URL (`profile` scope)
    pub picture: Option<String>,
    /// Email address (`email` scope)
    pub email: Option<String>,
    /// Whether the email address was verified
    pub email_verified: bool,
    /// Phone number (`phone` scope)
    pub phone_number: Option<String>,
    /// Postal address (`address` scope)
    pub address: Option<String>,
}

/// OAuth 2.0 Authorization Request
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeRequest {
    /// Response type (code, token, id_token)
    pub response_type: String,
    /// Client identifier
    pub client_id: String,
    /// Redirect URI for response
    pub redirect_uri: String,
    /// Requested scopes (space-delimited)
    pub scope: Option<String>,
    /// State parameter for CSRF protection
    pub state: Option<String>,
    /// OIDC nonce, echoed into ID tokens
    pub nonce: Option<String>,
    /// PKCE code challenge (RFC 7636)
    pub code_challenge: Option<String>,
    /// PKCE code challenge method (plain or S256)
    pub code_challenge_method: Option<String>,
}

/// OAuth 2.0 Authorization Response, shaped by the requested response type
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AuthorizeResponse {
    /// `response_type=code`
    Code {
        /// Authorization code
        code: String,
        /// State parameter (if provided in request)
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
    /// `response_type=token` (implicit)
    ImplicitToken {
        /// Bearer access token
        access_token: String,
        /// Always "Bearer"
        token_type: String,
        /// Lifetime in seconds
        expires_in: i64,
        /// State parameter (if provided in request)
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
    /// `response_type=id_token` (implicit OIDC)
    IdToken {
        /// Signed ID token
        id_token: String,
        /// State parameter (if provided in request)
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
}

/// OAuth 2.0 Token Request
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    /// Grant type (`authorization_code`, `client_credentials`, `refresh_token`)
    pub grant_type: String,
    /// Authorization code (for `authorization_code` grant)
    pub code: Option<String>,
    /// Redirect URI (must match the one bound to the code)
    pub redirect_uri: Option<String>,
    /// Client ID
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
    /// Requested scopes (for `client_credentials` grant)
    pub scope: Option<String>,
    /// Refresh token (for `refresh_token` grant)
    pub refresh_token: Option<String>,
    /// PKCE code verifier (RFC 7636, for `authorization_code` grant)
    pub code_verifier: Option<String>,
}

/// OAuth 2.0 Token Response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Access token (JWT)
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Expires in seconds
    pub expires_in: i64,
    /// Scopes actually granted (space-delimited, possibly narrowed)
    pub scope: Option<String>,
    /// Refresh token (authorization-code and refresh grants)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// ID token (only when `openid` is in the granted scope)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// Token introspection response (RFC 7662)
#[derive(Debug, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active
    pub active: bool,
    /// Granted scopes (space-delimited)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Client the token was issued to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Subject the token acts for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiry timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issued-at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Token type hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Trust tier carried by the token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lukhas_tier: Option<u8>,
    /// ΛiD subject identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lukhas_lambda_id: Option<String>,
}

impl IntrospectionResponse {
    /// The RFC 7662 "not active" response: no claims, no explanation.
    /// Returned for unknown, expired, revoked, and malformed tokens alike
    /// so callers cannot probe which tokens exist.
    #[must_use]
    pub const fn inactive() -> Self {
        Self {
            active: false,
            scope: None,
            client_id: None,
            sub: None,
            exp: None,
            iat: None,
            token_type: None,
            lukhas_tier: None,
            lukhas_lambda_id: None,
        }
    }
}

/// UserInfo response with claims filtered by granted scope
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserInfoResponse {
    /// Subject identifier
    pub sub: String,
    /// Display name (`profile`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Avatar URL (`profile`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Trust tier (`profile`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lukhas_tier: Option<u8>,
    /// Email address (`email`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Email verification flag (`email`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    /// Phone number (`phone`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Postal address (`address`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// ΛiD subject identifier (vendor extension)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda_id: Option<String>,
    /// Trinity framework compliance marker (vendor extension)
    pub trinity_compliance: bool,
}

/// OAuth 2.0 Error Response
#[derive(Debug, Serialize)]
pub struct OAuth2Error {
    /// Error code
    pub error: String,
    /// Human-readable error description
    pub error_description: Option<String>,
    /// URI for error information
    pub error_uri: Option<String>,
}

impl OAuth2Error {
    /// Create an `invalid_request` error
    #[must_use]
    pub fn invalid_request(description: &str) -> Self {
        Self {
            error: "invalid_request".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some(
                "https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1".to_owned(),
            ),
        }
    }

    /// Create an `invalid_client` error
    #[must_use]
    pub fn invalid_client() -> Self {
        Self {
            error: "invalid_client".to_owned(),
            error_description: Some("Client authentication failed".to_owned()),
            error_uri: Some("https://datatracker.ietf.org/doc/html/rfc6749#section-5.2".to_owned()),
        }
    }

    /// Create an `invalid_grant` error
    #[must_use]
    pub fn invalid_grant(description: &str) -> Self {
        Self {
            error: "invalid_grant".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some("https://datatracker.ietf.org/doc/html/rfc6749#section-5.2".to_owned()),
        }
    }

    /// Create an `unsupported_grant_type` error
    #[must_use]
    pub fn unsupported_grant_type() -> Self {
        Self {
            error: "unsupported_grant_type".to_owned(),
            error_description: Some("Grant type not supported".to_owned()),
            error_uri: Some("https://datatracker.ietf.org/doc/html/rfc6749#section-5.2".to_owned()),
        }
    }

    /// Create an `unsupported_response_type` error
    #[must_use]
    pub fn unsupported_response_type(description: &str) -> Self {
        Self {
            error: "unsupported_response_type".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some(
                "https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1".to_owned(),
            ),
        }
    }

    /// Create an `unauthorized_client` error (RFC 6749 Section 4.1.2.1)
    /// Used when a client attempts a `grant_type` or `response_type` it was not registered for
    #[must_use]
    pub fn unauthorized_client(description: &str) -> Self {
        Self {
            error: "unauthorized_client".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some(
                "https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1".to_owned(),
            ),
        }
    }

    /// Create an `invalid_scope` error (RFC 6749 Section 4.1.2.1)
    /// Used when no requested scope survives the client/tier intersection
    #[must_use]
    pub fn invalid_scope(description: &str) -> Self {
        Self {
            error: "invalid_scope".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some(
                "https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1".to_owned(),
            ),
        }
    }

    /// Create an `insufficient_scope` error (RFC 6750 Section 3.1)
    #[must_use]
    pub fn insufficient_scope(description: &str) -> Self {
        Self {
            error: "insufficient_scope".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some("https://datatracker.ietf.org/doc/html/rfc6750#section-3.1".to_owned()),
        }
    }

    /// Create an `invalid_token` error (RFC 6750 Section 3.1)
    #[must_use]
    pub fn invalid_token(description: &str) -> Self {
        Self {
            error: "invalid_token".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some("https://datatracker.ietf.org/doc/html/rfc6750#section-3.1".to_owned()),
        }
    }

    /// Create a `server_error` fallback (RFC 6749 Section 4.1.2.1)
    /// Catch-all so internal failures never escape as panics or stack traces
    #[must_use]
    pub fn server_error(description: &str) -> Self {
        Self {
            error: "server_error".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: None,
        }
    }
}
