// ABOUTME: JWT token codec issuing and verifying RS256 access and ID tokens
// ABOUTME: Claims carry subject, client, scope, trust tier, and ΛiD identifiers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

//! # Token Codec
//!
//! Mints and verifies the JWT-shaped tokens of the platform: bearer access
//! tokens (for users and for clients acting as themselves) and OIDC ID
//! tokens. All tokens are RS256-signed with the active JWKS key and carry
//! the signing `kid` in their header so verification survives rotation.

use crate::constants::service_names;
use crate::jwks::JwksManager;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT validation error with detailed information
#[derive(Debug, Clone)]
pub enum JwtValidationError {
    /// Token has expired
    TokenExpired {
        /// When the token expired
        expired_at: DateTime<Utc>,
        /// Current time for reference
        current_time: DateTime<Utc>,
    },
    /// Token signature is invalid
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Token is malformed (not proper JWT format)
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
}

impl std::fmt::Display for JwtValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TokenExpired {
                expired_at,
                current_time,
            } => {
                let expired_for = current_time.signed_duration_since(*expired_at);
                write!(
                    f,
                    "Token expired {} minutes ago at {}",
                    expired_for.num_minutes(),
                    expired_at.format("%Y-%m-%d %H:%M:%S UTC")
                )
            }
            Self::TokenInvalid { reason } => {
                write!(f, "Token signature is invalid: {reason}")
            }
            Self::TokenMalformed { details } => {
                write!(f, "Token is malformed: {details}")
            }
        }
    }
}

impl std::error::Error for JwtValidationError {}

/// Claims carried by bearer access tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: user ID, or `client:<client_id>` for client-credentials tokens
    pub sub: String,
    /// Client the token was issued to
    pub client_id: String,
    /// Granted scopes
    pub scope: Vec<String>,
    /// Trust tier of the subject
    pub lukhas_tier: u8,
    /// ΛiD subject identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lukhas_lambda_id: Option<String>,
    /// Unique token identifier
    pub jti: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
}

/// Claims carried by OIDC ID tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct IdClaims {
    /// Issuer
    pub iss: String,
    /// Authenticated subject
    pub sub: String,
    /// Audience: the requesting client
    pub aud: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
    /// Nonce echoed from the authorization request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Trust tier of the subject
    pub lukhas_tier: u8,
    /// ΛiD subject identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lukhas_lambda_id: Option<String>,
}

/// Parameters for minting an access token
pub struct AccessTokenParams<'a> {
    /// Client the token is issued to
    pub client_id: &'a str,
    /// User the token acts for; `None` mints a client-credentials token
    pub user_id: Option<&'a str>,
    /// Trust tier carried by the token
    pub tier: u8,
    /// Optional ΛiD subject identifier
    pub lambda_id: Option<&'a str>,
    /// Granted scopes
    pub scopes: &'a [String],
    /// Token lifetime
    pub lifetime: Duration,
}

/// Issues and verifies RS256 tokens using the JWKS key set
pub struct TokenManager {
    issuer: String,
}

impl TokenManager {
    /// Create a token manager for the given issuer
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    /// Issuer embedded in minted tokens
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Mint an RS256 access token.
    ///
    /// The subject is the user ID, or `client:<client_id>` when no user is
    /// involved (client-credentials grant). The `jti` claim makes every
    /// minted token unique even for identical inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the JWKS manager has no active key or JWT
    /// encoding fails.
    pub fn generate_access_token(
        &self,
        jwks_manager: &JwksManager,
        params: &AccessTokenParams<'_>,
    ) -> Result<String> {
        let now = Utc::now();
        let expiry = now + params.lifetime;

        let sub = params.user_id.map_or_else(
            || format!("client:{}", params.client_id),
            std::string::ToString::to_string,
        );

        let claims = AccessClaims {
            sub,
            client_id: params.client_id.to_owned(),
            scope: params.scopes.to_vec(),
            lukhas_tier: params.tier,
            lukhas_lambda_id: params.lambda_id.map(std::string::ToString::to_string),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
            iss: self.issuer.clone(),
            aud: service_names::RESOURCE_API.to_string(),
        };

        Self::sign(jwks_manager, &claims)
    }

    /// Mint an RS256 OIDC ID token asserting authentication facts.
    ///
    /// # Errors
    ///
    /// Returns an error if the JWKS manager has no active key or JWT
    /// encoding fails.
    pub fn generate_id_token(
        &self,
        jwks_manager: &JwksManager,
        client_id: &str,
        user_id: &str,
        tier: u8,
        lambda_id: Option<&str>,
        nonce: Option<&str>,
    ) -> Result<String> {
        let now = Utc::now();
        let expiry = now + Duration::hours(1);

        let claims = IdClaims {
            iss: self.issuer.clone(),
            sub: user_id.to_owned(),
            aud: client_id.to_owned(),
            exp: expiry.timestamp(),
            iat: now.timestamp(),
            nonce: nonce.map(std::string::ToString::to_string),
            lukhas_tier: tier,
            lukhas_lambda_id: lambda_id.map(std::string::ToString::to_string),
        };

        Self::sign(jwks_manager, &claims)
    }

    /// Validate an access token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] when the token is expired, carries
    /// a bad signature, references an unknown `kid`, or is not a JWT.
    pub fn validate_access_token(
        &self,
        token: &str,
        jwks_manager: &JwksManager,
    ) -> Result<AccessClaims, JwtValidationError> {
        let claims = Self::decode_claims(token, jwks_manager)?;

        let current_time = Utc::now();
        if current_time.timestamp() > claims.exp {
            let expired_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
            tracing::warn!(
                sub = %claims.sub,
                expired_at = %expired_at.to_rfc3339(),
                "Access token expired"
            );
            return Err(JwtValidationError::TokenExpired {
                expired_at,
                current_time,
            });
        }

        Ok(claims)
    }

    /// Decode access-token claims without expiry validation.
    ///
    /// Useful when an expired token's claims are needed to locate the
    /// matching refresh credential; the claims are read, not trusted.
    fn decode_claims(
        token: &str,
        jwks_manager: &JwksManager,
    ) -> Result<AccessClaims, JwtValidationError> {
        let header = jsonwebtoken::decode_header(token).map_err(|e| {
            JwtValidationError::TokenMalformed {
                details: format!("Failed to decode token header: {e}"),
            }
        })?;

        let kid = header
            .kid
            .ok_or_else(|| JwtValidationError::TokenMalformed {
                details: "Token header missing kid (key ID)".to_string(),
            })?;

        let key_pair =
            jwks_manager
                .get_key(&kid)
                .ok_or_else(|| JwtValidationError::TokenInvalid {
                    reason: format!("Key not found in JWKS: {kid}"),
                })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.set_audience(&[service_names::RESOURCE_API]);

        decode::<AccessClaims>(token, &key_pair.decoding_key(), &validation)
            .map(|token_data| token_data.claims)
            .map_err(|e| Self::convert_jwt_error(&e))
    }

    /// Sign claims with the active JWKS key, embedding its `kid`
    fn sign<T: Serialize>(jwks_manager: &JwksManager, claims: &T) -> Result<String> {
        let active_key = jwks_manager.get_active_key()?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(active_key.kid.clone());

        let token = encode(&header, claims, &active_key.encoding_key())?;
        Ok(token)
    }

    /// Convert JWT library errors to detailed validation errors
    fn convert_jwt_error(e: &jsonwebtoken::errors::Error) -> JwtValidationError {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::InvalidSignature => {
                tracing::warn!("JWT signature verification failed");
                JwtValidationError::TokenInvalid {
                    reason: "Token signature verification failed".into(),
                }
            }
            ErrorKind::InvalidToken => JwtValidationError::TokenMalformed {
                details: "Token format is invalid".into(),
            },
            ErrorKind::Base64(base64_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid base64: {base64_err}"),
            },
            ErrorKind::Json(json_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid JSON: {json_err}"),
            },
            _ => JwtValidationError::TokenInvalid {
                reason: format!("Token validation failed: {e}"),
            },
        }
    }
}
