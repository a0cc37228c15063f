// ABOUTME: Structured API key generation and validation with embedded HMAC signatures
// ABOUTME: Four-stage pipeline: format, rate limit, signature, masked audit on failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

//! # API Key Validation
//!
//! A sibling credential scheme to the OAuth flows: keys of the form
//! `luk_<env>_<32 hex base><16 hex signature>` where the signature is
//! HMAC-SHA256 over `luk_<env>_<base>`, truncated to 16 hex characters.
//! Validation short-circuits through format, rate-limit, and signature
//! checks, and every failure emits a masked audit record so operators can
//! trace abuse without full keys landing in logs.

use crate::constants::api_keys;
use crate::errors::AppError;
use crate::rate_limiting::{RateLimitStatus, SlidingWindowRateLimiter};
use rand::RngCore;
use ring::hmac;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::warn;

/// Deployment environment embedded in a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyEnvironment {
    Dev,
    Test,
    Staging,
    Prod,
}

impl ApiKeyEnvironment {
    /// The `<env>` segment of the key format
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }

    /// Parse an environment segment
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dev" => Some(Self::Dev),
            "test" => Some(Self::Test),
            "staging" => Some(Self::Staging),
            "prod" => Some(Self::Prod),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApiKeyEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Distinct validation failure kinds so callers can react differently
/// (401 for credential problems, 429 for rate limiting)
#[derive(Debug, Clone, Error)]
pub enum ApiKeyError {
    /// No key was presented at all
    #[error("API key is missing")]
    Missing,
    /// Key does not match the `luk_<env>_<hex>` structure
    #[error("API key format is invalid: {0}")]
    InvalidFormat(String),
    /// Too many requests inside the sliding window
    #[error("API key rate limit exceeded")]
    RateLimited {
        /// Window request cap
        limit: u32,
        /// Seconds until a slot frees up
        retry_after_seconds: u64,
    },
    /// Embedded HMAC signature does not verify
    #[error("API key signature is invalid")]
    InvalidSignature,
}

impl From<ApiKeyError> for AppError {
    fn from(error: ApiKeyError) -> Self {
        match error {
            ApiKeyError::Missing => Self::auth_required(),
            ApiKeyError::InvalidFormat(detail) => Self::auth_malformed(detail),
            ApiKeyError::RateLimited {
                limit,
                retry_after_seconds,
            } => Self::rate_limit_exceeded(
                limit,
                i64::try_from(retry_after_seconds).unwrap_or(i64::MAX),
            ),
            ApiKeyError::InvalidSignature => Self::auth_invalid("API key signature is invalid"),
        }
    }
}

/// Structural parts of a well-formed key
#[derive(Debug)]
struct ParsedKey<'a> {
    environment: ApiKeyEnvironment,
    /// `luk_<env>_<base>` — the exact message the signature covers
    signed_message: &'a str,
    /// Trailing 16 hex characters
    signature: &'a str,
}

/// Mask a key for audit logs: first 12 characters stay visible
#[must_use]
pub fn mask_key(api_key: &str) -> String {
    let visible: String = api_key.chars().take(api_keys::KEY_MASK_VISIBLE).collect();
    format!("{visible}***")
}

/// API key generator and validator
pub struct ApiKeyManager {
    signing_key: hmac::Key,
    limiter: SlidingWindowRateLimiter,
}

impl ApiKeyManager {
    /// Create a manager from the configured shared secret.
    ///
    /// The configuration loader has already refused empty or placeholder
    /// secrets, so any string reaching this point is intentional.
    #[must_use]
    pub fn new(secret: &str, limiter: SlidingWindowRateLimiter) -> Self {
        Self {
            signing_key: hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
            limiter,
        }
    }

    /// Generate a new key for the given environment.
    ///
    /// The signature is deterministic over the same message format
    /// [`Self::verify_signature`] checks, so generated keys always
    /// validate against the same secret.
    #[must_use]
    pub fn generate(&self, environment: ApiKeyEnvironment) -> String {
        let mut base_bytes = [0u8; api_keys::KEY_BASE_LEN / 2];
        rand::thread_rng().fill_bytes(&mut base_bytes);
        let base = hex::encode(base_bytes);

        let message = format!("{}_{}_{base}", api_keys::KEY_PREFIX, environment.as_str());
        let signature = self.sign_message(&message);

        format!("{message}{signature}")
    }

    /// Full validation pipeline: presence, format, rate limit, signature.
    ///
    /// Checks run in order and short-circuit on the first failure; every
    /// failure is audit-logged with a masked key and the caller IP before
    /// being returned.
    ///
    /// # Errors
    /// Returns the distinct [`ApiKeyError`] kind of the first failed stage
    pub fn validate(&self, api_key: Option<&str>, client_ip: &str) -> Result<(), ApiKeyError> {
        let Some(api_key) = api_key.filter(|k| !k.is_empty()) else {
            Self::audit_failure("missing", "", client_ip);
            return Err(ApiKeyError::Missing);
        };

        if let Err(e) = self.validate_format(api_key) {
            Self::audit_failure("format", api_key, client_ip);
            return Err(e);
        }

        let status = self.limiter.check(api_key);
        if status.is_limited {
            Self::audit_failure("rate_limit", api_key, client_ip);
            return Err(Self::rate_limited(&status));
        }

        if let Err(e) = self.verify_signature(api_key) {
            Self::audit_failure("signature", api_key, client_ip);
            return Err(e);
        }

        Ok(())
    }

    /// Structural format check: prefix, environment, hex payload lengths.
    ///
    /// # Errors
    /// Returns `InvalidFormat` naming the first violated constraint
    pub fn validate_format(&self, api_key: &str) -> Result<(), ApiKeyError> {
        Self::parse_key(api_key).map(|_| ())
    }

    /// Verify the embedded HMAC signature in constant time.
    ///
    /// # Errors
    /// Returns `InvalidFormat` for keys that do not parse and
    /// `InvalidSignature` when the signature does not match
    pub fn verify_signature(&self, api_key: &str) -> Result<(), ApiKeyError> {
        let parsed = Self::parse_key(api_key)?;
        let expected = self.sign_message(parsed.signed_message);

        if expected
            .as_bytes()
            .ct_eq(parsed.signature.as_bytes())
            .into()
        {
            Ok(())
        } else {
            Err(ApiKeyError::InvalidSignature)
        }
    }

    /// Extract the environment from a well-formed key
    ///
    /// # Errors
    /// Returns `InvalidFormat` for keys that do not parse
    pub fn key_environment(&self, api_key: &str) -> Result<ApiKeyEnvironment, ApiKeyError> {
        Self::parse_key(api_key).map(|parsed| parsed.environment)
    }

    /// HMAC-SHA256 over the message, truncated to the signature length
    fn sign_message(&self, message: &str) -> String {
        let tag = hmac::sign(&self.signing_key, message.as_bytes());
        hex::encode(&tag.as_ref()[..api_keys::KEY_SIGNATURE_LEN / 2])
    }

    /// Parse and structurally validate a key
    fn parse_key(api_key: &str) -> Result<ParsedKey<'_>, ApiKeyError> {
        // Longest legal key: luk_staging_ + 48 hex chars
        let max_len = api_keys::KEY_PREFIX.len()
            + 1
            + "staging".len()
            + 1
            + api_keys::KEY_BASE_LEN
            + api_keys::KEY_SIGNATURE_LEN;
        if api_key.len() > max_len || api_key.len() < api_keys::KEY_BASE_LEN {
            return Err(ApiKeyError::InvalidFormat("unexpected key length".into()));
        }

        let rest = api_key
            .strip_prefix("luk_")
            .ok_or_else(|| ApiKeyError::InvalidFormat("missing luk_ prefix".into()))?;

        let (env_segment, payload) = rest
            .split_once('_')
            .ok_or_else(|| ApiKeyError::InvalidFormat("missing environment segment".into()))?;

        let environment = ApiKeyEnvironment::parse(env_segment).ok_or_else(|| {
            ApiKeyError::InvalidFormat(format!("unknown environment: {env_segment}"))
        })?;

        if payload.len() != api_keys::KEY_BASE_LEN + api_keys::KEY_SIGNATURE_LEN {
            return Err(ApiKeyError::InvalidFormat("unexpected payload length".into()));
        }
        if !payload.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ApiKeyError::InvalidFormat("payload is not hex".into()));
        }

        let signature_start = api_key.len() - api_keys::KEY_SIGNATURE_LEN;
        Ok(ParsedKey {
            environment,
            signed_message: &api_key[..signature_start],
            signature: &api_key[signature_start..],
        })
    }

    /// Build the rate-limited error from a limiter status
    fn rate_limited(status: &RateLimitStatus) -> ApiKeyError {
        ApiKeyError::RateLimited {
            limit: status.limit,
            retry_after_seconds: status.retry_after_seconds.unwrap_or_default(),
        }
    }

    /// Emit the masked audit record for a failed validation.
    ///
    /// The timestamp rides on the tracing event itself; only the first 12
    /// characters of the key are visible.
    fn audit_failure(kind: &str, api_key: &str, client_ip: &str) {
        warn!(
            failure = kind,
            api_key = %mask_key(api_key),
            client_ip = %client_ip,
            "API key validation failed"
        );
    }
}
