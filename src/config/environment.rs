// ABOUTME: Environment-based configuration with validation of secrets and limits
// ABOUTME: ServerConfig::from_env loads and validates all runtime settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

//! # Environment Configuration
//!
//! All runtime settings load from environment variables. The loader is
//! strict about the API-key signing secret: a missing value or the
//! well-known insecure placeholder is a hard configuration error, never a
//! silent fallback.

use crate::constants::{api_keys, limits, rules};
use anyhow::{Context, Result};
use std::env;
use tracing::info;

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to a tracing level
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }

    /// Parse from string, defaulting to `Info` on unknown values
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "warn" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testing,
    Staging,
    Production,
}

impl Environment {
    /// Parse from string, defaulting to `Development` on unknown values
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "staging" => Self::Staging,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Whether this is a production deployment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Staging => "staging",
            Self::Production => "production",
        };
        write!(f, "{s}")
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Issuer URL advertised in discovery and embedded in token claims
    pub issuer: String,
    /// Deployment environment
    pub environment: Environment,
    /// Log level
    pub log_level: LogLevel,
    /// Authentication and token lifetimes
    pub auth: AuthConfig,
    /// API-key rate limiting
    pub rate_limit: RateLimitConfig,
    /// Rule engine report caching
    pub rule_cache: RuleCacheConfig,
}

/// Token and secret configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared secret for API-key HMAC signatures
    pub api_key_secret: String,
    /// User access token lifetime in hours
    pub access_token_expiry_hours: i64,
    /// Client-credentials token lifetime in hours
    pub client_token_expiry_hours: i64,
    /// Refresh token lifetime in days
    pub refresh_token_expiry_days: i64,
    /// Authorization code lifetime in minutes
    pub auth_code_ttl_minutes: i64,
}

/// API-key rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enforced
    pub enabled: bool,
    /// Maximum requests per key per window
    pub requests_per_window: u32,
    /// Sliding window length in seconds
    pub window_secs: u64,
    /// Tracked-key count above which stale entries are lazily swept
    pub cleanup_threshold: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: api_keys::RATE_LIMIT_REQUESTS,
            window_secs: api_keys::RATE_LIMIT_WINDOW_SECS,
            cleanup_threshold: 10_000,
        }
    }
}

/// Rule engine cache configuration
#[derive(Debug, Clone)]
pub struct RuleCacheConfig {
    /// Maximum cached reports before oldest-first eviction
    pub max_entries: usize,
    /// Default TTL for rules without an explicit `cache_duration`
    pub default_ttl_secs: u64,
}

impl Default for RuleCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: rules::CACHE_MAX_ENTRIES,
            default_ttl_secs: rules::CACHE_DEFAULT_TTL_SECS,
        }
    }
}

/// Read an environment variable with a default value
fn env_var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable fails to parse, or if
    /// `LUKHAS_API_KEY_SECRET` is missing or set to the insecure
    /// placeholder value.
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let environment =
            Environment::from_str_or_default(&env_var_or("ENVIRONMENT", "development"));

        let config = Self {
            issuer: env_var_or("LUKHAS_ISSUER", "https://auth.lukhas.ai"),
            environment,
            log_level: LogLevel::from_str_or_default(&env_var_or("LOG_LEVEL", "info")),
            auth: AuthConfig {
                api_key_secret: env::var("LUKHAS_API_KEY_SECRET").unwrap_or_default(),
                access_token_expiry_hours: env_var_or(
                    "ACCESS_TOKEN_EXPIRY_HOURS",
                    &limits::ACCESS_TOKEN_EXPIRY_HOURS.to_string(),
                )
                .parse()
                .context("Invalid ACCESS_TOKEN_EXPIRY_HOURS value")?,
                client_token_expiry_hours: env_var_or(
                    "CLIENT_TOKEN_EXPIRY_HOURS",
                    &limits::CLIENT_TOKEN_EXPIRY_HOURS.to_string(),
                )
                .parse()
                .context("Invalid CLIENT_TOKEN_EXPIRY_HOURS value")?,
                refresh_token_expiry_days: env_var_or(
                    "REFRESH_TOKEN_EXPIRY_DAYS",
                    &limits::REFRESH_TOKEN_EXPIRY_DAYS.to_string(),
                )
                .parse()
                .context("Invalid REFRESH_TOKEN_EXPIRY_DAYS value")?,
                auth_code_ttl_minutes: env_var_or(
                    "AUTH_CODE_TTL_MINUTES",
                    &limits::AUTH_CODE_TTL_MINUTES.to_string(),
                )
                .parse()
                .context("Invalid AUTH_CODE_TTL_MINUTES value")?,
            },
            rate_limit: RateLimitConfig {
                enabled: env_var_or("RATE_LIMIT_ENABLED", "true")
                    .parse()
                    .context("Invalid RATE_LIMIT_ENABLED value")?,
                requests_per_window: env_var_or(
                    "RATE_LIMIT_REQUESTS",
                    &api_keys::RATE_LIMIT_REQUESTS.to_string(),
                )
                .parse()
                .context("Invalid RATE_LIMIT_REQUESTS value")?,
                window_secs: env_var_or(
                    "RATE_LIMIT_WINDOW_SECS",
                    &api_keys::RATE_LIMIT_WINDOW_SECS.to_string(),
                )
                .parse()
                .context("Invalid RATE_LIMIT_WINDOW_SECS value")?,
                cleanup_threshold: env_var_or("RATE_LIMIT_CLEANUP_THRESHOLD", "10000")
                    .parse()
                    .context("Invalid RATE_LIMIT_CLEANUP_THRESHOLD value")?,
            },
            rule_cache: RuleCacheConfig {
                max_entries: env_var_or(
                    "RULE_CACHE_MAX_ENTRIES",
                    &rules::CACHE_MAX_ENTRIES.to_string(),
                )
                .parse()
                .context("Invalid RULE_CACHE_MAX_ENTRIES value")?,
                default_ttl_secs: env_var_or(
                    "RULE_CACHE_DEFAULT_TTL_SECS",
                    &rules::CACHE_DEFAULT_TTL_SECS.to_string(),
                )
                .parse()
                .context("Invalid RULE_CACHE_DEFAULT_TTL_SECS value")?,
            },
        };

        config.validate()?;

        info!(
            issuer = %config.issuer,
            environment = %config.environment,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate loaded configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the API-key secret is missing, is the insecure
    /// placeholder, or is too short to be a real secret.
    pub fn validate(&self) -> Result<()> {
        if self.auth.api_key_secret.is_empty() {
            anyhow::bail!(
                "LUKHAS_API_KEY_SECRET is not set; API-key signatures cannot be verified"
            );
        }
        if self.auth.api_key_secret == api_keys::INSECURE_DEFAULT_SECRET {
            anyhow::bail!(
                "LUKHAS_API_KEY_SECRET is set to the insecure placeholder value; \
                 configure a real secret"
            );
        }
        if self.environment.is_production() && self.auth.api_key_secret.len() < 32 {
            anyhow::bail!("LUKHAS_API_KEY_SECRET must be at least 32 characters in production");
        }
        if self.rate_limit.requests_per_window == 0 {
            anyhow::bail!("RATE_LIMIT_REQUESTS must be greater than zero");
        }
        Ok(())
    }

    /// Configuration for tests: in-memory defaults with a fixed test secret
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            issuer: "https://auth.lukhas.test".into(),
            environment: Environment::Testing,
            log_level: LogLevel::Debug,
            auth: AuthConfig {
                api_key_secret: "test-secret-0123456789abcdef0123456789abcdef".into(),
                access_token_expiry_hours: limits::ACCESS_TOKEN_EXPIRY_HOURS,
                client_token_expiry_hours: limits::CLIENT_TOKEN_EXPIRY_HOURS,
                refresh_token_expiry_days: limits::REFRESH_TOKEN_EXPIRY_DAYS,
                auth_code_ttl_minutes: limits::AUTH_CODE_TTL_MINUTES,
            },
            rate_limit: RateLimitConfig::default(),
            rule_cache: RuleCacheConfig::default(),
        }
    }
}
