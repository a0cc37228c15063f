// ABOUTME: Main library entry point for the LUKHAS identity core
// ABOUTME: OAuth2/OIDC authorization server, API key validation, and policy rule engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

#![deny(unsafe_code)]

//! # LUKHAS Auth Core
//!
//! The authentication and authorization core of the LUKHAS identity
//! platform. Three loosely coupled components:
//!
//! - **`OAuth2`/OIDC authorization server**: dynamic client registration,
//!   authorization and token endpoints (code, implicit, refresh, and
//!   client-credentials flows with PKCE), introspection, UserInfo, and
//!   discovery/JWKS metadata. Scope grants are clamped by a 0-5 trust-tier
//!   policy.
//! - **API key validator**: a sibling credential scheme with embedded HMAC
//!   signatures and per-key sliding-window rate limiting.
//! - **Rule/policy validator**: a declarative rule engine producing scored,
//!   cached validation reports.
//!
//! The crate deliberately excludes the HTTP layer: an embedding server
//! extracts request parameters, calls these operations, and maps the
//! returned result objects onto status codes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lukhas_auth::config::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("issuer: {}", config.issuer);
//!     Ok(())
//! }
//! ```

/// API key generation and the four-stage validation pipeline
pub mod api_keys;

/// Environment-driven configuration
pub mod config;

/// Application constants grouped by domain
pub mod constants;

/// Unified error handling with standard error codes
pub mod errors;

/// JWKS key lifecycle management for RS256 signing
pub mod jwks;

/// Structured logging setup
pub mod logging;

/// OAuth 2.0 / OIDC authorization server
pub mod oauth2;

/// Sliding-window rate limiting
pub mod rate_limiting;

/// Declarative rule/policy validation engine
pub mod rules;

/// Credential store abstraction and in-memory implementation
pub mod store;

/// Trust-tier scope policy
pub mod tiers;

/// JWT token codec for access and ID tokens
pub mod tokens;
