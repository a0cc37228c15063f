// ABOUTME: Configuration module for environment-driven server settings
// ABOUTME: Exposes ServerConfig and typed sub-configurations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

/// Environment-variable driven configuration loading
pub mod environment;

pub use environment::{
    AuthConfig, Environment, LogLevel, RateLimitConfig, RuleCacheConfig, ServerConfig,
};
