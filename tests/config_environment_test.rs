// ABOUTME: Tests for environment-driven configuration loading and validation
// ABOUTME: Verifies the insecure-secret rejection path and numeric parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use lukhas_auth::config::{Environment, ServerConfig};
use serial_test::serial;
use std::env;

const SECRET_VAR: &str = "LUKHAS_API_KEY_SECRET";

fn clear_config_env() {
    for var in [
        SECRET_VAR,
        "ENVIRONMENT",
        "LUKHAS_ISSUER",
        "LOG_LEVEL",
        "ACCESS_TOKEN_EXPIRY_HOURS",
        "RATE_LIMIT_REQUESTS",
    ] {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_missing_secret_is_rejected() {
    clear_config_env();

    let error = ServerConfig::from_env().unwrap_err();
    assert!(error.to_string().contains(SECRET_VAR));
}

#[test]
#[serial]
fn test_insecure_placeholder_secret_is_rejected() {
    clear_config_env();
    env::set_var(SECRET_VAR, "lukhas-insecure-dev-secret");

    let error = ServerConfig::from_env().unwrap_err();
    assert!(error.to_string().contains("insecure"));

    clear_config_env();
}

#[test]
#[serial]
fn test_short_secret_rejected_in_production() {
    clear_config_env();
    env::set_var("ENVIRONMENT", "production");
    env::set_var(SECRET_VAR, "short");

    let error = ServerConfig::from_env().unwrap_err();
    assert!(error.to_string().contains("32 characters"));

    clear_config_env();
}

#[test]
#[serial]
fn test_valid_configuration_loads() {
    clear_config_env();
    env::set_var(SECRET_VAR, "a-real-secret-0123456789abcdef0123456789");
    env::set_var("ENVIRONMENT", "staging");
    env::set_var("LUKHAS_ISSUER", "https://auth.staging.lukhas.ai");
    env::set_var("ACCESS_TOKEN_EXPIRY_HOURS", "2");

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.environment, Environment::Staging);
    assert_eq!(config.issuer, "https://auth.staging.lukhas.ai");
    assert_eq!(config.auth.access_token_expiry_hours, 2);
    // Untouched settings keep their defaults
    assert_eq!(config.auth.refresh_token_expiry_days, 30);
    assert_eq!(config.rate_limit.requests_per_window, 100);
    assert_eq!(config.rule_cache.max_entries, 1000);

    clear_config_env();
}

#[test]
#[serial]
fn test_unparseable_numeric_is_an_error() {
    clear_config_env();
    env::set_var(SECRET_VAR, "a-real-secret-0123456789abcdef0123456789");
    env::set_var("RATE_LIMIT_REQUESTS", "not-a-number");

    let error = ServerConfig::from_env().unwrap_err();
    assert!(error.to_string().contains("RATE_LIMIT_REQUESTS"));

    clear_config_env();
}

#[test]
fn test_testing_config_is_always_valid() {
    let config = ServerConfig::for_testing();
    assert!(config.validate().is_ok());
    assert_eq!(config.environment, Environment::Testing);
}
