// ABOUTME: Integration tests for API key generation and the validation pipeline
// ABOUTME: Covers format, signature, rate limiting, and failure-kind mapping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use lukhas_auth::api_keys::{mask_key, ApiKeyEnvironment, ApiKeyError, ApiKeyManager};
use lukhas_auth::config::{RateLimitConfig, ServerConfig};
use lukhas_auth::errors::AppError;
use lukhas_auth::rate_limiting::SlidingWindowRateLimiter;

const CLIENT_IP: &str = "203.0.113.7";

fn manager() -> ApiKeyManager {
    let config = ServerConfig::for_testing();
    ApiKeyManager::new(
        &config.auth.api_key_secret,
        SlidingWindowRateLimiter::new(config.rate_limit),
    )
}

#[test]
fn test_generated_keys_validate_for_every_environment() {
    let manager = manager();

    for environment in [
        ApiKeyEnvironment::Dev,
        ApiKeyEnvironment::Test,
        ApiKeyEnvironment::Staging,
        ApiKeyEnvironment::Prod,
    ] {
        let key = manager.generate(environment);

        assert!(key.starts_with(&format!("luk_{environment}_")));
        assert!(manager.validate_format(&key).is_ok());
        assert!(manager.verify_signature(&key).is_ok());
        assert!(manager.validate(Some(&key), CLIENT_IP).is_ok());
        assert_eq!(manager.key_environment(&key).unwrap(), environment);
    }
}

#[test]
fn test_every_signature_character_is_load_bearing() {
    let manager = manager();
    let key = manager.generate(ApiKeyEnvironment::Prod);
    let signature_start = key.len() - 16;

    for position in signature_start..key.len() {
        let mut chars: Vec<char> = key.chars().collect();
        chars[position] = if chars[position] == 'f' { '0' } else { 'f' };
        let mutated: String = chars.into_iter().collect();

        assert!(
            matches!(
                manager.verify_signature(&mutated),
                Err(ApiKeyError::InvalidSignature)
            ),
            "signature survived a flip at position {position}"
        );
    }
}

#[test]
fn test_format_failures_are_distinct_from_signature_failures() {
    let manager = manager();

    // Structurally broken keys fail the format stage
    let unknown_env = format!("luk_qa_{}", "a".repeat(48));
    let bad_keys = [
        "luk_prod_tooshort",
        "wrong_prefix_0123456789abcdef0123456789abcdef0123456789abcdef",
        unknown_env.as_str(),
    ];
    for bad in bad_keys {
        assert!(matches!(
            manager.validate(Some(bad), CLIENT_IP),
            Err(ApiKeyError::InvalidFormat(_))
        ));
    }

    // A well-formed key with a forged signature fails the signature stage
    let key = manager.generate(ApiKeyEnvironment::Prod);
    let forged = format!("{}{}", &key[..key.len() - 16], "0123456789abcdef");
    let result = manager.validate(Some(&forged), CLIENT_IP);
    assert!(
        matches!(result, Err(ApiKeyError::InvalidSignature))
            || matches!(result, Ok(())) // astronomically unlikely collision
    );
}

#[test]
fn test_hundred_first_request_is_rate_limited() {
    let config = ServerConfig::for_testing();
    let manager = ApiKeyManager::new(
        &config.auth.api_key_secret,
        SlidingWindowRateLimiter::new(RateLimitConfig {
            enabled: true,
            requests_per_window: 100,
            window_secs: 3600,
            cleanup_threshold: 10_000,
        }),
    );
    let key = manager.generate(ApiKeyEnvironment::Prod);

    for _ in 0..100 {
        assert!(manager.validate(Some(&key), CLIENT_IP).is_ok());
    }

    let rejection = manager.validate(Some(&key), CLIENT_IP).unwrap_err();
    let ApiKeyError::RateLimited {
        limit,
        retry_after_seconds,
    } = rejection
    else {
        panic!("expected a rate-limit failure, got {rejection:?}");
    };
    assert_eq!(limit, 100);
    assert!(retry_after_seconds <= 3600);

    // A different key is unaffected
    let other_key = manager.generate(ApiKeyEnvironment::Prod);
    assert!(manager.validate(Some(&other_key), CLIENT_IP).is_ok());
}

#[test]
fn test_failure_kinds_map_to_http_statuses() {
    let rate_limited: AppError = ApiKeyError::RateLimited {
        limit: 100,
        retry_after_seconds: 60,
    }
    .into();
    assert_eq!(rate_limited.http_status(), 429);

    let missing: AppError = ApiKeyError::Missing.into();
    assert_eq!(missing.http_status(), 401);

    let malformed: AppError = ApiKeyError::InvalidFormat("bad".into()).into();
    assert_eq!(malformed.http_status(), 401);

    let forged: AppError = ApiKeyError::InvalidSignature.into();
    assert_eq!(forged.http_status(), 401);
}

#[test]
fn test_mask_preserves_twelve_characters() {
    let manager = manager();
    let key = manager.generate(ApiKeyEnvironment::Prod);

    let masked = mask_key(&key);
    assert!(masked.starts_with("luk_prod_"));
    assert_eq!(masked.len(), 12 + 3);
    assert!(!masked.contains(&key[20..]));
}
