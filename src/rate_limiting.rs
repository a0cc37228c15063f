// ABOUTME: Sliding-window rate limiting keyed by credential string
// ABOUTME: DashMap-sharded request timestamp tracking with lazy stale-entry cleanup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

//! # Rate Limiting
//!
//! A true sliding window: each key keeps the timestamps of its requests
//! inside the window, so the limit cannot be gamed by straddling a window
//! boundary. `DashMap` gives sharded locking instead of a global mutex so
//! concurrent checks on different keys do not contend.

use crate::config::RateLimitConfig;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a rate limit check
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    /// Whether this request was rejected
    pub is_limited: bool,
    /// Maximum requests allowed in the window
    pub limit: u32,
    /// Requests remaining in the current window
    pub remaining: u32,
    /// Seconds until a slot frees up (only when limited)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

/// Per-key sliding-window rate limiter
#[derive(Clone)]
pub struct SlidingWindowRateLimiter {
    /// Per-key request timestamps within the window
    state: Arc<DashMap<String, VecDeque<Instant>>>,
    config: RateLimitConfig,
}

impl SlidingWindowRateLimiter {
    /// Create a limiter with the given configuration
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Record a request for `key` and report whether it is allowed.
    ///
    /// When the key already has `limit` requests inside the window the
    /// request is rejected and not recorded, with `retry_after_seconds`
    /// measuring until the oldest in-window request ages out.
    #[must_use]
    pub fn check(&self, key: &str) -> RateLimitStatus {
        let limit = self.config.requests_per_window;

        if !self.config.enabled {
            return RateLimitStatus {
                is_limited: false,
                limit,
                remaining: limit,
                retry_after_seconds: None,
            };
        }

        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_secs);

        // Entry API keeps the trim-check-push sequence atomic per key
        let mut entry = self.state.entry(key.to_owned()).or_default();
        let timestamps = entry.value_mut();

        while timestamps
            .front()
            .is_some_and(|&oldest| now.duration_since(oldest) >= window)
        {
            timestamps.pop_front();
        }

        let used = u32::try_from(timestamps.len()).unwrap_or(u32::MAX);
        let status = if used >= limit {
            let retry_after = timestamps
                .front()
                .map(|&oldest| window.saturating_sub(now.duration_since(oldest)).as_secs())
                .unwrap_or_default();
            RateLimitStatus {
                is_limited: true,
                limit,
                remaining: 0,
                retry_after_seconds: Some(retry_after),
            }
        } else {
            timestamps.push_back(now);
            RateLimitStatus {
                is_limited: false,
                limit,
                remaining: limit - used - 1,
                retry_after_seconds: None,
            }
        };
        drop(entry);

        // Lazy cleanup off the hot path: only when the map has grown
        if self.state.len() > self.config.cleanup_threshold {
            self.cleanup_stale_entries(now, window);
        }

        status
    }

    /// Drop keys whose every recorded request has aged out of the window
    fn cleanup_stale_entries(&self, now: Instant, window: Duration) {
        self.state.retain(|_key, timestamps| {
            timestamps
                .back()
                .is_some_and(|&latest| now.duration_since(latest) < window)
        });
    }

    /// Number of keys currently tracked
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.state.len()
    }
}
