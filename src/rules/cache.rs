// ABOUTME: Bounded TTL cache for validation reports with oldest-first eviction
// ABOUTME: Keys are SHA-256 over rule id plus canonically sorted JSON inputs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

use super::models::ValidationReport;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry {
    report: ValidationReport,
    stored_at: Instant,
    ttl: Duration,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Insertion order for oldest-first eviction
    order: VecDeque<String>,
}

/// Bounded report cache.
///
/// Entries expire per-rule (`cache_duration_secs`) and the cache as a whole
/// is capped: once it exceeds `max_entries`, the oldest insertions are
/// evicted first regardless of their remaining TTL.
pub struct ReportCache {
    inner: Mutex<CacheInner>,
    max_entries: usize,
}

impl ReportCache {
    /// Create a cache bounded at `max_entries`
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_entries,
        }
    }

    /// Deterministic cache key for an evaluation.
    ///
    /// Object keys are sorted recursively before hashing so that two JSON
    /// documents with equal content but different key order hit the same
    /// entry.
    #[must_use]
    pub fn cache_key(rule_id: &str, data: &Value, context: &Map<String, Value>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(rule_id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(canonical_json(data).as_bytes());
        hasher.update(b"\x1f");
        hasher.update(canonical_json(&Value::Object(context.clone())).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Fetch a non-expired report. Expired entries are dropped on access.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ValidationReport> {
        let mut inner = self.inner.lock().expect("rule cache poisoned");

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.stored_at.elapsed() >= entry.ttl,
            None => return None,
        };

        if expired {
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
            return None;
        }

        inner.entries.get(key).map(|entry| entry.report.clone())
    }

    /// Store a report with the given TTL, evicting oldest entries past the cap
    pub fn insert(&self, key: String, report: ValidationReport, ttl: Duration) {
        let mut inner = self.inner.lock().expect("rule cache poisoned");

        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                report,
                stored_at: Instant::now(),
                ttl,
            },
        );

        while inner.entries.len() > self.max_entries {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }

    /// Number of cached reports
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("rule cache poisoned").entries.len()
    }

    /// Whether the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serialize JSON with recursively sorted object keys
fn canonical_json(value: &Value) -> String {
    fn sort_value(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
                sorted.sort_by_key(|(k, _)| k.as_str());
                let mut out = Map::with_capacity(sorted.len());
                for (k, v) in sorted {
                    out.insert(k.clone(), sort_value(v));
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
            other => other.clone(),
        }
    }

    sort_value(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::models::{ValidationOutcome, ValidationReport};
    use serde_json::json;

    fn report(rule_id: &str) -> ValidationReport {
        let mut report = ValidationReport::error(rule_id, "placeholder");
        report.outcome = ValidationOutcome::Valid;
        report
    }

    #[test]
    fn test_cache_key_ignores_object_key_order() {
        let a = json!({"b": 1, "a": {"y": 2, "x": 3}});
        let b = json!({"a": {"x": 3, "y": 2}, "b": 1});
        let ctx = Map::new();

        assert_eq!(
            ReportCache::cache_key("r1", &a, &ctx),
            ReportCache::cache_key("r1", &b, &ctx)
        );
        assert_ne!(
            ReportCache::cache_key("r1", &a, &ctx),
            ReportCache::cache_key("r2", &a, &ctx)
        );
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = ReportCache::new(10);
        cache.insert("k".into(), report("r1"), Duration::from_secs(0));
        assert!(cache.get("k").is_none());

        cache.insert("k".into(), report("r1"), Duration::from_secs(300));
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn test_oldest_first_eviction() {
        let cache = ReportCache::new(3);
        for i in 0..4 {
            cache.insert(format!("k{i}"), report("r1"), Duration::from_secs(300));
        }

        assert_eq!(cache.len(), 3);
        assert!(cache.get("k0").is_none());
        assert!(cache.get("k3").is_some());
    }
}
