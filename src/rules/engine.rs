// ABOUTME: Rule evaluation engine: context gating, condition evaluation, verdict combination
// ABOUTME: Comparison failures fold into failed conditions and never propagate as errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

//! # Rule Validator
//!
//! Evaluates declarative [`RuleDefinition`]s against arbitrary JSON data.
//! An evaluation moves through context gating (possibly deferring), then
//! per-condition comparison, then combination through the rule's logic
//! operator. The engine never returns an error: rules that cannot run
//! produce `ERROR` or `DEFERRED` reports, and any exception-like failure
//! during a comparison fails that condition only.

use super::cache::ReportCache;
use super::models::{
    ConditionOperator, ConditionOutcome, LogicOperator, RuleCondition, RuleDefinition,
    ValidationOutcome, ValidationReport,
};
use crate::config::RuleCacheConfig;
use crate::constants::rules::CONTEXT_TYPE_KEY;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

/// General-purpose rule evaluation engine with report caching
pub struct RuleValidator {
    rules: RwLock<HashMap<String, RuleDefinition>>,
    cache: ReportCache,
    default_ttl: Duration,
}

impl RuleValidator {
    /// Create a validator with the given cache configuration
    #[must_use]
    pub fn new(config: &RuleCacheConfig) -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            cache: ReportCache::new(config.max_entries),
            default_ttl: Duration::from_secs(config.default_ttl_secs),
        }
    }

    /// Register (or replace) a rule
    pub fn register_rule(&self, rule: RuleDefinition) {
        tracing::debug!(rule_id = %rule.rule_id, conditions = rule.conditions.len(), "Registered rule");
        self.rules
            .write()
            .expect("rule registry poisoned")
            .insert(rule.rule_id.clone(), rule);
    }

    /// Remove a rule. Returns whether it existed.
    pub fn remove_rule(&self, rule_id: &str) -> bool {
        self.rules
            .write()
            .expect("rule registry poisoned")
            .remove(rule_id)
            .is_some()
    }

    /// Number of registered rules
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.read().expect("rule registry poisoned").len()
    }

    /// Evaluate a rule against structured data.
    ///
    /// Unknown rule ids produce an `ERROR` report rather than an error
    /// value. With `use_cache`, a non-expired cached report for the same
    /// `(rule, data, context)` triple is returned with `cache_hit` set and
    /// no re-evaluation.
    pub async fn evaluate(
        &self,
        rule_id: &str,
        data: &Value,
        context: &Map<String, Value>,
        use_cache: bool,
    ) -> ValidationReport {
        let Some(rule) = self
            .rules
            .read()
            .expect("rule registry poisoned")
            .get(rule_id)
            .cloned()
        else {
            tracing::warn!(rule_id = %rule_id, "Evaluation requested for unknown rule");
            return ValidationReport::error(rule_id, &format!("Unknown rule: {rule_id}"));
        };

        let cache_key = ReportCache::cache_key(rule_id, data, context);
        if use_cache {
            if let Some(mut cached) = self.cache.get(&cache_key) {
                tracing::debug!(rule_id = %rule_id, "Rule cache hit");
                cached.cache_hit = true;
                return cached;
            }
        }

        let report = self.run_evaluation(&rule, data, context);

        // ERROR reports are never cached; everything else is deterministic
        // for the hashed inputs and safe to replay within the TTL
        if use_cache && report.outcome != ValidationOutcome::Error {
            let ttl = rule
                .cache_duration_secs
                .map_or(self.default_ttl, Duration::from_secs);
            self.cache.insert(cache_key, report.clone(), ttl);
        }

        report
    }

    /// Run one full evaluation: gate on context, evaluate, combine
    fn run_evaluation(
        &self,
        rule: &RuleDefinition,
        data: &Value,
        context: &Map<String, Value>,
    ) -> ValidationReport {
        if let Some(deferred) = Self::check_context(rule, context) {
            return deferred;
        }

        let condition_results: Vec<ConditionOutcome> = rule
            .conditions
            .iter()
            .map(|condition| Self::evaluate_condition(condition, data))
            .collect();

        Self::combine(rule, context, condition_results)
    }

    /// Context gating: defer when the rule does not apply or lacks context.
    ///
    /// Deferral is not failure; the report lists what is missing so the
    /// caller can retry with more context.
    fn check_context(
        rule: &RuleDefinition,
        context: &Map<String, Value>,
    ) -> Option<ValidationReport> {
        let context_type = context.get(CONTEXT_TYPE_KEY).and_then(Value::as_str);

        if let Some(context_type) = context_type {
            if rule.excluded_contexts.iter().any(|c| c == context_type) {
                return Some(ValidationReport::deferred(
                    &rule.rule_id,
                    Vec::new(),
                    format!("Rule is excluded in context '{context_type}'"),
                ));
            }
            if !rule.applicable_contexts.is_empty()
                && !rule.applicable_contexts.iter().any(|c| c == context_type)
            {
                return Some(ValidationReport::deferred(
                    &rule.rule_id,
                    Vec::new(),
                    format!("Rule does not apply in context '{context_type}'"),
                ));
            }
        } else if !rule.applicable_contexts.is_empty() {
            return Some(ValidationReport::deferred(
                &rule.rule_id,
                vec![CONTEXT_TYPE_KEY.to_owned()],
                "Provide a context_type so applicability can be determined".to_owned(),
            ));
        }

        let missing: Vec<String> = rule
            .required_context
            .iter()
            .filter(|key| !context.contains_key(*key))
            .cloned()
            .collect();

        if missing.is_empty() {
            None
        } else {
            let suggestion = format!("Provide missing context keys: {}", missing.join(", "));
            Some(ValidationReport::deferred(&rule.rule_id, missing, suggestion))
        }
    }

    /// Evaluate a single condition against the data.
    ///
    /// Missing fields auto-pass optional conditions and fail required
    /// ones; comparison errors (type mismatches, bad regex) fail the
    /// condition with a diagnostic instead of propagating.
    fn evaluate_condition(condition: &RuleCondition, data: &Value) -> ConditionOutcome {
        let field_value = lookup_path(data, &condition.field_path);

        let (passed, detail) = match field_value {
            None => {
                if condition.optional {
                    (true, "optional field absent".to_owned())
                } else {
                    (false, "required field absent".to_owned())
                }
            }
            Some(value) => match Self::compare(condition, value) {
                Ok(true) => (true, format!("{} check passed", condition.operator)),
                Ok(false) => (false, format!("{} check failed", condition.operator)),
                Err(reason) => (false, format!("comparison error: {reason}")),
            },
        };

        ConditionOutcome {
            condition_id: condition.id.clone(),
            field_path: condition.field_path.clone(),
            passed,
            score: if passed { 1.0 } else { 0.0 },
            detail,
        }
    }

    /// Apply the condition operator. The enum match is exhaustive, so a new
    /// operator cannot be added without deciding its semantics here.
    fn compare(condition: &RuleCondition, value: &Value) -> Result<bool, String> {
        match condition.operator {
            ConditionOperator::Equals => Ok(value == &condition.expected),
            ConditionOperator::NotEquals => Ok(value != &condition.expected),
            ConditionOperator::GreaterThan => {
                let (lhs, rhs) = Self::numeric_pair(value, &condition.expected)?;
                Ok(lhs > rhs)
            }
            ConditionOperator::LessThan => {
                let (lhs, rhs) = Self::numeric_pair(value, &condition.expected)?;
                Ok(lhs < rhs)
            }
            ConditionOperator::Contains => match (value, &condition.expected) {
                (Value::String(haystack), Value::String(needle)) => {
                    Ok(haystack.contains(needle.as_str()))
                }
                (Value::Array(items), expected) => Ok(items.contains(expected)),
                _ => Err("contains requires a string or array field".to_owned()),
            },
            ConditionOperator::Matches => {
                let pattern = condition
                    .expected
                    .as_str()
                    .ok_or_else(|| "matches requires a string pattern".to_owned())?;
                let subject = value
                    .as_str()
                    .ok_or_else(|| "matches requires a string field".to_owned())?;
                let regex = regex::Regex::new(pattern).map_err(|e| e.to_string())?;
                Ok(regex.is_match(subject))
            }
        }
    }

    /// Extract both sides of a numeric comparison
    fn numeric_pair(value: &Value, expected: &Value) -> Result<(f64, f64), String> {
        let lhs = value
            .as_f64()
            .ok_or_else(|| "field value is not numeric".to_owned())?;
        let rhs = expected
            .as_f64()
            .ok_or_else(|| "expected value is not numeric".to_owned())?;
        Ok((lhs, rhs))
    }

    /// Combine condition outcomes through the rule's logic operator
    fn combine(
        rule: &RuleDefinition,
        context: &Map<String, Value>,
        condition_results: Vec<ConditionOutcome>,
    ) -> ValidationReport {
        let passed_count = condition_results.iter().filter(|r| r.passed).count();
        let failed_count = condition_results.len() - passed_count;

        let weighted_score = Self::weighted_score(rule, &condition_results);

        let (outcome, score) = match rule.logic_operator {
            LogicOperator::And => {
                if failed_count == 0 {
                    (ValidationOutcome::Valid, weighted_score)
                } else if passed_count == 0 {
                    (ValidationOutcome::Invalid, 0.0)
                } else {
                    (ValidationOutcome::Partial, weighted_score)
                }
            }
            LogicOperator::Or => {
                if passed_count > 0 {
                    let best = condition_results
                        .iter()
                        .filter(|r| r.passed)
                        .map(|r| r.score)
                        .fold(0.0_f64, f64::max);
                    (ValidationOutcome::Valid, best)
                } else {
                    (ValidationOutcome::Invalid, 0.0)
                }
            }
            LogicOperator::Xor => match passed_count {
                1 => (ValidationOutcome::Valid, 1.0),
                0 => (ValidationOutcome::Invalid, 0.0),
                _ => (ValidationOutcome::Partial, weighted_score),
            },
        };

        let failed_conditions: Vec<String> = condition_results
            .iter()
            .filter(|result| !result.passed)
            .map(|result| {
                let condition_label = rule
                    .conditions
                    .iter()
                    .find(|c| c.id == result.condition_id)
                    .map_or_else(String::new, |c| c.operator.as_str().to_owned());
                format!(
                    "Condition {}: Field '{}' {} check",
                    result.condition_id, result.field_path, condition_label
                )
            })
            .collect();

        let suggestions: Vec<String> = condition_results
            .iter()
            .filter(|result| !result.passed)
            .map(|result| {
                format!(
                    "Adjust '{}' so that its {} condition holds ({})",
                    result.field_path,
                    result.condition_id,
                    result.detail
                )
            })
            .collect();

        let confidence = Self::confidence(rule, context, passed_count, condition_results.len());

        ValidationReport {
            rule_id: rule.rule_id.clone(),
            outcome,
            score,
            confidence,
            condition_results,
            failed_conditions,
            missing_context: Vec::new(),
            suggestions,
            cache_hit: false,
            evaluated_at: Utc::now(),
        }
    }

    /// Weighted average of condition scores
    fn weighted_score(rule: &RuleDefinition, results: &[ConditionOutcome]) -> f64 {
        let mut total_weight = 0.0;
        let mut weighted = 0.0;

        for result in results {
            let weight = rule
                .conditions
                .iter()
                .find(|c| c.id == result.condition_id)
                .map_or(1.0, |c| c.weight)
                .max(0.0);
            total_weight += weight;
            weighted += weight * result.score;
        }

        if total_weight > 0.0 {
            weighted / total_weight
        } else {
            0.0
        }
    }

    /// Reporting-only confidence heuristic: success rate, context
    /// completeness, and a penalty for rules with many conditions. Never
    /// gates the VALID/INVALID decision.
    fn confidence(
        rule: &RuleDefinition,
        context: &Map<String, Value>,
        passed_count: usize,
        condition_count: usize,
    ) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let success_rate = if condition_count == 0 {
            1.0
        } else {
            passed_count as f64 / condition_count as f64
        };

        #[allow(clippy::cast_precision_loss)]
        let context_completeness = if rule.required_context.is_empty() {
            1.0
        } else {
            let provided = rule
                .required_context
                .iter()
                .filter(|key| context.contains_key(*key))
                .count();
            provided as f64 / rule.required_context.len() as f64
        };

        #[allow(clippy::cast_precision_loss)]
        let complexity_factor = 1.0 / (1.0 + 0.1 * condition_count.saturating_sub(1) as f64);

        (0.6 * success_rate + 0.3 * context_completeness + 0.1 * complexity_factor).clamp(0.0, 1.0)
    }
}

/// Fetch a value at a dotted path. Returns `None` when any segment is
/// absent or an intermediate value is not an object.
fn lookup_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn condition(id: &str, path: &str, operator: ConditionOperator, expected: Value) -> RuleCondition {
        RuleCondition {
            id: id.to_owned(),
            field_path: path.to_owned(),
            operator,
            expected,
            weight: 1.0,
            optional: false,
        }
    }

    fn rule(rule_id: &str, logic: LogicOperator, conditions: Vec<RuleCondition>) -> RuleDefinition {
        RuleDefinition {
            rule_id: rule_id.to_owned(),
            name: rule_id.to_owned(),
            description: String::new(),
            conditions,
            logic_operator: logic,
            required_context: Vec::new(),
            applicable_contexts: Vec::new(),
            excluded_contexts: Vec::new(),
            cache_duration_secs: None,
        }
    }

    fn validator() -> RuleValidator {
        RuleValidator::new(&RuleCacheConfig::default())
    }

    #[test]
    fn test_lookup_path() {
        let data = json!({"user": {"profile": {"age": 21}}});

        assert_eq!(
            lookup_path(&data, "user.profile.age"),
            Some(&json!(21))
        );
        assert!(lookup_path(&data, "user.profile.name").is_none());
        assert!(lookup_path(&data, "user.profile.age.nested").is_none());
    }

    #[tokio::test]
    async fn test_unknown_rule_is_error_report() {
        let validator = validator();
        let report = validator
            .evaluate("nope", &json!({}), &Map::new(), false)
            .await;

        assert_eq!(report.outcome, ValidationOutcome::Error);
        assert!(!report.cache_hit);
    }

    #[tokio::test]
    async fn test_comparison_error_fails_condition() {
        let validator = validator();
        validator.register_rule(rule(
            "numeric",
            LogicOperator::And,
            vec![condition(
                "c1",
                "age",
                ConditionOperator::GreaterThan,
                json!(18),
            )],
        ));

        // Non-numeric field: the condition fails, the engine does not error
        let report = validator
            .evaluate("numeric", &json!({"age": "twenty"}), &Map::new(), false)
            .await;
        assert_eq!(report.outcome, ValidationOutcome::Invalid);
        assert!(report.condition_results[0]
            .detail
            .contains("comparison error"));
    }

    #[tokio::test]
    async fn test_bad_regex_fails_condition() {
        let validator = validator();
        validator.register_rule(rule(
            "regex",
            LogicOperator::And,
            vec![condition(
                "c1",
                "name",
                ConditionOperator::Matches,
                json!("(unclosed"),
            )],
        ));

        let report = validator
            .evaluate("regex", &json!({"name": "anything"}), &Map::new(), false)
            .await;
        assert_eq!(report.outcome, ValidationOutcome::Invalid);
    }
}
