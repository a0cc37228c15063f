// ABOUTME: Rule engine data model: definitions, conditions, operators, and reports
// ABOUTME: Closed operator enums give compile-time exhaustive dispatch
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comparison applied by a single condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    Matches,
}

impl ConditionOperator {
    /// Wire-format name, used in report messages
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::Contains => "contains",
            Self::Matches => "matches",
        }
    }
}

impl std::fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boolean combinator merging condition outcomes into one verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicOperator {
    And,
    Or,
    Xor,
}

/// Overall result of a rule evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationOutcome {
    /// The rule is satisfied
    Valid,
    /// The rule is not satisfied
    Invalid,
    /// Some but not all conditions hold
    Partial,
    /// The rule could not run yet: required context is missing, or the rule
    /// does not apply in the caller's context. Not a failure; retry with
    /// more context.
    Deferred,
    /// The rule itself could not be evaluated (unknown rule id)
    Error,
}

/// One atomic comparison inside a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCondition {
    /// Condition identifier, referenced in report messages
    pub id: String,
    /// Dotted path into the evaluated data (`user.profile.age`)
    pub field_path: String,
    /// Comparison operator
    pub operator: ConditionOperator,
    /// Expected value, or the regex pattern for `matches`
    pub expected: serde_json::Value,
    /// Relative weight in the combined score
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Optional conditions auto-pass when their field is absent
    #[serde(default)]
    pub optional: bool,
}

fn default_weight() -> f64 {
    1.0
}

/// Declarative validation rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Unique rule identifier
    pub rule_id: String,
    /// Human-readable name
    pub name: String,
    /// What the rule checks
    pub description: String,
    /// Ordered conditions
    pub conditions: Vec<RuleCondition>,
    /// How condition outcomes combine
    pub logic_operator: LogicOperator,
    /// Context keys that must be present before the rule can run
    #[serde(default)]
    pub required_context: Vec<String>,
    /// Context types the rule applies to (empty = all)
    #[serde(default)]
    pub applicable_contexts: Vec<String>,
    /// Context types the rule must not run in
    #[serde(default)]
    pub excluded_contexts: Vec<String>,
    /// Report cache TTL in seconds (engine default when absent)
    #[serde(default)]
    pub cache_duration_secs: Option<u64>,
}

/// Outcome of one condition within a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionOutcome {
    /// Condition identifier
    pub condition_id: String,
    /// Field path the condition inspected
    pub field_path: String,
    /// Whether the condition held
    pub passed: bool,
    /// 0.0 or 1.0 per condition
    pub score: f64,
    /// Diagnostic detail (why it passed or failed)
    pub detail: String,
}

/// Value object produced by every evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Rule that was evaluated
    pub rule_id: String,
    /// Overall verdict
    pub outcome: ValidationOutcome,
    /// Weighted pass score in [0, 1]
    pub score: f64,
    /// Reporting-only confidence in [0, 1]; never gates the verdict
    pub confidence: f64,
    /// Per-condition outcomes
    pub condition_results: Vec<ConditionOutcome>,
    /// Messages for each failed condition
    pub failed_conditions: Vec<String>,
    /// Context keys that were required but absent (Deferred only)
    pub missing_context: Vec<String>,
    /// Human-readable follow-up suggestions
    pub suggestions: Vec<String>,
    /// Whether this report came from the cache
    pub cache_hit: bool,
    /// When the evaluation ran
    pub evaluated_at: DateTime<Utc>,
}

impl ValidationReport {
    /// Report for a rule that could not be evaluated at all
    #[must_use]
    pub fn error(rule_id: &str, detail: &str) -> Self {
        Self {
            rule_id: rule_id.to_owned(),
            outcome: ValidationOutcome::Error,
            score: 0.0,
            confidence: 0.0,
            condition_results: Vec::new(),
            failed_conditions: Vec::new(),
            missing_context: Vec::new(),
            suggestions: vec![detail.to_owned()],
            cache_hit: false,
            evaluated_at: Utc::now(),
        }
    }

    /// Report deferring evaluation until more context arrives
    #[must_use]
    pub fn deferred(rule_id: &str, missing_context: Vec<String>, suggestion: String) -> Self {
        Self {
            rule_id: rule_id.to_owned(),
            outcome: ValidationOutcome::Deferred,
            score: 0.0,
            confidence: 0.0,
            condition_results: Vec::new(),
            failed_conditions: Vec::new(),
            missing_context,
            suggestions: vec![suggestion],
            cache_hit: false,
            evaluated_at: Utc::now(),
        }
    }
}
