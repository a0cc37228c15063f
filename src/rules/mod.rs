// ABOUTME: Declarative rule/policy validation engine module
// ABOUTME: Rule definitions, evaluation engine, and report caching
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

/// Bounded TTL report cache
pub mod cache;
/// Rule evaluation engine
pub mod engine;
/// Rule, condition, and report data model
pub mod models;

pub use cache::ReportCache;
pub use engine::RuleValidator;
pub use models::{
    ConditionOperator, ConditionOutcome, LogicOperator, RuleCondition, RuleDefinition,
    ValidationOutcome, ValidationReport,
};
