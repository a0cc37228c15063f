// ABOUTME: Trust-tier policy mapping numeric tiers (0-5) to permitted scope sets
// ABOUTME: Implements the three-way scope intersection used by every grant path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 LUKHAS AI

//! # Tier Policy
//!
//! Principals carry a trust tier between 0 and 5. The tier gates which
//! scopes they may ever receive, independent of what a client requests or
//! is registered for. Granted scope is always the intersection of the
//! request, the client registration, and this table.

use crate::constants::oauth::SUPPORTED_SCOPES;
use std::collections::HashSet;

/// Highest tier; receives every supported scope
pub const SUPERUSER_TIER: u8 = 5;

/// Scopes reachable at tier 0 (every authenticated principal)
const TIER_0_SCOPES: &[&str] = &["openid", "profile", "lukhas:basic"];

/// Additional scopes unlocked at tier 1
const TIER_1_SCOPES: &[&str] = &["email", "lukhas:identity:read"];

/// Additional scopes unlocked at tier 3
const TIER_3_SCOPES: &[&str] = &["phone", "address", "lukhas:identity:write", "lukhas:premium"];

/// Scopes a principal of the given tier may receive.
///
/// Tiers are cumulative: tier 2 carries the tier-1 set, tier 4 the tier-3
/// set. Tier 5 is the superuser tier and receives the full supported set,
/// including `lukhas:admin`, which no lower tier can reach.
#[must_use]
pub fn scopes_for_tier(tier: u8) -> HashSet<&'static str> {
    if tier >= SUPERUSER_TIER {
        return SUPPORTED_SCOPES.iter().copied().collect();
    }

    let mut scopes: HashSet<&'static str> = TIER_0_SCOPES.iter().copied().collect();
    if tier >= 1 {
        scopes.extend(TIER_1_SCOPES.iter().copied());
    }
    if tier >= 3 {
        scopes.extend(TIER_3_SCOPES.iter().copied());
    }
    scopes
}

/// Resolve the scope set actually granted for a request.
///
/// Intersects the requested scopes with the client's registered
/// `allowed_scopes` and the tier table. Returns the surviving scopes in the
/// order they were requested so the echoed `scope` string is stable.
#[must_use]
pub fn resolve_scopes(requested: &[String], client_allowed: &[String], tier: u8) -> Vec<String> {
    let tier_scopes = scopes_for_tier(tier);
    requested
        .iter()
        .filter(|scope| client_allowed.iter().any(|allowed| allowed == *scope))
        .filter(|scope| tier_scopes.contains(scope.as_str()))
        .cloned()
        .collect()
}

/// Split a space-delimited scope parameter into individual scopes.
#[must_use]
pub fn parse_scope_param(scope: &str) -> Vec<String> {
    scope
        .split_whitespace()
        .map(std::string::ToString::to_string)
        .collect()
}

/// Join granted scopes back into the space-delimited wire form.
#[must_use]
pub fn join_scopes(scopes: &[String]) -> String {
    scopes.join(" ")
}
