// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions
//!
//! Assertions with failure messages that name the decision or error that
//! was actually produced.

use warden_auth::{AccessContext, GateDecision};
use warden_core::{AccessError, AuthError, RoleError, WardenError};

// =============================================================================
// Gate Decision Assertions
// =============================================================================

/// Assertion extensions for [`GateDecision`].
pub trait DecisionAssertions {
    /// Assert that the content renders.
    fn assert_render(&self);

    /// Assert a redirect to `to` that returns to `return_to`.
    fn assert_redirect(&self, to: &str, return_to: &str);

    /// Assert a denial naming `required`.
    fn assert_denied(&self, required: &str);

    /// Assert the loading placeholder.
    fn assert_pending(&self);
}

impl DecisionAssertions for GateDecision {
    fn assert_render(&self) {
        assert!(self.is_render(), "Expected render, got {:?}", self);
    }

    fn assert_redirect(&self, to: &str, return_to: &str) {
        match self {
            GateDecision::Redirect {
                to: actual_to,
                return_to: actual_return,
            } => {
                assert_eq!(actual_to, to, "Wrong sign-in target");
                assert_eq!(actual_return, return_to, "Wrong return path");
            }
            other => panic!("Expected redirect to {}, got {:?}", to, other),
        }
    }

    fn assert_denied(&self, required: &str) {
        match self {
            GateDecision::Deny(denial) => assert_eq!(
                denial.required, required,
                "Denied for '{}', expected '{}'",
                denial.required, required
            ),
            other => panic!("Expected denial for {}, got {:?}", required, other),
        }
    }

    fn assert_pending(&self) {
        assert_eq!(self, &GateDecision::Pending, "Expected pending");
    }
}

// =============================================================================
// Context Assertions
// =============================================================================

/// Assert that `ctx` holds exactly `expected` (order-insensitive).
pub fn assert_permissions(ctx: &AccessContext, expected: &[&str]) {
    let mut actual: Vec<&str> = ctx.permissions().iter().map(|p| p.as_str()).collect();
    actual.sort_unstable();
    let mut expected = expected.to_vec();
    expected.sort_unstable();
    assert_eq!(
        actual,
        expected,
        "Permission mismatch for {}",
        ctx.display_label()
    );
}

// =============================================================================
// Error Assertions
// =============================================================================

/// Assert a forbidden access error and return the missing requirement.
pub fn assert_forbidden<T: std::fmt::Debug>(result: Result<T, WardenError>) -> String {
    match result {
        Err(WardenError::Access(AccessError::Forbidden { required, .. })) => required,
        other => panic!("Expected forbidden, got {:?}", other),
    }
}

/// Assert an operation refused regardless of capability.
pub fn assert_not_allowed<T: std::fmt::Debug>(result: Result<T, WardenError>) {
    assert!(
        matches!(result, Err(WardenError::Access(AccessError::NotAllowed { .. }))),
        "Expected not-allowed, got {:?}",
        result
    );
}

/// Assert a role error matching `predicate`.
pub fn assert_role_error<T, F>(result: Result<T, WardenError>, predicate: F)
where
    T: std::fmt::Debug,
    F: FnOnce(&RoleError) -> bool,
{
    match result {
        Err(WardenError::Role(ref e)) if predicate(e) => {}
        other => panic!("Unexpected role result: {:?}", other),
    }
}

/// Assert an authentication error matching `predicate`.
pub fn assert_auth_error<T, F>(result: Result<T, WardenError>, predicate: F)
where
    T: std::fmt::Debug,
    F: FnOnce(&AuthError) -> bool,
{
    match result {
        Err(WardenError::Auth(ref e)) if predicate(e) => {}
        other => panic!("Unexpected auth result: {:?}", other),
    }
}
