// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Access gate.
//!
//! A [`Gate`] guards one protected view. Evaluating it against an
//! [`AccessContext`] yields a [`GateDecision`]:
//!
//! | context | decision |
//! |---------|----------|
//! | no identity, or disabled profile | [`GateDecision::Redirect`] to sign-in |
//! | identity whose profile is still loading | [`GateDecision::Pending`] |
//! | a requirement is unmet | [`GateDecision::Deny`] |
//! | everything met | [`GateDecision::Render`] |
//!
//! Requirements are checked in the order they were added and evaluation
//! stops at the first unmet one. Evaluation is synchronous and never
//! touches the network.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};
use warden_core::{AccessError, RoleId};

use crate::context::AccessContext;
use crate::permission::PermissionTag;

/// Default sign-in path.
pub const DEFAULT_SIGN_IN_PATH: &str = "/login";

/// Default safe view offered from a denial.
pub const DEFAULT_FALLBACK_PATH: &str = "/";

// =============================================================================
// Requirement
// =============================================================================

/// A condition a context must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Any signed-in identity.
    Authenticated,
    /// A capability.
    Permission(PermissionTag),
    /// Every child must hold. Stops at the first failure.
    AllOf(Vec<Requirement>),
    /// At least one child must hold.
    AnyOf(Vec<Requirement>),
    /// An exact role tag.
    Role(RoleId),
    /// The admin or super-admin role.
    Admin,
    /// The super-admin role.
    SuperAdmin,
}

impl Requirement {
    /// Requires a capability.
    pub fn permission(tag: impl Into<PermissionTag>) -> Self {
        Requirement::Permission(tag.into())
    }

    /// Requires an exact role.
    pub fn role(role: impl Into<RoleId>) -> Self {
        Requirement::Role(role.into())
    }

    /// Requires every permission in `tags`.
    pub fn all_permissions(tags: &[&str]) -> Self {
        Requirement::AllOf(tags.iter().map(|t| Requirement::permission(*t)).collect())
    }

    /// Requires any permission in `tags`.
    pub fn any_permission(tags: &[&str]) -> Self {
        Requirement::AnyOf(tags.iter().map(|t| Requirement::permission(*t)).collect())
    }

    /// Returns `true` if the context satisfies this requirement.
    pub fn is_met(&self, ctx: &AccessContext) -> bool {
        self.first_unmet(ctx).is_none()
    }

    /// Returns the first requirement the context fails, if any.
    pub fn first_unmet<'a>(&'a self, ctx: &AccessContext) -> Option<&'a Requirement> {
        match self {
            Requirement::Authenticated => (!ctx.is_authenticated()).then_some(self),
            Requirement::Permission(tag) => (!ctx.has_permission(tag.as_str())).then_some(self),
            Requirement::AllOf(children) => children.iter().find_map(|c| c.first_unmet(ctx)),
            Requirement::AnyOf(children) => {
                (!children.iter().any(|c| c.is_met(ctx))).then_some(self)
            }
            Requirement::Role(role) => (!ctx.has_role(role.as_str())).then_some(self),
            Requirement::Admin => (!ctx.is_admin()).then_some(self),
            Requirement::SuperAdmin => (!ctx.is_super_admin()).then_some(self),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Authenticated => write!(f, "authenticated"),
            Requirement::Permission(tag) => write!(f, "{}", tag),
            Requirement::AllOf(children) | Requirement::AnyOf(children) => {
                let joiner = if matches!(self, Requirement::AllOf(_)) {
                    " and "
                } else {
                    " or "
                };
                let parts: Vec<String> = children.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(joiner))
            }
            Requirement::Role(role) => write!(f, "role:{}", role),
            Requirement::Admin => write!(f, "role:{}", RoleId::ADMIN),
            Requirement::SuperAdmin => write!(f, "role:{}", RoleId::SUPER_ADMIN),
        }
    }
}

// =============================================================================
// Decision
// =============================================================================

/// Details shown by a denial view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Denial {
    /// The unmet requirement.
    pub required: String,
    /// Label of the current identity.
    pub current_user: String,
    /// Safe view to go back to.
    pub back_to: String,
}

/// Outcome of evaluating a gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Show the protected content.
    Render,
    /// Send the visitor to sign in.
    Redirect {
        /// Sign-in path.
        to: String,
        /// Path to come back to after signing in.
        return_to: String,
    },
    /// Show the denial view instead of the content.
    Deny(Denial),
    /// The profile is still loading; show a placeholder.
    Pending,
}

impl GateDecision {
    /// Returns `true` for [`GateDecision::Render`].
    pub fn is_render(&self) -> bool {
        matches!(self, GateDecision::Render)
    }

    /// Returns `true` for [`GateDecision::Redirect`].
    pub fn is_redirect(&self) -> bool {
        matches!(self, GateDecision::Redirect { .. })
    }

    /// Returns `true` for [`GateDecision::Deny`].
    pub fn is_deny(&self) -> bool {
        matches!(self, GateDecision::Deny(_))
    }

    /// Short name used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateDecision::Render => "render",
            GateDecision::Redirect { .. } => "redirect",
            GateDecision::Deny(_) => "deny",
            GateDecision::Pending => "pending",
        }
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Gate
// =============================================================================

/// Guard for one protected view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    path: String,
    requirements: Vec<Requirement>,
    sign_in_path: String,
    fallback_path: String,
}

impl Gate {
    /// Creates a gate that only requires a signed-in identity.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            requirements: Vec::new(),
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            fallback_path: DEFAULT_FALLBACK_PATH.to_string(),
        }
    }

    /// Adds a requirement, checked after those already present.
    pub fn require(mut self, requirement: Requirement) -> Self {
        if requirement != Requirement::Authenticated {
            self.requirements.push(requirement);
        }
        self
    }

    /// Shorthand for requiring a capability.
    pub fn require_permission(self, tag: impl Into<PermissionTag>) -> Self {
        self.require(Requirement::permission(tag))
    }

    /// Nests `inner` inside this gate. The outer requirements are checked first.
    pub fn wrap(mut self, inner: Gate) -> Self {
        self.requirements.extend(inner.requirements);
        self.path = inner.path;
        self
    }

    /// Sets the sign-in path.
    pub fn with_sign_in_path(mut self, path: impl Into<String>) -> Self {
        self.sign_in_path = path.into();
        self
    }

    /// Sets the safe view offered by denials.
    pub fn with_fallback_path(mut self, path: impl Into<String>) -> Self {
        self.fallback_path = path.into();
        self
    }

    /// Returns the protected path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the requirements in evaluation order.
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Decides what to show for `ctx`.
    pub fn evaluate(&self, ctx: &AccessContext) -> GateDecision {
        if !ctx.is_authenticated() || ctx.is_disabled() {
            debug!(path = %self.path, "Gate redirecting to sign-in");
            return GateDecision::Redirect {
                to: self.sign_in_path.clone(),
                return_to: self.path.clone(),
            };
        }
        if ctx.is_pending() {
            return GateDecision::Pending;
        }

        if let Some(unmet) = self.requirements.iter().find_map(|r| r.first_unmet(ctx)) {
            let required = unmet.to_string();
            warn!(
                path = %self.path,
                user = %ctx.display_label(),
                required = %required,
                "Access denied"
            );
            return GateDecision::Deny(Denial {
                required,
                current_user: ctx.display_label(),
                back_to: self.fallback_path.clone(),
            });
        }

        GateDecision::Render
    }

    /// Checks an action guarded by this gate.
    pub fn authorize(&self, ctx: &AccessContext) -> Result<(), AccessError> {
        match self.evaluate(ctx) {
            GateDecision::Render => Ok(()),
            GateDecision::Redirect { .. } => Err(AccessError::Unauthenticated),
            GateDecision::Deny(denial) => {
                Err(AccessError::forbidden(denial.required, denial.current_user))
            }
            GateDecision::Pending => Err(AccessError::not_allowed("profile is still loading")),
        }
    }

    /// Follows a context channel and re-evaluates on every change.
    pub fn watch(self, contexts: watch::Receiver<Arc<AccessContext>>) -> GateWatcher {
        GateWatcher {
            gate: self,
            contexts,
        }
    }
}

// =============================================================================
// Watcher
// =============================================================================

/// A gate bound to the live access context.
#[derive(Debug)]
pub struct GateWatcher {
    gate: Gate,
    contexts: watch::Receiver<Arc<AccessContext>>,
}

impl GateWatcher {
    /// Returns the decision for the current context.
    pub fn decision(&self) -> GateDecision {
        let ctx = self.contexts.borrow().clone();
        self.gate.evaluate(&ctx)
    }

    /// Waits for the context to change and returns the new decision.
    ///
    /// Returns `None` once the context source is gone.
    pub async fn changed(&mut self) -> Option<GateDecision> {
        self.contexts.changed().await.ok()?;
        let ctx = self.contexts.borrow_and_update().clone();
        Some(self.gate.evaluate(&ctx))
    }

    /// Waits until the decision differs from `current`.
    pub async fn transition_from(&mut self, current: &GateDecision) -> Option<GateDecision> {
        loop {
            let next = self.changed().await?;
            if &next != current {
                return Some(next);
            }
        }
    }

    /// Returns the gate.
    pub fn gate(&self) -> &Gate {
        &self.gate
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::memory::MemoryDocumentStore;
    use warden_core::{AccountStatus, Identity, Profile};

    use crate::registry::RoleRegistry;

    async fn registry() -> RoleRegistry {
        let registry = RoleRegistry::builder(Arc::new(MemoryDocumentStore::new())).build();
        registry.load().await.unwrap();
        registry
    }

    fn identity() -> Identity {
        Identity::new("u1", "gil@example.com")
    }

    async fn ctx_with_role(role: &str) -> AccessContext {
        let profile = Profile::default_for(&identity()).with_role(role);
        AccessContext::resolve(identity(), Some(profile), &registry().await)
    }

    #[test]
    fn test_unauthenticated_redirects() {
        let gate = Gate::new("/users").require_permission("manage_users");
        let decision = gate.evaluate(&AccessContext::anonymous());

        assert_eq!(
            decision,
            GateDecision::Redirect {
                to: "/login".to_string(),
                return_to: "/users".to_string()
            }
        );
        assert_eq!(gate.authorize(&AccessContext::anonymous()), Err(AccessError::Unauthenticated));
    }

    #[test]
    fn test_pending_profile() {
        let gate = Gate::new("/users").require_permission("manage_users");
        assert_eq!(gate.evaluate(&AccessContext::pending(identity())), GateDecision::Pending);
    }

    #[tokio::test]
    async fn test_insufficient_capability_denies() {
        let gate = Gate::new("/users")
            .require_permission("manage_users")
            .with_fallback_path("/dashboard");
        let decision = gate.evaluate(&ctx_with_role("user").await);

        assert_eq!(
            decision,
            GateDecision::Deny(Denial {
                required: "manage_users".to_string(),
                current_user: "gil@example.com".to_string(),
                back_to: "/dashboard".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_sufficient_capability_renders() {
        let gate = Gate::new("/users").require_permission("manage_users");
        assert!(gate.evaluate(&ctx_with_role("admin").await).is_render());
        assert!(gate.evaluate(&ctx_with_role("super_admin").await).is_render());
    }

    #[tokio::test]
    async fn test_nested_gates_short_circuit() {
        let outer = Gate::new("/reports").require_permission("read");
        let inner = Gate::new("/reports/sales").require_permission("write");
        let gate = outer.wrap(inner).require_permission("delete");
        assert_eq!(gate.path(), "/reports/sales");

        let ctx = AccessContext::resolve(
            identity(),
            Some(Profile::default_for(&identity()).with_role("ghost")),
            &registry().await,
        );
        match gate.evaluate(&ctx) {
            GateDecision::Deny(denial) => assert_eq!(denial.required, "read"),
            other => panic!("expected deny, got {other:?}"),
        }

        match gate.evaluate(&ctx_with_role("user").await) {
            GateDecision::Deny(denial) => assert_eq!(denial.required, "write"),
            other => panic!("expected deny, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_composite_requirements() {
        let editor = ctx_with_role("editor").await;
        assert!(Requirement::any_permission(&["manage_users", "bond:access"]).is_met(&editor));
        assert!(!Requirement::all_permissions(&["write", "delete"]).is_met(&editor));
        assert_eq!(
            Requirement::any_permission(&["a", "b"]).to_string(),
            "a or b"
        );
        assert!(Requirement::Admin.is_met(&ctx_with_role("admin").await));
        assert!(!Requirement::SuperAdmin.is_met(&ctx_with_role("admin").await));
        assert!(Requirement::role("editor").is_met(&editor));
    }

    #[tokio::test]
    async fn test_disabled_profile_redirects() {
        let profile = Profile::default_for(&identity())
            .with_role("admin")
            .with_status(AccountStatus::Disabled);
        let ctx = AccessContext::resolve(identity(), Some(profile), &registry().await);
        assert!(Gate::new("/").evaluate(&ctx).is_redirect());
    }

    #[tokio::test]
    async fn test_watcher_reevaluates_on_change() {
        let (tx, rx) = watch::channel(Arc::new(AccessContext::anonymous()));
        let mut watcher = Gate::new("/roles").require_permission("manage_roles").watch(rx);
        assert!(watcher.decision().is_redirect());

        tx.send(Arc::new(ctx_with_role("user").await)).unwrap();
        assert!(watcher.changed().await.unwrap().is_deny());

        tx.send(Arc::new(ctx_with_role("admin").await)).unwrap();
        let current = GateDecision::Deny(Denial {
            required: String::new(),
            current_user: String::new(),
            back_to: String::new(),
        });
        assert!(watcher.transition_from(&current).await.unwrap().is_render());

        drop(tx);
        assert!(watcher.changed().await.is_none());
    }
}
