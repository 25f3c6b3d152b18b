// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Audit trail for session and administrative actions.
//!
//! Every sign-in, sign-out, forced sign-out and registry or directory
//! mutation produces an [`AuditLog`] entry. Audit failures never fail the
//! audited action; callers log them and continue.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::types::UserId;

// =============================================================================
// Types
// =============================================================================

/// The audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Interactive sign-in.
    SignIn,
    /// Interactive sign-out.
    SignOut,
    /// Sign-out forced by a disabled account.
    ForcedSignOut,
    /// A role definition was created.
    RoleCreated,
    /// A role definition was updated.
    RoleUpdated,
    /// A role definition was deleted.
    RoleDeleted,
    /// A user's role tag was changed.
    UserRoleChanged,
    /// A user's account status was changed.
    UserStatusChanged,
    /// An account deleted itself.
    AccountDeleted,
}

impl AuditAction {
    /// Returns the action name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::SignIn => "sign_in",
            AuditAction::SignOut => "sign_out",
            AuditAction::ForcedSignOut => "forced_sign_out",
            AuditAction::RoleCreated => "role_created",
            AuditAction::RoleUpdated => "role_updated",
            AuditAction::RoleDeleted => "role_deleted",
            AuditAction::UserRoleChanged => "user_role_changed",
            AuditAction::UserStatusChanged => "user_status_changed",
            AuditAction::AccountDeleted => "account_deleted",
        }
    }

    /// Returns `true` for actions that change another principal's rights.
    pub fn is_administrative(&self) -> bool {
        matches!(
            self,
            AuditAction::RoleCreated
                | AuditAction::RoleUpdated
                | AuditAction::RoleDeleted
                | AuditAction::UserRoleChanged
                | AuditAction::UserStatusChanged
        )
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the audited action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The action completed.
    Success,
    /// The action was refused for lack of capability.
    Denied {
        /// Why it was refused.
        reason: String,
    },
    /// The action failed.
    Failure {
        /// Error description.
        error: String,
    },
}

impl AuditOutcome {
    /// Returns `true` for a successful outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, AuditOutcome::Success)
    }
}

/// A single audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    /// Unique entry ID.
    pub id: Uuid,
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
    /// Who acted. `None` for system-initiated actions.
    pub actor: Option<UserId>,
    /// What was done.
    pub action: AuditAction,
    /// What it was done to (user ID, role tag).
    pub target: Option<String>,
    /// How it ended.
    pub outcome: AuditOutcome,
    /// Free-form details.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub detail: serde_json::Value,
}

impl AuditLog {
    /// Creates a successful entry.
    pub fn new(action: AuditAction) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            actor: None,
            action,
            target: None,
            outcome: AuditOutcome::Success,
            detail: serde_json::Value::Null,
        }
    }

    /// Sets the actor.
    pub fn actor(mut self, actor: &UserId) -> Self {
        self.actor = Some(actor.clone());
        self
    }

    /// Sets the target.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the detail payload.
    pub fn detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }

    /// Marks the entry as denied.
    pub fn denied(mut self, reason: impl Into<String>) -> Self {
        self.outcome = AuditOutcome::Denied {
            reason: reason.into(),
        };
        self
    }

    /// Marks the entry as failed.
    pub fn failed(mut self, error: impl fmt::Display) -> Self {
        self.outcome = AuditOutcome::Failure {
            error: error.to_string(),
        };
        self
    }
}

// =============================================================================
// AuditLogger Trait
// =============================================================================

/// A sink for audit entries.
#[async_trait]
pub trait AuditLogger: Send + Sync + fmt::Debug {
    /// Records an entry.
    async fn log(&self, entry: AuditLog) -> StoreResult<()>;

    /// Returns the logger name for identification.
    fn name(&self) -> &str {
        "audit_logger"
    }
}

/// Records an entry, logging and swallowing any failure.
pub async fn record(logger: &Arc<dyn AuditLogger>, entry: AuditLog) {
    let action = entry.action;
    if let Err(e) = logger.log(entry).await {
        tracing::warn!(action = %action, logger = logger.name(), error = %e, "Audit write failed");
    }
}

// =============================================================================
// Implementations
// =============================================================================

/// Discards every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAuditLogger;

impl NoOpAuditLogger {
    /// Creates a new no-op logger.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditLogger for NoOpAuditLogger {
    async fn log(&self, _entry: AuditLog) -> StoreResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Emits each entry as a structured `tracing` event on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

impl TracingAuditLogger {
    /// Creates a new tracing logger.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn log(&self, entry: AuditLog) -> StoreResult<()> {
        let actor = entry.actor.as_ref().map(UserId::as_str).unwrap_or("system");
        let target = entry.target.as_deref().unwrap_or("-");
        match &entry.outcome {
            AuditOutcome::Success => {
                tracing::info!(target: "audit", action = %entry.action, actor, subject = target, "Audit")
            }
            AuditOutcome::Denied { reason } => {
                tracing::warn!(target: "audit", action = %entry.action, actor, subject = target, reason = %reason, "Audit denied")
            }
            AuditOutcome::Failure { error } => {
                tracing::warn!(target: "audit", action = %entry.action, actor, subject = target, error = %error, "Audit failure")
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// In-memory audit logger for tests and the `simulate` command.
///
/// # Thread Safety
///
/// Entries live in a `RwLock`-protected vector shared by clones.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditLogger {
    logs: Arc<RwLock<Vec<AuditLog>>>,
    /// Maximum number of entries to keep (0 = unlimited).
    max_entries: usize,
}

impl InMemoryAuditLogger {
    /// Creates a logger with unlimited capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a logger that keeps at most `max_entries`, dropping the oldest.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            logs: Arc::new(RwLock::new(Vec::new())),
            max_entries,
        }
    }

    /// Returns all entries.
    pub fn entries(&self) -> Vec<AuditLog> {
        self.logs.read().clone()
    }

    /// Returns entries matching a predicate.
    pub fn entries_where<F>(&self, predicate: F) -> Vec<AuditLog>
    where
        F: Fn(&AuditLog) -> bool,
    {
        self.logs.read().iter().filter(|l| predicate(l)).cloned().collect()
    }

    /// Returns entries for one action.
    pub fn entries_for_action(&self, action: AuditAction) -> Vec<AuditLog> {
        self.entries_where(|l| l.action == action)
    }

    /// Clears all entries.
    pub fn clear(&self) {
        self.logs.write().clear();
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.logs.read().len()
    }

    /// Returns `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.logs.read().is_empty()
    }
}

#[async_trait]
impl AuditLogger for InMemoryAuditLogger {
    async fn log(&self, entry: AuditLog) -> StoreResult<()> {
        let mut logs = self.logs.write();
        if self.max_entries > 0 && logs.len() >= self.max_entries {
            logs.remove(0);
        }
        logs.push(entry);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_logger_records() {
        let logger = InMemoryAuditLogger::new();
        let admin = UserId::new("admin-1");

        logger
            .log(AuditLog::new(AuditAction::RoleDeleted).actor(&admin).target("editor"))
            .await
            .unwrap();
        logger
            .log(AuditLog::new(AuditAction::SignIn).actor(&admin))
            .await
            .unwrap();

        assert_eq!(logger.len(), 2);
        let deleted = logger.entries_for_action(AuditAction::RoleDeleted);
        assert_eq!(deleted[0].target.as_deref(), Some("editor"));
        assert!(deleted[0].action.is_administrative());
    }

    #[tokio::test]
    async fn test_memory_logger_capacity() {
        let logger = InMemoryAuditLogger::with_capacity(2);
        for action in [AuditAction::SignIn, AuditAction::SignOut, AuditAction::ForcedSignOut] {
            logger.log(AuditLog::new(action)).await.unwrap();
        }

        let actions: Vec<_> = logger.entries().iter().map(|l| l.action).collect();
        assert_eq!(actions, vec![AuditAction::SignOut, AuditAction::ForcedSignOut]);
    }

    #[test]
    fn test_outcome_serialization() {
        let entry = AuditLog::new(AuditAction::UserRoleChanged).denied("requires manage_users");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["action"], "user_role_changed");
        assert_eq!(json["outcome"]["status"], "denied");
    }
}
