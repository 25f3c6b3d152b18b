// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the Warden binary.
//!
//! Every variant maps to a process exit code so scripts can tell a broken
//! configuration from a denied capability check.

use thiserror::Error;

/// Result type alias for warden-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that can occur in the Warden binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// The configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A step of the simulated scenario failed.
    #[error("Scenario failed: {0}")]
    Scenario(String),

    /// A report could not be rendered.
    #[error("Output error: {0}")]
    Output(String),

    /// Reading a file failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// `check` found that the role lacks the permission.
    #[error("Role '{role}' does not grant '{permission}'")]
    Denied {
        /// Role checked.
        role: String,
        /// Permission asked for.
        permission: String,
    },

    /// Config parsing error.
    #[error("Config error: {0}")]
    Config(#[from] warden_config::ConfigError),

    /// Access layer error.
    #[error("{}", .0.user_message())]
    Core(#[from] warden_core::WardenError),

    /// Settings error.
    #[error("Settings error: {0}")]
    Settings(#[from] warden_settings::SettingsError),

    /// An error with the step that produced it.
    #[error("{context}: {source}")]
    WithContext {
        /// What was being done.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a scenario error.
    pub fn scenario(msg: impl Into<String>) -> Self {
        Self::Scenario(msg.into())
    }

    /// Creates a denial for `role` and `permission`.
    pub fn denied(role: impl Into<String>, permission: impl Into<String>) -> Self {
        Self::Denied {
            role: role.into(),
            permission: permission.into(),
        }
    }

    /// Adds context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Config(_) => 1,
            Self::Scenario(_) => 2,
            Self::Output(_) => 3,
            Self::Io(_) => 4,
            Self::Denied { .. } => 5,
            Self::Core(_) => 6,
            Self::Settings(_) => 7,
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BinError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output(err.to_string())
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Scenario(format!("{:#}", err))
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Prints `error` and its causes to stderr.
///
/// A denial is an answer rather than a failure, so it gets no cause chain.
pub fn report_error(error: &BinError) {
    if let BinError::Denied { .. } = error {
        eprintln!("{}", error);
        return;
    }

    eprintln!("Error: {}", error);
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

/// Reports an error and exits with its code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{AccessError, WardenError};

    #[test]
    fn test_context_keeps_exit_code() {
        let err = BinError::config("unknown default role 'member'")
            .with_context("Failed to build runtime");
        assert_eq!(
            err.to_string(),
            "Failed to build runtime: Configuration error: unknown default role 'member'"
        );
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BinError::scenario("promotion").exit_code(), 2);
        assert_eq!(BinError::Output("bad json".into()).exit_code(), 3);
        assert_eq!(BinError::denied("user", "manage_roles").exit_code(), 5);
        assert_eq!(
            BinError::from(WardenError::Access(AccessError::Unauthenticated)).exit_code(),
            6
        );
    }

    #[test]
    fn test_denial_message() {
        let err = BinError::denied("editor", "manage_users");
        assert_eq!(err.to_string(), "Role 'editor' does not grant 'manage_users'");
    }

    #[test]
    fn test_from_anyhow_keeps_chain() {
        let err: BinError = anyhow::anyhow!("root cause").context("while promoting").into();
        assert!(matches!(err, BinError::Scenario(_)));
        assert!(err.to_string().contains("while promoting"));
        assert!(err.to_string().contains("root cause"));
    }
}
