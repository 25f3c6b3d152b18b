// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Settings errors.

use thiserror::Error;
use warden_core::{ErrorCategory, StoreError, UserId};

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Settings synchronizer errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// The backing store failed.
    #[error("Settings store error: {0}")]
    Store(#[from] StoreError),

    /// A preference value is not recognised.
    #[error("Invalid value '{value}' for preference '{field}'")]
    InvalidValue {
        /// Preference name.
        field: &'static str,
        /// Rejected value.
        value: String,
    },

    /// Preferences for this identity were never loaded.
    #[error("Preferences not loaded for '{user_id}'")]
    NotLoaded {
        /// The identity.
        user_id: UserId,
    },
}

impl SettingsError {
    /// Creates an invalid-value error.
    pub fn invalid_value(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
        }
    }

    /// Creates a not-loaded error.
    pub fn not_loaded(user_id: &UserId) -> Self {
        Self::NotLoaded {
            user_id: user_id.clone(),
        }
    }

    /// Returns the surfacing category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SettingsError::Store(e) => e.category(),
            SettingsError::InvalidValue { .. } | SettingsError::NotLoaded { .. } => {
                ErrorCategory::Consistency
            }
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            SettingsError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns a message suitable for display to end users.
    pub fn user_message(&self) -> String {
        match self {
            SettingsError::Store(e) => e.user_message(),
            SettingsError::InvalidValue { field, .. } => {
                format!("The {} setting has an unsupported value", field)
            }
            SettingsError::NotLoaded { .. } => "Settings are still loading".to_string(),
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            SettingsError::Store(e) => e.error_type(),
            SettingsError::InvalidValue { .. } => "invalid_preference",
            SettingsError::NotLoaded { .. } => "preferences_not_loaded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_keep_their_category() {
        let err: SettingsError = StoreError::unavailable("offline").into();
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert!(err.is_retryable());
        assert_eq!(err.error_type(), "store_unavailable");
    }

    #[test]
    fn test_local_errors() {
        let err = SettingsError::invalid_value("fontSize", "huge");
        assert_eq!(err.category(), ErrorCategory::Consistency);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("huge"));
    }
}
