// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for warden.
//!
//! Every error maps onto one of five categories that decide how it is
//! surfaced:
//!
//! ```text
//! WardenError (root)
//! ├── AuthError     - Credential failures (inline, user may retry)
//! │                   AccountDisabled is the one Fatal error
//! ├── AccessError   - Authorization failures (denial view, not retryable)
//! ├── RoleError     - Registry mutation failures
//! └── StoreError    - Transport / consistency failures of the backend
//! ```
//!
//! # Examples
//!
//! ```
//! use warden_core::error::{AuthError, ErrorCategory, StoreError, WardenError};
//!
//! let error: WardenError = StoreError::unavailable("connection reset").into();
//! assert_eq!(error.category(), ErrorCategory::Transport);
//! assert!(error.is_retryable());
//!
//! let fatal: WardenError = AuthError::AccountDisabled.into();
//! assert_eq!(fatal.category(), ErrorCategory::Fatal);
//! ```

use std::fmt;
use thiserror::Error;

/// Result type alias for warden operations.
pub type WardenResult<T> = Result<T, WardenError>;

/// Result type alias for collaborator store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// ErrorCategory
// =============================================================================

/// How an error is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad password, unverified email. Shown inline, retryable by the user.
    Credential,
    /// Insufficient capability. Denial view, never silently ignored.
    Authorization,
    /// Missing profile, unknown role. Self-healed where safe.
    Consistency,
    /// Backend unreachable. Dismissible notice, state left unchanged.
    Transport,
    /// Account disabled. Forces sign-out unconditionally.
    Fatal,
}

impl ErrorCategory {
    /// Returns the category name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Credential => "credential",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::Consistency => "consistency",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// WardenError - Root Error Type
// =============================================================================

/// The root error type for warden.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Authentication error.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Authorization error.
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    /// Role registry error.
    #[error("Role error: {0}")]
    Role(#[from] RoleError),

    /// Backend store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl WardenError {
    /// Returns the surfacing category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            WardenError::Auth(e) => e.category(),
            WardenError::Access(_) => ErrorCategory::Authorization,
            WardenError::Role(e) => e.category(),
            WardenError::Store(e) => e.category(),
        }
    }

    /// Returns `true` if repeating the triggering action may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WardenError::Auth(e) => e.is_retryable(),
            WardenError::Access(_) => false,
            WardenError::Role(_) => false,
            WardenError::Store(e) => e.is_retryable(),
        }
    }

    /// Returns `true` for the fatal account-disabled condition.
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Fatal
    }

    /// Returns a message suitable for display to end users.
    pub fn user_message(&self) -> String {
        match self {
            WardenError::Auth(e) => e.user_message(),
            WardenError::Access(e) => e.user_message(),
            WardenError::Role(e) => e.to_string(),
            WardenError::Store(e) => e.user_message(),
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            WardenError::Auth(e) => e.error_type(),
            WardenError::Access(_) => "access",
            WardenError::Role(_) => "role",
            WardenError::Store(e) => e.error_type(),
        }
    }
}

// =============================================================================
// AuthError
// =============================================================================

/// Authentication and session errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Email or password is wrong.
    #[error("Invalid credential")]
    InvalidCredential,

    /// Password does not meet the policy.
    #[error("Weak password: {reason}")]
    WeakSecret {
        /// Why the password was rejected.
        reason: String,
    },

    /// An account already exists for this email.
    #[error("Email already in use: {email}")]
    EmailInUse {
        /// The email.
        email: String,
    },

    /// The provider throttled this client.
    #[error("Too many requests")]
    TooManyRequests,

    /// The operation needs a fresh sign-in.
    #[error("Recent login required")]
    RequiresRecentLogin,

    /// No account exists for this email.
    #[error("User not found: {email}")]
    UserNotFound {
        /// The email.
        email: String,
    },

    /// Password confirmation does not match.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// The operation needs a signed-in identity.
    #[error("Not signed in")]
    NotSignedIn,

    /// The email address is already verified.
    #[error("Email already verified")]
    AlreadyVerified,

    /// The account has been disabled by an administrator.
    #[error("Account disabled")]
    AccountDisabled,

    /// The provider could not be reached.
    #[error("Auth provider unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
    },
}

impl AuthError {
    /// Creates a weak secret error.
    pub fn weak_secret(reason: impl Into<String>) -> Self {
        Self::WeakSecret {
            reason: reason.into(),
        }
    }

    /// Creates an email-in-use error.
    pub fn email_in_use(email: impl Into<String>) -> Self {
        Self::EmailInUse {
            email: email.into(),
        }
    }

    /// Creates a user-not-found error.
    pub fn user_not_found(email: impl Into<String>) -> Self {
        Self::UserNotFound {
            email: email.into(),
        }
    }

    /// Creates a provider-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Returns the surfacing category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::AccountDisabled => ErrorCategory::Fatal,
            AuthError::Unavailable { .. } => ErrorCategory::Transport,
            AuthError::NotSignedIn => ErrorCategory::Authorization,
            _ => ErrorCategory::Credential,
        }
    }

    /// Returns `true` if the user may retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AuthError::AccountDisabled | AuthError::AlreadyVerified)
    }

    /// Returns a message suitable for display to end users.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredential => "Incorrect email or password".to_string(),
            AuthError::WeakSecret { reason } => format!("Password is too weak: {}", reason),
            AuthError::EmailInUse { .. } => "An account with this email already exists".to_string(),
            AuthError::TooManyRequests => {
                "Too many attempts. Please wait a moment and try again".to_string()
            }
            AuthError::RequiresRecentLogin => {
                "Please sign in again to complete this action".to_string()
            }
            AuthError::UserNotFound { .. } => "No account found for this email".to_string(),
            AuthError::PasswordMismatch => "New passwords do not match".to_string(),
            AuthError::NotSignedIn => "You must be signed in".to_string(),
            AuthError::AlreadyVerified => "Email is already verified".to_string(),
            AuthError::AccountDisabled => {
                "Your account has been disabled. Contact an administrator".to_string()
            }
            AuthError::Unavailable { .. } => {
                "Authentication service is unreachable. Please try again".to_string()
            }
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            AuthError::InvalidCredential => "invalid_credential",
            AuthError::WeakSecret { .. } => "weak_secret",
            AuthError::EmailInUse { .. } => "email_in_use",
            AuthError::TooManyRequests => "too_many_requests",
            AuthError::RequiresRecentLogin => "requires_recent_login",
            AuthError::UserNotFound { .. } => "user_not_found",
            AuthError::PasswordMismatch => "password_mismatch",
            AuthError::NotSignedIn => "not_signed_in",
            AuthError::AlreadyVerified => "already_verified",
            AuthError::AccountDisabled => "account_disabled",
            AuthError::Unavailable { .. } => "auth_unavailable",
        }
    }
}

// =============================================================================
// AccessError
// =============================================================================

/// Authorization errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No identity is signed in.
    #[error("Authentication required")]
    Unauthenticated,

    /// The identity lacks the required capability.
    #[error("Permission '{required}' denied for '{user}'")]
    Forbidden {
        /// The capability that was required.
        required: String,
        /// The identity that was denied.
        user: String,
    },

    /// The action is not allowed regardless of capability.
    #[error("Operation not allowed: {reason}")]
    NotAllowed {
        /// Why the action is refused.
        reason: String,
    },
}

impl AccessError {
    /// Creates a forbidden error.
    pub fn forbidden(required: impl Into<String>, user: impl Into<String>) -> Self {
        Self::Forbidden {
            required: required.into(),
            user: user.into(),
        }
    }

    /// Creates a not-allowed error.
    pub fn not_allowed(reason: impl Into<String>) -> Self {
        Self::NotAllowed {
            reason: reason.into(),
        }
    }

    /// Returns a message suitable for display to end users.
    pub fn user_message(&self) -> String {
        match self {
            AccessError::Unauthenticated => "Please sign in to continue".to_string(),
            AccessError::Forbidden { required, .. } => {
                format!("You do not have the '{}' permission", required)
            }
            AccessError::NotAllowed { reason } => reason.clone(),
        }
    }
}

// =============================================================================
// RoleError
// =============================================================================

/// Role registry errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleError {
    /// A system role cannot be deleted or renamed.
    #[error("Role '{role}' is a system role and cannot be {operation}")]
    SystemRoleProtected {
        /// The protected role.
        role: String,
        /// The rejected operation ("deleted", "renamed").
        operation: &'static str,
    },

    /// The role does not exist.
    #[error("Role not found: {role}")]
    NotFound {
        /// The missing role.
        role: String,
    },

    /// A role with this tag already exists.
    #[error("Role already exists: {role}")]
    AlreadyExists {
        /// The duplicated role.
        role: String,
    },

    /// The role definition is malformed.
    #[error("Invalid role definition: {message}")]
    Invalid {
        /// Error message.
        message: String,
    },
}

impl RoleError {
    /// Creates a system-role-protected error.
    pub fn system_protected(role: impl Into<String>, operation: &'static str) -> Self {
        Self::SystemRoleProtected {
            role: role.into(),
            operation,
        }
    }

    /// Creates a not-found error.
    pub fn not_found(role: impl Into<String>) -> Self {
        Self::NotFound { role: role.into() }
    }

    /// Creates an already-exists error.
    pub fn already_exists(role: impl Into<String>) -> Self {
        Self::AlreadyExists { role: role.into() }
    }

    /// Creates an invalid-definition error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Returns the surfacing category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            RoleError::SystemRoleProtected { .. } => ErrorCategory::Authorization,
            RoleError::NotFound { .. } => ErrorCategory::Consistency,
            RoleError::AlreadyExists { .. } | RoleError::Invalid { .. } => {
                ErrorCategory::Consistency
            }
        }
    }
}

// =============================================================================
// StoreError
// =============================================================================

/// Errors from the document and blob stores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
    },

    /// The document or blob does not exist.
    #[error("Not found: {path}")]
    NotFound {
        /// Path of the missing item.
        path: String,
    },

    /// A stored document could not be decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },

    /// The backend rejected the write.
    #[error("Write rejected: {message}")]
    Rejected {
        /// Error message.
        message: String,
    },

    /// The subscription channel was closed.
    #[error("Subscription closed")]
    Closed,
}

impl StoreError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a rejected-write error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Returns the surfacing category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            StoreError::Unavailable { .. } | StoreError::Closed => ErrorCategory::Transport,
            StoreError::NotFound { .. } | StoreError::Serialization { .. } => {
                ErrorCategory::Consistency
            }
            StoreError::Rejected { .. } => ErrorCategory::Authorization,
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. } | StoreError::Closed)
    }

    /// Returns a message suitable for display to end users.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Unavailable { .. } | StoreError::Closed => {
                "The server could not be reached. Please try again".to_string()
            }
            StoreError::NotFound { .. } => "The requested record does not exist".to_string(),
            StoreError::Serialization { .. } => "A stored record is malformed".to_string(),
            StoreError::Rejected { .. } => "The change was rejected by the server".to_string(),
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            StoreError::Unavailable { .. } => "store_unavailable",
            StoreError::NotFound { .. } => "not_found",
            StoreError::Serialization { .. } => "serialization",
            StoreError::Rejected { .. } => "rejected",
            StoreError::Closed => "closed",
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================
