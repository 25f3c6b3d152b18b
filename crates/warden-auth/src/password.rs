// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Password policy and strength estimation.

use std::fmt;

use serde::{Deserialize, Serialize};
use warden_core::AuthError;

/// Default minimum password length.
pub const DEFAULT_MIN_LENGTH: usize = 6;

/// Strength bucket shown next to a password field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrengthLabel {
    /// Score below 40.
    Weak,
    /// Score below 70.
    Fair,
    /// Score below 90.
    Good,
    /// Score of 90 or more.
    Strong,
}

impl StrengthLabel {
    fn from_score(score: u8) -> Self {
        match score {
            s if s < 40 => StrengthLabel::Weak,
            s if s < 70 => StrengthLabel::Fair,
            s if s < 90 => StrengthLabel::Good,
            _ => StrengthLabel::Strong,
        }
    }
}

impl fmt::Display for StrengthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StrengthLabel::Weak => "Weak",
            StrengthLabel::Fair => "Fair",
            StrengthLabel::Good => "Good",
            StrengthLabel::Strong => "Strong",
        };
        write!(f, "{}", label)
    }
}

/// Estimated password strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordStrength {
    /// Score from 0 to 100.
    pub score: u8,
    /// Bucket of the score.
    pub label: StrengthLabel,
}

/// Scores a password.
///
/// +25 for 8+ characters, +25 for 12+, +25 for mixed case, +15 for a digit
/// and +10 for any other symbol.
pub fn strength(password: &str) -> PasswordStrength {
    let length = password.chars().count();
    let mut score = 0u8;

    if length >= 8 {
        score += 25;
    }
    if length >= 12 {
        score += 25;
    }
    if password.chars().any(char::is_lowercase) && password.chars().any(char::is_uppercase) {
        score += 25;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 15;
    }
    if password.chars().any(|c| !c.is_alphanumeric()) {
        score += 10;
    }

    PasswordStrength {
        score,
        label: StrengthLabel::from_score(score),
    }
}

/// Rules a new password must satisfy before it reaches the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LENGTH)
    }
}

impl PasswordPolicy {
    /// Creates a policy. Lengths below the provider minimum are raised to it.
    pub fn new(min_length: usize) -> Self {
        Self {
            min_length: min_length.max(DEFAULT_MIN_LENGTH),
        }
    }

    /// Returns the minimum length.
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Rejects passwords that are too short.
    pub fn check(&self, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < self.min_length {
            return Err(AuthError::weak_secret(format!(
                "password must be at least {} characters",
                self.min_length
            )));
        }
        Ok(())
    }

    /// Checks a new password and its confirmation.
    pub fn check_new(&self, password: &str, confirm: &str) -> Result<(), AuthError> {
        if password != confirm {
            return Err(AuthError::PasswordMismatch);
        }
        self.check(password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strength_scores() {
        assert_eq!(strength("abc").score, 0);
        assert_eq!(strength("abcdefgh").label, StrengthLabel::Weak);
        assert_eq!(strength("abcdefgH1").score, 65);
        assert_eq!(strength("abcdefgH1").label, StrengthLabel::Fair);
        assert_eq!(strength("abcdefghijK!").label, StrengthLabel::Good);
        assert_eq!(strength("abcdefghijK1!").score, 100);
        assert_eq!(strength("abcdefghijK1!").label, StrengthLabel::Strong);
    }

    #[test]
    fn test_policy_min_length() {
        let policy = PasswordPolicy::default();
        assert!(matches!(policy.check("12345"), Err(AuthError::WeakSecret { .. })));
        assert!(policy.check("123456").is_ok());

        assert_eq!(PasswordPolicy::new(2).min_length(), DEFAULT_MIN_LENGTH);
        assert!(PasswordPolicy::new(10).check("123456789").is_err());
    }

    #[test]
    fn test_check_new_mismatch_first() {
        let policy = PasswordPolicy::default();
        assert_eq!(policy.check_new("abc", "abd"), Err(AuthError::PasswordMismatch));
        assert!(policy.check_new("abcdef", "abcdef").is_ok());
    }
}
