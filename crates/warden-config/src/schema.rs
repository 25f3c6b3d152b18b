// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for Warden.
//!
//! # Schema Structure
//!
//! ```text
//! WardenConfig
//! ├── app: AppConfig
//! ├── auth: AuthConfig
//! ├── roles: RolesConfig
//! ├── storage: StorageConfig
//! ├── settings: SettingsConfig
//! └── logging: LoggingConfig
//! ```
//!
//! Role tags and preference values are kept as plain strings here; the
//! binary converts them into registry and settings types.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Default sign-in route.
pub const DEFAULT_SIGN_IN_PATH: &str = "/login";

/// Default home route.
pub const DEFAULT_HOME_PATH: &str = "/";

/// Smallest accepted minimum password length.
pub const MIN_PASSWORD_LENGTH_FLOOR: usize = 6;

/// Default commit debounce for previewed settings.
pub const DEFAULT_COMMIT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Accepted theme modes.
pub const THEME_MODES: &[&str] = &["light", "dark"];

/// Accepted colour schemes.
pub const COLOR_SCHEMES: &[&str] = &["purple", "blue", "green", "orange", "pink"];

/// Accepted font sizes.
pub const FONT_SIZES: &[&str] = &["small", "medium", "large", "xlarge"];

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for Warden.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    /// Application identity and routes.
    #[serde(default)]
    pub app: AppConfig,

    /// Authentication policy.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Role registry bootstrap.
    #[serde(default)]
    pub roles: RolesConfig,

    /// Document and blob layout.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Default preferences.
    #[serde(default)]
    pub settings: SettingsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WardenConfig {
    /// Validates the entire configuration.
    ///
    /// Sections are checked in declaration order; the first failure is
    /// returned. The bootstrap role list is checked against the configured
    /// super-admin role.
    pub fn validate(&self) -> ConfigResult<()> {
        self.app.validate()?;
        self.auth.validate()?;
        self.roles.validate(&self.auth.super_admin_role)?;
        self.storage.validate()?;
        self.settings.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Returns a bootstrap role seed by id.
    pub fn get_role(&self, id: &str) -> Option<&RoleSeed> {
        self.roles
            .bootstrap
            .as_ref()
            .and_then(|roles| roles.iter().find(|r| r.id == id))
    }
}

// =============================================================================
// App Configuration
// =============================================================================

/// Application identity and route configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Where unauthenticated visitors are redirected.
    #[serde(default = "default_sign_in_path")]
    pub sign_in_path: String,

    /// Where denied visitors are sent back to.
    #[serde(default = "default_home_path")]
    pub home_path: String,
}

fn default_app_name() -> String {
    "Warden Admin".to_string()
}

fn default_sign_in_path() -> String {
    DEFAULT_SIGN_IN_PATH.to_string()
}

fn default_home_path() -> String {
    DEFAULT_HOME_PATH.to_string()
}

impl AppConfig {
    /// Validates the app configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::validation("app.name", "must not be empty"));
        }
        validate_route("app.sign_in_path", &self.sign_in_path)?;
        validate_route("app.home_path", &self.home_path)?;
        if self.sign_in_path == self.home_path {
            return Err(ConfigError::validation(
                "app.sign_in_path",
                "must differ from app.home_path",
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            sign_in_path: default_sign_in_path(),
            home_path: default_home_path(),
        }
    }
}

fn validate_route(field: &str, path: &str) -> ConfigResult<()> {
    if !path.starts_with('/') {
        return Err(ConfigError::validation(field, "must start with '/'"));
    }
    Ok(())
}

// =============================================================================
// Auth Configuration
// =============================================================================

/// Authentication policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Minimum accepted password length.
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// Role assigned to newly created profiles.
    #[serde(default = "default_role")]
    pub default_role: String,

    /// Role that bypasses every permission check.
    #[serde(default = "default_super_admin_role")]
    pub super_admin_role: String,
}

fn default_min_password_length() -> usize {
    MIN_PASSWORD_LENGTH_FLOOR
}

fn default_role() -> String {
    "user".to_string()
}

fn default_super_admin_role() -> String {
    "super_admin".to_string()
}

impl AuthConfig {
    /// Validates the auth configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_password_length < MIN_PASSWORD_LENGTH_FLOOR {
            return Err(ConfigError::validation(
                "auth.min_password_length",
                format!("must be at least {}", MIN_PASSWORD_LENGTH_FLOOR),
            ));
        }
        if self.default_role.trim().is_empty() {
            return Err(ConfigError::validation("auth.default_role", "must not be empty"));
        }
        if self.super_admin_role.trim().is_empty() {
            return Err(ConfigError::validation(
                "auth.super_admin_role",
                "must not be empty",
            ));
        }
        if self.default_role == self.super_admin_role {
            return Err(ConfigError::validation(
                "auth.default_role",
                "new accounts must not start as super-admin",
            ));
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_length: default_min_password_length(),
            default_role: default_role(),
            super_admin_role: default_super_admin_role(),
        }
    }
}

// =============================================================================
// Roles Configuration
// =============================================================================

/// Role registry bootstrap configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RolesConfig {
    /// Write the bootstrap set to the store on first run.
    #[serde(default = "default_enabled")]
    pub persist_bootstrap: bool,

    /// Replaces the built-in bootstrap set when present.
    #[serde(default)]
    pub bootstrap: Option<Vec<RoleSeed>>,
}

fn default_enabled() -> bool {
    true
}

impl RolesConfig {
    /// Validates the roles configuration.
    pub fn validate(&self, super_admin_role: &str) -> ConfigResult<()> {
        let Some(ref roles) = self.bootstrap else {
            return Ok(());
        };

        let mut ids = HashSet::new();
        for role in roles {
            if !ids.insert(role.id.as_str()) {
                return Err(ConfigError::duplicate_role(&role.id));
            }
            role.validate()?;
        }

        if !ids.contains(super_admin_role) {
            return Err(ConfigError::validation(
                "roles.bootstrap",
                format!("must include the super-admin role '{}'", super_admin_role),
            ));
        }
        Ok(())
    }
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            persist_bootstrap: true,
            bootstrap: None,
        }
    }
}

/// A role definition seeded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleSeed {
    /// Role tag stored on profiles.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Description.
    #[serde(default)]
    pub description: String,

    /// Granted permission tags.
    #[serde(default)]
    pub permissions: Vec<String>,

    /// System roles cannot be deleted or renamed.
    #[serde(default)]
    pub system: bool,

    /// Badge colour.
    #[serde(default)]
    pub color: Option<String>,
}

impl RoleSeed {
    /// Validates the role seed.
    pub fn validate(&self) -> ConfigResult<()> {
        let field = |name: &str| format!("roles.bootstrap[{}].{}", self.id, name);

        if self.id.trim().is_empty() {
            return Err(ConfigError::validation("roles.bootstrap.id", "must not be empty"));
        }
        if self.id.chars().any(char::is_whitespace) {
            return Err(ConfigError::validation(field("id"), "must not contain whitespace"));
        }
        if self.name.trim().is_empty() {
            return Err(ConfigError::validation(field("name"), "must not be empty"));
        }
        if let Some(tag) = self.permissions.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::validation(
                field("permissions"),
                format!("invalid permission tag '{}'", tag),
            ));
        }
        if let Some(ref color) = self.color {
            if !is_hex_color(color) {
                return Err(ConfigError::validation(
                    field("color"),
                    format!("'{}' is not a #rrggbb colour", color),
                ));
            }
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

// =============================================================================
// Storage Configuration
// =============================================================================

/// Document and blob layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Collection holding user profiles.
    #[serde(default = "default_users_collection")]
    pub users_collection: String,

    /// Collection holding role definitions.
    #[serde(default = "default_roles_collection")]
    pub roles_collection: String,

    /// Per-user settings sub-collection.
    #[serde(default = "default_settings_collection")]
    pub settings_collection: String,

    /// Key of the preferences document.
    #[serde(default = "default_preferences_key")]
    pub preferences_key: String,

    /// Blob prefix for avatars.
    #[serde(default = "default_avatars_prefix")]
    pub avatars_prefix: String,
}

fn default_users_collection() -> String {
    "users".to_string()
}

fn default_roles_collection() -> String {
    "roles".to_string()
}

fn default_settings_collection() -> String {
    "settings".to_string()
}

fn default_preferences_key() -> String {
    "preferences".to_string()
}

fn default_avatars_prefix() -> String {
    "avatars".to_string()
}

impl StorageConfig {
    /// Validates the storage configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let names = [
            ("storage.users_collection", &self.users_collection),
            ("storage.roles_collection", &self.roles_collection),
            ("storage.settings_collection", &self.settings_collection),
            ("storage.preferences_key", &self.preferences_key),
            ("storage.avatars_prefix", &self.avatars_prefix),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(ConfigError::validation(field, "must not be empty"));
            }
            if value.contains('/') {
                return Err(ConfigError::validation(field, "must be a single path segment"));
            }
        }
        if self.users_collection == self.roles_collection {
            return Err(ConfigError::validation(
                "storage.roles_collection",
                "must differ from storage.users_collection",
            ));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            users_collection: default_users_collection(),
            roles_collection: default_roles_collection(),
            settings_collection: default_settings_collection(),
            preferences_key: default_preferences_key(),
            avatars_prefix: default_avatars_prefix(),
        }
    }
}

// =============================================================================
// Settings Configuration
// =============================================================================

/// Default preferences and commit timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsConfig {
    /// Default theme mode.
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Default colour scheme.
    #[serde(default = "default_color_scheme")]
    pub color_scheme: String,

    /// Default font size.
    #[serde(default = "default_font_size")]
    pub font_size: String,

    /// Whether the sidebar starts open.
    #[serde(default = "default_enabled")]
    pub sidebar_open: bool,

    /// Delay before a previewed value is committed.
    #[serde(default = "default_commit_debounce", with = "humantime_serde")]
    pub commit_debounce: Duration,
}

fn default_mode() -> String {
    "light".to_string()
}

fn default_color_scheme() -> String {
    "purple".to_string()
}

fn default_font_size() -> String {
    "medium".to_string()
}

fn default_commit_debounce() -> Duration {
    DEFAULT_COMMIT_DEBOUNCE
}

impl SettingsConfig {
    /// Validates the settings configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_choice("settings.mode", &self.mode, THEME_MODES)?;
        validate_choice("settings.color_scheme", &self.color_scheme, COLOR_SCHEMES)?;
        validate_choice("settings.font_size", &self.font_size, FONT_SIZES)?;
        if self.commit_debounce > Duration::from_secs(10) {
            return Err(ConfigError::validation(
                "settings.commit_debounce",
                "must not exceed 10s",
            ));
        }
        Ok(())
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            color_scheme: default_color_scheme(),
            font_size: default_font_size(),
            sidebar_open: true,
            commit_debounce: default_commit_debounce(),
        }
    }
}

fn validate_choice(field: &str, value: &str, allowed: &[&str]) -> ConfigResult<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::validation(
            field,
            format!("'{}' is not one of: {}", value, allowed.join(", ")),
        ))
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Validates the logging configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        Ok(())
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level as an `EnvFilter` directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// Single-line compact output.
    Compact,
    /// JSON lines.
    Json,
}

impl LogFormat {
    /// Returns the format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(id: &str) -> RoleSeed {
        RoleSeed {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            permissions: vec!["read".to_string()],
            system: false,
            color: None,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = WardenConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.app.sign_in_path, "/login");
        assert_eq!(config.auth.min_password_length, 6);
        assert_eq!(config.settings.commit_debounce, Duration::from_millis(500));
    }

    #[test]
    fn test_route_must_be_absolute() {
        let mut config = WardenConfig::default();
        config.app.sign_in_path = "login".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "app.sign_in_path"));
    }

    #[test]
    fn test_password_floor() {
        let auth = AuthConfig {
            min_password_length: 4,
            ..Default::default()
        };
        assert!(auth.validate().is_err());

        let auth = AuthConfig {
            min_password_length: 12,
            ..Default::default()
        };
        assert!(auth.validate().is_ok());
    }

    #[test]
    fn test_bootstrap_requires_super_admin() {
        let roles = RolesConfig {
            persist_bootstrap: true,
            bootstrap: Some(vec![seed("admin"), seed("user")]),
        };
        assert!(roles.validate("super_admin").is_err());

        let roles = RolesConfig {
            persist_bootstrap: true,
            bootstrap: Some(vec![seed("super_admin"), seed("user")]),
        };
        assert!(roles.validate("super_admin").is_ok());
    }

    #[test]
    fn test_bootstrap_rejects_duplicates() {
        let roles = RolesConfig {
            persist_bootstrap: false,
            bootstrap: Some(vec![seed("super_admin"), seed("user"), seed("user")]),
        };
        assert!(matches!(
            roles.validate("super_admin"),
            Err(ConfigError::DuplicateRole { ref role }) if role == "user"
        ));
    }

    #[test]
    fn test_role_seed_color() {
        let mut role = seed("editor");
        role.color = Some("#4caf50".to_string());
        assert!(role.validate().is_ok());

        role.color = Some("green".to_string());
        assert!(role.validate().is_err());
    }

    #[test]
    fn test_settings_choices() {
        let mut settings = SettingsConfig::default();
        assert!(settings.validate().is_ok());

        settings.color_scheme = "teal".to_string();
        assert!(settings.validate().is_err());

        settings.color_scheme = "pink".to_string();
        settings.font_size = "xlarge".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_storage_segments() {
        let storage = StorageConfig {
            users_collection: "org/users".to_string(),
            ..Default::default()
        };
        assert!(storage.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(LogLevel::Info.as_str(), "info");
        assert_eq!(LogLevel::Debug.as_str(), "debug");
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }
}
