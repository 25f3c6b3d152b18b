// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading for Warden.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and pick the format from its extension
//! 2. Resolve `${VAR}` / `${VAR:default}` placeholders in the raw text
//! 3. Parse YAML/TOML/JSON into [`WardenConfig`]
//! 4. Apply `WARDEN_*` environment overrides
//! 5. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! WARDEN_APP_NAME="Back Office"
//! WARDEN_AUTH_MIN_PASSWORD_LENGTH=10
//! WARDEN_ROLES_PERSIST_BOOTSTRAP=false
//! WARDEN_SETTINGS_COMMIT_DEBOUNCE=750ms
//! WARDEN_LOG_LEVEL=debug
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LogFormat, LogLevel, WardenConfig};
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "WARDEN";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Configuration loader for Warden.
///
/// # Examples
///
/// ```no_run
/// use warden_config::loader::ConfigLoader;
///
/// let loader = ConfigLoader::new();
/// let config = loader.load("warden.yaml").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve placeholders and apply overrides.
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a new configuration loader with default settings.
    pub fn new() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
        }
    }

    /// Creates a builder for configuring the loader.
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::new()
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Loads configuration from a file.
    ///
    /// The file format is determined by the file extension:
    /// - `.yaml` or `.yml` - YAML format
    /// - `.toml` - TOML format
    /// - `.json` - JSON format
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<WardenConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = self.read_file(path)?;
        let format = ConfigFormat::from_path(path)?;
        let mut config = self.parse_content(&content, format, path)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        config.validate()?;

        info!(app = %config.app.name, "Configuration loaded successfully");
        debug!(
            bootstrap_roles = config.roles.bootstrap.as_ref().map(Vec::len).unwrap_or(0),
            persist_bootstrap = config.roles.persist_bootstrap,
            log_level = config.logging.level.as_str(),
            "Configuration details"
        );

        Ok(config)
    }

    /// Loads configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<WardenConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)?
        } else {
            content.to_string()
        };

        let mut config = parse_str(&content, format)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Reads file content.
    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    /// Parses content based on format.
    fn parse_content(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<WardenConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)?
        } else {
            content.to_string()
        };

        parse_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })
    }

    /// Resolves environment variable placeholders in content.
    ///
    /// Supports the format: `${VAR_NAME}` or `${VAR_NAME:default}`
    fn resolve_env_placeholders(&self, content: &str) -> ConfigResult<String> {
        let mut result = String::with_capacity(content.len());
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' || chars.peek() != Some(&'{') {
                result.push(c);
                continue;
            }
            chars.next();

            let mut var_content = String::new();
            let mut found_close = false;
            for c in chars.by_ref() {
                if c == '}' {
                    found_close = true;
                    break;
                }
                var_content.push(c);
            }

            if !found_close {
                result.push_str("${");
                result.push_str(&var_content);
                continue;
            }

            let (var_name, default_value) = match var_content.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (var_content.as_str(), None),
            };

            match env::var(var_name) {
                Ok(value) => result.push_str(&value),
                Err(_) => match default_value {
                    Some(default) => result.push_str(default),
                    None => {
                        warn!("Environment variable '{}' not found", var_name);
                        result.push_str(&format!("${{{}}}", var_name));
                    }
                },
            }
        }

        Ok(result)
    }

    fn env_name(&self, key: &str) -> String {
        format!("{}_{}", self.env_prefix, key)
    }

    fn env_value(&self, key: &str) -> Option<(String, String)> {
        let name = self.env_name(key);
        env::var(&name).ok().map(|value| (name, value))
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&self, config: &mut WardenConfig) -> ConfigResult<()> {
        // App
        if let Some((_, value)) = self.env_value("APP_NAME") {
            config.app.name = value;
        }
        if let Some((_, value)) = self.env_value("APP_SIGN_IN_PATH") {
            config.app.sign_in_path = value;
        }
        if let Some((_, value)) = self.env_value("APP_HOME_PATH") {
            config.app.home_path = value;
        }

        // Auth
        if let Some((name, value)) = self.env_value("AUTH_MIN_PASSWORD_LENGTH") {
            config.auth.min_password_length = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env_var(name, "expected a positive number"))?;
        }
        if let Some((_, value)) = self.env_value("AUTH_DEFAULT_ROLE") {
            config.auth.default_role = value;
        }
        if let Some((_, value)) = self.env_value("AUTH_SUPER_ADMIN_ROLE") {
            config.auth.super_admin_role = value;
        }

        // Roles
        if let Some((_, value)) = self.env_value("ROLES_PERSIST_BOOTSTRAP") {
            config.roles.persist_bootstrap = parse_bool(&value);
        }

        // Settings
        if let Some((_, value)) = self.env_value("SETTINGS_MODE") {
            config.settings.mode = value.to_lowercase();
        }
        if let Some((_, value)) = self.env_value("SETTINGS_COLOR_SCHEME") {
            config.settings.color_scheme = value.to_lowercase();
        }
        if let Some((_, value)) = self.env_value("SETTINGS_FONT_SIZE") {
            config.settings.font_size = value.to_lowercase();
        }
        if let Some((_, value)) = self.env_value("SETTINGS_SIDEBAR_OPEN") {
            config.settings.sidebar_open = parse_bool(&value);
        }
        if let Some((name, value)) = self.env_value("SETTINGS_COMMIT_DEBOUNCE") {
            config.settings.commit_debounce =
                humantime_serde::re::humantime::parse_duration(value.trim()).map_err(|e| {
                    ConfigError::invalid_env_var(name, format!("expected a duration: {}", e))
                })?;
        }

        // Logging
        if let Some((name, value)) = self.env_value("LOG_LEVEL") {
            match parse_log_level(&value) {
                Some(level) => config.logging.level = level,
                None => warn!(variable = %name, value = %value, "Ignoring unknown log level"),
            }
        }
        if let Some((name, value)) = self.env_value("LOG_FORMAT") {
            config.logging.format = parse_log_format(&value).ok_or_else(|| {
                ConfigError::invalid_env_var(name, "expected one of: text, compact, json")
            })?;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigLoaderBuilder
// =============================================================================

/// Builder for ConfigLoader.
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    env_prefix: Option<String>,
    resolve_env_vars: Option<bool>,
}

impl ConfigLoaderBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the environment prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn resolve_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = Some(enabled);
        self
    }

    /// Builds the ConfigLoader.
    pub fn build(self) -> ConfigLoader {
        let mut loader = ConfigLoader::new();

        if let Some(prefix) = self.env_prefix {
            loader.env_prefix = prefix;
        }
        if let Some(resolve_env_vars) = self.resolve_env_vars {
            loader.resolve_env_vars = resolve_env_vars;
        }

        loader
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parses a string based on format.
fn parse_str(content: &str, format: ConfigFormat) -> ConfigResult<WardenConfig> {
    match format {
        ConfigFormat::Yaml => yaml_parse(content),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
    }
}

/// Parses a string to bool.
fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "enabled"
    )
}

/// Parses a log level string.
fn parse_log_level(value: &str) -> Option<LogLevel> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Some(LogLevel::Trace),
        "debug" => Some(LogLevel::Debug),
        "info" => Some(LogLevel::Info),
        "warn" | "warning" => Some(LogLevel::Warn),
        "error" => Some(LogLevel::Error),
        _ => None,
    }
}

/// Parses a log format string.
fn parse_log_format(value: &str) -> Option<LogFormat> {
    match value.trim().to_lowercase().as_str() {
        "text" | "pretty" => Some(LogFormat::Text),
        "compact" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

/// YAML parsing through the `config` crate.
fn yaml_parse<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .map_err(|e| ConfigError::serialization(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::serialization(e.to_string()))
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
///
/// ```no_run
/// use warden_config::loader::load_config;
///
/// let config = load_config("warden.yaml").unwrap();
/// ```
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<WardenConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the specified format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<WardenConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================
