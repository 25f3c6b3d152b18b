// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # warden-config
//!
//! Configuration management for the Warden access console.
//!
//! ## Features
//!
//! - **Schema Definition**: typed sections with per-section validation
//! - **Multi-Format Support**: YAML, TOML or JSON configuration files
//! - **Environment Overrides**: `${VAR:default}` placeholders and `WARDEN_*` variables
//!
//! ## Quick Start
//!
//! ```no_run
//! use warden_config::loader::load_config;
//!
//! let config = load_config("warden.yaml").unwrap();
//!
//! println!("App: {}", config.app.name);
//! println!("Sign-in route: {}", config.app.sign_in_path);
//! ```
//!
//! ## Configuration Schema
//!
//! - `app` - Display name and routes
//! - `auth` - Password policy and role tags
//! - `roles` - Role registry bootstrap
//! - `storage` - Collection names and blob prefixes
//! - `settings` - Default preferences and commit debounce
//! - `logging` - Logging configuration

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader, ConfigLoaderBuilder};
pub use schema::{
    AppConfig, AuthConfig, LogFormat, LogLevel, LoggingConfig, RoleSeed, RolesConfig,
    SettingsConfig, StorageConfig, WardenConfig,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
