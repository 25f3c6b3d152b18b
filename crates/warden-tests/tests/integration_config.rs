// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! Loading configuration files from disk in every supported format, with
//! environment overrides and validation.
//!
//! Environment variables are process-wide, so every test that sets one uses
//! its own prefix.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use warden_config::{
    load_config, load_config_str, ConfigError, ConfigFormat, ConfigLoader, LogFormat, LogLevel,
};
use warden_tests::common::temp_test_dir;
use warden_tests::prelude::*;

fn write_config(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("failed to write config file");
    path
}

// =============================================================================
// File Loading Tests
// =============================================================================

#[test]
fn test_minimal_config_uses_defaults() {
    let config = load_config_str(ConfigFixtures::minimal_yaml(), ConfigFormat::Yaml).unwrap();

    assert_eq!(config.app.name, "Minimal Console");
    assert_eq!(config.app.sign_in_path, "/login");
    assert_eq!(config.app.home_path, "/");
    assert_eq!(config.auth.min_password_length, 6);
    assert_eq!(config.auth.default_role, "user");
    assert_eq!(config.auth.super_admin_role, "super_admin");
    assert!(config.roles.persist_bootstrap);
    assert!(config.roles.bootstrap.is_none());
    assert_eq!(config.storage.users_collection, "users");
    assert_eq!(config.settings.mode, "light");
    assert_eq!(config.settings.commit_debounce, Duration::from_millis(500));
    assert_eq!(config.logging.level, LogLevel::Info);
    assert_eq!(config.logging.format, LogFormat::Text);
}

#[test]
fn test_full_yaml_file() {
    let dir = temp_test_dir("warden-config");
    let path = write_config(&dir, "warden.yaml", ConfigFixtures::full_yaml());

    let config = load_config(&path).unwrap();

    assert_eq!(config.app.name, "Operations Console");
    assert_eq!(config.app.sign_in_path, "/signin");
    assert_eq!(config.app.home_path, "/overview");
    assert_eq!(config.auth.min_password_length, 10);
    assert_eq!(config.auth.default_role, "member");
    assert!(!config.roles.persist_bootstrap);
    assert_eq!(config.roles.bootstrap.as_ref().map(Vec::len), Some(2));

    let root = config.get_role("super_admin").unwrap();
    assert!(root.system);
    assert_eq!(root.permissions, vec!["all"]);
    let member = config.get_role("member").unwrap();
    assert_eq!(member.description, "Reads reports");
    assert_eq!(member.color.as_deref(), Some("#00897b"));
    assert!(!member.system);
    assert!(config.get_role("editor").is_none());

    assert_eq!(config.storage.users_collection, "accounts");
    assert_eq!(config.storage.roles_collection, "access_roles");
    assert_eq!(config.storage.settings_collection, "settings");
    assert_eq!(config.settings.mode, "dark");
    assert_eq!(config.settings.color_scheme, "green");
    assert_eq!(config.settings.font_size, "large");
    assert!(!config.settings.sidebar_open);
    assert_eq!(config.settings.commit_debounce, Duration::from_millis(250));
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_toml_and_json_files() {
    let dir = temp_test_dir("warden-config");

    let toml = load_config(write_config(&dir, "warden.toml", ConfigFixtures::toml())).unwrap();
    assert_eq!(toml.app.name, "Toml Console");
    assert_eq!(toml.auth.min_password_length, 8);
    assert_eq!(toml.settings.color_scheme, "orange");
    assert_eq!(toml.settings.commit_debounce, Duration::from_secs(1));

    let json = load_config(write_config(&dir, "warden.json", ConfigFixtures::json())).unwrap();
    assert_eq!(json.app.name, "Json Console");
    assert_eq!(json.app.home_path, "/home");
    assert_eq!(json.settings.font_size, "small");

    let yml = load_config(write_config(&dir, "warden.YML", ConfigFixtures::minimal_yaml())).unwrap();
    assert_eq!(yml.app.name, "Minimal Console");
}

#[test]
fn test_missing_and_unsupported_files() {
    let dir = temp_test_dir("warden-config");

    let missing = dir.path().join("absent.yaml");
    match load_config(&missing) {
        Err(ConfigError::FileNotFound { path }) => assert_eq!(path, missing),
        other => panic!("expected FileNotFound, got {:?}", other),
    }

    let ini = write_config(&dir, "warden.ini", "[app]\nname = x\n");
    assert!(matches!(
        load_config(&ini),
        Err(ConfigError::UnsupportedFormat { ref format }) if format == "ini"
    ));

    let bare = write_config(&dir, "warden", "app: {}\n");
    assert!(matches!(
        load_config(&bare),
        Err(ConfigError::UnsupportedFormat { .. })
    ));
}

#[test]
fn test_malformed_file_reports_path() {
    let dir = temp_test_dir("warden-config");
    let path = write_config(&dir, "broken.json", "{ \"app\": { \"name\": ");

    match load_config(&path) {
        Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected Parse, got {:?}", other),
    }

    let unknown = write_config(&dir, "unknown.json", r#"{ "app": { "title": "x" } }"#);
    assert!(matches!(load_config(&unknown), Err(ConfigError::Parse { .. })));
}

// =============================================================================
// Environment Tests
// =============================================================================

#[test]
fn test_env_overrides_apply_after_parsing() {
    let prefix = "WARDEN_IT_OVERRIDE";
    std::env::set_var(format!("{prefix}_APP_NAME"), "Env Console");
    std::env::set_var(format!("{prefix}_AUTH_MIN_PASSWORD_LENGTH"), " 12 ");
    std::env::set_var(format!("{prefix}_ROLES_PERSIST_BOOTSTRAP"), "off");
    std::env::set_var(format!("{prefix}_SETTINGS_MODE"), "DARK");
    std::env::set_var(format!("{prefix}_SETTINGS_COMMIT_DEBOUNCE"), "2s");
    std::env::set_var(format!("{prefix}_LOG_FORMAT"), "compact");
    std::env::set_var(format!("{prefix}_LOG_LEVEL"), "chatty");

    let config = ConfigLoader::new()
        .with_env_prefix(prefix)
        .load_from_str(ConfigFixtures::minimal_yaml(), ConfigFormat::Yaml)
        .unwrap();

    assert_eq!(config.app.name, "Env Console");
    assert_eq!(config.auth.min_password_length, 12);
    assert!(!config.roles.persist_bootstrap);
    assert_eq!(config.settings.mode, "dark");
    assert_eq!(config.settings.commit_debounce, Duration::from_secs(2));
    assert_eq!(config.logging.format, LogFormat::Compact);
    assert_eq!(config.logging.level, LogLevel::Info);

    let untouched = ConfigLoader::new()
        .with_env_prefix(prefix)
        .with_env_vars(false)
        .load_from_str(ConfigFixtures::minimal_yaml(), ConfigFormat::Yaml)
        .unwrap();
    assert_eq!(untouched.app.name, "Minimal Console");
}

#[test]
fn test_env_override_errors() {
    let prefix = "WARDEN_IT_BAD_NUMBER";
    std::env::set_var(format!("{prefix}_AUTH_MIN_PASSWORD_LENGTH"), "lots");
    match ConfigLoader::new()
        .with_env_prefix(prefix)
        .load_from_str(ConfigFixtures::minimal_yaml(), ConfigFormat::Yaml)
    {
        Err(ConfigError::InvalidEnvVar { name, .. }) => {
            assert_eq!(name, "WARDEN_IT_BAD_NUMBER_AUTH_MIN_PASSWORD_LENGTH")
        }
        other => panic!("expected InvalidEnvVar, got {:?}", other),
    }

    let prefix = "WARDEN_IT_TOO_SHORT";
    std::env::set_var(format!("{prefix}_AUTH_MIN_PASSWORD_LENGTH"), "3");
    match ConfigLoader::new()
        .with_env_prefix(prefix)
        .load_from_str(ConfigFixtures::minimal_yaml(), ConfigFormat::Yaml)
    {
        Err(ConfigError::Validation { field, .. }) => {
            assert_eq!(field, "auth.min_password_length")
        }
        other => panic!("expected Validation, got {:?}", other),
    }
}

#[test]
fn test_env_placeholders_in_file() {
    let dir = temp_test_dir("warden-config");
    std::env::set_var("WARDEN_IT_PLACEHOLDER_HOME", "/start");
    let path = write_config(
        &dir,
        "warden.yaml",
        r#"
app:
  name: "${WARDEN_IT_PLACEHOLDER_NAME:Fallback Console}"
  home_path: "${WARDEN_IT_PLACEHOLDER_HOME}"
"#,
    );

    let config = load_config(&path).unwrap();
    assert_eq!(config.app.name, "Fallback Console");
    assert_eq!(config.app.home_path, "/start");
}

// =============================================================================
// Validation Tests
// =============================================================================

fn validation_field(content: &str) -> String {
    match load_config_str(content, ConfigFormat::Yaml) {
        Err(ConfigError::Validation { field, .. }) => field,
        other => panic!("expected Validation, got {:?}", other),
    }
}

#[test]
fn test_validation_rejects_bad_sections() {
    assert_eq!(
        validation_field("auth:\n  min_password_length: 4\n"),
        "auth.min_password_length"
    );
    assert_eq!(
        validation_field("auth:\n  default_role: \"super_admin\"\n"),
        "auth.default_role"
    );
    assert_eq!(
        validation_field("app:\n  sign_in_path: \"login\"\n"),
        "app.sign_in_path"
    );
    assert_eq!(
        validation_field("settings:\n  mode: \"sepia\"\n"),
        "settings.mode"
    );
    assert_eq!(
        validation_field("settings:\n  commit_debounce: \"1m\"\n"),
        "settings.commit_debounce"
    );
    assert_eq!(
        validation_field("storage:\n  roles_collection: \"users\"\n"),
        "storage.roles_collection"
    );
}

#[test]
fn test_validation_of_bootstrap_roles() {
    let duplicate = r#"
roles:
  bootstrap:
    - { id: "super_admin", name: "Root", permissions: ["all"], system: true }
    - { id: "viewer", name: "Viewer" }
    - { id: "viewer", name: "Viewer again" }
"#;
    assert!(matches!(
        load_config_str(duplicate, ConfigFormat::Yaml),
        Err(ConfigError::DuplicateRole { ref role }) if role == "viewer"
    ));

    let without_root = r#"
roles:
  bootstrap:
    - { id: "viewer", name: "Viewer", permissions: ["read"] }
"#;
    assert_eq!(validation_field(without_root), "roles.bootstrap");

    let bad_color = r#"
roles:
  bootstrap:
    - { id: "super_admin", name: "Root", permissions: ["all"], system: true }
    - { id: "viewer", name: "Viewer", color: "purple" }
"#;
    assert_eq!(validation_field(bad_color), "roles.bootstrap[viewer].color");
}
