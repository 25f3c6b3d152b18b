// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use std::time::Duration;

use warden_auth::{bootstrap_roles, PermissionTag};
use warden_config::WardenConfig;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Returns the non-fatal issues found in a valid configuration.
pub fn collect_warnings(config: &WardenConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let roles: Vec<(String, Vec<String>)> = match config.roles.bootstrap {
        Some(ref seeds) => seeds
            .iter()
            .map(|s| (s.id.clone(), s.permissions.clone()))
            .collect(),
        None => bootstrap_roles()
            .into_iter()
            .map(|r| {
                let permissions = r.permissions.iter().map(|p| p.as_str().to_string()).collect();
                (r.id.as_str().to_string(), permissions)
            })
            .collect(),
    };

    match roles.iter().find(|(id, _)| *id == config.auth.default_role) {
        None => warnings.push(format!(
            "Default role '{}' is not defined; new accounts will have no permissions",
            config.auth.default_role
        )),
        Some((_, permissions)) => {
            let elevated = [
                PermissionTag::ALL,
                PermissionTag::MANAGE_USERS,
                PermissionTag::MANAGE_ROLES,
            ];
            if permissions.iter().any(|p| elevated.contains(&p.as_str())) {
                warnings.push(format!(
                    "Default role '{}' grants administrative permissions to every new account",
                    config.auth.default_role
                ));
            }
        }
    }

    if !config.roles.persist_bootstrap {
        warnings.push(
            "Bootstrap roles are kept in memory until the first role mutation".to_string(),
        );
    }

    if config.settings.commit_debounce == Duration::ZERO {
        warnings.push("Previewed settings are committed without debounce".to_string());
    }

    warnings
}

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;

    if !config_path.exists() {
        return Err(BinError::Configuration(format!(
            "Configuration file not found: {}",
            config_path.display()
        )));
    }

    let config = warden_config::load_config(config_path).map_err(|e| {
        BinError::Configuration(format!("Configuration validation failed: {}", e.user_message()))
    })?;

    let warnings = collect_warnings(&config);
    let role_count = config
        .roles
        .bootstrap
        .as_ref()
        .map(Vec::len)
        .unwrap_or_else(|| bootstrap_roles().len());

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  App:              {}", config.app.name);
            println!("  Sign-in route:    {}", config.app.sign_in_path);
            println!("  Default role:     {}", config.auth.default_role);
            println!("  Super-admin role: {}", config.auth.super_admin_role);
            println!("  Bootstrap roles:  {}", role_count);
            println!(
                "  Commit debounce:  {}",
                humantime_serde::re::humantime::format_duration(config.settings.commit_debounce)
            );
            println!(
                "  Logging:          {} ({})",
                config.logging.level.as_str(),
                config.logging.format.as_str()
            );

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!(
                    "{}",
                    serde_json::to_string_pretty(&config)
                        .unwrap_or_else(|_| "(serialization error)".to_string())
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "app_name": config.app.name,
                    "sign_in_path": config.app.sign_in_path,
                    "default_role": config.auth.default_role,
                    "super_admin_role": config.auth.super_admin_role,
                    "bootstrap_roles": role_count,
                    "commit_debounce_ms": config.settings.commit_debounce.as_millis() as u64,
                },
                "warnings": warnings,
                "config": if args.show_config { Some(&config) } else { None },
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output)?
            );
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::Configuration(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
