// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `roles` command.

use crate::cli::{Cli, OutputFormat, RolesArgs};
use crate::commands::load_config_or_default;
use crate::error::BinResult;
use crate::runtime::RuntimeBuilder;

/// Lists the roles the registry resolves from configuration.
pub async fn roles(cli: &Cli, args: RolesArgs) -> BinResult<()> {
    let config = load_config_or_default(&cli.config)?;
    let runtime = RuntimeBuilder::new().config(config).build().await?;
    let registry = &runtime.registry;
    let roles = registry.roles();

    match args.format {
        OutputFormat::Text => {
            println!("Roles ({}, source: {:?}):", roles.len(), registry.source());
            for role in &roles {
                let marker = if role.id == *registry.super_admin_tag() {
                    " [super-admin]"
                } else if role.system {
                    " [system]"
                } else {
                    ""
                };
                let permissions: Vec<&str> = role.permissions.iter().map(|p| p.as_str()).collect();
                println!("  {:<14} {}{}", role.id.as_str(), role.name, marker);
                println!("  {:<14} {}", "", permissions.join(", "));
            }
        }
        OutputFormat::Json => {
            let output: Vec<_> = roles
                .iter()
                .map(|role| {
                    serde_json::json!({
                        "id": role.id.as_str(),
                        "name": role.name,
                        "description": role.description,
                        "permissions": role.permissions,
                        "system": role.system,
                        "color": role.color,
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&output)?
            );
        }
    }

    Ok(())
}
