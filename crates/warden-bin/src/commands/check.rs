// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `check` command.

use tracing::warn;
use warden_auth::{check_capability, CapabilityGrant};
use warden_core::RoleId;

use crate::cli::{CheckArgs, Cli, OutputFormat};
use crate::commands::load_config_or_default;
use crate::error::{BinError, BinResult};
use crate::runtime::RuntimeBuilder;

fn grant_label(grant: CapabilityGrant) -> &'static str {
    match grant {
        CapabilityGrant::Exact => "exact",
        CapabilityGrant::Wildcard => "wildcard",
        CapabilityGrant::Bypass => "bypass",
        CapabilityGrant::Denied => "denied",
    }
}

/// Resolves one permission for one role. Fails when it is denied.
pub async fn check(cli: &Cli, args: CheckArgs) -> BinResult<()> {
    let config = load_config_or_default(&cli.config)?;
    let runtime = RuntimeBuilder::new().config(config).build().await?;
    let registry = &runtime.registry;

    let role = RoleId::new(args.role.as_str());
    let defined = registry.contains(&role);
    if !defined {
        warn!(role = %role, "Role is not defined, resolving with no permissions");
    }

    let grant = check_capability(
        &registry.permissions_for(&role),
        Some(&role),
        registry.super_admin_tag(),
        &args.permission,
    );

    match args.format {
        OutputFormat::Text => {
            let verdict = if grant.is_granted() { "granted" } else { "denied" };
            println!(
                "{} → {}: {} ({})",
                role,
                args.permission,
                verdict,
                grant_label(grant)
            );
            if !defined {
                println!("  note: role '{}' is not defined", role);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "role": role.as_str(),
                "permission": args.permission,
                "granted": grant.is_granted(),
                "reason": grant_label(grant),
                "role_defined": defined,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output)?
            );
        }
    }

    if grant.is_granted() {
        Ok(())
    } else {
        Err(BinError::denied(role.as_str(), args.permission.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_labels() {
        assert_eq!(grant_label(CapabilityGrant::Bypass), "bypass");
        assert_eq!(grant_label(CapabilityGrant::Denied), "denied");
    }
}
