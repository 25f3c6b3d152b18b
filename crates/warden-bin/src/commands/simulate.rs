// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `simulate` command.
//!
//! Scenario, in order:
//!
//! 1. the operator signs up and receives the default role
//! 2. an administrator promotes the operator to `admin`
//! 3. the operator toggles the theme and previews then commits a colour scheme
//! 4. the administrator disables the account, which forces a sign-out

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;
use warden_auth::{visible_menu, AccessContext, GateDecision};
use warden_core::{AccountStatus, Identity, RoleId, WardenError};
use warden_settings::{ColorScheme, PreferenceUpdate};

use crate::cli::{Cli, OutputFormat, SimulateArgs};
use crate::commands::load_config_or_default;
use crate::error::{BinError, BinResult};
use crate::runtime::{ConsoleRuntime, RuntimeBuilder};

// =============================================================================
// Trail
// =============================================================================

/// One recorded step of the scenario.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    /// Stage name.
    pub stage: &'static str,
    /// One-line summary.
    pub summary: String,
    /// Structured details.
    pub data: Value,
}

#[derive(Debug, Default)]
struct Trail {
    steps: Vec<Step>,
}

impl Trail {
    fn push(&mut self, stage: &'static str, summary: impl Into<String>, data: Value) {
        let summary = summary.into();
        info!(stage, summary = %summary, "Simulation step");
        self.steps.push(Step {
            stage,
            summary,
            data,
        });
    }

    fn print(&self, format: OutputFormat) -> BinResult<()> {
        match format {
            OutputFormat::Text => {
                for (i, step) in self.steps.iter().enumerate() {
                    println!("[{:>2}] {:<12} {}", i + 1, step.stage, step.summary);
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&self.steps)?
                );
            }
        }
        Ok(())
    }
}

// =============================================================================
// Command
// =============================================================================

/// Runs the scenario and prints the event trail.
pub async fn simulate(cli: &Cli, args: SimulateArgs) -> BinResult<()> {
    let config = load_config_or_default(&cli.config)?;
    let runtime = RuntimeBuilder::new().config(config).build().await?;
    runtime.start();

    let mut trail = Trail::default();
    let result = run_scenario(&runtime, &args, &mut trail).await;
    runtime.shutdown().await;

    for entry in runtime.audit.entries() {
        trail.push(
            "audit",
            format!(
                "{} {} by {} ({:?})",
                entry.action.as_str(),
                entry.target.as_deref().unwrap_or("-"),
                entry.actor.as_ref().map(|a| a.as_str()).unwrap_or("system"),
                entry.outcome
            ),
            serde_json::to_value(&entry).unwrap_or(Value::Null),
        );
    }

    trail.print(args.format)?;
    result
}

async fn run_scenario(
    runtime: &ConsoleRuntime,
    args: &SimulateArgs,
    trail: &mut Trail,
) -> BinResult<()> {
    let wait = Duration::from_secs(args.timeout);

    // 1. Sign-up
    let identity = runtime.session.sign_up(&args.email, &args.password).await?;
    trail.push(
        "sign_up",
        format!("{} signed up as {}", identity.email, identity.id),
        json!({ "user_id": identity.id.as_str() }),
    );

    let ctx = settle(runtime, wait, "initial profile", |c| c.profile().is_some()).await?;
    record_access(runtime, trail, "resolved", &ctx);

    // 2. Promotion by an administrator
    let admin = administrator(runtime).await?;
    let promoted = RoleId::admin();
    if !runtime.registry.contains(&promoted) {
        return Err(BinError::config(format!(
            "the scenario needs a '{}' role in the registry",
            promoted
        )));
    }
    runtime
        .directory
        .set_role(&admin, &identity.id, &promoted)
        .await?;
    let ctx = settle(runtime, wait, "promotion", |c| c.has_role(promoted.as_str())).await?;
    record_access(runtime, trail, "promoted", &ctx);

    // 3. Preferences
    let loaded = runtime.settings.load(&identity).await?;
    trail.push(
        "preferences",
        format!(
            "loaded mode={} scheme={} font={}",
            loaded.mode,
            loaded.color_scheme.as_str(),
            loaded.font_scale.as_str()
        ),
        serde_json::to_value(loaded).unwrap_or(Value::Null),
    );

    runtime.settings.toggle_mode(&identity.id).await?;
    runtime
        .settings
        .preview(&identity.id, PreferenceUpdate::new().color_scheme(ColorScheme::Blue))?;
    runtime.settings.commit(&identity.id).await?;
    let saved = runtime
        .settings
        .confirmed(&identity.id)
        .context("preferences disappeared after commit")?;
    trail.push(
        "preferences",
        format!(
            "saved mode={} scheme={} ({})",
            saved.mode,
            saved.color_scheme.as_str(),
            saved.color_scheme.primary()
        ),
        serde_json::to_value(saved).unwrap_or(Value::Null),
    );

    // 4. Disablement
    runtime
        .directory
        .set_status(&admin, &identity.id, AccountStatus::Disabled)
        .await?;
    let ctx = settle(runtime, wait, "forced sign-out", |c| !c.is_authenticated()).await?;
    let fatal: Vec<String> = runtime
        .notices
        .list()
        .into_iter()
        .filter(|n| !n.is_dismissible())
        .map(|n| n.message)
        .collect();
    trail.push(
        "disabled",
        format!(
            "session ended: {}, fatal notices: {}, preferences released: {}",
            runtime.session.current_identity().is_none(),
            fatal.len(),
            runtime.settings.current(&identity.id).is_none()
        ),
        json!({ "fatal_notices": fatal }),
    );
    record_access(runtime, trail, "signed_out", &ctx);
    Ok(())
}

/// Creates a super-admin profile to act as the administrator.
async fn administrator(runtime: &ConsoleRuntime) -> BinResult<AccessContext> {
    let identity = Identity::new("simulation-admin", "admin@warden.local");
    let super_admin = runtime.registry.super_admin_tag().clone();
    let profiles = runtime.profiles();

    let profile = profiles
        .create_default(&identity)
        .await
        .map_err(WardenError::from)?;
    profiles
        .set_role(&identity.id, &super_admin)
        .await
        .map_err(WardenError::from)?;

    Ok(AccessContext::for_profile(
        profile.with_role(super_admin),
        &runtime.registry,
    ))
}

/// Waits for the live context to satisfy `predicate`.
async fn settle<F>(
    runtime: &ConsoleRuntime,
    wait: Duration,
    what: &str,
    predicate: F,
) -> BinResult<Arc<AccessContext>>
where
    F: Fn(&AccessContext) -> bool,
{
    let ctx = tokio::time::timeout(wait, runtime.coordinator.wait_for(predicate))
        .await
        .with_context(|| format!("timed out waiting for {}", what))?
        .with_context(|| format!("coordinator closed while waiting for {}", what))?;
    Ok(ctx)
}

fn record_access(runtime: &ConsoleRuntime, trail: &mut Trail, stage: &'static str, ctx: &AccessContext) {
    let mut permissions: Vec<&str> = ctx.permissions().iter().map(|p| p.as_str()).collect();
    permissions.sort_unstable();

    let routes: Vec<(String, &'static str)> = runtime
        .routes
        .protected_paths()
        .map(|path| {
            let decision = runtime
                .routes
                .resolve(path, ctx)
                .unwrap_or(GateDecision::Render);
            (path.to_string(), decision.as_str())
        })
        .collect();

    let menu: Vec<String> = visible_menu(&runtime.menu, ctx)
        .into_iter()
        .map(|item| item.title)
        .collect();

    trail.push(
        stage,
        format!(
            "{} role={} permissions=[{}] menu=[{}]",
            ctx.display_label(),
            ctx.role_id().map(|r| r.as_str()).unwrap_or("-"),
            permissions.join(", "),
            menu.join(", ")
        ),
        json!({
            "role": ctx.role_id().map(|r| r.as_str()),
            "permissions": permissions,
            "routes": routes
                .iter()
                .map(|(path, decision)| json!({ "path": path, "decision": decision }))
                .collect::<Vec<_>>(),
            "menu": menu,
        }),
    );
}
