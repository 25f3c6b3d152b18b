// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Navigation menu and route table, both filtered through gates.

use serde::Serialize;

use crate::context::AccessContext;
use crate::gate::{Gate, GateDecision, Requirement, DEFAULT_FALLBACK_PATH, DEFAULT_SIGN_IN_PATH};
use crate::permission::PermissionTag;

// =============================================================================
// Menu
// =============================================================================

/// One navigation entry. Groups have children and no path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    /// Label.
    pub title: String,
    /// Target path for leaf entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Requirement for the entry to be shown.
    #[serde(skip)]
    pub requirement: Option<Requirement>,
    /// Child entries.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
}

impl MenuItem {
    /// Creates a leaf entry.
    pub fn link(title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            path: Some(path.into()),
            requirement: None,
            children: Vec::new(),
        }
    }

    /// Creates a group entry.
    pub fn group(title: impl Into<String>, children: Vec<MenuItem>) -> Self {
        Self {
            title: title.into(),
            path: None,
            requirement: None,
            children,
        }
    }

    /// Attaches a requirement.
    pub fn requires(mut self, requirement: Requirement) -> Self {
        self.requirement = Some(requirement);
        self
    }

    /// Returns `true` for entries with children.
    pub fn is_group(&self) -> bool {
        self.path.is_none()
    }

    fn allows(&self, ctx: &AccessContext) -> bool {
        self.requirement
            .as_ref()
            .map(|r| r.is_met(ctx))
            .unwrap_or(true)
    }
}

/// The dashboard sidebar.
pub fn default_menu() -> Vec<MenuItem> {
    vec![
        MenuItem::link("Dashboard", "/"),
        MenuItem::group(
            "Reports",
            vec![
                MenuItem::link("Sales", "/reports/sales"),
                MenuItem::link("Traffic", "/reports/traffic"),
            ],
        )
        .requires(Requirement::permission(PermissionTag::READ)),
        MenuItem::group(
            "Management",
            vec![
                MenuItem::link("Users", "/management/users")
                    .requires(Requirement::permission(PermissionTag::MANAGE_USERS)),
                MenuItem::link("Roles", "/management/roles")
                    .requires(Requirement::permission(PermissionTag::MANAGE_ROLES)),
            ],
        ),
        MenuItem::link("Bonds", "/bonds")
            .requires(Requirement::permission(PermissionTag::BOND_ACCESS)),
        MenuItem::link("Settings", "/settings"),
    ]
}

/// Returns the entries `ctx` may see.
///
/// Signed-out visitors see nothing. Groups left without children are dropped.
pub fn visible_menu(menu: &[MenuItem], ctx: &AccessContext) -> Vec<MenuItem> {
    if !ctx.is_authenticated() || ctx.is_pending() {
        return Vec::new();
    }
    filter(menu, ctx)
}

fn filter(items: &[MenuItem], ctx: &AccessContext) -> Vec<MenuItem> {
    items
        .iter()
        .filter(|item| item.allows(ctx))
        .filter_map(|item| {
            if !item.is_group() {
                return Some(item.clone());
            }
            let children = filter(&item.children, ctx);
            (!children.is_empty()).then(|| MenuItem {
                children,
                ..item.clone()
            })
        })
        .collect()
}

// =============================================================================
// Routes
// =============================================================================

/// Public and protected routes of the dashboard.
#[derive(Debug, Clone)]
pub struct RouteTable {
    public: Vec<String>,
    protected: Vec<Gate>,
}

impl RouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            public: Vec::new(),
            protected: Vec::new(),
        }
    }

    /// Adds a route open to everyone.
    pub fn public(mut self, path: impl Into<String>) -> Self {
        self.public.push(path.into());
        self
    }

    /// Adds a guarded route.
    pub fn protected(mut self, gate: Gate) -> Self {
        self.protected.push(gate);
        self
    }

    /// Returns the gate for `path`.
    pub fn gate(&self, path: &str) -> Option<&Gate> {
        self.protected.iter().find(|g| g.path() == path)
    }

    /// Returns every protected path.
    pub fn protected_paths(&self) -> impl Iterator<Item = &str> {
        self.protected.iter().map(Gate::path)
    }

    /// Decides what to show at `path`. `None` for unknown paths.
    pub fn resolve(&self, path: &str, ctx: &AccessContext) -> Option<GateDecision> {
        if self.public.iter().any(|p| p == path) {
            return Some(GateDecision::Render);
        }
        self.gate(path).map(|gate| gate.evaluate(ctx))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::dashboard(DEFAULT_SIGN_IN_PATH, DEFAULT_FALLBACK_PATH)
    }
}

impl RouteTable {
    /// The dashboard routes, every protected one behind the sign-in gate.
    pub fn dashboard(sign_in_path: &str, fallback_path: &str) -> Self {
        let base = |path: &str| {
            Gate::new(path)
                .with_sign_in_path(sign_in_path)
                .with_fallback_path(fallback_path)
        };

        Self::new()
            .public(sign_in_path)
            .public("/signup")
            .public("/forgot-password")
            .protected(base("/"))
            .protected(base("/reports/sales").require_permission(PermissionTag::READ))
            .protected(base("/reports/traffic").require_permission(PermissionTag::READ))
            .protected(base("/management/users").require_permission(PermissionTag::MANAGE_USERS))
            .protected(base("/management/roles").require_permission(PermissionTag::MANAGE_ROLES))
            .protected(base("/bonds").require_permission(PermissionTag::BOND_ACCESS))
            .protected(base("/settings"))
            .protected(base("/admin").require(Requirement::Admin))
    }
}

// =============================================================================
// Tests
// =============================================================================
