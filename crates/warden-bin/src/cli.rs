// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `validate`: Validate the configuration file (default)
//! - `version`: Show version information
//! - `roles`: List the role registry built from configuration
//! - `check`: Resolve one capability for one role
//! - `simulate`: Run the sign-up → promotion → disablement scenario

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// Warden - access console core
///
/// Session, role-based access control and preference synchronization for
/// the administration dashboard, run against in-memory backends.
#[derive(Parser, Debug)]
#[command(
    name = "warden",
    author = "Sylvex <contact@sylvex.io>",
    version = warden_core::VERSION,
    about = "Access console core: sessions, roles, gates and preferences",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "warden.yaml",
        env = "WARDEN_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "WARDEN_CLI_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact)
    #[arg(long, env = "WARDEN_CLI_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the Warden CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Validate the configuration file
    ///
    /// Parses and validates the configuration file and reports warnings.
    /// This is the default command when no subcommand is specified.
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,

    /// List roles and their permissions
    ///
    /// Builds the role registry from the configured bootstrap set.
    Roles(RolesArgs),

    /// Check whether a role grants a permission
    ///
    /// Exits with a non-zero code when the permission is denied.
    Check(CheckArgs),

    /// Run the access scenario against in-memory backends
    ///
    /// Signs a user up, promotes them, changes their preferences and finally
    /// disables the account, printing every decision along the way.
    Simulate(SimulateArgs),
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Strict mode: treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the `roles` command.
#[derive(Args, Debug, Clone, Default)]
pub struct RolesArgs {
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `check` command.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Role tag to check
    #[arg(short, long)]
    pub role: String,

    /// Permission tag to resolve
    #[arg(short, long)]
    pub permission: String,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `simulate` command.
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Email of the simulated user
    #[arg(long, default_value = "operator@example.com")]
    pub email: String,

    /// Password of the simulated user
    #[arg(long, default_value = "operator-secret")]
    pub password: String,

    /// Seconds to wait for each access change to propagate
    #[arg(short, long, default_value = "5")]
    pub timeout: u64,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

impl Default for SimulateArgs {
    fn default() -> Self {
        Self {
            email: "operator@example.com".to_string(),
            password: "operator-secret".to_string(),
            timeout: 5,
            format: OutputFormat::Text,
        }
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<warden_config::LogFormat> for LogFormat {
    fn from(format: warden_config::LogFormat) -> Self {
        match format {
            warden_config::LogFormat::Text => LogFormat::Text,
            warden_config::LogFormat::Json => LogFormat::Json,
            warden_config::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Validate` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Validate(ValidateArgs::default()))
    }

    /// Check if verbose logging is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    /// Get the effective log level. Flags win over `--log-level`, which wins
    /// over the configured level.
    pub fn effective_log_level<'a>(&'a self, configured: &'a str) -> &'a str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            self.log_level.as_deref().unwrap_or(configured)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
