// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `validate`: Validate configuration file
//! - `version`: Show version information
//! - `roles`: List the role registry
//! - `check`: Resolve one capability
//! - `simulate`: Run the access scenario

mod check;
mod roles;
mod simulate;
mod validate;
mod version;

pub use check::check;
pub use roles::roles;
pub use simulate::simulate;
pub use validate::{collect_warnings, validate};
pub use version::version;

use std::path::Path;

use tracing::info;
use warden_config::{load_config, LoggingConfig, WardenConfig};

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Version => version::version(&cli),
        Commands::Roles(args) => roles::roles(&cli, args).await,
        Commands::Check(args) => check::check(&cli, args).await,
        Commands::Simulate(args) => simulate::simulate(&cli, args).await,
    }
}

/// Loads the configuration file, or the defaults when it does not exist.
pub fn load_config_or_default(path: &Path) -> BinResult<WardenConfig> {
    if path.exists() {
        Ok(load_config(path)?)
    } else {
        info!(path = %path.display(), "No configuration file, using defaults");
        Ok(WardenConfig::default())
    }
}

/// Reads the logging section before logging is initialised.
///
/// Any error is left for the command itself to report.
pub fn peek_logging(path: &Path) -> LoggingConfig {
    load_config_or_default(path)
        .map(|config| config.logging)
        .unwrap_or_default()
}
