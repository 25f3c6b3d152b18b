// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::cli::Cli;
use crate::error::BinResult;

/// Executes the `version` command to display version information.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!("Warden - access console core");
    println!();
    println!("Version Information:");
    println!("  warden-bin:      {}", env!("CARGO_PKG_VERSION"));
    println!("  warden-core:     {}", warden_core::VERSION);
    println!("  warden-auth:     {}", warden_auth::VERSION);
    println!("  warden-settings: {}", warden_settings::VERSION);
    println!("  warden-config:   {}", warden_config::VERSION);
    println!();
    println!("Build Information:");
    println!("  Rust Edition: 2021");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
