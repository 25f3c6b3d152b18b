// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Warden - access console core
//!
//! Main binary entry point.

use warden_bin::cli::{Cli, LogFormat};
use warden_bin::commands;
use warden_bin::error::report_error_and_exit;
use warden_bin::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let configured = commands::peek_logging(&cli.config);
    let format = cli
        .log_format
        .unwrap_or_else(|| LogFormat::from(configured.format));
    init_logging(cli.effective_log_level(configured.level.as_str()), format);

    if let Err(e) = commands::execute(cli).await {
        report_error_and_exit(e);
    }
}
