// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # warden-bin
//!
//! CLI binary for the Warden access console core.
//!
//! ## Architecture
//!
//! ```text
//!                     main.rs
//!                        │
//!                  ┌─────▼─────┐
//!                  │  cli.rs   │
//!                  └─────┬─────┘
//!           ┌────────────┼────────────┐
//!           ▼            ▼            ▼
//!      ┌──────────┐ ┌──────────┐ ┌──────────┐
//!      │ commands │ │ runtime  │ │ logging  │
//!      └────┬─────┘ └────┬─────┘ └──────────┘
//!           └──────┬─────┘
//!           ┌──────▼──────┐
//!           │  warden-*   │
//!           └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Validate configuration (default command)
//! warden -c warden.yaml
//!
//! # List roles
//! warden roles --format json
//!
//! # Check one capability
//! warden check --role editor --permission write
//!
//! # Run the access scenario
//! warden simulate
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{ConsoleRuntime, RuntimeBuilder};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
