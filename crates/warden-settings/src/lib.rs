// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # warden-settings
//!
//! Per-identity display preferences: theme mode, colour scheme, font scale
//! and the sidebar default.
//!
//! [`SettingsSynchronizer`] loads them (writing defaults on first access),
//! applies changes optimistically, serializes writes per identity and rolls
//! back fields whose write failed. Continuous inputs use `preview` and
//! `commit` so intermediate values are never written.
//!
//! It is a `SessionListener`: registered on the session, it drops an
//! identity's entry, and any pending commit, when that session ends.
//!
//! ```rust,ignore
//! let sync = SettingsSynchronizer::new(profiles);
//! let prefs = sync.load(&identity).await?;
//!
//! sync.preview(&identity.id, PreferenceUpdate::new().font_scale(FontScale::Large))?;
//! sync.schedule_commit(&identity.id)?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod preferences;
pub mod sync;

pub use error::{SettingsError, SettingsResult};
pub use preferences::{
    ColorScheme, FontScale, PreferenceField, PreferenceSet, PreferenceUpdate, ThemeMode,
};
pub use sync::{SettingsEvent, SettingsSynchronizer, DEFAULT_COMMIT_DEBOUNCE};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
