// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Preference model and its stored document layout.
//!
//! ```text
//! users/{uid}/settings/preferences
//! {
//!   "theme":   { "mode": "light", "colorScheme": "purple", "fontSize": "medium" },
//!   "sidebar": { "defaultOpen": true },
//!   "updatedAt": "2025-01-01T00:00:00Z"
//! }
//! ```
//!
//! Missing or unrecognised fields fall back to the defaults one by one.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::SettingsError;

// =============================================================================
// Theme Mode
// =============================================================================

/// Light or dark palette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Light palette.
    #[default]
    Light,
    /// Dark palette.
    Dark,
}

impl ThemeMode {
    /// Returns the stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    /// Returns the other mode.
    pub fn toggled(&self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ThemeMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            other => Err(SettingsError::invalid_value("mode", other)),
        }
    }
}

// =============================================================================
// Color Scheme
// =============================================================================

/// Accent colour pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    /// `#667eea` / `#764ba2`.
    #[default]
    Purple,
    /// `#2196f3` / `#1976d2`.
    Blue,
    /// `#4caf50` / `#388e3c`.
    Green,
    /// `#ff9800` / `#f57c00`.
    Orange,
    /// `#e91e63` / `#c2185b`.
    Pink,
}

impl ColorScheme {
    /// Every scheme in display order.
    pub const ALL: [ColorScheme; 5] = [
        ColorScheme::Purple,
        ColorScheme::Blue,
        ColorScheme::Green,
        ColorScheme::Orange,
        ColorScheme::Pink,
    ];

    /// Returns the stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorScheme::Purple => "purple",
            ColorScheme::Blue => "blue",
            ColorScheme::Green => "green",
            ColorScheme::Orange => "orange",
            ColorScheme::Pink => "pink",
        }
    }

    /// Primary colour.
    pub fn primary(&self) -> &'static str {
        match self {
            ColorScheme::Purple => "#667eea",
            ColorScheme::Blue => "#2196f3",
            ColorScheme::Green => "#4caf50",
            ColorScheme::Orange => "#ff9800",
            ColorScheme::Pink => "#e91e63",
        }
    }

    /// Secondary colour.
    pub fn secondary(&self) -> &'static str {
        match self {
            ColorScheme::Purple => "#764ba2",
            ColorScheme::Blue => "#1976d2",
            ColorScheme::Green => "#388e3c",
            ColorScheme::Orange => "#f57c00",
            ColorScheme::Pink => "#c2185b",
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ColorScheme {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColorScheme::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| SettingsError::invalid_value("colorScheme", s))
    }
}

// =============================================================================
// Font Scale
// =============================================================================

/// Root font size step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontScale {
    /// 75%.
    Small,
    /// 100%.
    #[default]
    Medium,
    /// 125%.
    Large,
    /// 150%.
    #[serde(rename = "xlarge")]
    XLarge,
}

impl FontScale {
    /// Returns the stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FontScale::Small => "small",
            FontScale::Medium => "medium",
            FontScale::Large => "large",
            FontScale::XLarge => "xlarge",
        }
    }

    /// Multiplier applied to the base font size.
    pub fn factor(&self) -> f32 {
        match self {
            FontScale::Small => 0.75,
            FontScale::Medium => 1.0,
            FontScale::Large => 1.25,
            FontScale::XLarge => 1.5,
        }
    }

    /// Root font size as a percentage of the browser default.
    pub fn root_font_percent(&self) -> u32 {
        (self.factor() * 100.0).round() as u32
    }
}

impl fmt::Display for FontScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FontScale {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(FontScale::Small),
            "medium" => Ok(FontScale::Medium),
            "large" => Ok(FontScale::Large),
            "xlarge" => Ok(FontScale::XLarge),
            other => Err(SettingsError::invalid_value("fontSize", other)),
        }
    }
}

// =============================================================================
// Preference Set
// =============================================================================

/// One field of a [`PreferenceSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PreferenceField {
    /// Theme mode.
    Mode,
    /// Colour scheme.
    ColorScheme,
    /// Font scale.
    FontScale,
    /// Sidebar default.
    SidebarOpen,
}

impl PreferenceField {
    /// Every field.
    pub const ALL: [PreferenceField; 4] = [
        PreferenceField::Mode,
        PreferenceField::ColorScheme,
        PreferenceField::FontScale,
        PreferenceField::SidebarOpen,
    ];

    /// Name used in the stored document.
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceField::Mode => "mode",
            PreferenceField::ColorScheme => "colorScheme",
            PreferenceField::FontScale => "fontSize",
            PreferenceField::SidebarOpen => "defaultOpen",
        }
    }
}

impl fmt::Display for PreferenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-identity display preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceSet {
    /// Light or dark.
    pub mode: ThemeMode,
    /// Accent colours.
    pub color_scheme: ColorScheme,
    /// Root font size.
    pub font_scale: FontScale,
    /// Whether the sidebar starts open.
    pub sidebar_open: bool,
}

impl Default for PreferenceSet {
    fn default() -> Self {
        Self {
            mode: ThemeMode::Light,
            color_scheme: ColorScheme::Purple,
            font_scale: FontScale::Medium,
            sidebar_open: true,
        }
    }
}

impl PreferenceSet {
    /// Reads a stored document, falling back to `defaults` field by field.
    pub fn from_document(data: &Value, defaults: &PreferenceSet) -> Self {
        let theme = |key: &str| data.pointer(&format!("/theme/{key}")).and_then(Value::as_str);

        Self {
            mode: theme("mode")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.mode),
            color_scheme: theme("colorScheme")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.color_scheme),
            font_scale: theme("fontSize")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.font_scale),
            sidebar_open: data
                .pointer("/sidebar/defaultOpen")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.sidebar_open),
        }
    }

    /// Renders the full stored document.
    pub fn to_document(&self) -> Value {
        PreferenceUpdate::from(*self).to_document()
    }

    /// Returns the fields whose values differ from `other`.
    pub fn diff(&self, other: &PreferenceSet) -> Vec<PreferenceField> {
        PreferenceField::ALL
            .into_iter()
            .filter(|field| self.project(*field) != other.project(*field))
            .collect()
    }

    /// Copies `field` from `source`.
    pub fn copy_field(&mut self, field: PreferenceField, source: &PreferenceSet) {
        match field {
            PreferenceField::Mode => self.mode = source.mode,
            PreferenceField::ColorScheme => self.color_scheme = source.color_scheme,
            PreferenceField::FontScale => self.font_scale = source.font_scale,
            PreferenceField::SidebarOpen => self.sidebar_open = source.sidebar_open,
        }
    }

    /// Returns an update carrying only `fields`.
    pub fn select(&self, fields: &[PreferenceField]) -> PreferenceUpdate {
        let mut update = PreferenceUpdate::new();
        for field in fields {
            match field {
                PreferenceField::Mode => update.mode = Some(self.mode),
                PreferenceField::ColorScheme => update.color_scheme = Some(self.color_scheme),
                PreferenceField::FontScale => update.font_scale = Some(self.font_scale),
                PreferenceField::SidebarOpen => update.sidebar_open = Some(self.sidebar_open),
            }
        }
        update
    }

    fn project(&self, field: PreferenceField) -> &'static str {
        match field {
            PreferenceField::Mode => self.mode.as_str(),
            PreferenceField::ColorScheme => self.color_scheme.as_str(),
            PreferenceField::FontScale => self.font_scale.as_str(),
            PreferenceField::SidebarOpen => {
                if self.sidebar_open {
                    "open"
                } else {
                    "closed"
                }
            }
        }
    }
}

// =============================================================================
// Preference Update
// =============================================================================

/// A partial change. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceUpdate {
    /// New mode.
    pub mode: Option<ThemeMode>,
    /// New colour scheme.
    pub color_scheme: Option<ColorScheme>,
    /// New font scale.
    pub font_scale: Option<FontScale>,
    /// New sidebar default.
    pub sidebar_open: Option<bool>,
}

impl PreferenceUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the mode.
    pub fn mode(mut self, mode: ThemeMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Sets the colour scheme.
    pub fn color_scheme(mut self, scheme: ColorScheme) -> Self {
        self.color_scheme = Some(scheme);
        self
    }

    /// Sets the font scale.
    pub fn font_scale(mut self, scale: FontScale) -> Self {
        self.font_scale = Some(scale);
        self
    }

    /// Sets the sidebar default.
    pub fn sidebar_open(mut self, open: bool) -> Self {
        self.sidebar_open = Some(open);
        self
    }

    /// Returns `true` if nothing is set.
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Returns the fields this update sets.
    pub fn fields(&self) -> Vec<PreferenceField> {
        let mut fields = Vec::with_capacity(4);
        if self.mode.is_some() {
            fields.push(PreferenceField::Mode);
        }
        if self.color_scheme.is_some() {
            fields.push(PreferenceField::ColorScheme);
        }
        if self.font_scale.is_some() {
            fields.push(PreferenceField::FontScale);
        }
        if self.sidebar_open.is_some() {
            fields.push(PreferenceField::SidebarOpen);
        }
        fields
    }

    /// Applies the set fields to `prefs`.
    pub fn apply_to(&self, prefs: &mut PreferenceSet) {
        if let Some(mode) = self.mode {
            prefs.mode = mode;
        }
        if let Some(scheme) = self.color_scheme {
            prefs.color_scheme = scheme;
        }
        if let Some(scale) = self.font_scale {
            prefs.font_scale = scale;
        }
        if let Some(open) = self.sidebar_open {
            prefs.sidebar_open = open;
        }
    }

    /// Renders a merge document carrying only the set fields and `updatedAt`.
    pub fn to_document(&self) -> Value {
        let mut theme = Map::new();
        if let Some(mode) = self.mode {
            theme.insert("mode".into(), json!(mode.as_str()));
        }
        if let Some(scheme) = self.color_scheme {
            theme.insert("colorScheme".into(), json!(scheme.as_str()));
        }
        if let Some(scale) = self.font_scale {
            theme.insert("fontSize".into(), json!(scale.as_str()));
        }

        let mut doc = Map::new();
        if !theme.is_empty() {
            doc.insert("theme".into(), Value::Object(theme));
        }
        if let Some(open) = self.sidebar_open {
            doc.insert("sidebar".into(), json!({ "defaultOpen": open }));
        }
        doc.insert("updatedAt".into(), json!(Utc::now()));
        Value::Object(doc)
    }
}

impl From<PreferenceSet> for PreferenceUpdate {
    fn from(prefs: PreferenceSet) -> Self {
        Self {
            mode: Some(prefs.mode),
            color_scheme: Some(prefs.color_scheme),
            font_scale: Some(prefs.font_scale),
            sidebar_open: Some(prefs.sidebar_open),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
