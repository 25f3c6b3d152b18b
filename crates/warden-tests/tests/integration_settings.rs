// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Settings Integration Tests
//!
//! Preference load, optimistic saves with rollback, and the preview and
//! debounced commit cycle, over a store whose writes can be made to fail.
//!
//! ## Test Categories
//!
//! - `test_load_*`: Defaults and cached loads
//! - `test_save_*`: Persisted saves and rollback
//! - `test_preview_*`: Preview, commit, discard and debounce
//! - `test_session_*`: Release when the session ends

use std::time::Duration;

use serde_json::json;
use warden_core::{DocumentStore, SetOptions};
use warden_settings::{
    ColorScheme, FontScale, PreferenceField, PreferenceSet, PreferenceUpdate, SettingsError,
    SettingsEvent, SettingsSynchronizer, ThemeMode,
};
use warden_tests::prelude::*;

fn theme_value(h: &TestResources, user: &warden_core::UserId, key: &str) -> serde_json::Value {
    let doc = h
        .store
        .peek(&h.layout().preferences_path(user))
        .expect("preferences document missing");
    doc.pointer(&format!("/theme/{key}"))
        .cloned()
        .unwrap_or(serde_json::Value::Null)
}

// =============================================================================
// Load Tests
// =============================================================================

#[tokio::test]
async fn test_load_writes_defaults_once() {
    let h = TestHarness::with_name("load_defaults").setup().await;
    let identity = h.sign_up("ana@example.com").await;
    h.store.clear_history();

    let prefs = h.settings.load(&identity).await.unwrap();
    assert_eq!(prefs, PreferenceSet::default());
    assert_eq!(
        h.store.write_history(),
        vec![h.layout().preferences_path(&identity.id)]
    );

    let doc = h.store.peek(&h.layout().preferences_path(&identity.id)).unwrap();
    assert_eq!(doc["theme"]["mode"], "light");
    assert_eq!(doc["theme"]["colorScheme"], "purple");
    assert_eq!(doc["theme"]["fontSize"], "medium");
    assert_eq!(doc["sidebar"]["defaultOpen"], true);

    h.settings.load(&identity).await.unwrap();
    assert_eq!(h.store.write_history().len(), 1);
}

#[tokio::test]
async fn test_load_fills_gaps_from_defaults() {
    let h = TestHarness::with_name("load_partial").setup().await;
    let identity = h.sign_up("ben@example.com").await;
    let defaults = PreferenceSet {
        mode: ThemeMode::Light,
        color_scheme: ColorScheme::Orange,
        font_scale: FontScale::Small,
        sidebar_open: false,
    };
    let settings =
        SettingsSynchronizer::with_options(h.profiles.clone(), defaults, Duration::from_millis(50));

    h.store
        .memory()
        .set(
            &h.layout().preferences_path(&identity.id),
            json!({ "theme": { "mode": "dark", "fontSize": "gigantic" } }),
            SetOptions::replace(),
        )
        .await
        .unwrap();

    let prefs = settings.load(&identity).await.unwrap();
    assert_eq!(prefs.mode, ThemeMode::Dark);
    assert_eq!(prefs.color_scheme, ColorScheme::Orange);
    assert_eq!(prefs.font_scale, FontScale::Small);
    assert!(!prefs.sidebar_open);
}

#[tokio::test]
async fn test_load_with_custom_defaults() {
    let h = TestHarness::with_name("load_custom").setup().await;
    let identity = h.sign_up("cat@example.com").await;
    let defaults = PreferenceSet {
        mode: ThemeMode::Dark,
        color_scheme: ColorScheme::Green,
        font_scale: FontScale::Large,
        sidebar_open: false,
    };
    let settings =
        SettingsSynchronizer::with_options(h.profiles.clone(), defaults, Duration::from_millis(50));

    assert_eq!(settings.load(&identity).await.unwrap(), defaults);
    assert_eq!(theme_value(&h, &identity.id, "colorScheme"), "green");
    assert_eq!(theme_value(&h, &identity.id, "fontSize"), "large");
}

#[tokio::test]
async fn test_load_required_before_changes() {
    let h = TestHarness::with_name("not_loaded").setup().await;
    let identity = h.sign_up("dan@example.com").await;
    let update = PreferenceUpdate::new().mode(ThemeMode::Dark);

    assert!(matches!(
        h.settings.save(&identity.id, update).await,
        Err(SettingsError::NotLoaded { .. })
    ));
    assert!(matches!(
        h.settings.preview(&identity.id, update),
        Err(SettingsError::NotLoaded { .. })
    ));
    assert!(h.settings.current(&identity.id).is_none());

    h.settings.load(&identity).await.unwrap();
    h.settings.evict(&identity.id);
    assert!(h.settings.current(&identity.id).is_none());
    assert!(matches!(
        h.settings.toggle_mode(&identity.id).await,
        Err(SettingsError::NotLoaded { .. })
    ));
}

#[tokio::test]
async fn test_load_concurrent_loads_write_defaults_once() {
    let h = TestHarness::with_name("load_concurrent").setup().await;
    let identity = h.sign_up("cora@example.com").await;
    let path = h.layout().preferences_path(&identity.id);
    h.store.set_latency(Duration::from_millis(10));
    h.store.clear_history();

    let ((), second) = tokio::join!(
        async {
            h.settings.load(&identity).await.unwrap();
            h.settings
                .save(&identity.id, PreferenceUpdate::new().font_scale(FontScale::Large))
                .await
                .unwrap();
        },
        h.settings.load(&identity)
    );
    second.unwrap();

    let writes = h.store.write_history().iter().filter(|p| **p == path).count();
    assert_eq!(writes, 2);
    assert_eq!(theme_value(&h, &identity.id, "fontSize"), "large");
    assert_eq!(
        h.settings.current(&identity.id).unwrap().font_scale,
        FontScale::Large
    );
}

// =============================================================================
// Save Tests
// =============================================================================

#[tokio::test]
async fn test_save_merges_changed_fields() {
    let h = TestHarness::with_name("save").setup().await;
    let identity = h.sign_up("eva@example.com").await;
    h.settings.load(&identity).await.unwrap();
    let mut events = h.settings.subscribe();

    h.settings
        .save(&identity.id, PreferenceUpdate::new().mode(ThemeMode::Dark))
        .await
        .unwrap();

    assert_eq!(theme_value(&h, &identity.id, "mode"), "dark");
    assert_eq!(theme_value(&h, &identity.id, "colorScheme"), "purple");
    assert_eq!(
        h.settings.current(&identity.id),
        h.settings.confirmed(&identity.id)
    );
    assert!(h.settings.pending_fields(&identity.id).is_empty());

    let events = events.drain();
    assert!(matches!(events[0], SettingsEvent::Changed { ref prefs, .. } if prefs.mode == ThemeMode::Dark));
    assert!(matches!(
        &events[1],
        SettingsEvent::Persisted { fields, .. } if fields == &vec![PreferenceField::Mode]
    ));

    h.settings.toggle_mode(&identity.id).await.unwrap();
    assert_eq!(theme_value(&h, &identity.id, "mode"), "light");
}

#[tokio::test]
async fn test_save_rolls_back_failed_write() {
    let h = TestHarness::with_name("rollback").setup().await;
    let identity = h.sign_up("fin@example.com").await;
    h.settings.load(&identity).await.unwrap();
    h.settings
        .save(&identity.id, PreferenceUpdate::new().mode(ThemeMode::Dark))
        .await
        .unwrap();
    let mut events = h.settings.subscribe();

    h.store.fail_next_writes(1);
    let err = h
        .settings
        .save(
            &identity.id,
            PreferenceUpdate::new()
                .font_scale(FontScale::XLarge)
                .sidebar_open(false),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SettingsError::Store(_)));
    assert!(err.is_retryable());

    let current = h.settings.current(&identity.id).unwrap();
    assert_eq!(current.font_scale, FontScale::Medium);
    assert!(current.sidebar_open);
    assert_eq!(current.mode, ThemeMode::Dark);
    assert_eq!(theme_value(&h, &identity.id, "fontSize"), "medium");

    let rolled_back = events
        .drain()
        .into_iter()
        .find_map(|e| match e {
            SettingsEvent::RolledBack { fields, .. } => Some(fields),
            _ => None,
        })
        .expect("no rollback event");
    assert_eq!(
        rolled_back,
        vec![PreferenceField::FontScale, PreferenceField::SidebarOpen]
    );
}

#[tokio::test]
async fn test_save_in_background_reports_rollback() {
    let h = TestHarness::with_name("background").setup().await;
    let identity = h.sign_up("gia@example.com").await;
    h.settings.load(&identity).await.unwrap();
    let mut events = h.settings.subscribe();

    h.store.fail_all_writes(true);
    h.settings
        .save_in_background(
            &identity.id,
            PreferenceUpdate::new().color_scheme(ColorScheme::Pink),
        )
        .await
        .unwrap();
    h.store.fail_all_writes(false);

    assert_eq!(
        h.settings.current(&identity.id).unwrap().color_scheme,
        ColorScheme::Purple
    );
    assert!(events
        .drain()
        .iter()
        .any(|e| matches!(e, SettingsEvent::RolledBack { .. })));
}

// =============================================================================
// Preview Tests
// =============================================================================

#[tokio::test]
async fn test_preview_then_commit() {
    let h = TestHarness::with_name("preview_commit").setup().await;
    let identity = h.sign_up("hana@example.com").await;
    h.settings.load(&identity).await.unwrap();

    let local = h
        .settings
        .preview(
            &identity.id,
            PreferenceUpdate::new()
                .color_scheme(ColorScheme::Green)
                .sidebar_open(false),
        )
        .unwrap();
    assert_eq!(local.color_scheme, ColorScheme::Green);
    assert_eq!(
        h.settings.confirmed(&identity.id).unwrap().color_scheme,
        ColorScheme::Purple
    );
    assert_eq!(
        h.settings.previewed_fields(&identity.id),
        vec![PreferenceField::ColorScheme, PreferenceField::SidebarOpen]
    );
    assert_eq!(theme_value(&h, &identity.id, "colorScheme"), "purple");

    h.settings.commit(&identity.id).await.unwrap();
    assert_eq!(theme_value(&h, &identity.id, "colorScheme"), "green");
    assert!(h.settings.previewed_fields(&identity.id).is_empty());
    assert_eq!(
        h.settings.confirmed(&identity.id).unwrap().color_scheme,
        ColorScheme::Green
    );

    h.store.clear_history();
    h.settings.commit(&identity.id).await.unwrap();
    assert!(h.store.write_history().is_empty());
}

#[tokio::test]
async fn test_preview_discard_restores_confirmed() {
    let h = TestHarness::with_name("preview_discard").setup().await;
    let identity = h.sign_up("ike@example.com").await;
    h.settings.load(&identity).await.unwrap();

    h.settings
        .preview(&identity.id, PreferenceUpdate::new().font_scale(FontScale::Large))
        .unwrap();
    let restored = h.settings.discard_preview(&identity.id).unwrap();

    assert_eq!(restored, PreferenceSet::default());
    assert!(h.settings.previewed_fields(&identity.id).is_empty());
    assert_eq!(theme_value(&h, &identity.id, "fontSize"), "medium");
}

#[tokio::test]
async fn test_preview_debounced_commit() {
    let h = TestHarness::with_name("debounce").setup().await;
    let identity = h.sign_up("jun@example.com").await;
    h.settings.load(&identity).await.unwrap();

    h.settings
        .preview(&identity.id, PreferenceUpdate::new().font_scale(FontScale::Small))
        .unwrap();
    h.settings.schedule_commit(&identity.id).unwrap();
    h.settings
        .preview(&identity.id, PreferenceUpdate::new().font_scale(FontScale::Large))
        .unwrap();
    h.settings.schedule_commit(&identity.id).unwrap();
    h.store.clear_history();

    h.eventually("debounced commit", || {
        h.settings
            .confirmed(&identity.id)
            .map(|p| p.font_scale == FontScale::Large)
            .unwrap_or(false)
    })
    .await;
    assert_eq!(theme_value(&h, &identity.id, "fontSize"), "large");
    assert_eq!(h.store.write_history().len(), 1);
}

#[tokio::test]
async fn test_preview_discard_cancels_scheduled_commit() {
    let h = TestHarness::with_name("debounce_cancel").setup().await;
    let identity = h.sign_up("kim@example.com").await;
    h.settings.load(&identity).await.unwrap();

    h.settings
        .preview(&identity.id, PreferenceUpdate::new().mode(ThemeMode::Dark))
        .unwrap();
    h.settings.schedule_commit(&identity.id).unwrap();
    h.settings.discard_preview(&identity.id).unwrap();
    h.store.clear_history();

    tokio::time::sleep(h.config.commit_debounce * 3).await;
    assert!(h.store.write_history().is_empty());
    assert_eq!(theme_value(&h, &identity.id, "mode"), "light");
}

// =============================================================================
// Session Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_session_sign_out_releases_preferences() {
    let h = TestHarness::with_name("release_sign_out").setup().await;
    let identity = h.sign_up("lia@example.com").await;
    h.settings.load(&identity).await.unwrap();
    h.settings
        .preview(&identity.id, PreferenceUpdate::new().mode(ThemeMode::Dark))
        .unwrap();
    h.settings.schedule_commit(&identity.id).unwrap();

    h.session.sign_out().await.unwrap();
    assert!(h.settings.current(&identity.id).is_none());
    h.store.clear_history();

    tokio::time::sleep(h.config.commit_debounce * 3).await;
    assert!(h.store.write_history().is_empty());
    assert_eq!(theme_value(&h, &identity.id, "mode"), "light");
    assert!(matches!(
        h.settings.save(&identity.id, PreferenceUpdate::new().mode(ThemeMode::Dark)).await,
        Err(SettingsError::NotLoaded { .. })
    ));
}

#[tokio::test]
async fn test_session_deleted_account_stays_deleted() {
    let h = TestHarness::with_name("release_delete").setup().await;
    let identity = h.sign_up("max@example.com").await;
    let path = h.layout().preferences_path(&identity.id);
    h.settings.load(&identity).await.unwrap();
    h.settings
        .preview(&identity.id, PreferenceUpdate::new().font_scale(FontScale::Large))
        .unwrap();
    h.settings.schedule_commit(&identity.id).unwrap();

    h.session
        .delete_account(IdentityFixtures::PASSWORD)
        .await
        .unwrap();
    assert!(h.store.peek(&path).is_none());
    assert!(h.settings.current(&identity.id).is_none());

    tokio::time::sleep(h.config.commit_debounce * 3).await;
    assert!(h.store.peek(&path).is_none());
}
