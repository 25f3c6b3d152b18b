// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Session Integration Tests
//!
//! The chain session store → profile subscriber → coordinator, driven
//! through the in-memory provider and store.
//!
//! ## Test Categories
//!
//! - `test_session_*`: Sign-up, sign-in, sign-out and identity switches
//! - `test_disabled_*`: Forced sign-out of disabled accounts
//! - `test_account_*`: Password, avatar and account deletion

use warden_auth::{PasswordPolicy, SnapshotOutcome};
use warden_core::{AccountStatus, AuditAction, AuthError, SnapshotEvent};
use warden_tests::prelude::*;

// =============================================================================
// Session Tests
// =============================================================================

#[tokio::test]
async fn test_session_sign_up_resolves_default_role() {
    TestHarness::with_name("sign_up")
        .run(|h| async move {
            let identity = h.sign_up("ada@example.com").await;
            let ctx = h.settle_profile().await;

            assert_eq!(ctx.user_id(), Some(&identity.id));
            assert!(ctx.has_role("user"));
            assert_permissions(&ctx, &["read"]);
            assert_eq!(ctx.profile().unwrap().display_name, "ada");

            let sign_ins = h.audit.entries_for_action(AuditAction::SignIn);
            assert_eq!(sign_ins.len(), 1);
            assert_eq!(sign_ins[0].detail["signUp"], true);
        })
        .await;
}

#[tokio::test]
async fn test_session_configured_default_role() {
    TestHarness::new(TestHarnessConfig::new("default_role").default_role("editor"))
        .run(|h| async move {
            h.sign_up("bo@example.com").await;
            let ctx = h.settle_profile().await;
            assert!(ctx.has_role("editor"));
            assert!(ctx.has_all_permissions(&["read", "write", "bond:access"]));
        })
        .await;
}

#[tokio::test]
async fn test_session_sign_out_tears_down_subscription() {
    TestHarness::with_name("sign_out")
        .run(|h| async move {
            let identity = h.sign_up("cy@example.com").await;
            h.settle_profile().await;
            let path = h.layout().profile_path(&identity.id);
            assert_eq!(h.store.memory().subscriber_count(&path), 1);

            h.session.sign_out().await.unwrap();
            let ctx = h.settle(|c| !c.is_authenticated()).await;

            assert!(ctx.permissions().is_empty());
            assert!(h.subscriber.active_ticket().is_none());
            assert_eq!(h.store.memory().subscriber_count(&path), 0);
            assert_eq!(h.audit.entries_for_action(AuditAction::SignOut).len(), 1);
        })
        .await;
}

#[tokio::test]
async fn test_session_identity_switch_discards_stale_snapshots() {
    TestHarness::with_name("identity_switch")
        .run(|h| async move {
            let first = h.sign_up("di@example.com").await;
            h.settle_profile().await;
            let stale = h.subscriber.active_ticket().unwrap();
            assert_eq!(stale.user_id, first.id);

            let second = h.sign_up("ed@example.com").await;
            let ctx = h
                .settle(|c| c.user_id() == Some(&second.id) && c.profile().is_some())
                .await;
            assert_eq!(ctx.profile().unwrap().email, "ed@example.com");

            let outcome = h
                .subscriber
                .apply_snapshot(&stale, SnapshotEvent::Snapshot(None))
                .await;
            assert_eq!(outcome, SnapshotOutcome::Discarded);
            assert_eq!(h.coordinator.current().user_id(), Some(&second.id));
            assert!(h.subscriber.current_profile().is_some());

            let first_path = h.layout().profile_path(&first.id);
            assert_eq!(h.store.memory().subscriber_count(&first_path), 0);
        })
        .await;
}

#[tokio::test]
async fn test_session_missing_profile_is_recreated_on_load() {
    TestHarness::with_name("self_heal")
        .run(|h| async move {
            h.store.fail_next_writes(1);
            let identity = h.sign_up("fay@example.com").await;
            assert_eq!(h.store.rejected_count(), 1);

            let ctx = h.settle(|c| c.is_authenticated() && !c.is_pending()).await;
            assert!(ctx.profile().is_none());
            assert!(ctx.permissions().is_empty());
            h.routes
                .resolve("/reports/sales", &ctx)
                .unwrap()
                .assert_denied("read");

            h.settings.load(&identity).await.unwrap();
            let ctx = h.settle_profile().await;
            assert!(ctx.has_permission("read"));
        })
        .await;
}

#[tokio::test]
async fn test_session_sign_in_failures() {
    TestHarness::with_name("sign_in_failures")
        .run(|h| async move {
            h.sign_up("gus@example.com").await;
            h.session.sign_out().await.unwrap();

            assert_auth_error(
                h.session.sign_in("gus@example.com", "wrong-password").await,
                |e| matches!(e, AuthError::InvalidCredential),
            );
            let failed: Vec<_> = h
                .audit
                .entries_where(|e| e.action == AuditAction::SignIn && !e.outcome.is_success());
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].target.as_deref(), Some("gus@example.com"));

            h.session
                .sign_in("GUS@example.com", IdentityFixtures::PASSWORD)
                .await
                .unwrap();
            h.settle_profile().await;
        })
        .await;
}

// =============================================================================
// Disabled Account Tests
// =============================================================================

#[tokio::test]
async fn test_disabled_account_is_signed_out() {
    TestHarness::with_name("disabled")
        .run(|h| async move {
            let identity = h.sign_up("hal@example.com").await;
            h.settle_profile().await;
            let gate = h
                .coordinator
                .watch_gate(h.routes.gate("/settings").unwrap().clone());
            gate.decision().assert_render();

            let root = h.administrator().await;
            h.directory
                .set_status(&root, &identity.id, AccountStatus::Disabled)
                .await
                .unwrap();

            h.settle(|c| !c.is_authenticated()).await;
            gate.decision().assert_redirect("/login", "/settings");
            assert!(h.session.current_identity().is_none());
            assert!(h.notices.has_fatal());

            h.eventually("forced sign-out audited", || {
                !h.audit.entries_for_action(AuditAction::ForcedSignOut).is_empty()
            })
            .await;
            let forced = h.audit.entries_for_action(AuditAction::ForcedSignOut);
            assert_eq!(forced.len(), 1);
            assert_eq!(forced[0].target.as_deref(), Some(identity.id.as_str()));
        })
        .await;
}

#[tokio::test]
async fn test_disabled_account_cannot_stay_signed_in() {
    TestHarness::with_name("disabled_sign_in")
        .run(|h| async move {
            let identity = h.sign_up("ivy@example.com").await;
            h.settle_profile().await;
            h.profiles
                .set_status(&identity.id, AccountStatus::Disabled)
                .await
                .unwrap();
            h.settle(|c| !c.is_authenticated()).await;

            h.session
                .sign_in("ivy@example.com", IdentityFixtures::PASSWORD)
                .await
                .unwrap();
            h.eventually("second forced sign-out", || {
                h.audit.entries_for_action(AuditAction::ForcedSignOut).len() == 2
            })
            .await;
            h.settle(|c| !c.is_authenticated()).await;

            h.profiles
                .set_status(&identity.id, AccountStatus::Active)
                .await
                .unwrap();
            h.session
                .sign_in("ivy@example.com", IdentityFixtures::PASSWORD)
                .await
                .unwrap();
            let ctx = h.settle_profile().await;
            assert!(!ctx.is_disabled());
            assert!(!h.notices.has_fatal());
        })
        .await;
}

// =============================================================================
// Account Tests
// =============================================================================

#[tokio::test]
async fn test_account_password_rules() {
    let h = TestHarness::with_name("password_rules").setup().await;
    let strict = h.session.clone().with_policy(PasswordPolicy::new(10));

    assert_auth_error(strict.sign_up("jo@example.com", "short-pw").await, |e| {
        matches!(e, AuthError::WeakSecret { .. })
    });
    assert!(!h.auth.has_account("jo@example.com"));

    strict
        .sign_up("jo@example.com", "long-enough-pw")
        .await
        .unwrap();
    assert_auth_error(
        strict
            .change_password("long-enough-pw", "replacement-1", "replacement-2")
            .await,
        |e| matches!(e, AuthError::PasswordMismatch),
    );
    assert_auth_error(
        strict
            .change_password("not-my-password", "replacement-1", "replacement-1")
            .await,
        |e| matches!(e, AuthError::InvalidCredential),
    );

    h.auth.expire_recent_login();
    strict
        .change_password("long-enough-pw", "replacement-1", "replacement-1")
        .await
        .unwrap();
    strict.sign_out().await.unwrap();
    strict
        .sign_in("jo@example.com", "replacement-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_account_avatar_replaces_previous() {
    let h = TestHarness::with_name("avatar").setup().await;
    let identity = h.sign_up("kai@example.com").await;

    h.session
        .upload_avatar("first.png", vec![1, 2, 3])
        .await
        .unwrap();
    let url = h
        .session
        .upload_avatar("../../second.png", vec![4, 5])
        .await
        .unwrap();

    assert_eq!(h.blobs.len(), 1);
    assert!(url.ends_with("second.png"));
    let profile = h.profiles.get(&identity.id).await.unwrap().unwrap();
    assert_eq!(profile.photo_url.as_deref(), Some(url.as_str()));

    h.session.remove_avatar().await.unwrap();
    assert!(h.blobs.is_empty());
    let profile = h.profiles.get(&identity.id).await.unwrap().unwrap();
    assert!(profile.photo_url.is_none());
}

#[tokio::test]
async fn test_account_deletion_removes_everything() {
    TestHarness::with_name("delete_account")
        .run(|h| async move {
            let identity = h.sign_up("lou@example.com").await;
            h.settle_profile().await;
            h.settings.load(&identity).await.unwrap();
            h.session
                .upload_avatar("me.png", vec![9])
                .await
                .unwrap();

            assert_auth_error(h.session.delete_account("wrong-password").await, |e| {
                matches!(e, AuthError::InvalidCredential)
            });

            h.session
                .delete_account(IdentityFixtures::PASSWORD)
                .await
                .unwrap();
            h.settle(|c| !c.is_authenticated()).await;

            let layout = h.layout();
            assert!(h.store.peek(&layout.profile_path(&identity.id)).is_none());
            assert!(h.store.peek(&layout.preferences_path(&identity.id)).is_none());
            assert!(h.blobs.is_empty());
            assert!(!h.auth.has_account("lou@example.com"));
            assert_eq!(h.audit.entries_for_action(AuditAction::AccountDeleted).len(), 1);
        })
        .await;
}

#[tokio::test]
async fn test_account_verification_and_reset_mail() {
    let h = TestHarness::with_name("mail").setup().await;
    h.sign_up("max@example.com").await;

    h.session.send_verification_email().await.unwrap();
    h.auth.verify_email("max@example.com");
    assert_auth_error(h.session.send_verification_email().await, |e| {
        matches!(e, AuthError::AlreadyVerified)
    });

    h.session
        .request_password_reset("max@example.com")
        .await
        .unwrap();
    assert_auth_error(
        h.session.request_password_reset("nobody@example.com").await,
        |e| matches!(e, AuthError::UserNotFound { .. }),
    );

    let kinds: Vec<&str> = h.auth.outbox().iter().map(|m| m.kind).collect();
    assert_eq!(kinds, vec!["verification", "password_reset"]);
}
