// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! Wires every access component over in-memory backends, the document
//! store being a [`FlakyDocumentStore`] so writes can be made to fail.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use warden_auth::{
    default_menu, AccessContext, AccessCoordinator, MenuItem, ProfileSubscriber, RoleDefinition,
    RoleRegistry, RouteTable, SessionStore, UserDirectory,
};
use warden_core::memory::{MemoryAuthProvider, MemoryBlobStore};
use warden_core::{
    Identity, InMemoryAuditLogger, NoticeCenter, ProfileRepository, RoleId, StorageLayout,
};
use warden_settings::{PreferenceSet, SettingsSynchronizer};

use super::fixtures::IdentityFixtures;
use super::init_test_logging;
use super::mocks::FlakyDocumentStore;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the test harness.
#[derive(Debug, Clone)]
pub struct TestHarnessConfig {
    /// Name of the test, used in log output.
    pub test_name: String,

    /// Timeout for the whole test and for each `settle`.
    pub timeout: Duration,

    /// Role given to new profiles.
    pub default_role: RoleId,

    /// Roles installed on first load. `None` uses the built-in set.
    pub bootstrap: Option<Vec<RoleDefinition>>,

    /// Whether bootstrap roles are written on first load.
    pub persist_bootstrap: bool,

    /// Debounce interval of scheduled settings commits.
    pub commit_debounce: Duration,

    /// Whether to install a tracing subscriber.
    pub enable_tracing: bool,
}

impl Default for TestHarnessConfig {
    fn default() -> Self {
        Self {
            test_name: "unknown_test".to_string(),
            timeout: Duration::from_secs(5),
            default_role: RoleId::user(),
            bootstrap: None,
            persist_bootstrap: true,
            commit_debounce: Duration::from_millis(50),
            enable_tracing: false,
        }
    }
}

impl TestHarnessConfig {
    /// Creates a config with a test name.
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            ..Default::default()
        }
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the default role.
    pub fn default_role(mut self, role: &str) -> Self {
        self.default_role = RoleId::new(role);
        self
    }

    /// Replaces the bootstrap roles.
    pub fn bootstrap(mut self, roles: Vec<RoleDefinition>) -> Self {
        self.bootstrap = Some(roles);
        self
    }

    /// Keeps bootstrap roles in memory on first load.
    pub fn in_memory_bootstrap(mut self) -> Self {
        self.persist_bootstrap = false;
        self
    }

    /// Sets the commit debounce.
    pub fn commit_debounce(mut self, debounce: Duration) -> Self {
        self.commit_debounce = debounce;
        self
    }

    /// Enables tracing output.
    pub fn with_tracing(mut self) -> Self {
        self.enable_tracing = true;
        self
    }
}

// =============================================================================
// Resources
// =============================================================================

/// Components provided by the harness.
#[derive(Debug, Clone)]
pub struct TestResources {
    /// Configuration used to build these resources.
    pub config: TestHarnessConfig,
    /// Document store shared by every component.
    pub store: Arc<FlakyDocumentStore>,
    /// Identity provider.
    pub auth: Arc<MemoryAuthProvider>,
    /// Blob store.
    pub blobs: Arc<MemoryBlobStore>,
    /// Audit trail.
    pub audit: Arc<InMemoryAuditLogger>,
    /// User-facing notices.
    pub notices: NoticeCenter,
    /// Profile repository.
    pub profiles: ProfileRepository,
    /// Session store.
    pub session: SessionStore,
    /// Profile subscriber used by the coordinator.
    pub subscriber: ProfileSubscriber,
    /// Role registry, already loaded.
    pub registry: Arc<RoleRegistry>,
    /// Live access context.
    pub coordinator: AccessCoordinator,
    /// Administrative user operations.
    pub directory: UserDirectory,
    /// Preference synchronizer.
    pub settings: SettingsSynchronizer,
    /// Dashboard routes.
    pub routes: RouteTable,
    /// Dashboard menu.
    pub menu: Vec<MenuItem>,
}

impl TestResources {
    /// Returns the storage layout.
    pub fn layout(&self) -> &StorageLayout {
        self.profiles.layout()
    }

    /// Signs up `email` with the fixture password.
    pub async fn sign_up(&self, email: &str) -> Identity {
        self.session
            .sign_up(email, IdentityFixtures::PASSWORD)
            .await
            .expect("sign-up failed")
    }

    /// Waits for the live context to satisfy `predicate`.
    pub async fn settle<F>(&self, predicate: F) -> Arc<AccessContext>
    where
        F: Fn(&AccessContext) -> bool,
    {
        tokio::time::timeout(self.config.timeout, self.coordinator.wait_for(predicate))
            .await
            .expect("timed out waiting for access context")
            .expect("coordinator closed")
    }

    /// Polls `condition` until it holds.
    pub async fn eventually<F>(&self, what: &str, condition: F)
    where
        F: Fn() -> bool,
    {
        let poll = async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        if tokio::time::timeout(self.config.timeout, poll).await.is_err() {
            panic!("timed out waiting for {}", what);
        }
    }

    /// Waits until the signed-in profile has been resolved.
    pub async fn settle_profile(&self) -> Arc<AccessContext> {
        self.settle(|c| c.profile().is_some()).await
    }

    /// Stores a profile with `role` for `identity` and resolves its context.
    ///
    /// The identity does not need to be signed in.
    pub async fn actor(&self, identity: &Identity, role: &str) -> AccessContext {
        let role = RoleId::new(role);
        let profile = self
            .profiles
            .create_default(identity)
            .await
            .expect("failed to store actor profile");
        self.profiles
            .set_role(&identity.id, &role)
            .await
            .expect("failed to set actor role");
        AccessContext::for_profile(profile.with_role(role), &self.registry)
    }

    /// A stored super-admin acting from outside the session.
    pub async fn administrator(&self) -> AccessContext {
        let tag = self.registry.super_admin_tag().clone();
        self.actor(&IdentityFixtures::root(), tag.as_str()).await
    }

    /// Starts the coordinator.
    pub fn start(&self) {
        self.coordinator.start();
    }

    /// Stops the coordinator.
    pub async fn shutdown(&self) {
        self.coordinator.stop().await;
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Builds [`TestResources`] and runs tests against them.
pub struct TestHarness {
    config: TestHarnessConfig,
}

impl TestHarness {
    /// Creates a harness with a config.
    pub fn new(config: TestHarnessConfig) -> Self {
        Self { config }
    }

    /// Creates a harness with default settings.
    pub fn with_name(test_name: impl Into<String>) -> Self {
        Self::new(TestHarnessConfig::new(test_name))
    }

    /// Builds the components and loads the registry. The coordinator is not
    /// started.
    pub async fn setup(self) -> TestResources {
        if self.config.enable_tracing {
            init_test_logging();
        }
        tracing::debug!(test = %self.config.test_name, "Setting up harness");

        let store = Arc::new(FlakyDocumentStore::new());
        let auth = Arc::new(MemoryAuthProvider::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let audit = Arc::new(InMemoryAuditLogger::new());
        let notices = NoticeCenter::default();

        let profiles = ProfileRepository::new(store.clone(), StorageLayout::default())
            .with_default_role(self.config.default_role.clone());
        let settings = SettingsSynchronizer::with_options(
            profiles.clone(),
            PreferenceSet::default(),
            self.config.commit_debounce,
        );
        let session = SessionStore::new(auth.clone(), profiles.clone(), blobs.clone())
            .with_audit(audit.clone())
            .with_listener(Arc::new(settings.clone()));

        let mut registry = RoleRegistry::builder(store.clone())
            .audit(audit.clone())
            .persist_bootstrap(self.config.persist_bootstrap);
        if let Some(ref roles) = self.config.bootstrap {
            registry = registry.bootstrap(roles.clone());
        }
        let registry = Arc::new(registry.build());
        registry.load().await.expect("registry load failed");

        let subscriber = ProfileSubscriber::new(session.clone(), notices.clone());
        let coordinator = AccessCoordinator::new(
            session.clone(),
            subscriber.clone(),
            registry.clone(),
            notices.clone(),
        );
        let directory =
            UserDirectory::new(profiles.clone(), registry.clone()).with_audit(audit.clone());

        TestResources {
            config: self.config,
            store,
            auth,
            blobs,
            audit,
            notices,
            profiles,
            session,
            subscriber,
            registry,
            coordinator,
            directory,
            settings,
            routes: RouteTable::default(),
            menu: default_menu(),
        }
    }

    /// Runs a test with the coordinator started, stopping it afterwards.
    pub async fn run<F, Fut>(self, test_fn: F)
    where
        F: FnOnce(TestResources) -> Fut,
        Fut: Future<Output = ()>,
    {
        let timeout = self.config.timeout;
        let name = self.config.test_name.clone();
        let resources = self.setup().await;
        resources.start();

        let result = tokio::time::timeout(timeout, test_fn(resources.clone())).await;
        resources.shutdown().await;

        if result.is_err() {
            panic!("Test '{}' timed out after {:?}", name, timeout);
        }
    }
}
