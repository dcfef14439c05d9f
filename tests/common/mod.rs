//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use axum_test::TestServer;
use gatekeeper::{
    auth::jwt::SessionTokenService, build_router, db::TursoClient, idp::LocalIdentityProvider,
    AppState, GatekeeperConfig,
};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

pub use axum_extra::extract::cookie::Cookie;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const SUPER_ADMIN: &str = "root@example.com";
pub const PASSWORD: &str = "correct-horse-battery";

/// A running app plus handles to its internals.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    _pages: TempDir,
}

/// Page tree served behind the routing guard.
fn write_pages() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create static dir");
    for page in ["dashboard", "login", "about"] {
        fs::create_dir_all(dir.path().join(page)).unwrap();
        fs::write(
            dir.path().join(page).join("index.html"),
            format!("<h1>{}</h1>", page),
        )
        .unwrap();
    }
    fs::write(dir.path().join("favicon.ico"), "icon").unwrap();
    dir
}

/// Create a test app with in-memory database and three registered accounts.
pub async fn create_test_app() -> TestApp {
    let pages = write_pages();

    let mut config = GatekeeperConfig::default();
    config.server.environment = "development".to_string();
    config.server.static_dir = Some(pages.path().to_path_buf());
    config.database.url = ":memory:".to_string();

    let db = Arc::new(
        TursoClient::new_memory()
            .await
            .expect("Failed to create in-memory database"),
    );
    let idp = Arc::new(LocalIdentityProvider::new(db.clone()));
    for (email, name) in [
        (SUPER_ADMIN, "Root"),
        ("admin@example.com", "Ada Admin"),
        ("user@example.com", "Uma User"),
    ] {
        idp.register(email, PASSWORD, Some(name))
            .await
            .expect("Failed to register test user");
    }

    let sessions = SessionTokenService::new(TEST_SECRET, 3600).expect("valid secret");
    let mut state = AppState::new(config, db, idp, sessions);
    state.super_admin_email = Some(SUPER_ADMIN.to_string());

    let server =
        TestServer::new(build_router(state.clone())).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _pages: pages,
    }
}

impl TestApp {
    /// Logs in and returns the session cookie.
    pub async fn login(&self, email: &str) -> Cookie<'static> {
        let response = self
            .server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": email, "password": PASSWORD }))
            .await;
        response.assert_status_ok();
        response.cookie("session")
    }

    /// Directory id of a user who has logged in at least once.
    pub async fn user_id(&self, email: &str) -> String {
        self.state
            .db
            .find_user_by_email(email)
            .await
            .unwrap()
            .expect("user synced")
            .id
    }

    /// Logs `email` in once, then promotes them to `role` directly in the directory.
    pub async fn login_as_role(
        &self,
        email: &str,
        role: gatekeeper::types::Role,
    ) -> Cookie<'static> {
        use gatekeeper::db::{UserDirectory, UserUpdate};

        self.login(email).await;
        let id = self.user_id(email).await;
        self.state
            .db
            .update_user(
                &id,
                &UserUpdate {
                    role: Some(role),
                    is_active: None,
                },
            )
            .await
            .unwrap();
        self.login(email).await
    }
}
