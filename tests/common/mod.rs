#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use nurture_api::auth::password::hash_password;
use nurture_api::config::{AppConfig, DatabaseBackend};
use nurture_api::database::models::{Account, Profile};
use nurture_api::database::{AccountStore, MemoryStore};
use nurture_api::services::{LogMailer, MemoryFileStorage};
use nurture_api::types::Role;
use nurture_api::{router, AppState};

pub const PASSWORD: &str = "correct-horse-battery";

/// Development profile with cheap hashing and no rate limiting
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = "integration-test-secret".to_string();
    config.security.password_cost = 4;
    config.api.enable_rate_limiting = false;
    config
}

/// Router wired to the memory store, driven in-process with `oneshot`
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: MemoryStore,
    pub mailer: Arc<LogMailer>,
    pub files: Arc<MemoryFileStorage>,
    pub base: String,
}

pub struct Session {
    pub token: String,
    pub id: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = MemoryStore::new();
        let mailer = Arc::new(LogMailer::default());
        let files = Arc::new(MemoryFileStorage::new("nurture-test"));
        let base = config.server.base_path.clone();
        let state = AppState::new(Arc::new(store.clone()), files.clone(), mailer.clone(), config);

        Self {
            router: router(state.clone()),
            state,
            store,
            mailer,
            files,
            base,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, body)
    }

    /// `path` is relative to the API base path
    pub async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(format!("{}{}", self.base, path));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(request).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::DELETE, path, token, None).await
    }

    /// Register through the API and return the session
    pub async fn register(&self, email: &str, role: &str) -> Session {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                json!({
                    "email": email,
                    "password": PASSWORD,
                    "first_name": "Test",
                    "last_name": role,
                    "role": role
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        session_from(&body)
    }

    pub async fn mother(&self, email: &str) -> Session {
        self.register(email, "mother").await
    }

    /// Administrators are provisioned outside the API
    pub async fn admin(&self, email: &str) -> Session {
        let hash = hash_password(PASSWORD, 4).expect("hash");
        let account = Account::new(email, hash, "Site".into(), "Admin".into(), None, Role::Admin);
        self.store
            .create_account(&account, &Profile::empty_for(Role::Admin))
            .await
            .expect("admin created");
        let (token, _) = self.state.tokens.issue(&account).expect("token");
        Session {
            token,
            id: account.id.to_string(),
        }
    }

    /// A collaborator verified by an administrator
    pub async fn verified_collaborator(&self, email: &str, admin: &Session) -> Session {
        let collaborator = self.register(email, "collaborator").await;
        let (status, body) = self
            .put(
                &format!("/admin/collaborators/{}/verify", collaborator.id),
                Some(&admin.token),
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "verify failed: {}", body);
        collaborator
    }

    pub async fn published_class(&self, owner: &Session, admin: &Session, title: &str) -> String {
        let (status, body) = self.post("/classes", Some(&owner.token), json!({ "title": title })).await;
        assert_eq!(status, StatusCode::CREATED, "class create failed: {}", body);
        let id = body["data"]["id"].as_str().expect("class id").to_string();
        let (status, _) = self
            .put(&format!("/admin/classes/{}/publish", id), Some(&admin.token), json!({ "published": true }))
            .await;
        assert_eq!(status, StatusCode::OK);
        id
    }

    pub async fn published_event(&self, owner: &Session, admin: &Session, capacity: i32, waitlist: bool) -> String {
        let starts_at = chrono::Utc::now() + chrono::Duration::days(7);
        let (status, body) = self
            .post(
                "/events",
                Some(&owner.token),
                json!({
                    "title": "Birth prep meetup",
                    "starts_at": starts_at,
                    "ends_at": starts_at + chrono::Duration::hours(2),
                    "capacity": capacity,
                    "waitlist_enabled": waitlist
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "event create failed: {}", body);
        let id = body["data"]["id"].as_str().expect("event id").to_string();
        let (status, _) = self
            .put(&format!("/admin/events/{}/publish", id), Some(&admin.token), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        id
    }
}

pub fn session_from(body: &Value) -> Session {
    Session {
        token: body["data"]["token"].as_str().expect("token").to_string(),
        id: body["data"]["account"]["id"].as_str().expect("account id").to_string(),
    }
}

/// The real binary on a free port, backed by the memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_nurture-api"))
            .env("APP_ENV", "development")
            .env("NURTURE_API_PORT", port.to_string())
            .env("DATABASE_BACKEND", "memory")
            .env("JWT_SECRET", "spawned-server-secret")
            .env("BCRYPT_COST", "4")
            .env("RATE_LIMIT_ENABLED", "false")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
