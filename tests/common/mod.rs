use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use agent_desk::auth::jwt::JwtService;
use agent_desk::auth::password::hash_password;
use agent_desk::config::AppConfig;
use agent_desk::db::{self, DbPool};
use agent_desk::models::{Application, NewUser, User};
use agent_desk::notify::{Notifier, NotifyError};
use agent_desk::routes;
use agent_desk::schema::{applications, users};
use agent_desk::state::AppState;
use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::sync::Mutex;
use tower::util::ServiceExt;

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
}

pub const ADMIN_CHAT_ID: &str = "admin-chat";

/// Records every message instead of calling the messaging API.
#[derive(Default)]
pub struct FakeNotifier {
    sent: Mutex<Vec<SentMessage>>,
    failing: AtomicBool,
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Request("connection refused".to_string()));
        }
        let mut guard = self.sent.lock().await;
        guard.push(SentMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn notify_admin(&self, text: &str) -> Result<(), NotifyError> {
        self.send(ADMIN_CHAT_ID, text).await
    }
}

impl FakeNotifier {
    #[allow(dead_code)]
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    #[allow(dead_code)]
    pub fn fail_deliveries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    notifier: Arc<FakeNotifier>,
    // Dropping the directory removes the database file.
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create temp dir")?;
        let database_path = dir.path().join("test.sqlite");
        let static_dir = dir.path().join("build");
        std::fs::create_dir_all(&static_dir)?;
        std::fs::write(
            static_dir.join("index.html"),
            "<!doctype html><title>agent desk</title>",
        )?;
        std::fs::write(static_dir.join("app.js"), "console.log('ok');")?;

        let config = AppConfig {
            database_url: database_path
                .to_str()
                .ok_or_else(|| anyhow!("temp path is not utf-8"))?
                .to_string(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_hours: 24,
            static_dir: PathBuf::from(&static_dir),
            cors_allowed_origin: None,
            telegram: None,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let notifier = Arc::new(FakeNotifier::default());
        let notifier_for_state: Arc<dyn Notifier> = notifier.clone();
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool, config, jwt, notifier_for_state);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            notifier,
            _dir: dir,
        })
    }

    #[allow(dead_code)]
    pub fn notifier(&self) -> Arc<FakeNotifier> {
        self.notifier.clone()
    }

    /// Inserts a user directly, bypassing registration. The only way to get
    /// an admin besides the bootstrap binary.
    pub async fn insert_user(
        &self,
        username: &str,
        password: &str,
        full_name: &str,
        role: &str,
    ) -> Result<i32> {
        let user = NewUser {
            username: username.to_string(),
            password_hash: hash_password(password)?,
            full_name: full_name.to_string(),
            role: role.to_string(),
            created_at: Utc::now().naive_utc(),
        };
        self.with_conn(move |conn| {
            let inserted: User = diesel::insert_into(users::table)
                .values(&user)
                .returning(User::as_returning())
                .get_result(conn)
                .context("failed to insert user")?;
            Ok(inserted.id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn admin_token(&self) -> Result<String> {
        self.insert_user("root", "rootpw", "Главный Админ", "admin")
            .await?;
        self.login_token("root", "rootpw").await
    }

    pub async fn login_token(&self, username: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            username: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json(
                "/api/auth/login",
                &LoginPayload { username, password },
                None,
            )
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        #[derive(Deserialize)]
        struct LoginResponse {
            token: String,
        }
        let parsed: LoginResponse = json_body(response).await?;
        Ok(parsed.token)
    }

    #[allow(dead_code)]
    pub async fn register_token(
        &self,
        username: &str,
        password: &str,
        full_name: &str,
    ) -> Result<String> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct RegisterPayload<'a> {
            username: &'a str,
            password: &'a str,
            full_name: &'a str,
        }

        let response = self
            .post_json(
                "/api/auth/register",
                &RegisterPayload {
                    username,
                    password,
                    full_name,
                },
                None,
            )
            .await?;

        ensure!(
            response.status() == StatusCode::CREATED,
            "registration failed with status {}",
            response.status()
        );

        #[derive(Deserialize)]
        struct RegisterResponse {
            token: String,
        }
        let parsed: RegisterResponse = json_body(response).await?;
        Ok(parsed.token)
    }

    #[allow(dead_code)]
    pub async fn stored_application(&self, id: i32) -> Result<Option<Application>> {
        self.with_conn(move |conn| {
            applications::table
                .find(id)
                .select(Application::as_select())
                .first(conn)
                .optional()
                .context("failed to load application")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn stored_user(&self, id: i32) -> Result<Option<User>> {
        self.with_conn(move |conn| {
            users::table
                .find(id)
                .select(User::as_select())
                .first(conn)
                .optional()
                .context("failed to load user")
        })
        .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PATCH, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn post_raw(
        &self,
        path: &str,
        body: &'static str,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        self.call(request).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        self.call(request).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let builder = Request::builder().method(Method::DELETE).uri(path);
        let builder = if let Some(token) = token {
            builder.header("authorization", format!("Bearer {token}"))
        } else {
            builder
        };
        let request = builder.body(Body::empty())?;
        self.call(request).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        self.call(request).await
    }

    async fn call(&self, request: Request<Body>) -> Result<hyper::Response<Body>> {
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn json_body<T: DeserializeOwned>(response: hyper::Response<Body>) -> Result<T> {
    let body = body_to_vec(response.into_body()).await?;
    serde_json::from_slice(&body).with_context(|| {
        format!(
            "unexpected response body: {}",
            String::from_utf8_lossy(&body)
        )
    })
}

#[allow(dead_code)]
pub async fn error_message(response: hyper::Response<Body>) -> Result<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }
    let parsed: ErrorBody = json_body(response).await?;
    Ok(parsed.message)
}

async fn prepare_database(pool: &DbPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || db::run_migrations(&pool))
        .await
        .context("migration task panicked")?
}
