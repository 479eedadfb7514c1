//! Black-box test harness: an in-memory database, a real server on an
//! ephemeral port, and a recording mailer so tests can read outbound tokens.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde_json::Value;

use crate::app::{AppState, build_router};
use crate::config::Config;
use crate::db;
use crate::mail::{MailError, Mailer};

#[derive(Debug, Clone)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutboundMail {
    /// Mail bodies end with the raw token as the final word.
    pub fn token(&self) -> String {
        self.body
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .to_owned()
    }
}

/// Records every send; can be primed to fail the next one.
#[derive(Default)]
pub struct TestMailer {
    outbox: Mutex<Vec<OutboundMail>>,
    fail_next: AtomicBool,
}

impl TestMailer {
    pub fn outbox(&self) -> Vec<OutboundMail> {
        self.outbox.lock().expect("outbox poisoned").clone()
    }

    pub fn last(&self) -> Option<OutboundMail> {
        self.outbox().last().cloned()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for TestMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(MailError("simulated mail outage".to_owned()));
        }
        self.outbox.lock().expect("outbox poisoned").push(OutboundMail {
            to: to.to_owned(),
            subject: subject.to_owned(),
            body: body.to_owned(),
        });
        Ok(())
    }
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub db: DatabaseConnection,
    pub mailer: Arc<TestMailer>,
    pub state: AppState,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let config = Config {
            database_url: "sqlite::memory:".to_owned(),
            jwt_secret: "test-secret".to_owned(),
            host: "127.0.0.1".to_owned(),
            port: 0,
            environment: "test".to_owned(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
            token_sweep_interval_secs: 86_400,
            session_sweep_interval_secs: 86_400,
            session_retention_days: 30,
        };

        let db = db::connect(&config.database_url)
            .await
            .expect("connect test database");
        let mailer = Arc::new(TestMailer::default());
        let state = AppState::assemble(db.clone(), mailer.clone(), Arc::new(config));
        let router = build_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
            )
            .await
            .ok();
        });

        Self {
            addr,
            db,
            mailer,
            state,
        }
    }

    pub fn client(&self) -> TestClient {
        TestClient {
            base: format!("http://{}", self.addr),
            http: reqwest::Client::new(),
        }
    }
}

pub struct TestClient {
    base: String,
    http: reqwest::Client,
}

impl TestClient {
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        let response = self
            .http
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .expect("request failed");
        TestResponse::from(response).await
    }

    pub async fn post_auth(&self, path: &str, token: &str) -> TestResponse {
        let response = self
            .http
            .post(format!("{}{path}", self.base))
            .bearer_auth(token)
            .send()
            .await
            .expect("request failed");
        TestResponse::from(response).await
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> TestResponse {
        let response = self
            .http
            .get(format!("{}{path}", self.base))
            .bearer_auth(token)
            .send()
            .await
            .expect("request failed");
        TestResponse::from(response).await
    }

    pub async fn delete_auth(&self, path: &str, token: &str, body: Value) -> TestResponse {
        let response = self
            .http
            .delete(format!("{}{path}", self.base))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("request failed");
        TestResponse::from(response).await
    }

    /// Registers a user with default names and a desktop Chrome User-Agent
    /// so the created session carries device metadata.
    pub async fn register(&self, email: &str, password: &str) -> TestResponse {
        self.register_with_agent(
            email,
            password,
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
        )
        .await
    }

    pub async fn register_with_agent(
        &self,
        email: &str,
        password: &str,
        user_agent: &str,
    ) -> TestResponse {
        let response = self
            .http
            .post(format!("{}/auth/register", self.base))
            .header("user-agent", user_agent)
            .json(&serde_json::json!({
                "email": email,
                "firstName": "Test",
                "lastName": "User",
                "password": password,
            }))
            .send()
            .await
            .expect("request failed");
        TestResponse::from(response).await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post(
            "/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }
}

pub struct TestResponse {
    pub status: u16,
    pub body: Value,
}

impl TestResponse {
    async fn from(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        Self { status, body }
    }

    pub fn message(&self) -> &str {
        self.body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// JSON-pointer access into the envelope, e.g. `/data/accessToken`.
    /// Missing paths come back as `Null` so assertions stay one-liners.
    pub fn at(&self, pointer: &str) -> Value {
        self.body.pointer(pointer).cloned().unwrap_or(Value::Null)
    }

    pub fn str_at(&self, pointer: &str) -> String {
        self.at(pointer).as_str().unwrap_or_default().to_owned()
    }
}
