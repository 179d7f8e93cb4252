#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Months, Utc};
use http_body_util::BodyExt;
use mirro::api::AppState;
use mirro::clients::email::{EmailMessage, Mailer};
use mirro::config::Config;
use serde_json::{Value, json};
use tower::ServiceExt;

/// Keeps every message instead of sending it. A failing mailer still keeps
/// the message, then reports the send as failed.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, to: &str) -> Vec<EmailMessage> {
        self.sent().into_iter().filter(|m| m.to == to).collect()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail {
            anyhow::bail!("mail provider unavailable");
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub mailer: Arc<RecordingMailer>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_mailer(Arc::new(RecordingMailer::default())).await
}

pub async fn spawn_app_with_mailer(mailer: Arc<RecordingMailer>) -> TestApp {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.scheduler.enabled = false;

    let state = mirro::api::create_app_state_with_mailer(config, mailer.clone(), None)
        .await
        .expect("Failed to create app state");

    TestApp {
        router: mirro::api::router(state.clone()),
        state,
        mailer,
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> (StatusCode, Value, Option<String>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json, set_cookie)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body, _) = self.send(Method::GET, uri, None, None).await;
        (status, body)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, body, _) = self.send(Method::POST, uri, Some(body), None).await;
        (status, body)
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, body, _) = self.send(Method::PUT, uri, Some(body), None).await;
        (status, body)
    }

    pub async fn delete(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, body, _) = self.send(Method::DELETE, uri, Some(body), None).await;
        (status, body)
    }

    /// Registers an adult and returns the new user id.
    pub async fn register_adult(&self, username: &str) -> String {
        self.register(json!({
            "name": username,
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "password123",
            "dateOfBirth": years_ago(30),
        }))
        .await
    }

    /// Registers a 15-year-old with a guardian address and returns the id.
    pub async fn register_minor(&self, username: &str, guardian: &str) -> String {
        self.register(json!({
            "name": username,
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "password123",
            "dateOfBirth": years_ago(15),
            "guardianEmail": guardian,
        }))
        .await
    }

    async fn register(&self, body: Value) -> String {
        let (status, body) = self.post("/api/auth/register", body).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Minor with a configured PIN.
    pub async fn minor_with_pin(&self, username: &str, guardian: &str, pin: &str) -> String {
        let id = self.register_minor(username, guardian).await;
        let (status, body) = self
            .post(
                "/api/parental-controls/setup-pin",
                json!({ "userId": id, "pin": pin, "confirmPin": pin }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "setup failed: {body}");
        id
    }

    pub async fn verify_pin(&self, user_id: &str, pin: &str) -> (StatusCode, Value) {
        self.post(
            "/api/parental-controls/verify-pin",
            json!({ "userId": user_id, "pin": pin }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value, Option<String>) {
        self.send(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": email, "password": password })),
            None,
        )
        .await
    }
}

/// `YYYY-MM-DD` for a birthday exactly `years` ago.
pub fn years_ago(years: u32) -> String {
    Utc::now()
        .date_naive()
        .checked_sub_months(Months::new(years * 12))
        .unwrap()
        .format("%Y-%m-%d")
        .to_string()
}

/// Pulls the `token=` value out of an emailed link.
pub fn token_from(message: &EmailMessage) -> String {
    let start = message.html.find("token=").expect("no token link in email") + "token=".len();
    message.html[start..]
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect()
}
