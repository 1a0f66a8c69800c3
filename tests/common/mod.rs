#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, SecondsFormat, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;

use meetcheck::{database, web, AppState, Config};

pub const ORGANIZER: &str = "org-1";
pub const ALICE: &str = "user-alice";
pub const BOB: &str = "user-bob";

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        auth_jwt_secret: "integration-session-secret".to_string(),
        check_in_token_secret: "integration-check-in-secret-0123456789abcdef".to_string(),
        check_in_token_ttl_minutes: 720,
        token_leeway_seconds: 0,
        public_base_url: "https://meetcheck.test".to_string(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub async fn spawn_app() -> TestApp {
    let config = test_config();
    let pool = database::connect(&config.database_url).await.unwrap();
    let state = AppState::new(pool, config);
    TestApp {
        router: web::build_router(state.clone()),
        state,
    }
}

#[derive(Serialize)]
struct SessionClaims<'a> {
    sub: &'a str,
    exp: i64,
}

pub fn session_token(user_id: &str) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &SessionClaims {
            sub: user_id,
            exp: Utc::now().timestamp() + 3600,
        },
        &EncodingKey::from_secret(test_config().auth_jwt_secret.as_bytes()),
    )
    .unwrap()
}

pub fn timestamp_from_now(minutes: i64) -> String {
    (Utc::now() + Duration::minutes(minutes)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestApp {
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        match body {
            Some(body) => {
                self.send_raw(method, uri, user, Some("application/json"), &body.to_string())
                    .await
            }
            None => self.send_raw(method, uri, user, None, "").await,
        }
    }

    /// Sends `body` verbatim with an optional `Content-Type`.
    pub async fn send_raw(
        &self,
        method: &str,
        uri: &str,
        user: Option<&str>,
        content_type: Option<&str>,
        body: &str,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", session_token(user)));
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8_lossy(&bytes).to_string();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, body, text }
    }

    /// Two-hour event starting `starts_in_minutes` from now.
    pub async fn create_event_starting_in(&self, title: &str, starts_in_minutes: i64) -> String {
        let resp = self
            .send(
                "POST",
                "/api/events",
                Some(ORGANIZER),
                Some(serde_json::json!({
                    "title": title,
                    "starts_at": timestamp_from_now(starts_in_minutes),
                    "ends_at": timestamp_from_now(starts_in_minutes + 120),
                })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
        resp.body["event_id"].as_str().unwrap().to_string()
    }

    /// Event that is open for check-in right now.
    pub async fn create_open_event(&self, title: &str) -> String {
        let resp = self
            .send(
                "POST",
                "/api/events",
                Some(ORGANIZER),
                Some(serde_json::json!({
                    "title": title,
                    "starts_at": timestamp_from_now(-30),
                    "ends_at": timestamp_from_now(120),
                    "check_in_opens_minutes": 60,
                })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
        resp.body["event_id"].as_str().unwrap().to_string()
    }

    pub async fn register(
        &self,
        event_id: &str,
        name: &str,
        user_id: Option<&str>,
        participant_type: &str,
    ) -> String {
        let resp = self
            .send(
                "POST",
                &format!("/api/events/{event_id}/participants"),
                Some(ORGANIZER),
                Some(serde_json::json!({
                    "name": name,
                    "user_id": user_id,
                    "participant_type": participant_type,
                })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
        resp.body["participant_id"].as_str().unwrap().to_string()
    }

    pub async fn issue_token(&self, event_id: &str, participant_id: Option<&str>) -> Value {
        let resp = self
            .send(
                "POST",
                &format!("/api/events/{event_id}/check-in-tokens"),
                Some(ORGANIZER),
                Some(serde_json::json!({ "participant_id": participant_id })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
        resp.body
    }

    pub async fn check_in(&self, user: &str, token: &str) -> TestResponse {
        self.send(
            "POST",
            "/api/check-ins",
            Some(user),
            Some(serde_json::json!({ "token": token })),
        )
        .await
    }
}
