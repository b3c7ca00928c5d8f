#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use chrono::Duration;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use tenant_gate::auth::{generate_jwt, SessionClaims};
use tenant_gate::authz::{DefaultCapabilities, Role};
use tenant_gate::config::AppConfig;
use tenant_gate::database::models::{Organization, UserProfile};
use tenant_gate::database::MemoryStore;
use tenant_gate::server::{app, AppState};
use tenant_gate::services::{ActingContext, InviteError, InviteSender};

pub const SECRET: &str = "integration-test-secret";

/// One invite the sender was asked to deliver.
#[derive(Debug, Clone)]
pub struct SentInvite {
    pub email: String,
    pub redirect_url: String,
    pub metadata: Value,
}

/// Records invites, or refuses all of them when `failing` is set.
#[derive(Default)]
pub struct RecordingInviteSender {
    pub sent: Mutex<Vec<SentInvite>>,
    pub failing: bool,
}

impl RecordingInviteSender {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<SentInvite> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl InviteSender for RecordingInviteSender {
    async fn send_invite(&self, email: &str, redirect_url: &str, metadata: &Value) -> Result<(), InviteError> {
        if self.failing {
            return Err(InviteError::Rejected {
                status: 502,
                body: "upstream unavailable".to_string(),
            });
        }
        self.sent.lock().expect("sender lock").push(SentInvite {
            email: email.to_string(),
            redirect_url: redirect_url.to_string(),
            metadata: metadata.clone(),
        });
        Ok(())
    }
}

/// An organization with a tenant subdomain, ready for users.
pub struct Org {
    pub org: Organization,
    pub subdomain: String,
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub sender: Arc<RecordingInviteSender>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_sender(RecordingInviteSender::default())
    }

    pub fn with_sender(sender: RecordingInviteSender) -> Self {
        let store = Arc::new(MemoryStore::new());
        let sender = Arc::new(sender);
        let config = Arc::new(AppConfig::for_tests(SECRET));
        let state = AppState::new(store.clone(), config, sender.clone(), DefaultCapabilities::builtin());
        Self { state, store, sender }
    }

    pub async fn org(&self, subdomain: &str) -> Org {
        let org = self.store.add_organization(subdomain).await;
        self.store.add_tenant(org.id, subdomain).await;
        Org {
            org,
            subdomain: subdomain.to_string(),
        }
    }

    pub async fn user(&self, org: &Org, email: &str, role: Role) -> UserProfile {
        self.store.add_profile(org.org.id, email, role).await
    }

    pub fn acting(&self, org: &Org, user: &UserProfile) -> ActingContext {
        ActingContext {
            user_id: user.user_id,
            email: user.email.clone(),
            org_id: org.org.id,
            subdomain: org.subdomain.clone(),
            role: user.role,
        }
    }

    /// Bearer token for `user`, scoped to `subdomain`.
    pub fn token(&self, org: &Org, user: &UserProfile, subdomain: &str) -> String {
        let claims = SessionClaims::new(user.user_id, &user.email, subdomain, org.org.id, user.role, Duration::hours(1));
        generate_jwt(&claims, SECRET).expect("token")
    }

    /// Token whose `iat` is `age` in the past.
    pub fn aged_token(&self, org: &Org, user: &UserProfile, age: Duration) -> String {
        let mut claims =
            SessionClaims::new(user.user_id, &user.email, &org.subdomain, org.org.id, user.role, Duration::hours(1));
        claims.iat -= age.num_seconds();
        generate_jwt(&claims, SECRET).expect("token")
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = app(self.state.clone()).oneshot(request).await?;
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(TestResponse { status, location, body })
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Value,
}

/// Request addressed to `host`, optionally authenticated and with a JSON body.
pub fn request(method: Method, host: &str, path: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::HOST, host);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request")
}

pub fn tenant_host(subdomain: &str) -> String {
    format!("{}.app.example.com", subdomain)
}

pub fn random_id() -> Uuid {
    Uuid::new_v4()
}
