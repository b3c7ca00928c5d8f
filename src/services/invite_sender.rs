//! Outbound invitation email dispatch.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::InvitationConfig;

#[derive(Debug, thiserror::Error)]
pub enum InviteError {
    #[error("Invite dispatch is not configured")]
    NotConfigured,

    #[error("Invite request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Auth authority rejected invite ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait InviteSender: Send + Sync {
    async fn send_invite(&self, email: &str, redirect_url: &str, metadata: &Value) -> Result<(), InviteError>;
}

/// Posts to the auth authority's admin invite endpoint.
pub struct HttpInviteSender {
    client: reqwest::Client,
    endpoint: String,
    service_key: String,
}

impl HttpInviteSender {
    pub fn new(admin_url: &str, service_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/invite", admin_url.trim_end_matches('/')),
            service_key: service_key.to_string(),
        }
    }

    pub fn from_config(config: &InvitationConfig) -> Result<Self, InviteError> {
        match (&config.auth_admin_url, &config.auth_service_key) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Ok(Self::new(url, key)),
            _ => Err(InviteError::NotConfigured),
        }
    }
}

#[async_trait]
impl InviteSender for HttpInviteSender {
    async fn send_invite(&self, email: &str, redirect_url: &str, metadata: &Value) -> Result<(), InviteError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&json!({
                "email": email,
                "data": metadata,
                "redirect_to": redirect_url,
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("Invite dispatched to {}", email);
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(InviteError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Development stand-in that only logs the invite.
pub struct LogInviteSender;

#[async_trait]
impl InviteSender for LogInviteSender {
    async fn send_invite(&self, email: &str, redirect_url: &str, metadata: &Value) -> Result<(), InviteError> {
        tracing::info!(
            "Invite for {} (redirect {}) not sent, no auth authority configured: {}",
            email,
            redirect_url,
            metadata
        );
        Ok(())
    }
}
