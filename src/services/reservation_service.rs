//! Subdomain holds between signup and email verification.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::authz::{AuthzError, AuthzResult};
use crate::database::models::{NewTenant, SubdomainReservation, Tenant};
use crate::database::{DatabaseError, Store};
use crate::tenancy::{normalize_subdomain, validate_subdomain};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Availability {
    Available,
    Invalid { message: String },
    Taken,
    Reserved,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn Store>,
    hold: Duration,
}

impl ReservationService {
    pub fn new(store: Arc<dyn Store>, hold_hours: i64) -> Self {
        Self {
            store,
            hold: Duration::hours(hold_hours),
        }
    }

    pub async fn check_availability(&self, subdomain: &str) -> AuthzResult<Availability> {
        let subdomain = normalize_subdomain(subdomain);
        if let Err(e) = validate_subdomain(&subdomain) {
            return Ok(Availability::Invalid { message: e.to_string() });
        }
        if self.store.find_tenant_by_subdomain(&subdomain).await?.is_some() {
            return Ok(Availability::Taken);
        }
        if self.store.live_reservation(&subdomain, Utc::now()).await?.is_some() {
            return Ok(Availability::Reserved);
        }
        Ok(Availability::Available)
    }

    /// A live hold by the same email is refreshed instead of duplicated.
    pub async fn reserve(&self, subdomain: &str, email: &str) -> AuthzResult<SubdomainReservation> {
        let subdomain = normalize_subdomain(subdomain);
        validate_subdomain(&subdomain)?;
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() {
            return Err(AuthzError::validation("Email is required"));
        }

        if self.store.find_tenant_by_subdomain(&subdomain).await?.is_some() {
            return Err(AuthzError::SubdomainTaken(subdomain));
        }

        let now = Utc::now();
        if let Some(existing) = self.store.live_reservation(&subdomain, now).await? {
            if !existing.held_by(&email) {
                return Err(AuthzError::SubdomainTaken(subdomain));
            }
            return self.refresh(existing).await;
        }

        let reservation = self
            .store
            .insert_reservation(&subdomain, &email, now + self.hold)
            .await
            .map_err(|e| taken_on_conflict(&subdomain, e))?;
        tracing::info!("Reserved '{}' until {}", subdomain, reservation.expires_at);
        Ok(reservation)
    }

    /// Resets the expiry to a fixed hold from now; repeated calls never stack.
    pub async fn extend(&self, subdomain: &str, email: &str) -> AuthzResult<SubdomainReservation> {
        let existing = self.live_held_by(subdomain, email).await?;
        self.refresh(existing).await
    }

    /// Confirms the hold and provisions the tenant. The subdomain is fixed from here on.
    pub async fn complete_signup(
        &self,
        subdomain: &str,
        email: &str,
        org_id: Uuid,
        display_name: &str,
    ) -> AuthzResult<Tenant> {
        let reservation = self.live_held_by(subdomain, email).await?;
        if !self
            .store
            .confirm_reservation(reservation.id, Utc::now())
            .await?
        {
            return Err(AuthzError::not_found("Reservation was already confirmed"));
        }

        let tenant = self
            .store
            .insert_tenant(NewTenant {
                subdomain: reservation.subdomain.clone(),
                display_name: display_name.trim().to_string(),
                org_id,
            })
            .await?;
        tracing::info!("Provisioned tenant '{}' for org {}", tenant.subdomain, org_id);
        Ok(tenant)
    }

    async fn live_held_by(&self, subdomain: &str, email: &str) -> AuthzResult<SubdomainReservation> {
        let subdomain = normalize_subdomain(subdomain);
        match self.store.live_reservation(&subdomain, Utc::now()).await? {
            Some(reservation) if reservation.held_by(email) => Ok(reservation),
            _ => Err(AuthzError::not_found(format!(
                "No active reservation for '{}'",
                subdomain
            ))),
        }
    }

    async fn refresh(&self, mut reservation: SubdomainReservation) -> AuthzResult<SubdomainReservation> {
        let expires_at = Utc::now() + self.hold;
        if !self
            .store
            .set_reservation_expiry(reservation.id, expires_at)
            .await?
        {
            return Err(AuthzError::not_found("Reservation was already confirmed"));
        }
        reservation.expires_at = expires_at;
        tracing::debug!("Reservation '{}' extended to {}", reservation.subdomain, expires_at);
        Ok(reservation)
    }
}

/// A concurrent reserve that won the unique index means the name is taken.
fn taken_on_conflict(subdomain: &str, err: DatabaseError) -> AuthzError {
    match err {
        DatabaseError::Conflict(_) => AuthzError::SubdomainTaken(subdomain.to_string()),
        other => other.into(),
    }
}
