use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An organization's namespace, addressed by an immutable subdomain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub subdomain: String,
    pub display_name: String,
    pub logo_url: Option<String>,
    pub org_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub subdomain: String,
    pub display_name: String,
    pub org_id: Uuid,
}
