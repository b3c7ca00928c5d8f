use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub domains: DomainConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub invitations: InvitationConfig,
    pub reservations: ReservationConfig,
    pub session: SessionConfig,
    pub capabilities_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Domains used to map a request host to a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    pub app_root_domain: String,
    pub marketing_root_domain: String,
    pub preview_suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// HS256 secret shared with the auth authority that signs session tokens.
    pub jwt_secret: String,
    pub fallback_redirect: String,
    pub enable_audit_logging: bool,
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationConfig {
    pub expiry_days: i64,
    pub redirect_path: String,
    pub auth_admin_url: Option<String>,
    pub auth_service_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationConfig {
    pub hold_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Domain overrides
        if let Ok(v) = env::var("APP_ROOT_DOMAIN") {
            self.domains.app_root_domain = v.trim().to_ascii_lowercase();
        }
        if let Ok(v) = env::var("MARKETING_ROOT_DOMAIN") {
            self.domains.marketing_root_domain = v.trim().to_ascii_lowercase();
        }
        if let Ok(v) = env::var("PREVIEW_DEPLOYMENT_SUFFIX") {
            self.domains.preview_suffix = v.trim().to_ascii_lowercase();
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("AUTH_FALLBACK_REDIRECT") {
            self.security.fallback_redirect = v;
        }
        if let Ok(v) = env::var("SECURITY_AUDIT_LOGGING") {
            self.security.enable_audit_logging = v.parse().unwrap_or(self.security.enable_audit_logging);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }

        // Invitation overrides
        if let Ok(v) = env::var("INVITATION_EXPIRY_DAYS") {
            self.invitations.expiry_days = v.parse().unwrap_or(self.invitations.expiry_days);
        }
        if let Ok(v) = env::var("INVITE_REDIRECT_PATH") {
            self.invitations.redirect_path = v;
        }
        if let Ok(v) = env::var("AUTH_ADMIN_URL") {
            self.invitations.auth_admin_url = Some(v);
        }
        if let Ok(v) = env::var("AUTH_SERVICE_KEY") {
            self.invitations.auth_service_key = Some(v);
        }

        // Reservation and session overrides
        if let Ok(v) = env::var("RESERVATION_HOLD_HOURS") {
            self.reservations.hold_hours = v.parse().unwrap_or(self.reservations.hold_hours);
        }
        if let Ok(v) = env::var("SESSION_POLL_ATTEMPTS") {
            self.session.poll_attempts = v.parse().unwrap_or(self.session.poll_attempts);
        }
        if let Ok(v) = env::var("SESSION_POLL_INTERVAL_MS") {
            self.session.poll_interval_ms = v.parse().unwrap_or(self.session.poll_interval_ms);
        }

        if let Ok(v) = env::var("CAPABILITIES_FILE") {
            self.capabilities_file = Some(v);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            domains: DomainConfig {
                app_root_domain: "app.localhost".to_string(),
                marketing_root_domain: "marketing.localhost".to_string(),
                preview_suffix: ".vercel.app".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                fallback_redirect: "/auth/login".to_string(),
                enable_audit_logging: false,
                enable_cors: true,
            },
            invitations: Self::default_invitations(),
            reservations: ReservationConfig { hold_hours: 48 },
            session: SessionConfig {
                poll_attempts: 3,
                poll_interval_ms: 300,
            },
            capabilities_file: None,
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            domains: DomainConfig {
                app_root_domain: "app.staging.example.com".to_string(),
                marketing_root_domain: "staging.example.com".to_string(),
                preview_suffix: ".vercel.app".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                fallback_redirect: "/auth/login".to_string(),
                enable_audit_logging: true,
                enable_cors: true,
            },
            invitations: Self::default_invitations(),
            reservations: ReservationConfig { hold_hours: 48 },
            session: SessionConfig {
                poll_attempts: 3,
                poll_interval_ms: 300,
            },
            capabilities_file: None,
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            domains: DomainConfig {
                app_root_domain: "app.example.com".to_string(),
                marketing_root_domain: "example.com".to_string(),
                preview_suffix: ".vercel.app".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                fallback_redirect: "/auth/login".to_string(),
                enable_audit_logging: true,
                enable_cors: false,
            },
            invitations: Self::default_invitations(),
            reservations: ReservationConfig { hold_hours: 48 },
            session: SessionConfig {
                poll_attempts: 3,
                poll_interval_ms: 300,
            },
            capabilities_file: None,
        }
    }

    fn default_invitations() -> InvitationConfig {
        InvitationConfig {
            expiry_days: 7,
            redirect_path: "/auth/accept-invite".to_string(),
            auth_admin_url: None,
            auth_service_key: None,
        }
    }

    /// Development preset with a fixed secret, for tests and the in-memory CLI mode.
    pub fn for_tests(jwt_secret: &str) -> Self {
        let mut config = Self::development();
        config.domains.app_root_domain = "app.example.com".to_string();
        config.domains.marketing_root_domain = "marketing-root.com".to_string();
        config.security.jwt_secret = jwt_secret.to_string();
        config
    }

    /// Absolute URL an invited user lands on after accepting.
    pub fn invite_redirect_url(&self, subdomain: &str) -> String {
        let scheme = match self.environment {
            Environment::Development => "http",
            _ => "https",
        };
        format!(
            "{}://{}.{}{}",
            scheme, subdomain, self.domains.app_root_domain, self.invitations.redirect_path
        )
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
