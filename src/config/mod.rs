use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub base_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_rate_limiting: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    /// Key the limiter on X-Forwarded-For; only safe behind a proxy that sets it
    pub trust_forwarded_for: bool,
    pub max_upload_bytes: usize,
    pub page_max_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub password_cost: u32,
}

/// File-storage provider credentials (Cloudinary-compatible upload API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub base_url: String,
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    #[serde(skip_serializing)]
    pub api_secret: Option<String>,
    pub folder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub api_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub from_address: String,
}

impl StorageConfig {
    pub fn is_configured(&self) -> bool {
        self.cloud_name.is_some() && self.api_key.is_some() && self.api_secret.is_some()
    }
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        self.api_url.is_some() && self.api_key.is_some()
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("NURTURE_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("API_BASE_PATH") {
            self.server.base_path = normalize_base_path(&v);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
                self.database.backend = DatabaseBackend::Postgres;
            }
        }
        match env::var("DATABASE_BACKEND").as_deref() {
            Ok("memory") => self.database.backend = DatabaseBackend::Memory,
            Ok("postgres") => self.database.backend = DatabaseBackend::Postgres,
            _ => {}
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_TIMEOUT_SECS") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("RATE_LIMIT_ENABLED") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        if let Ok(v) = env::var("RATE_LIMIT_MAX_REQUESTS") {
            self.api.rate_limit_requests = v.parse().unwrap_or(self.api.rate_limit_requests);
        }
        if let Ok(v) = env::var("RATE_LIMIT_WINDOW_SECS") {
            self.api.rate_limit_window_secs = v.parse().unwrap_or(self.api.rate_limit_window_secs);
        }
        if let Ok(v) = env::var("RATE_LIMIT_TRUST_PROXY") {
            self.api.trust_forwarded_for = v.parse().unwrap_or(self.api.trust_forwarded_for);
        }
        if let Ok(v) = env::var("MAX_UPLOAD_BYTES") {
            self.api.max_upload_bytes = v.parse().unwrap_or(self.api.max_upload_bytes);
        }
        if let Ok(v) = env::var("PAGE_MAX_LIMIT") {
            self.api.page_max_limit = v.parse().unwrap_or(self.api.page_max_limit);
        }

        // Security overrides
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("BCRYPT_COST") {
            self.security.password_cost = v.parse().unwrap_or(self.security.password_cost);
        }

        // Storage overrides
        if let Ok(v) = env::var("STORAGE_BASE_URL") {
            self.storage.base_url = v;
        }
        self.storage.cloud_name = env::var("STORAGE_CLOUD_NAME").ok().or(self.storage.cloud_name);
        self.storage.api_key = env::var("STORAGE_API_KEY").ok().or(self.storage.api_key);
        self.storage.api_secret = env::var("STORAGE_API_SECRET").ok().or(self.storage.api_secret);
        if let Ok(v) = env::var("STORAGE_FOLDER") {
            self.storage.folder = v;
        }

        // Email overrides
        self.email.api_url = env::var("EMAIL_API_URL").ok().or(self.email.api_url);
        self.email.api_key = env::var("EMAIL_API_KEY").ok().or(self.email.api_key);
        if let Ok(v) = env::var("EMAIL_FROM") {
            self.email.from_address = v;
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                base_path: "/api/v1".to_string(),
            },
            database: DatabaseConfig {
                backend: DatabaseBackend::Memory,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                enable_rate_limiting: false,
                rate_limit_requests: 1000,
                rate_limit_window_secs: 60,
                trust_forwarded_for: false,
                max_upload_bytes: 25 * 1024 * 1024, // 25MB
                page_max_limit: 100,
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:8081".to_string()],
                jwt_secret: "development-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                password_cost: 10,
            },
            storage: StorageConfig::default(),
            email: EmailConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                base_path: "/api/v1".to_string(),
            },
            database: DatabaseConfig {
                backend: DatabaseBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 300,
                rate_limit_window_secs: 60,
                trust_forwarded_for: false,
                max_upload_bytes: 25 * 1024 * 1024,
                page_max_limit: 100,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.nurture.app".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                password_cost: 12,
            },
            storage: StorageConfig::default(),
            email: EmailConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                base_path: "/api/v1".to_string(),
            },
            database: DatabaseConfig {
                backend: DatabaseBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 100,
                rate_limit_window_secs: 15 * 60,
                trust_forwarded_for: false,
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
                page_max_limit: 50,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.nurture.app".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7,
                password_cost: 12,
            },
            storage: StorageConfig::default(),
            email: EmailConfig::default(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cloudinary.com/v1_1/".to_string(),
            cloud_name: None,
            api_key: None,
            api_secret: None,
            folder: "nurture".to_string(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            from_address: "Nurture <no-reply@nurture.app>".to_string(),
        }
    }
}

/// "/api/v1/" and "api/v1" both become "/api/v1"; empty stays empty (routes at the root)
fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database.backend, DatabaseBackend::Memory);
        assert!(!config.api.enable_rate_limiting);
        assert!(!config.security.jwt_secret.is_empty());
        assert_eq!(config.server.base_path, "/api/v1");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.is_production());
        assert!(config.api.enable_rate_limiting);
        assert_eq!(config.database.backend, DatabaseBackend::Postgres);
        // production must be given a secret explicitly
        assert!(config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_base_path_normalization() {
        assert_eq!(normalize_base_path("/api/v2/"), "/api/v2");
        assert_eq!(normalize_base_path("api"), "/api");
        assert_eq!(normalize_base_path("/"), "");
    }

    #[test]
    fn test_unconfigured_providers() {
        let config = AppConfig::development();
        assert!(!config.storage.is_configured());
        assert!(!config.email.is_configured());
    }
}
