//! Application configuration structs
//!
//! Loaded from environment variables (a `.env` file is honoured when present).
//! Unset optional variables fall back to defaults; a variable that is set but
//! cannot be parsed is an error rather than silently defaulted.

use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub storage: StorageBackend,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub media: MediaConfig,
    pub directory: DirectoryConfig,
    pub gateway: GatewayConfig,
    pub snowflake: SnowflakeConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// HTTP listener (REST and gateway share it)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where conversations and messages are persisted
#[derive(Debug, Clone)]
pub enum StorageBackend {
    Postgres(DatabaseConfig),
    /// Process-local store; everything is lost on restart
    Memory,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Lifetime of tokens issued by tooling, in seconds
    pub access_token_expiry: i64,
}

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst: u32,
}

/// CORS configuration
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Local media storage for conversation avatars
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub root: String,
    /// Base URL the stored files are served from
    pub public_url: String,
    pub max_avatar_size_mb: u32,
}

impl MediaConfig {
    #[must_use]
    pub fn max_avatar_bytes(&self) -> usize {
        self.max_avatar_size_mb as usize * 1024 * 1024
    }
}

/// Foreign-entity directory (products, posts, profiles)
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Base URL of the directory service; `None` selects the open in-memory directory
    pub url: Option<String>,
    pub timeout_secs: u64,
}

/// WebSocket gateway tuning
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub heartbeat_interval_ms: u64,
    /// Outbound events buffered per connection before pushes are dropped
    pub outbound_buffer: usize,
}

impl GatewayConfig {
    /// Connections silent for two intervals are closed
    #[must_use]
    pub fn heartbeat_timeout_ms(&self) -> u64 {
        self.heartbeat_interval_ms * 2
    }
}

/// Snowflake ID generator configuration
#[derive(Debug, Clone)]
pub struct SnowflakeConfig {
    pub worker_id: u16,
}

// Default value functions
fn default_app_name() -> String {
    "inbox".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_access_token_expiry() -> i64 {
    900 // 15 minutes
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_burst() -> u32 {
    50
}

fn default_media_root() -> String {
    "./uploads".to_string()
}

fn default_media_public_url() -> String {
    "/media".to_string()
}

fn default_max_avatar_size() -> u32 {
    5
}

fn default_directory_timeout() -> u64 {
    5
}

fn default_heartbeat_interval() -> u64 {
    45_000
}

fn default_outbound_buffer() -> usize {
    100
}

/// Read and parse an optional variable, falling back to `default` when unset
fn env_or<T: FromStr>(key: &'static str, default: impl FnOnce() -> T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        _ => Ok(default()),
    }
}

fn env_required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingVar(key))
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let storage = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StorageBackend::Postgres(DatabaseConfig {
                url: env_required("DATABASE_URL")?,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", default_max_connections)?,
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", default_min_connections)?,
            }),
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue("STORAGE_BACKEND", other.to_string()));
            }
        };

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env_or("APP_ENV", Environment::default)?,
            },
            server: ServerConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| default_host()),
                port: env_or("API_PORT", default_port)?,
            },
            storage,
            jwt: JwtConfig {
                secret: env_required("JWT_SECRET")?,
                access_token_expiry: env_or("JWT_ACCESS_TOKEN_EXPIRY", default_access_token_expiry)?,
            },
            rate_limit: RateLimitConfig {
                requests_per_second: env_or(
                    "RATE_LIMIT_REQUESTS_PER_SECOND",
                    default_requests_per_second,
                )?,
                burst: env_or("RATE_LIMIT_BURST", default_burst)?,
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .ok()
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|o| !o.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            media: MediaConfig {
                root: env::var("MEDIA_ROOT").unwrap_or_else(|_| default_media_root()),
                public_url: env::var("MEDIA_PUBLIC_URL")
                    .unwrap_or_else(|_| default_media_public_url()),
                max_avatar_size_mb: env_or("MAX_AVATAR_SIZE_MB", default_max_avatar_size)?,
            },
            directory: DirectoryConfig {
                url: env::var("DIRECTORY_URL").ok().filter(|u| !u.trim().is_empty()),
                timeout_secs: env_or("DIRECTORY_TIMEOUT_SECS", default_directory_timeout)?,
            },
            gateway: GatewayConfig {
                heartbeat_interval_ms: env_or(
                    "GATEWAY_HEARTBEAT_INTERVAL_MS",
                    default_heartbeat_interval,
                )?,
                outbound_buffer: env_or("GATEWAY_OUTBOUND_BUFFER", default_outbound_buffer)?,
            },
            snowflake: SnowflakeConfig {
                worker_id: env_or("WORKER_ID", || 0)?,
            },
        })
    }

    /// In-memory configuration with defaults everywhere
    ///
    /// Used by tests and local demos that run without PostgreSQL.
    #[must_use]
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: Environment::Development,
            },
            server: ServerConfig {
                host: default_host(),
                port: 0,
            },
            storage: StorageBackend::Memory,
            jwt: JwtConfig {
                secret: jwt_secret.to_string(),
                access_token_expiry: default_access_token_expiry(),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: 1000,
                burst: 1000,
            },
            cors: CorsConfig::default(),
            media: MediaConfig {
                root: std::env::temp_dir()
                    .join("inbox-media")
                    .to_string_lossy()
                    .into_owned(),
                public_url: default_media_public_url(),
                max_avatar_size_mb: default_max_avatar_size(),
            },
            directory: DirectoryConfig {
                url: None,
                timeout_secs: default_directory_timeout(),
            },
            gateway: GatewayConfig {
                heartbeat_interval_ms: default_heartbeat_interval(),
                outbound_buffer: default_outbound_buffer(),
            },
            snowflake: SnowflakeConfig { worker_id: 0 },
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
