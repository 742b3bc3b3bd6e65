//! # inbox-common
//!
//! Shared infrastructure: configuration, telemetry, access-token verification,
//! and adapters for the media storage and foreign-entity directory
//! collaborators.

pub mod auth;
pub mod config;
pub mod external;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{strip_bearer, AuthError, Claims, JwtService, TokenType};
pub use config::{
    AppConfig, AppSettings, ConfigError, CorsConfig, DatabaseConfig, DirectoryConfig, Environment,
    GatewayConfig, JwtConfig, MediaConfig, RateLimitConfig, ServerConfig, SnowflakeConfig,
    StorageBackend,
};
pub use external::{HttpDirectory, LocalMediaStorage, MemoryDirectory, MemoryMediaStorage};
pub use telemetry::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
