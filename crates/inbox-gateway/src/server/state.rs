//! Gateway state
//!
//! Shared dependencies handed to every connection.

use std::sync::Arc;
use std::time::Duration;

use inbox_common::{GatewayConfig, JwtService};
use inbox_service::{PresenceRegistry, ServiceContext};

/// Connection timing and buffering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewaySettings {
    /// Interval announced in HELLO, in milliseconds
    pub heartbeat_interval_ms: u64,
    /// Silence after which a connection is closed with 4009
    pub heartbeat_timeout_ms: u64,
    /// Events queued per connection before pushes to it are dropped
    pub outbound_buffer: usize,
}

impl GatewaySettings {
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 45_000,
            heartbeat_timeout_ms: 90_000,
            outbound_buffer: 256,
        }
    }
}

impl From<&GatewayConfig> for GatewaySettings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            heartbeat_interval_ms: config.heartbeat_interval_ms,
            heartbeat_timeout_ms: config.heartbeat_timeout_ms(),
            outbound_buffer: config.outbound_buffer,
        }
    }
}

/// Gateway application state
///
/// Shares the presence registry with the services, so events they publish
/// reach connections registered here.
#[derive(Clone)]
pub struct GatewayState {
    service_context: Arc<ServiceContext>,
    settings: GatewaySettings,
}

impl GatewayState {
    pub fn new(service_context: ServiceContext, settings: GatewaySettings) -> Self {
        Self {
            service_context: Arc::new(service_context),
            settings,
        }
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn presence(&self) -> &PresenceRegistry {
        self.service_context.presence()
    }

    pub fn jwt_service(&self) -> &JwtService {
        self.service_context.jwt_service()
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("online", &self.presence().online_count())
            .field("settings", &self.settings)
            .finish()
    }
}

/// State over in-memory collaborators
#[cfg(test)]
pub(crate) fn test_state() -> GatewayState {
    use inbox_common::{MemoryDirectory, MemoryMediaStorage};
    use inbox_db::MemoryStore;
    use inbox_service::ServiceContextBuilder;

    let store = Arc::new(MemoryStore::new());
    let ctx = ServiceContextBuilder::new()
        .conversation_repo(store.clone())
        .message_repo(store)
        .directory(Arc::new(MemoryDirectory::open()))
        .media(Arc::new(MemoryMediaStorage::new()))
        .jwt_service(Arc::new(JwtService::new("gateway-test-secret", 900)))
        .build()
        .unwrap();
    GatewayState::new(ctx, GatewaySettings::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let config = GatewayConfig {
            heartbeat_interval_ms: 10_000,
            outbound_buffer: 8,
        };
        let settings = GatewaySettings::from(&config);
        assert_eq!(settings.heartbeat_interval_ms, 10_000);
        assert_eq!(settings.heartbeat_timeout(), Duration::from_secs(20));
        assert_eq!(settings.outbound_buffer, 8);
    }
}
