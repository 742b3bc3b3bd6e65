//! Server setup and initialization
//!
//! Wires storage, collaborators and the real-time plumbing into one
//! [`ServiceContext`], then serves the REST routes and the gateway from the
//! same listener.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use inbox_common::{
    AppConfig, HttpDirectory, JwtService, LocalMediaStorage, MemoryDirectory, StorageBackend,
};
use inbox_core::traits::{ConversationRepository, ForeignDirectory, MessageRepository};
use inbox_core::SnowflakeGenerator;
use inbox_db::{
    apply_schema, create_pool, MemoryStore, PgConversationRepository, PgMessageRepository,
};
use inbox_gateway::{GatewaySettings, GatewayState};
use inbox_service::{PresenceRegistry, ServiceContextBuilder};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::middleware::apply_middleware;
use crate::routes::{create_router, health_routes};
use crate::state::AppState;

/// Failures while starting or running the server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type Repositories = (Arc<dyn ConversationRepository>, Arc<dyn MessageRepository>);

/// Build the complete application: REST routes with middleware, health
/// probes, the gateway, and local media when it is served from this host
pub fn create_app(state: AppState) -> Result<Router, ServerError> {
    let config = state.config().clone();

    let api = apply_middleware(
        create_router(config.media.max_avatar_bytes()),
        &config.rate_limit,
        &config.cors,
        config.app.env.is_production(),
    )?;

    let gateway = inbox_gateway::router(GatewayState::new(
        state.service_context().clone(),
        GatewaySettings::from(&config.gateway),
    ));

    let mut app = Router::new()
        .merge(health_routes())
        .merge(api)
        .with_state(state)
        .merge(gateway);

    // Avatars stored under a relative public URL are served from this host
    if config.media.public_url.starts_with('/') && config.media.public_url.len() > 1 {
        app = app.nest_service(&config.media.public_url, ServeDir::new(&config.media.root));
    }

    Ok(app)
}

/// Initialize all dependencies and create AppState
pub async fn create_app_state(config: AppConfig) -> Result<AppState, ServerError> {
    let (conversation_repo, message_repo) = open_storage(&config.storage).await?;

    let directory: Arc<dyn ForeignDirectory> = match &config.directory.url {
        Some(url) => {
            info!(url = %url, "Using HTTP directory");
            Arc::new(
                HttpDirectory::new(url, Duration::from_secs(config.directory.timeout_secs))
                    .map_err(|e| ServerError::Config(e.to_string()))?,
            )
        }
        None => {
            warn!("DIRECTORY_URL not set; every referenced id resolves to a placeholder");
            Arc::new(MemoryDirectory::open())
        }
    };

    let media = Arc::new(LocalMediaStorage::new(
        &config.media.root,
        &config.media.public_url,
    ));

    let jwt_service = Arc::new(JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expiry,
    ));

    let snowflake_generator = Arc::new(
        SnowflakeGenerator::new(config.snowflake.worker_id)
            .map_err(|e| ServerError::Config(e.to_string()))?,
    );

    let service_context = ServiceContextBuilder::new()
        .conversation_repo(conversation_repo)
        .message_repo(message_repo)
        .directory(directory)
        .media(media)
        .presence(Arc::new(PresenceRegistry::new()))
        .jwt_service(jwt_service)
        .snowflake_generator(snowflake_generator)
        .max_avatar_bytes(config.media.max_avatar_bytes())
        .build()
        .map_err(|e| ServerError::Config(e.to_string()))?;

    Ok(AppState::new(service_context, config))
}

async fn open_storage(storage: &StorageBackend) -> Result<Repositories, ServerError> {
    match storage {
        StorageBackend::Postgres(db) => {
            info!("Connecting to PostgreSQL...");
            let db_config =
                inbox_db::DatabaseConfig::new(&db.url, db.max_connections, db.min_connections);
            let pool = create_pool(&db_config)
                .await
                .map_err(|e| ServerError::Storage(e.to_string()))?;
            apply_schema(&pool)
                .await
                .map_err(|e| ServerError::Storage(e.to_string()))?;
            info!("PostgreSQL connection established");

            let conversations: Arc<dyn ConversationRepository> =
                Arc::new(PgConversationRepository::new(pool.clone()));
            let messages: Arc<dyn MessageRepository> = Arc::new(PgMessageRepository::new(pool));
            Ok((conversations, messages))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            let conversations: Arc<dyn ConversationRepository> = store.clone();
            let messages: Arc<dyn MessageRepository> = store;
            Ok((conversations, messages))
        }
    }
}

/// Serve `app` on an already bound listener until ctrl-c
pub async fn serve(listener: TcpListener, app: Router) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    info!("Server listening on http://{addr} (gateway at ws://{addr}/gateway)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), ServerError> {
    let address = config.server.address();

    let state = create_app_state(config).await?;
    let app = create_app(state)?;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| ServerError::Config(format!("Failed to bind to {address}: {e}")))?;

    serve(listener, app).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
