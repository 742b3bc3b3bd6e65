//! Test helpers for integration tests
//!
//! Spawns a server over in-memory storage and seeded collaborators, and
//! wraps the HTTP calls the tests make.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use inbox_api::{create_app, AppState};
use inbox_common::{AppConfig, JwtService, MemoryDirectory, MemoryMediaStorage};
use inbox_core::{ForeignKind, ForeignPreview, Snowflake, SnowflakeGenerator};
use inbox_db::MemoryStore;
use inbox_service::{PresenceRegistry, ServiceContextBuilder};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::fixtures::{LAMP_PRODUCT, LAMP_TITLE, USERS};

const TEST_SECRET: &str = "integration-test-secret";

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub state: AppState,
    pub media: Arc<MemoryMediaStorage>,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());

        let directory = Arc::new(MemoryDirectory::new());
        for (id, name) in USERS {
            directory.insert_user(Snowflake::new(*id), name);
        }
        directory.insert(ForeignPreview {
            kind: ForeignKind::Product,
            id: Snowflake::new(LAMP_PRODUCT),
            title: LAMP_TITLE.to_string(),
            image_url: None,
        });

        let media = Arc::new(MemoryMediaStorage::new());

        let service_context = ServiceContextBuilder::new()
            .conversation_repo(store.clone())
            .message_repo(store)
            .directory(directory)
            .media(media.clone())
            .presence(Arc::new(PresenceRegistry::new()))
            .jwt_service(Arc::new(JwtService::new(
                &config.jwt.secret,
                config.jwt.access_token_expiry,
            )))
            .snowflake_generator(Arc::new(SnowflakeGenerator::new(
                config.snowflake.worker_id,
            )?))
            .max_avatar_bytes(config.media.max_avatar_bytes())
            .build()?;

        let state = AppState::new(service_context, config);
        let app = create_app(state.clone())?;

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            if let Err(e) = inbox_api::serve(listener, app).await {
                eprintln!("test server stopped: {e}");
            }
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            state,
            media,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn gateway_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Access token for a user id
    pub fn token(&self, user: i64) -> String {
        self.state
            .jwt_service()
            .issue_access_token(Snowflake::new(user))
            .unwrap_or_default()
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url(), path)
    }

    fn authed(&self, builder: RequestBuilder, user: i64) -> RequestBuilder {
        builder.header("Authorization", format!("Bearer {}", self.token(user)))
    }

    /// Make a GET request outside /api/v1
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make an unauthenticated API GET request
    pub async fn get_anonymous(&self, path: &str) -> Result<Response> {
        Ok(self.client.get(self.api(path)).send().await?)
    }

    /// Make an API GET request with a raw Authorization header
    pub async fn get_with_header(&self, path: &str, authorization: &str) -> Result<Response> {
        Ok(self
            .client
            .get(self.api(path))
            .header("Authorization", authorization)
            .send()
            .await?)
    }

    pub async fn get_as(&self, user: i64, path: &str) -> Result<Response> {
        Ok(self.authed(self.client.get(self.api(path)), user).send().await?)
    }

    pub async fn post_as<T: Serialize>(&self, user: i64, path: &str, body: &T) -> Result<Response> {
        Ok(self
            .authed(self.client.post(self.api(path)), user)
            .json(body)
            .send()
            .await?)
    }

    /// POST without a body
    pub async fn post_empty_as(&self, user: i64, path: &str) -> Result<Response> {
        Ok(self
            .authed(self.client.post(self.api(path)), user)
            .send()
            .await?)
    }

    pub async fn patch_as<T: Serialize>(
        &self,
        user: i64,
        path: &str,
        body: &T,
    ) -> Result<Response> {
        Ok(self
            .authed(self.client.patch(self.api(path)), user)
            .json(body)
            .send()
            .await?)
    }

    /// PUT raw bytes with a content type
    pub async fn put_bytes_as(
        &self,
        user: i64,
        path: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Response> {
        Ok(self
            .authed(self.client.put(self.api(path)), user)
            .header("Content-Type", content_type)
            .body(body)
            .send()
            .await?)
    }

    /// PUT without a body
    pub async fn put_empty_as(&self, user: i64, path: &str) -> Result<Response> {
        Ok(self
            .authed(self.client.put(self.api(path)), user)
            .send()
            .await?)
    }

    pub async fn delete_as(&self, user: i64, path: &str) -> Result<Response> {
        Ok(self
            .authed(self.client.delete(self.api(path)), user)
            .send()
            .await?)
    }
}

/// In-memory configuration with a fixed secret
pub fn test_config() -> AppConfig {
    AppConfig::in_memory(TEST_SECRET)
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(())
}
