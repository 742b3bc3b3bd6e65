//! Minimal gateway client for end-to-end tests

use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// How long a test waits for any single frame
const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

pub struct GatewayClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// `d` of the HELLO frame
    pub hello: Value,
}

impl GatewayClient {
    /// Connect and consume the HELLO frame
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = connect_async(url).await?;
        let mut client = Self {
            stream,
            hello: Value::Null,
        };

        let hello = client.next_frame().await?;
        if hello["op"] != 10 {
            bail!("expected HELLO, got {hello}");
        }
        client.hello = hello["d"].clone();
        Ok(client)
    }

    /// Connect, identify and return the client with its READY frame
    pub async fn connect_identified(url: &str, token: &str) -> Result<(Self, Value)> {
        let mut client = Self::connect(url).await?;
        client.identify(token).await?;
        let ready = client.next_dispatch().await?;
        if ready["t"] != "READY" {
            bail!("expected READY, got {ready}");
        }
        Ok((client, ready))
    }

    pub async fn send_json(&mut self, frame: &Value) -> Result<()> {
        self.stream.send(Message::Text(frame.to_string())).await?;
        Ok(())
    }

    pub async fn identify(&mut self, token: &str) -> Result<()> {
        self.send_json(&json!({ "op": 2, "d": { "token": token } }))
            .await
    }

    pub async fn heartbeat(&mut self, seq: Option<u64>) -> Result<()> {
        self.send_json(&json!({ "op": 1, "d": seq })).await
    }

    /// Next text frame as JSON
    pub async fn next_frame(&mut self) -> Result<Value> {
        loop {
            let message = timeout(FRAME_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for a frame")?
                .context("connection ended")??;

            match message {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(frame) => bail!("connection closed: {frame:?}"),
                _ => {}
            }
        }
    }

    /// Next DISPATCH frame, skipping anything else
    pub async fn next_dispatch(&mut self) -> Result<Value> {
        loop {
            let frame = self.next_frame().await?;
            if frame["op"] == 0 {
                return Ok(frame);
            }
        }
    }

    /// Next DISPATCH of the given event name, skipping other events
    pub async fn next_event(&mut self, name: &str) -> Result<Value> {
        loop {
            let frame = self.next_dispatch().await?;
            if frame["t"] == name {
                return Ok(frame);
            }
        }
    }

    /// Wait for the server's close frame and return its code
    pub async fn expect_close(&mut self) -> Result<u16> {
        loop {
            let message = timeout(FRAME_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for close")?;

            match message {
                Some(Ok(Message::Close(Some(frame)))) => return Ok(u16::from(frame.code)),
                Some(Ok(Message::Close(None))) | None => bail!("closed without a code"),
                Some(Ok(_)) => {}
                Some(Err(e)) => bail!("connection error before close: {e}"),
            }
        }
    }

    /// Assert nothing arrives for a short while
    pub async fn expect_silence(&mut self, window: Duration) -> Result<()> {
        match timeout(window, self.stream.next()).await {
            Err(_) => Ok(()),
            Ok(message) => bail!("unexpected frame: {message:?}"),
        }
    }
}
